//! Tag cache and tag search
//!
//! Preferred tags (the organization's curated tags plus the kill-chain phase
//! tags) are fetched once per [`TagCache`] and reused for every search.
//! Free-text searches also hit the organization tag search endpoint and the
//! two lists are merged.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Search term returning only the cached preferred tags
pub const WILDCARD: &str = "*";

/// Kill-chain phases offered as preferred tags
pub const KILL_CHAIN_PHASES: [&str; 7] = [
    "Reconnaisance",
    "Weaponization",
    "Delivery",
    "Exploitation",
    "Installation",
    "Command & Control (C2)",
    "Actions on Objectives",
];

/// A tag suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub name: String,
    pub is_preferred: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_new: bool,
}

impl Tag {
    pub fn preferred(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_preferred: true,
            is_new: false,
        }
    }

    pub fn org(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_preferred: false,
            is_new: false,
        }
    }

    /// The analyst's own term, offered as a brand new tag
    pub fn new_term(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_preferred: false,
            is_new: true,
        }
    }

    fn sort_key(&self) -> String {
        self.name.to_lowercase()
    }
}

pub fn kill_chain_tags() -> Vec<Tag> {
    KILL_CHAIN_PHASES.iter().map(|name| Tag::preferred(*name)).collect()
}

/// Source of organization tags
#[async_trait]
pub trait TagDirectory: Send + Sync {
    /// Every curated organization tag
    async fn org_tag_list(&self) -> Result<Vec<Tag>>;

    /// Organization tags matching `term`, minus `exclude`
    async fn search_org_tags(&self, term: &str, exclude: &[String]) -> Result<Vec<Tag>>;
}

/// Sort case-insensitively by name
pub fn sort_tags(tags: &mut [Tag]) {
    tags.sort_by_cached_key(Tag::sort_key);
}

/// Union of preferred and ad hoc tags
///
/// Names are compared case-insensitively; when both lists carry a name the
/// preferred variant wins. The result is sorted by name.
pub fn merge_tags(preferred: Vec<Tag>, others: Vec<Tag>) -> Vec<Tag> {
    let mut merged: HashMap<String, Tag> = HashMap::with_capacity(preferred.len() + others.len());

    for tag in preferred.into_iter().chain(others) {
        merged
            .entry(tag.sort_key())
            .and_modify(|existing| {
                if tag.is_preferred && !existing.is_preferred {
                    *existing = tag.clone();
                }
            })
            .or_insert(tag);
    }

    let mut tags: Vec<Tag> = merged.into_values().collect();
    sort_tags(&mut tags);
    tags
}

/// Preferred tags cached for the lifetime of the owner
#[derive(Debug, Default)]
pub struct TagCache {
    preferred: RwLock<Option<Vec<Tag>>>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn is_initialized(&self) -> bool {
        self.preferred.read().await.is_some()
    }

    /// Cached preferred tags, empty before the first load
    pub async fn preferred(&self) -> Vec<Tag> {
        self.preferred.read().await.clone().unwrap_or_default()
    }

    /// Load the preferred tags unless already cached
    pub async fn ensure_initialized<D>(&self, directory: &D) -> Result<()>
    where
        D: TagDirectory + ?Sized,
    {
        if self.is_initialized().await {
            return Ok(());
        }

        let mut guard = self.preferred.write().await;
        // another caller may have loaded while we waited for the lock
        if guard.is_none() {
            *guard = Some(load_preferred(directory).await?);
        }
        Ok(())
    }

    /// Reload the preferred tags unconditionally
    pub async fn refresh<D>(&self, directory: &D) -> Result<()>
    where
        D: TagDirectory + ?Sized,
    {
        let tags = load_preferred(directory).await?;
        *self.preferred.write().await = Some(tags);
        Ok(())
    }

    /// Tag suggestions for `term`
    pub async fn search<D>(&self, directory: &D, term: &str, exclude: &[String]) -> Result<Vec<Tag>>
    where
        D: TagDirectory + ?Sized,
    {
        self.ensure_initialized(directory).await?;

        let excluded_lower: Vec<String> = exclude.iter().map(|e| e.to_lowercase()).collect();
        let needle = term.to_lowercase();

        let mut preferred: Vec<Tag> = self
            .preferred()
            .await
            .into_iter()
            .filter(|tag| {
                let name = tag.name.to_lowercase();
                !excluded_lower.contains(&name) && (term == WILDCARD || name.contains(&needle))
            })
            .collect();

        debug!(term, matches = preferred.len(), "Filtered preferred tags");

        if term == WILDCARD {
            sort_tags(&mut preferred);
            return Ok(preferred);
        }

        let org_tags = directory.search_org_tags(term, exclude).await?;
        let mut tags = merge_tags(preferred, org_tags);

        if !term.is_empty() {
            tags.insert(0, Tag::new_term(term));
        }

        Ok(tags)
    }
}

async fn load_preferred<D>(directory: &D) -> Result<Vec<Tag>>
where
    D: TagDirectory + ?Sized,
{
    let org_tags = directory
        .org_tag_list()
        .await?
        .into_iter()
        .map(|tag| Tag::preferred(tag.name));

    let tags = merge_tags(org_tags.chain(kill_chain_tags()).collect(), Vec::new());
    info!(count = tags.len(), "Cached preferred tags");
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeDirectory {
        org_list: Vec<&'static str>,
        search_results: Vec<&'static str>,
        list_calls: AtomicUsize,
        search_calls: AtomicUsize,
    }

    #[async_trait]
    impl TagDirectory for FakeDirectory {
        async fn org_tag_list(&self) -> Result<Vec<Tag>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.org_list.iter().map(|n| Tag::preferred(*n)).collect())
        }

        async fn search_org_tags(&self, _term: &str, _exclude: &[String]) -> Result<Vec<Tag>> {
            self.search_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.search_results.iter().map(|n| Tag::org(*n)).collect())
        }
    }

    fn names(tags: &[Tag]) -> Vec<&str> {
        tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn test_merge_prefers_preferred_variant() {
        let merged = merge_tags(
            vec![Tag::preferred("APT29")],
            vec![Tag::org("apt29"), Tag::org("botnet"), Tag::org("Botnet")],
        );

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], Tag::preferred("APT29"));
        assert!(!merged[1].is_preferred);
        assert_eq!(merged[1].name.to_lowercase(), "botnet");
    }

    #[test]
    fn test_merge_preferred_wins_regardless_of_order() {
        let merged = merge_tags(Vec::new(), vec![Tag::org("phish"), Tag::preferred("Phish")]);
        assert_eq!(merged, vec![Tag::preferred("Phish")]);
    }

    #[test]
    fn test_sort_is_case_insensitive() {
        let mut tags = vec![Tag::org("zeus"), Tag::org("Alpha"), Tag::org("beta")];
        sort_tags(&mut tags);
        assert_eq!(names(&tags), vec!["Alpha", "beta", "zeus"]);
    }

    #[test]
    fn test_cache_empty_before_load() {
        let cache = TagCache::new();
        assert!(!tokio_test::block_on(cache.is_initialized()));
        assert!(tokio_test::block_on(cache.preferred()).is_empty());
    }

    #[tokio::test]
    async fn test_cache_loads_once_and_appends_kill_chain() {
        let directory = FakeDirectory {
            org_list: vec!["Ransomware", "delivery"],
            ..Default::default()
        };
        let cache = TagCache::new();
        assert!(!cache.is_initialized().await);

        cache.ensure_initialized(&directory).await.unwrap();
        cache.ensure_initialized(&directory).await.unwrap();

        assert_eq!(directory.list_calls.load(Ordering::SeqCst), 1);
        let preferred = cache.preferred().await;
        assert!(preferred.iter().all(|t| t.is_preferred));
        // "delivery" from the org list collapses with the kill-chain "Delivery"
        assert_eq!(preferred.len(), 1 + KILL_CHAIN_PHASES.len());
        assert!(preferred.iter().any(|t| t.name == "Ransomware"));

        cache.refresh(&directory).await.unwrap();
        assert_eq!(directory.list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_wildcard_returns_sorted_preferred_only() {
        let directory = FakeDirectory {
            org_list: vec!["zeus", "APT29", "botnet"],
            search_results: vec!["should-not-appear"],
            ..Default::default()
        };
        let cache = TagCache::new();

        let tags = cache
            .search(&directory, WILDCARD, &["BOTNET".to_string(), "delivery".to_string()])
            .await
            .unwrap();

        assert_eq!(directory.search_calls.load(Ordering::SeqCst), 0);
        assert!(tags.iter().all(|t| t.is_preferred && !t.is_new));
        assert!(!tags.iter().any(|t| t.name == "botnet" || t.name == "Delivery"));

        let sorted: Vec<String> = tags.iter().map(|t| t.name.to_lowercase()).collect();
        let mut expected = sorted.clone();
        expected.sort();
        assert_eq!(sorted, expected);
        assert_eq!(tags.len(), 2 + KILL_CHAIN_PHASES.len() - 1);
    }

    #[tokio::test]
    async fn test_term_search_merges_and_prepends_new_term() {
        let directory = FakeDirectory {
            org_list: vec!["Emotet"],
            search_results: vec!["emotet", "emotet-loader"],
            ..Default::default()
        };
        let cache = TagCache::new();

        let tags = cache.search(&directory, "emo", &[]).await.unwrap();

        assert_eq!(tags[0], Tag::new_term("emo"));
        assert_eq!(&tags[1..], &[Tag::preferred("Emotet"), Tag::org("emotet-loader")]);
        assert_eq!(directory.search_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_term_has_no_new_tag() {
        let directory = FakeDirectory {
            search_results: vec!["c2"],
            ..Default::default()
        };

        let tags = TagCache::new().search(&directory, "", &[]).await.unwrap();
        assert!(!tags.iter().any(|t| t.is_new));
        assert!(tags.iter().any(|t| t.name == "c2"));
    }
}
