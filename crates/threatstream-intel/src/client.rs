//! ThreatStream REST API client
//!
//! One HTTP call per operation. The response status is compared against the
//! status the endpoint returns on success; anything else becomes
//! [`IntegrationError::UnexpectedStatus`]. No retries.

use crate::error::{IntegrationError, Result};
use crate::observable::{ObservableUpdate, Tlp};
use crate::options::Options;
use crate::tags::{Tag, TagDirectory};
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, error, trace};

/// Records returned per intelligence search
pub const LOOKUP_LIMIT: u32 = 50;
/// Suggestions returned per organization tag search
pub const ORG_TAG_SEARCH_LIMIT: u32 = 20;
/// Upper bound on the curated organization tag list
pub const ORG_TAG_LIST_LIMIT: u32 = 500;

/// Operator identity used when tagging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub user_id: u64,
    pub org_id: u64,
}

/// Client bound to one call's options
#[derive(Debug, Clone, Copy)]
pub struct ThreatStreamClient<'a> {
    http: &'a reqwest::Client,
    options: &'a Options,
}

impl<'a> ThreatStreamClient<'a> {
    pub fn new(http: &'a reqwest::Client, options: &'a Options) -> Self {
        Self { http, options }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.options.base_url(), path)
    }

    /// Request authenticated with `username` / `api_key` query parameters
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, self.url(path)).query(&[
            ("username", self.options.username.as_str()),
            ("api_key", self.options.api_key.as_str()),
        ])
    }

    async fn send(&self, request: RequestBuilder, expected: StatusCode, op: &str) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            error!(op, error = %e, "ThreatStream request failed");
            IntegrationError::Network(e)
        })?;

        let status = response.status();
        let text = response.text().await?;

        if status != expected {
            error!(op, status = status.as_u16(), expected = expected.as_u16(), "Unexpected HTTP status");
            return Err(IntegrationError::UnexpectedStatus {
                status: status.as_u16(),
                expected: expected.as_u16(),
                reason: status.canonical_reason().map(String::from),
                body: parse_error_body(&text),
            });
        }

        trace!(op, body = %text, "ThreatStream response");

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text).map_err(|e| {
            IntegrationError::MalformedResponse(format!("{} returned invalid JSON: {}", op, e))
        })
    }

    /// Search intelligence with a prebuilt query, returning the raw records
    pub async fn lookup(&self, query: &str) -> Result<Vec<Value>> {
        debug!(query, "Looking up indicators");

        let limit = LOOKUP_LIMIT.to_string();
        let request = self
            .http
            .get(self.url("/api/v2/intelligence"))
            .header(
                reqwest::header::AUTHORIZATION,
                format!("apikey {}:{}", self.options.username, self.options.api_key),
            )
            .query(&[("q", query), ("limit", limit.as_str())]);

        let body = self.send(request, StatusCode::OK, "lookup").await?;

        // missing or non-array `objects` means no hits
        Ok(body
            .get("objects")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default())
    }

    /// Resolve the operator's user and organization ids
    pub async fn get_user_info(&self) -> Result<UserInfo> {
        let body = self
            .send(self.request(Method::GET, "/api/v1/user"), StatusCode::OK, "get_user_info")
            .await?;

        let user = body
            .get("objects")
            .and_then(Value::as_array)
            .and_then(|objects| objects.first())
            .ok_or_else(|| IntegrationError::MalformedResponse("Unexpected user response body".into()))?;

        let user_id = user.pointer("/api_key/id").and_then(Value::as_u64);
        let org_id = user.pointer("/organization/id").and_then(Value::as_u64);

        match (user_id, org_id) {
            (Some(user_id), Some(org_id)) => Ok(UserInfo { user_id, org_id }),
            _ => Err(IntegrationError::MalformedResponse(
                "Unexpected user response body".into(),
            )),
        }
    }

    /// Attach a user tag to an observable
    pub async fn add_tag(&self, observable_id: &str, tag: &str, user: UserInfo, tlp: Tlp) -> Result<Value> {
        let body = json!({
            "tags": [{
                "name": tag,
                "category": "user",
                "org_id": user.org_id,
                "source_user": "",
                "source_user_id": user.user_id,
                "tagger": "user",
                "tlp": tlp,
            }]
        });

        debug!(observable_id, tag, %tlp, "Adding tag");

        let request = self
            .request(Method::POST, &format!("/api/v1/intelligence/{}/tag/", observable_id))
            .json(&body);
        self.send(request, StatusCode::CREATED, "add_tag").await
    }

    pub async fn delete_tag(&self, observable_id: &str, tag_id: &str) -> Result<Value> {
        debug!(observable_id, tag_id, "Deleting tag");

        let path = format!("/api/v1/intelligence/{}/tag/{}/", observable_id, tag_id);
        self.send(self.request(Method::DELETE, &path), StatusCode::OK, "delete_tag")
            .await
    }

    pub async fn get_comments(&self, value: &str) -> Result<Value> {
        let request = self
            .request(Method::GET, "/api/v2/intelligence/comments/")
            .query(&[("value", value)]);
        let body = self.send(request, StatusCode::OK, "get_comments").await?;

        Ok(body.get("comments").cloned().unwrap_or_else(|| json!([])))
    }

    pub async fn create_comment(&self, value: &str, comment: &str, tlp: Tlp) -> Result<Value> {
        debug!(value, %tlp, "Creating comment");

        let request = self
            .request(Method::POST, "/api/v2/intelligence/comments/")
            .query(&[("value", value)])
            .json(&json!({ "comment": comment, "tlp": tlp }));
        self.send(request, StatusCode::CREATED, "create_comment").await
    }

    pub async fn get_observable(&self, observable_id: &str) -> Result<Value> {
        let path = format!("/api/v2/intelligence/{}/", observable_id);
        self.send(self.request(Method::GET, &path), StatusCode::OK, "get_observable")
            .await
    }

    pub async fn update_observable(&self, observable_id: &str, update: &ObservableUpdate) -> Result<Value> {
        debug!(observable_id, ?update, "Updating observable");

        let path = format!("/api/v2/intelligence/{}/", observable_id);
        let request = self.request(Method::PATCH, &path).json(update);
        self.send(request, StatusCode::ACCEPTED, "update_observable").await
    }
}

#[async_trait]
impl<'a> TagDirectory for ThreatStreamClient<'a> {
    async fn org_tag_list(&self) -> Result<Vec<Tag>> {
        let limit = ORG_TAG_LIST_LIMIT.to_string();
        let request = self
            .request(Method::GET, "/api/v1/orgtag/")
            .query(&[("limit", limit.as_str())]);
        let body = self.send(request, StatusCode::OK, "org_tag_list").await?;

        let objects = body
            .get("objects")
            .and_then(Value::as_array)
            .ok_or_else(|| IntegrationError::MalformedResponse("orgtag response has no objects".into()))?;

        Ok(objects
            .iter()
            .filter_map(|object| object.get("name").and_then(Value::as_str))
            .map(|name| Tag::preferred(name))
            .collect())
    }

    async fn search_org_tags(&self, term: &str, exclude: &[String]) -> Result<Vec<Tag>> {
        let limit = ORG_TAG_SEARCH_LIMIT.to_string();
        let exclude = exclude.join(",");
        let request = self
            .request(Method::GET, "/api/v2/intelligence/tags_by_org/")
            .query(&[("term", term), ("exclude", exclude.as_str()), ("limit", limit.as_str())]);
        let body = self.send(request, StatusCode::OK, "search_org_tags").await?;

        let tags = body
            .get("tags")
            .and_then(Value::as_array)
            .ok_or_else(|| IntegrationError::MalformedResponse("tags_by_org response has no tags".into()))?;

        Ok(tags
            .iter()
            .filter_map(|object| object.get("tag").and_then(Value::as_str))
            .map(|name| Tag::org(name))
            .collect())
    }
}

/// Keep a failed response's body for the error payload
fn parse_error_body(text: &str) -> Option<Value> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
}
