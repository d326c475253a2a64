//! ThreatStream search query builder
//!
//! Produces the boolean expression passed as `q` to the intelligence search
//! endpoint. Values are interpolated literally; quotes or operators inside a
//! value are not escaped.

use crate::entity::{Entity, SearchType};
use crate::options::{Options, Severity};

/// Builds search queries for one set of filter options
#[derive(Debug, Clone, Copy)]
pub struct QueryBuilder<'a> {
    options: &'a Options,
}

impl<'a> QueryBuilder<'a> {
    pub fn new(options: &'a Options) -> Self {
        Self { options }
    }

    /// Query for one batch of entities
    pub fn build(&self, batch: &[Entity], types: &[SearchType]) -> String {
        let mut clauses = vec![
            value_clause(batch.iter().map(|e| e.value.as_str())),
            format!("confidence>={}", self.options.minimum_confidence),
            severity_clause(self.options.minimum_severity),
        ];

        if !types.is_empty() {
            let types: Vec<_> = types.iter().map(SearchType::clause).collect();
            clauses.push(format!("({})", types.join(" OR ")));
        }

        if self.options.active_only {
            clauses.push("status=active".to_string());
        }

        if self.options.search_my_org {
            clauses.push("is_public=false".to_string());
        }

        clauses.join(" AND ")
    }
}

/// `(value="a" OR value="b")`
pub fn value_clause<'v>(values: impl IntoIterator<Item = &'v str>) -> String {
    let values: Vec<_> = values
        .into_iter()
        .map(|value| format!("value=\"{}\"", value))
        .collect();
    format!("({})", values.join(" OR "))
}

/// Disjunction of every severity tier at or above `minimum`
pub fn severity_clause(minimum: Severity) -> String {
    let tiers: Vec<_> = minimum
        .at_or_above()
        .map(|tier| format!("meta.severity=\"{}\"", tier.as_str()))
        .collect();
    format!("({})", tiers.join(" OR "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityType;

    fn options() -> Options {
        let mut options = Options::new("https://ts.example.com", "user", "key");
        options.minimum_confidence = 50;
        options.minimum_severity = Severity::High;
        options
    }

    #[test]
    fn test_full_query() {
        let batch = vec![
            Entity::new("1.2.3.4", EntityType::IPv4),
            Entity::new("evil.example", EntityType::Domain),
        ];

        let query = QueryBuilder::new(&options()).build(&batch, &[SearchType::Ip, SearchType::Domain]);

        assert_eq!(
            query,
            "(value=\"1.2.3.4\" OR value=\"evil.example\") AND confidence>=50 \
             AND (meta.severity=\"high\" OR meta.severity=\"very-high\") \
             AND (type=ip OR type=domain) AND status=active"
        );
    }

    #[test]
    fn test_severity_tiers_at_or_above_minimum() {
        for minimum in Severity::ALL {
            let clause = severity_clause(minimum);
            for tier in Severity::ALL {
                let needle = format!("meta.severity=\"{}\"", tier.as_str());
                assert_eq!(clause.contains(&needle), tier >= minimum, "{} in {}", tier, clause);
            }
        }
    }

    #[test]
    fn test_optional_clauses() {
        let batch = vec![Entity::new("evil.example", EntityType::Domain)];

        let mut opts = options();
        opts.active_only = false;
        let query = QueryBuilder::new(&opts).build(&batch, &[SearchType::Domain]);
        assert!(!query.contains("status=active"));
        assert!(!query.contains("is_public"));

        opts.search_my_org = true;
        let query = QueryBuilder::new(&opts).build(&batch, &[SearchType::Domain]);
        assert!(query.ends_with(" AND is_public=false"));
    }
}
