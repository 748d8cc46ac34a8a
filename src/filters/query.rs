//! Query filter - one JMESPath expression over the whole metadata store
//!
//! The expression sees the store as `{"global": .., "path": .., "tag": ..}` and
//! is evaluated per tag, right after the late checkpoint:
//!
//! ```text
//! path.ext == 'jpg' && path.stat.size > `1024`
//! contains(path.parents, 'archive') == `false`
//! ```
//!
//! Falsy results (`false`, `null`, empty strings, arrays and objects) skip the
//! tag.

use std::fmt;

use tracing::debug;

use super::error::FilterError;
use super::evaluator::Verdict;
use crate::metadata::MetadataStore;

pub struct FilterQuery {
    source: String,
    expression: jmespath::Expression<'static>,
}

impl FilterQuery {
    /// Compile a query
    ///
    /// # Errors
    /// Returns `FilterError::InvalidQuery` if the expression does not compile.
    pub fn parse(source: &str) -> Result<Self, FilterError> {
        let expression = jmespath::compile(source).map_err(|e| FilterError::InvalidQuery {
            query: source.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            source: source.to_string(),
            expression,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Evaluate against the store. A runtime error counts as no match.
    #[must_use]
    pub fn check(&self, store: &MetadataStore) -> Verdict {
        match self.expression.search(store.to_value()) {
            Ok(result) if result.is_truthy() => Verdict::Proceed,
            Ok(_) => Verdict::Skip(format!("query '{}' is falsy", self.source)),
            Err(e) => {
                debug!(query = %self.source, error = %e, "query failed");
                Verdict::Skip(format!("query '{}' failed", self.source))
            }
        }
    }
}

impl fmt::Debug for FilterQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FilterQuery").field(&self.source).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Scope;
    use serde_json::json;

    fn store() -> MetadataStore {
        let mut store = MetadataStore::new();
        store.add(Scope::Path, "ext", "jpg");
        store.add(Scope::Path, "stat", json!({"size": 2048}));
        store.add(Scope::Tag, "name", "trip");
        store
    }

    #[test]
    fn test_truthy_results_proceed() {
        let query = FilterQuery::parse("path.ext == 'jpg' && path.stat.size > `1024`").unwrap();
        assert_eq!(query.check(&store()), Verdict::Proceed);
        let query = FilterQuery::parse("tag.name").unwrap();
        assert_eq!(query.check(&store()), Verdict::Proceed);
    }

    #[test]
    fn test_falsy_results_skip() {
        for source in ["path.ext == 'png'", "path.missing", "path.parents", "`[]`"] {
            let query = FilterQuery::parse(source).unwrap();
            assert!(query.check(&store()).is_skip(), "{source} should skip");
        }
    }

    #[test]
    fn test_invalid_query() {
        assert!(matches!(
            FilterQuery::parse("path.ext =="),
            Err(FilterError::InvalidQuery { .. })
        ));
    }
}
