//! Filter evaluation against a metadata store

use tracing::trace;

use super::error::FilterError;
use super::types::{Checkpoint, Filter, FilterMode};
use crate::metadata::MetadataStore;

/// Outcome of evaluating the filters of one checkpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Keep processing the entry
    Proceed,
    /// Drop the entry (or the current tag at the late checkpoint)
    Skip(String),
}

impl Verdict {
    #[must_use]
    pub const fn is_skip(&self) -> bool {
        matches!(self, Self::Skip(_))
    }
}

/// All filters of a run together with the mode that combines them
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    mode: FilterMode,
    filters: Vec<Filter>,
}

impl FilterSet {
    #[must_use]
    pub const fn new(mode: FilterMode, filters: Vec<Filter>) -> Self {
        Self { mode, filters }
    }

    /// Parse every definition, failing on the first invalid one
    ///
    /// # Errors
    /// Returns the `FilterError` of the first definition that does not parse.
    pub fn parse_all<S: AsRef<str>>(
        definitions: &[S],
        mode: FilterMode,
        plugins: &[&str],
    ) -> Result<Self, FilterError> {
        let filters = definitions
            .iter()
            .map(|d| Filter::parse(d.as_ref(), plugins))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(mode, filters))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    #[must_use]
    pub const fn mode(&self) -> FilterMode {
        self.mode
    }

    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Evaluate the filters registered for `checkpoint`.
    ///
    /// A filter whose key is missing does not apply, except at the late
    /// checkpoint where every key it could ever see is present and a missing
    /// one counts as a non-match.
    #[must_use]
    pub fn check(&self, checkpoint: &Checkpoint, store: &MetadataStore) -> Verdict {
        for filter in self.filters.iter().filter(|f| f.checkpoint == *checkpoint) {
            let matched = match store.resolve(&filter.key) {
                Some(value) => filter.op.matches(value),
                None if *checkpoint == Checkpoint::Late => false,
                None => {
                    trace!(filter = filter.as_str(), "key missing, filter not applicable");
                    continue;
                }
            };

            match (self.mode, matched) {
                (FilterMode::Include, false) => {
                    return Verdict::Skip(format!("{checkpoint}: '{}' did not match", filter.as_str()));
                }
                (FilterMode::Exclude, true) => {
                    return Verdict::Skip(format!("{checkpoint}: '{}' matched", filter.as_str()));
                }
                _ => {}
            }
        }
        Verdict::Proceed
    }
}
