//! Filter evaluation at processing checkpoints
//!
//! A filter is a predicate over one key path of the metadata store, written as
//! `[checkpoint:]key.path[__op]=value`:
//!
//! ```text
//! path.ext__in=jpg,png          # early: only path-scope data needed
//! stat:path.stat.size__gt=1024  # after the stat plugin ran
//! tag.name__regex=^20\d\d$      # late: tag scope is available
//! ```
//!
//! Filters are grouped by checkpoint so that cheap structural filters reject
//! entries before expensive plugins run on them:
//!
//! 1. **early**: before any plugin metadata is gathered
//! 2. **one per plugin**: right after that plugin ran, in plugin order
//! 3. **late**: per tag, just before the link path is computed
//!
//! A `FilterQuery` runs after the late filters and sees the whole store.

pub mod error;
pub mod evaluator;
pub mod query;
pub mod types;

pub use error::FilterError;
pub use evaluator::{FilterSet, Verdict};
pub use query::FilterQuery;
pub use types::{Checkpoint, Filter, FilterMode, FilterOp};
