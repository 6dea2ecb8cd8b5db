//! The read-only listing capability consumed by metrics collection.

use crate::error::StateResult;
use crate::selector::LabelSelector;
use crate::types::Application;

/// Anything that can return a snapshot of the current applications.
///
/// One call must return one consistent snapshot. Implementations may block
/// and may fail; callers decide how to degrade.
pub trait ApplicationLister: Send + Sync {
    fn list(&self, selector: &LabelSelector) -> StateResult<Vec<Application>>;
}
