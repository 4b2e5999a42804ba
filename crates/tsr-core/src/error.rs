//! Domain-level error types.

use thiserror::Error;

/// Rejections produced when checking a push request at the API boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required identity field is empty or absent.
    #[error("{0} is required")]
    MissingField(&'static str),
}
