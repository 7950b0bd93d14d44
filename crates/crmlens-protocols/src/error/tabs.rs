//! Tab host and badge errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabHostError {
    #[error("Tab not found: {0}")]
    NotFound(i64),

    /// The badge or tab API surface is not available in this context.
    /// Callers degrade gracefully rather than failing the operation.
    #[error("Indicator API unavailable")]
    IndicatorUnavailable,

    #[error("Tab host error: {0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_names_tab() {
        assert!(TabHostError::NotFound(42).to_string().contains("42"));
    }
}
