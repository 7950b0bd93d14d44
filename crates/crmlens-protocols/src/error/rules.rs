//! Rule engine errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleEngineError {
    #[error("Failed to add rule: {0}")]
    AddFailed(String),

    #[error("Failed to remove rules: {0}")]
    RemoveFailed(String),

    #[error("Failed to list rules: {0}")]
    ListFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_variants_display() {
        let errors = vec![
            RuleEngineError::AddFailed("a".to_string()),
            RuleEngineError::RemoveFailed("b".to_string()),
            RuleEngineError::ListFailed("c".to_string()),
        ];
        for err in errors {
            assert!(!err.to_string().is_empty());
        }
    }
}
