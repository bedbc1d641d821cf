use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// A conditional write lost against a concurrent transition, or the record
    /// is in a state the operation cannot start from.
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Unavailable: {0}")]
    Unavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn order_not_found() -> Self {
        DomainError::NotFound("Order".to_string())
    }
}
