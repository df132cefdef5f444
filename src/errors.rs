use sea_orm::error::DbErr;
use uuid::Uuid;

/// Error taxonomy shared by every service in the crate.
///
/// The transport layer that calls into the services owns the mapping to
/// protocol representations; services raise these values directly and
/// propagate each other's errors unchanged.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

pub trait IntoDbErr {
    fn into_db_err(self) -> DbErr;
}

impl IntoDbErr for DbErr {
    fn into_db_err(self) -> DbErr {
        self
    }
}

impl IntoDbErr for String {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self)
    }
}

impl IntoDbErr for &str {
    fn into_db_err(self) -> DbErr {
        DbErr::Custom(self.to_string())
    }
}

impl ServiceError {
    /// Generic constructor that normalizes any supported database error input.
    pub fn db_error<E: IntoDbErr>(error: E) -> Self {
        ServiceError::DatabaseError(error.into_db_err())
    }

    /// Stock-insufficiency failure carrying both sides of the failed check.
    pub fn insufficient_stock(item_id: Uuid, requested: i32, available: i32) -> Self {
        ServiceError::InsufficientStock(format!(
            "item {}: requested {}, available {}",
            item_id, requested, available
        ))
    }

    /// True for failures the caller may resolve by changing the request;
    /// false for storage/internal failures.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::ValidationError(_)
                | Self::InsufficientStock(_)
                | Self::Conflict(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_stock_message_carries_both_quantities() {
        let id = Uuid::new_v4();
        let err = ServiceError::insufficient_stock(id, 5, 3);
        let msg = err.to_string();
        assert!(msg.contains("requested 5"));
        assert!(msg.contains("available 3"));
        assert!(msg.contains(&id.to_string()));
    }

    #[test]
    fn caller_errors_are_distinguished_from_internal_ones() {
        assert!(ServiceError::NotFound("x".into()).is_caller_error());
        assert!(ServiceError::Conflict("x".into()).is_caller_error());
        assert!(!ServiceError::db_error("boom").is_caller_error());
        assert!(!ServiceError::InternalError("x".into()).is_caller_error());
    }
}
