//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use jsonrpsee::types::ErrorObjectOwned;
use studio_core::domain::DomainError;
use studio_core::error::AppError;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const NOT_FOUND: i32 = 4001;
    pub const CONFLICT: i32 = 4002;
    pub const QUEUE_FULL: i32 = 4003;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const DB_ERROR: i32 = 5001;
    pub const GENERATION_ERROR: i32 = 5002;
}

fn domain_code(err: &DomainError) -> i32 {
    match err {
        DomainError::ItemNotFound(_) => code::NOT_FOUND,
        DomainError::QueueFull { .. } => code::QUEUE_FULL,
        DomainError::InvalidStateTransition { .. } => code::CONFLICT,
        DomainError::ValidationError(_) => code::VALIDATION_ERROR,
    }
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    match err {
        AppError::Validation(msg) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, msg, None::<()>)
        }
        AppError::NotFound(msg) => ErrorObjectOwned::owned(code::NOT_FOUND, msg, None::<()>),
        AppError::Database(msg) => ErrorObjectOwned::owned(code::DB_ERROR, msg, None::<()>),
        AppError::Generation(e) => {
            ErrorObjectOwned::owned(code::GENERATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Internal(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
        AppError::Domain(e) => ErrorObjectOwned::owned(domain_code(&e), e.to_string(), None::<()>),
        AppError::Io(e) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, e.to_string(), None::<()>),
        AppError::Serialization(e) => {
            ErrorObjectOwned::owned(code::VALIDATION_ERROR, e.to_string(), None::<()>)
        }
        AppError::Config(msg) => ErrorObjectOwned::owned(code::INTERNAL_ERROR, msg, None::<()>),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::port::GenerationError;

    #[test]
    fn test_domain_errors_keep_their_meaning() {
        let full = to_rpc_error(AppError::Domain(DomainError::QueueFull { capacity: 20 }));
        assert_eq!(full.code(), code::QUEUE_FULL);
        assert_eq!(full.message(), "Queue is full (20 items)");

        let missing = to_rpc_error(AppError::Domain(DomainError::ItemNotFound("x".into())));
        assert_eq!(missing.code(), code::NOT_FOUND);

        let bad_state = to_rpc_error(AppError::Domain(DomainError::InvalidStateTransition {
            from: "DONE".into(),
            to: "GENERATING".into(),
        }));
        assert_eq!(bad_state.code(), code::CONFLICT);
    }

    #[test]
    fn test_infrastructure_errors() {
        assert_eq!(
            to_rpc_error(AppError::Validation("empty".into())).code(),
            code::VALIDATION_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::Database("locked".into())).code(),
            code::DB_ERROR
        );
        assert_eq!(
            to_rpc_error(AppError::Generation(GenerationError::RateLimited("slow".into()))).code(),
            code::GENERATION_ERROR
        );
    }
}
