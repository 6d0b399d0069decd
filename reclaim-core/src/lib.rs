pub mod identity;
pub mod pickup;
pub mod cluster;
pub mod invoice;
pub mod payment;
pub mod repository;

pub use identity::{Role, User};
pub use pickup::{PaymentStatus, PickupRequest, PickupStatus};
pub use cluster::{ActiveRoute, ClusterStop, CollectionCluster, RouteStatus};
pub use invoice::{Invoice, Notification, Settlement};
pub use repository::Stores;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Payment gateway error: {0}")]
    GatewayError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("Internal service error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
