pub mod auth;
pub mod resiliency;

pub use auth::{auth_middleware, Claims};
