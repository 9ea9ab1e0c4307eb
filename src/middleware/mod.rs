pub mod auth;
pub mod role;

pub use auth::{require_identity, AuthUser};
pub use role::{require_admin, require_role};
