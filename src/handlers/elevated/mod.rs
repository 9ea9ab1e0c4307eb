// handlers/elevated/mod.rs - Elevated handlers (IdentityGuard + RoleGuard(admin))
//
// Routed behind `require_admin`, which itself runs inside `require_identity`.
// Handlers trust that the caller holds the admin role.

pub mod menu;
pub mod stats;
pub mod users;
