// handlers/protected/mod.rs - Protected handlers (IdentityGuard required)
//
// Every handler here receives the verified caller as `Extension<AuthUser>`,
// injected by `middleware::require_identity`.

pub mod cart;
pub mod payments;
pub mod users;
