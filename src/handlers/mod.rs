// handlers/mod.rs - Three guard tiers
//
// Public (no guard) → Protected (IdentityGuard) → Elevated (IdentityGuard + RoleGuard(admin))
pub mod elevated;
pub mod protected;
pub mod public;
