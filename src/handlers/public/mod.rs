// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition, registration, catalogue reads and the cart writes the
// storefront performs before checkout.
//
// Security Level: None, unless SECURITY_GUARD_OPEN_ROUTES puts role
// promotion and cart writes behind the guards at routing time.

pub mod cart;
pub mod catalog;
pub mod status;
pub mod token;
pub mod users;
