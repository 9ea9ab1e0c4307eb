pub mod cart;
pub mod menu;
pub mod payment;
pub mod review;
pub mod user;

pub use cart::CartEntry;
pub use menu::MenuItem;
pub use payment::{PaymentRecord, SettlementState};
pub use review::Review;
pub use user::{NewUser, Role, User};
