pub mod reporting;
pub mod settlement;

pub use reporting::{AdminStats, ReportingService};
pub use settlement::{SettlementError, SettlementService};
