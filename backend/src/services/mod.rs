//! Business logic services for BizManager

pub mod auth;
pub mod inventory;
pub mod realtime;
pub mod reporting;
pub mod settings;
pub mod transaction;
pub mod user;

pub use auth::AuthService;
pub use inventory::InventoryService;
pub use realtime::RealtimeService;
pub use reporting::ReportingService;
pub use settings::SettingsService;
pub use transaction::TransactionService;
pub use user::UserService;
