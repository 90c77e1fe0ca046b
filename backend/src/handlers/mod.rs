//! HTTP handlers for BizManager

pub mod auth;
pub mod health;
pub mod inventory;
pub mod realtime;
pub mod reporting;
pub mod settings;
pub mod transactions;
pub mod users;

pub use auth::*;
pub use health::*;
pub use inventory::*;
pub use realtime::*;
pub use reporting::*;
pub use settings::*;
pub use transactions::*;
pub use users::*;
