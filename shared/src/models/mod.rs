//! Domain models for BizManager

mod inventory;
mod settings;
mod transaction;
mod user;

pub use inventory::*;
pub use settings::*;
pub use transaction::*;
pub use user::*;
