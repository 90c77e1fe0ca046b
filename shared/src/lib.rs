//! Shared types and logic for BizManager
//!
//! This crate contains the models, stock arithmetic and dashboard
//! reductions used by both the backend and the browser (via WASM).

pub mod i18n;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod realtime;
pub mod types;
pub mod validation;

pub use i18n::*;
pub use models::*;
pub use types::*;
pub use validation::*;
