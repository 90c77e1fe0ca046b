//! Database models for BizManager
//!
//! Re-exports models from the shared crate

pub use shared::models::*;
