// Core appeal module - stake-backed appeals against moderation verdicts.
// Following the same pattern as the moderation module.

pub mod appeal_models;
pub mod appeal_service;

pub use appeal_models::*;
pub use appeal_service::*;
