// Core moderation module - content analysis business logic.
// Detectors and the verdict composer are pure; the service adds
// connection state, the session store and event fan-out on top.

pub mod detectors;
pub mod formatting;
pub mod moderation_models;
pub mod moderation_service;
pub mod verdict;

pub use moderation_models::*;
pub use moderation_service::*;
