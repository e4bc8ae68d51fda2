// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "moderation/mod.rs"]
pub mod moderation;

#[path = "appeal/mod.rs"]
pub mod appeal;

#[path = "events/event_bus.rs"]
pub mod events;
