//! Per-session conversation state: the result cache that makes ordinal
//! follow-ups ("the second one") resolvable, the multi-step matching
//! workflow machine, and the registry that serializes requests per session.

pub mod cache;
pub mod registry;
pub mod state;
pub mod workflow;
