//! Conversational surface: the closed request enum, the dispatcher that
//! routes each request against per-session state, and the HTTP handlers.

pub mod dispatch;
pub mod handlers;
