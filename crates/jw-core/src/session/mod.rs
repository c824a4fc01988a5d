//! Per-chat conversational sessions.
//!
//! - `machine`: pure state machine (state, input) -> (state, action)
//! - `replies`: rendering of replies into HTML + menus
//! - `flood` / `janitor`: spam throttle and message cleanup
//! - `chat` / `registry`: locked per-chat session objects and their lifetime

pub mod chat;
pub mod flood;
pub mod janitor;
pub mod machine;
pub mod registry;
pub mod replies;

pub use chat::ChatSession;
pub use machine::ConversationState;
pub use registry::SessionRegistry;
