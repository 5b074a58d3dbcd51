//! # Router Module
//!
//! A [`Router`] is an ordered registry of actions plus its own middleware
//! tier. An application may hold several routers; the dispatcher searches them
//! in the order they were added and, within each, the actions in the order
//! they were registered. The first action whose name equals the requested
//! action and whose method answers the request method wins.
//!
//! Action names are exact strings (no wildcards, no prefixes) restricted to
//! `[A-Za-z0-9_.-]`. The restriction is enforced by [`matcher::find_action`]
//! while scanning, not at registration.

mod core;
pub mod matcher;

pub use self::core::{Action, ActionMethod, Handler, Router, UnknownMethod};
pub use matcher::{find_action, is_valid_action_name, ActionLookup};
