//! # Middleware Module
//!
//! Middleware run before the handler at three levels, always in this order:
//!
//! 1. **Application** middleware registered on [`crate::App`]
//! 2. **Router** middleware registered on the [`crate::Router`] being searched
//! 3. **Action** middleware registered with the matched action
//!
//! Every level uses the same executor, [`run_chain`]. A middleware returns a
//! [`MiddlewareOutcome`]:
//!
//! - `Continue(req)` replaces the current request and runs the next stage
//! - `Respond(reply)` writes `reply` into the response and ends the cycle;
//!   no later middleware, router search or handler runs
//!
//! ## Writing Middleware
//!
//! ```rust
//! use metime::middleware::{from_fn, Middleware, MiddlewareOutcome};
//!
//! let require_lang = from_fn(|req, res| {
//!     match req.query("lang").map(str::to_string) {
//!         Some(lang) => Ok(MiddlewareOutcome::next(req.with_data("lang", lang))),
//!         None => {
//!             res.status(400);
//!             Ok(MiddlewareOutcome::respond("missing lang"))
//!         }
//!     }
//! });
//! # fn takes(_: impl Middleware) {}
//! # takes(require_lang);
//! ```
//!
//! ## Built-in Middleware
//!
//! - [`RequestIdMiddleware`] - ULID request ids in the data bag and response
//! - [`AuthMiddleware`] - static bearer token check, halts with 401
//! - [`MetricsMiddleware`] - request counters

mod auth;
mod core;
mod metrics;
mod request_id;

pub use self::core::{
    from_fn, run_chain, ChainOutcome, FnMiddleware, Middleware, MiddlewareOutcome, Tier,
};
pub use auth::AuthMiddleware;
pub use metrics::MetricsMiddleware;
pub use request_id::{RequestIdMiddleware, REQUEST_ID_HEADER, REQUEST_ID_KEY};
