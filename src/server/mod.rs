//! # Server Module
//!
//! Host adapter that serves an [`crate::App`] over HTTP with `may_minihttp`.
//! Each inbound request becomes one [`crate::RequestContext`] and one call to
//! [`crate::App::run`]; the finalized response is written back as header
//! lines, status and body.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use metime::server::ActionServer;
//! use metime::{App, Router};
//!
//! let mut router = Router::new();
//! router.get("home", |_req, _res| Ok("hello"));
//! let mut app = App::new();
//! app.set_base_url("http://127.0.0.1:8080/").add_router(router);
//!
//! let handle = ActionServer::new(Arc::new(app))
//!     .start("127.0.0.1:8080")
//!     .expect("bind");
//! handle.join().ok();
//! ```

mod http_server;
mod service;

pub use http_server::{ActionServer, ServerHandle};
pub use service::{status_reason, write_sent_response, ActionService};
