//! # Dispatcher Module
//!
//! [`App`] drives one dispatch cycle per inbound request:
//!
//! 1. validate the configuration
//! 2. read the action name from the `action_key` query parameter; when it is
//!    missing or empty, redirect to `default_action` (other query parameters
//!    are kept) and stop
//! 3. run application middleware
//! 4. for each router, in the order added: run its middleware, then look for
//!    the first action with this name that answers the request method; on a
//!    match run the action middleware and the handler, then stop
//! 5. nothing matched: page not found
//!
//! A middleware that responds or redirects ends the cycle at once. Every
//! failure, including handler panics, is routed through [`error_handler`].
//!
//! ```rust
//! use metime::{App, Reply, RequestContext, Router};
//!
//! let mut router = Router::new();
//! router.get("home", |_req, _res| Ok(Reply::markdown("# Welcome")));
//!
//! let mut app = App::new();
//! app.set_base_url("http://localhost:8080/").add_router(router);
//!
//! let sent = app.run(RequestContext::default().with_query("_", "home"));
//! assert_eq!(sent.status, 200);
//! assert!(sent.body_text().contains("<h1>Welcome</h1>"));
//! ```

mod core;
pub mod error_handler;

pub use self::core::{App, ErrorCallback};
pub use error_handler::{classify, ErrorDisposition};
