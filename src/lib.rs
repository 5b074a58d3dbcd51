//! # metime
//!
//! **metime** is a single entry point action dispatcher. Every request hits
//! the same URL; a query parameter (the *action key*, `_` by default) names
//! the action to run, and a registered handler, wrapped by up to three tiers
//! of middleware, produces the response.
//!
//! ## Architecture
//!
//! - **[`config`]** - [`AppConfig`]: base URL, action key, default action, debug flag
//! - **[`request`]** - [`RequestContext`] (per-request snapshot) and [`Request`] (handler view)
//! - **[`response`]** - [`Response`] accumulator, [`Reply`] payloads, [`Cookie`], [`SentResponse`]
//! - **[`router`]** - [`Router`] action registry and the action matcher
//! - **[`middleware`]** - the chain executor shared by all tiers, plus stock middleware
//! - **[`dispatcher`]** - [`App`], the dispatch state machine and error handler
//! - **[`server`]** - `may_minihttp` host adapter
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Host
//!     participant App
//!     participant AppMW as App middleware
//!     participant Router
//!     participant RouterMW as Router middleware
//!     participant ActionMW as Action middleware
//!     participant Handler
//!
//!     Host->>App: run(RequestContext)
//!     App->>App: validate config
//!     alt no action in query
//!         App-->>Host: 302 base_url?...&_=home
//!     end
//!     App->>AppMW: run chain
//!     loop each router, in order added
//!         App->>RouterMW: run chain
//!         App->>Router: find_action(method, action)
//!         alt matched
//!             App->>ActionMW: run chain
//!             App->>Handler: invoke
//!             Handler-->>App: Reply
//!             App-->>Host: SentResponse
//!         end
//!     end
//!     App-->>Host: 404 page not found
//! ```
//!
//! Any middleware may end the cycle early by responding or redirecting.
//!
//! ## Example
//!
//! ```rust
//! use metime::{App, Reply, RequestContext, Router};
//!
//! let mut router = Router::new();
//! router
//!     .get("home", |_req, _res| Ok(Reply::markdown("# Home")))
//!     .get("about", |_req, _res| Ok("about us"));
//!
//! let mut app = App::new();
//! app.set_base_url("http://127.0.0.1:8080/")
//!     .set_debug(false)
//!     .add_router(router);
//!
//! let sent = app.run(RequestContext::default().with_query("_", "about"));
//! assert_eq!(sent.status, 200);
//! assert_eq!(sent.body_text(), "about us");
//!
//! let sent = app.run(RequestContext::default());
//! assert_eq!(sent.status, 302);
//! assert_eq!(sent.header("Location"), Some("http://127.0.0.1:8080/?_=home"));
//! ```

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod markdown;
pub mod middleware;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use config::AppConfig;
pub use dispatcher::{App, ErrorCallback};
pub use error::DispatchError;
pub use markdown::{CommonMarkRenderer, MarkdownRenderer};
pub use request::{Request, RequestContext};
pub use response::{Cookie, Reply, Response, SentResponse};
pub use router::{ActionMethod, Router};
