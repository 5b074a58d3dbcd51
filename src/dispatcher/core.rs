use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, info_span, Span};

use super::error_handler::{self, ErrorDisposition};
use crate::config::AppConfig;
use crate::error::{guarded, DispatchError};
use crate::markdown::{CommonMarkRenderer, MarkdownRenderer};
use crate::middleware::{run_chain, ChainOutcome, Middleware, Tier};
use crate::request::{Request, RequestContext};
use crate::response::{Response, SentResponse};
use crate::router::{find_action, ActionLookup, Router};

/// Custom error handler. Receives the failure with the current request and
/// response; whatever it leaves in the response is sent.
pub type ErrorCallback = Arc<dyn Fn(&DispatchError, &Request, &mut Response) + Send + Sync>;

/// The dispatcher: configuration, routers and application middleware.
///
/// Configure it once, then call [`App::run`] for each inbound request. `run`
/// takes `&self`, so a configured `App` can be shared behind an `Arc` by a
/// host that serves requests concurrently; every cycle owns its own request
/// and response.
pub struct App {
    config: Arc<AppConfig>,
    routers: Vec<Router>,
    middlewares: Vec<Arc<dyn Middleware>>,
    error_callback: Option<ErrorCallback>,
    markdown: Arc<dyn MarkdownRenderer>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("config", &self.config)
            .field("routers", &self.routers.len())
            .field("middlewares", &self.middlewares.len())
            .field("error_callback", &self.error_callback.is_some())
            .finish()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// App with default configuration. A base URL must be set before `run`.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(AppConfig::default())
    }

    /// App using a loaded configuration.
    #[must_use]
    pub fn from_config(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
            routers: Vec::new(),
            middlewares: Vec::new(),
            error_callback: None,
            markdown: Arc::new(CommonMarkRenderer),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn set_base_url(&mut self, base_url: impl Into<String>) -> &mut Self {
        Arc::make_mut(&mut self.config).base_url = Some(base_url.into());
        self
    }

    pub fn set_action_key(&mut self, action_key: impl Into<String>) -> &mut Self {
        Arc::make_mut(&mut self.config).action_key = action_key.into();
        self
    }

    pub fn set_default_action(&mut self, action: impl Into<String>) -> &mut Self {
        Arc::make_mut(&mut self.config).default_action = action.into();
        self
    }

    pub fn set_debug(&mut self, debug: bool) -> &mut Self {
        Arc::make_mut(&mut self.config).debug = debug;
        self
    }

    /// Take over error handling. Overrides the debug flag.
    pub fn set_error_callback<F>(&mut self, callback: F) -> &mut Self
    where
        F: Fn(&DispatchError, &Request, &mut Response) + Send + Sync + 'static,
    {
        self.error_callback = Some(Arc::new(callback));
        self
    }

    /// Append a router. Routers are searched in the order they are added.
    pub fn add_router(&mut self, router: Router) -> &mut Self {
        self.routers.push(router);
        self
    }

    /// Append application-level middleware.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Replace the Markdown renderer used by `Response::markdown`.
    pub fn with_markdown_renderer<R: MarkdownRenderer + 'static>(&mut self, renderer: R) -> &mut Self {
        self.markdown = Arc::new(renderer);
        self
    }

    /// Run one dispatch cycle and return the finalized response.
    ///
    /// Never fails: every error is turned into a response by the error
    /// callback or the built-in error pages.
    pub fn run(&self, ctx: RequestContext) -> SentResponse {
        let span = info_span!(
            "dispatch",
            method = %ctx.method,
            action = tracing::field::Empty,
            status = tracing::field::Empty
        );
        let _entered = span.enter();
        let start = Instant::now();

        let config = Arc::clone(&self.config);
        let mut req = Request::new(Arc::new(ctx), Arc::clone(&config));
        let mut res = Response::new(config, Arc::clone(&self.markdown));

        if let Err(err) = self.dispatch(&mut req, &mut res) {
            res = self.handle_error(&err, &req, res);
        }

        let sent = res.send();
        span.record("status", sent.status);
        info!(
            status = sent.status,
            latency_ms = start.elapsed().as_millis() as u64,
            "Dispatch complete"
        );
        sent
    }

    fn dispatch(&self, req: &mut Request, res: &mut Response) -> Result<(), DispatchError> {
        self.config.validate()?;
        debug!(base_url = %self.config.base_url(), "Configuration validated");

        let action = match req
            .query(&self.config.action_key)
            .filter(|action| !action.is_empty())
        {
            Some(action) => action.to_string(),
            None => {
                info!(
                    default_action = %self.config.default_action,
                    "No action requested, redirecting to default"
                );
                let queries = req.queries().iter().map(|(k, v)| (k.as_str(), v.as_str()));
                res.redirect(&self.config.default_action, queries, false);
                return Ok(());
            }
        };
        req.set_action(action.as_str());
        Span::current().record("action", action.as_str());

        if run_chain(Tier::App, &self.middlewares, req, res)? == ChainOutcome::Halt {
            return Ok(());
        }

        for (router_idx, router) in self.routers.iter().enumerate() {
            if run_chain(Tier::Router, router.middlewares(), req, res)? == ChainOutcome::Halt {
                return Ok(());
            }

            let found = match find_action(router, req.method(), &action)? {
                ActionLookup::Found(found) => found,
                ActionLookup::NotFound => continue,
            };

            if run_chain(Tier::Action, found.middlewares(), req, res)? == ChainOutcome::Halt {
                return Ok(());
            }

            info!(router_idx, action = %action, "Request dispatched to handler");
            let reply = found.invoke(req, res)?;
            res.apply(reply)?;
            debug!(router_idx, status = res.status_code(), "Handler execution complete");
            return Ok(());
        }

        Err(DispatchError::PageNotFound {
            method: req.method().clone(),
            action,
        })
    }

    fn handle_error(&self, err: &DispatchError, req: &Request, mut res: Response) -> Response {
        let callback = self.error_callback.as_ref();
        match (error_handler::classify(err, self.config.debug, callback.is_some()), callback) {
            (ErrorDisposition::Delegate, Some(callback)) => {
                info!(kind = err.kind(), error = %err, "Delegating to error callback");
                let outcome = guarded(|| {
                    callback(err, req, &mut res);
                    Ok(())
                });
                match outcome {
                    Ok(()) => res,
                    Err(callback_err) => {
                        error!(
                            error = %err,
                            callback_error = %callback_err,
                            "Error callback failed"
                        );
                        let mut fallback = res.fresh();
                        fallback.status(500);
                        fallback
                    }
                }
            }
            (disposition, _) => {
                let mut fresh = res.fresh();
                error_handler::render(disposition, err, &mut fresh);
                fresh
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Reply;

    fn app() -> App {
        let mut app = App::new();
        app.set_base_url("http://x/");
        app
    }

    #[test]
    fn test_setters_update_config() {
        let mut app = app();
        app.set_action_key("action")
            .set_default_action("index")
            .set_debug(false);
        assert_eq!(app.config().action_key, "action");
        assert_eq!(app.config().default_action, "index");
        assert!(!app.config().debug);
        assert_eq!(app.config().base_url(), "http://x/");
    }

    #[test]
    fn test_redirect_preserves_queries() {
        let sent = app().run(RequestContext::default().with_query("page", "2"));
        assert_eq!(sent.status, 302);
        assert_eq!(sent.header("Location"), Some("http://x/?page=2&_=home"));
    }

    #[test]
    fn test_empty_action_redirects() {
        let sent = app().run(RequestContext::default().with_query("_", ""));
        assert_eq!(sent.header("Location"), Some("http://x/?_=home"));
    }

    #[test]
    fn test_handler_reply_is_sent() {
        let mut router = Router::new();
        router.get("home", |req, _res| Ok(format!("hello from {}", req.action())));
        let mut app = app();
        app.add_router(router);
        let sent = app.run(RequestContext::default().with_query("_", "home"));
        assert_eq!(sent.status, 200);
        assert_eq!(sent.body_text(), "hello from home");
    }

    #[test]
    fn test_handler_redirect_is_not_overwritten() {
        let mut router = Router::new();
        router.post("save", |_req, res| {
            res.redirect("home", [("saved", "1")], false);
            Ok(Reply::text("ignored"))
        });
        let mut app = app();
        app.add_router(router);
        let sent = app.run(
            RequestContext::new(http::Method::POST).with_query("_", "save"),
        );
        assert_eq!(sent.status, 302);
        assert_eq!(sent.header("Location"), Some("http://x/?saved=1&_=home"));
        assert!(sent.body.is_empty());
    }

    #[test]
    fn test_failing_callback_falls_back_to_500() {
        let mut app = app();
        app.set_error_callback(|_err, _req, _res| panic!("callback exploded"));
        let sent = app.run(RequestContext::default().with_query("_", "nothing"));
        assert_eq!(sent.status, 500);
        assert!(sent.body.is_empty());
    }
}
