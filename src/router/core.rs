//! Action registry: the ordered set of actions and router-level middleware.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use tracing::debug;

use crate::error::{guarded, DispatchError};
use crate::middleware::Middleware;
use crate::request::Request;
use crate::response::{Reply, Response};

/// Type-erased action handler.
pub type Handler = Arc<dyn Fn(&Request, &mut Response) -> anyhow::Result<Reply> + Send + Sync>;

/// HTTP method an action answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    /// Matches every HTTP method.
    Any,
}

impl ActionMethod {
    /// Uppercase method token, `*` for [`ActionMethod::Any`].
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionMethod::Get => "GET",
            ActionMethod::Post => "POST",
            ActionMethod::Put => "PUT",
            ActionMethod::Patch => "PATCH",
            ActionMethod::Delete => "DELETE",
            ActionMethod::Any => "*",
        }
    }

    /// Case-insensitive comparison against a request method.
    #[must_use]
    pub fn matches(&self, method: &Method) -> bool {
        match self {
            ActionMethod::Any => true,
            other => method.as_str().eq_ignore_ascii_case(other.as_str()),
        }
    }
}

impl fmt::Display for ActionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized method token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMethod(pub String);

impl fmt::Display for UnknownMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown action method '{}'", self.0)
    }
}

impl std::error::Error for UnknownMethod {}

impl FromStr for ActionMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(ActionMethod::Get),
            "POST" => Ok(ActionMethod::Post),
            "PUT" => Ok(ActionMethod::Put),
            "PATCH" => Ok(ActionMethod::Patch),
            "DELETE" => Ok(ActionMethod::Delete),
            "*" | "ANY" => Ok(ActionMethod::Any),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// A registered `(method, name, handler, middlewares)` entry.
///
/// Immutable once registered.
#[derive(Clone)]
pub struct Action {
    method: ActionMethod,
    name: String,
    handler: Handler,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("method", &self.method)
            .field("name", &self.name)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl Action {
    #[must_use]
    pub fn method(&self) -> ActionMethod {
        self.method
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Action-level middleware, in registration order.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }

    /// Run the handler, converting errors and panics into [`DispatchError`].
    ///
    /// # Errors
    ///
    /// Whatever the handler returns, or [`DispatchError::Unhandled`] if it
    /// panics.
    pub fn invoke(&self, req: &Request, res: &mut Response) -> Result<Reply, DispatchError> {
        guarded(|| (self.handler)(req, res))
    }
}

/// Ordered collection of actions plus a router-level middleware tier.
///
/// Registration order is match priority. Names are not checked here; the
/// dispatcher validates each candidate while matching.
///
/// ```rust
/// use metime::{Reply, Router};
///
/// let mut router = Router::new();
/// router
///     .get("home", |_req, _res| Ok(Reply::markdown("# Home")))
///     .post("save", |req, _res| Ok(format!("saved {}", req.input("title").unwrap_or(""))));
/// assert_eq!(router.actions().len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct Router {
    actions: Vec<Action>,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("actions", &self.actions)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action with its own middleware.
    pub fn register<F, R>(
        &mut self,
        method: ActionMethod,
        name: impl Into<String>,
        handler: F,
        middlewares: Vec<Arc<dyn Middleware>>,
    ) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        let name = name.into();
        debug!(
            method = %method,
            action = %name,
            middleware_count = middlewares.len(),
            "Action registered"
        );
        self.actions.push(Action {
            method,
            name,
            handler: Arc::new(
                move |req: &Request, res: &mut Response| -> anyhow::Result<Reply> {
                    handler(req, res).map(Into::into)
                },
            ),
            middlewares,
        });
        self
    }

    pub fn get<F, R>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.register(ActionMethod::Get, name, handler, Vec::new())
    }

    pub fn post<F, R>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.register(ActionMethod::Post, name, handler, Vec::new())
    }

    pub fn put<F, R>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.register(ActionMethod::Put, name, handler, Vec::new())
    }

    pub fn patch<F, R>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.register(ActionMethod::Patch, name, handler, Vec::new())
    }

    pub fn delete<F, R>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.register(ActionMethod::Delete, name, handler, Vec::new())
    }

    /// Register an action that answers every HTTP method.
    pub fn any<F, R>(&mut self, name: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&Request, &mut Response) -> anyhow::Result<R> + Send + Sync + 'static,
        R: Into<Reply>,
    {
        self.register(ActionMethod::Any, name, handler, Vec::new())
    }

    /// Append router-level middleware.
    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Registered actions, in match-priority order.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Router-level middleware, in registration order.
    #[must_use]
    pub fn middlewares(&self) -> &[Arc<dyn Middleware>] {
        &self.middlewares
    }
}
