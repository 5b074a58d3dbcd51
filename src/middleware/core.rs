use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::{guarded, DispatchError};
use crate::request::Request;
use crate::response::{Reply, Response};

/// What a middleware decided for the current request.
#[derive(Debug)]
pub enum MiddlewareOutcome {
    /// Replace the current request and run the next stage.
    Continue(Request),
    /// Stop here; write this payload into the response and send it.
    Respond(Reply),
}

impl MiddlewareOutcome {
    /// Continue with `req`.
    pub fn next(req: Request) -> Self {
        MiddlewareOutcome::Continue(req)
    }

    /// Halt with `reply` as the response payload.
    pub fn respond(reply: impl Into<Reply>) -> Self {
        MiddlewareOutcome::Respond(reply.into())
    }
}

/// A stage that observes or transforms the request before the handler runs.
///
/// The same contract applies at application, router and action level.
pub trait Middleware: Send + Sync {
    fn handle(&self, req: Request, res: &mut Response) -> anyhow::Result<MiddlewareOutcome>;
}

impl<T: Middleware + ?Sized> Middleware for Arc<T> {
    fn handle(&self, req: Request, res: &mut Response) -> anyhow::Result<MiddlewareOutcome> {
        (**self).handle(req, res)
    }
}

/// Middleware built from a closure. See [`from_fn`].
pub struct FnMiddleware<F>(F);

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(Request, &mut Response) -> anyhow::Result<MiddlewareOutcome> + Send + Sync,
{
    fn handle(&self, req: Request, res: &mut Response) -> anyhow::Result<MiddlewareOutcome> {
        (self.0)(req, res)
    }
}

/// Wrap a closure as middleware.
///
/// ```rust
/// use metime::middleware::{from_fn, MiddlewareOutcome};
///
/// let stamp = from_fn(|req, _res| Ok(MiddlewareOutcome::next(req.with_data("seen", true))));
/// # let _ = stamp;
/// ```
pub fn from_fn<F>(f: F) -> FnMiddleware<F>
where
    F: Fn(Request, &mut Response) -> anyhow::Result<MiddlewareOutcome> + Send + Sync,
{
    FnMiddleware(f)
}

/// Middleware tier, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    App,
    Router,
    Action,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Tier::App => "app",
            Tier::Router => "router",
            Tier::Action => "action",
        })
    }
}

/// Termination signal returned by [`run_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every middleware continued; run the next stage.
    Continue,
    /// A middleware responded or redirected; the cycle is over.
    Halt,
}

/// Run `middlewares` in order against the current request/response pair.
///
/// On `Continue(req)` the request is replaced and the next middleware runs.
/// On `Respond(reply)` the reply is written into the response and the chain
/// halts. A middleware that redirects halts the chain even if it continues.
///
/// `req` always holds the last request a middleware accepted, so the error
/// handler sees the most recent state when a middleware fails.
///
/// # Errors
///
/// Any error (or panic) raised by a middleware, classified via
/// [`DispatchError::from_anyhow`].
pub fn run_chain(
    tier: Tier,
    middlewares: &[Arc<dyn Middleware>],
    req: &mut Request,
    res: &mut Response,
) -> Result<ChainOutcome, DispatchError> {
    debug!(
        tier = %tier,
        middleware_count = middlewares.len(),
        action = %req.action(),
        "Middleware chain start"
    );

    for (idx, mw) in middlewares.iter().enumerate() {
        let current = req.clone();
        match guarded(|| mw.handle(current, res))? {
            MiddlewareOutcome::Continue(next) => {
                *req = next;
                if res.is_halted() {
                    debug!(
                        tier = %tier,
                        middleware_idx = idx,
                        status = res.status_code(),
                        "Middleware redirected"
                    );
                    return Ok(ChainOutcome::Halt);
                }
            }
            MiddlewareOutcome::Respond(reply) => {
                debug!(
                    tier = %tier,
                    middleware_idx = idx,
                    status = res.status_code(),
                    "Middleware returned early response"
                );
                res.apply(reply)?;
                return Ok(ChainOutcome::Halt);
            }
        }
    }

    Ok(ChainOutcome::Continue)
}
