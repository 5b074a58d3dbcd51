use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Middleware, MiddlewareOutcome};
use crate::request::Request;
use crate::response::Response;

/// Passive request counters.
///
/// Counts every request that reaches its position in a chain, plus
/// authentication failures reported by [`super::AuthMiddleware`]. When the
/// dispatcher runs inside a `may` coroutine (the bundled HTTP server) the
/// coroutine stack size is recorded as well.
///
/// All counters use `Ordering::Relaxed`; values are eventually consistent.
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    auth_failures: AtomicUsize,
    stack_size: AtomicUsize,
}

impl Default for MetricsMiddleware {
    fn default() -> Self {
        Self {
            request_count: AtomicUsize::new(0),
            auth_failures: AtomicUsize::new(0),
            stack_size: AtomicUsize::new(0),
        }
    }
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests that reached this middleware.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn inc_auth_failure(&self) {
        self.auth_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn auth_failures(&self) -> usize {
        self.auth_failures.load(Ordering::Relaxed)
    }

    /// Last observed coroutine stack size in bytes (0 outside a coroutine).
    pub fn stack_size(&self) -> usize {
        self.stack_size.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn handle(&self, req: Request, _res: &mut Response) -> anyhow::Result<MiddlewareOutcome> {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        if may::coroutine::is_coroutine() {
            let size = may::coroutine::current().stack_size();
            self.stack_size.store(size, Ordering::Relaxed);
        }
        Ok(MiddlewareOutcome::Continue(req))
    }
}
