use std::sync::Arc;

use serde_json::json;
use tracing::warn;

use super::{Middleware, MetricsMiddleware, MiddlewareOutcome};
use crate::request::Request;
use crate::response::{Reply, Response};

/// Compares the `Authorization` header against a fixed value.
///
/// On mismatch the chain halts with `401` and a JSON error body. Register it
/// at the level that should be protected: app-wide, per router, or per action.
pub struct AuthMiddleware {
    token: String,
    metrics: Option<Arc<MetricsMiddleware>>,
}

impl AuthMiddleware {
    /// Expect `Authorization: <token>` verbatim (e.g. `"Bearer s3cret"`).
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            metrics: None,
        }
    }

    /// Count rejected requests on `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<MetricsMiddleware>) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl Middleware for AuthMiddleware {
    fn handle(&self, req: Request, res: &mut Response) -> anyhow::Result<MiddlewareOutcome> {
        match req.header("authorization") {
            Some(h) if h == self.token => Ok(MiddlewareOutcome::Continue(req)),
            presented => {
                warn!(
                    action = %req.action(),
                    header_present = presented.is_some(),
                    "Authorization rejected"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.inc_auth_failure();
                }
                res.status(401).set_header("WWW-Authenticate", "Bearer");
                Ok(MiddlewareOutcome::Respond(Reply::Json(
                    json!({ "error": "Unauthorized" }),
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::markdown::CommonMarkRenderer;
    use crate::request::RequestContext;

    fn run(ctx: RequestContext, auth: &AuthMiddleware) -> (MiddlewareOutcome, Response) {
        let config = Arc::new(AppConfig::default());
        let req = Request::new(Arc::new(ctx), Arc::clone(&config));
        let mut res = Response::new(config, Arc::new(CommonMarkRenderer));
        let outcome = auth.handle(req, &mut res).unwrap();
        (outcome, res)
    }

    #[test]
    fn test_valid_token_continues() {
        let auth = AuthMiddleware::new("Bearer valid-token");
        let ctx = RequestContext::default().with_header("Authorization", "Bearer valid-token");
        let (outcome, res) = run(ctx, &auth);
        assert!(matches!(outcome, MiddlewareOutcome::Continue(_)));
        assert_eq!(res.status_code(), 200);
    }

    #[test]
    fn test_invalid_token_halts_with_401() {
        let metrics = Arc::new(MetricsMiddleware::new());
        let auth = AuthMiddleware::new("Bearer valid-token").with_metrics(Arc::clone(&metrics));
        let ctx = RequestContext::default().with_header("Authorization", "Bearer nope");
        let (outcome, res) = run(ctx, &auth);
        assert!(matches!(outcome, MiddlewareOutcome::Respond(Reply::Json(_))));
        assert_eq!(res.status_code(), 401);
        assert_eq!(metrics.auth_failures(), 1);
    }

    #[test]
    fn test_missing_header_halts() {
        let auth = AuthMiddleware::new("Bearer valid-token");
        let (outcome, res) = run(RequestContext::default(), &auth);
        assert!(matches!(outcome, MiddlewareOutcome::Respond(_)));
        assert_eq!(res.header_value("WWW-Authenticate"), Some("Bearer"));
    }
}
