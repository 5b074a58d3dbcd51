//! Maps a dispatch failure to the response the client receives.
//!
//! Policy, first match wins:
//!
//! 1. an error callback is registered: it gets the error and the current
//!    request/response, nothing else happens
//! 2. not found: `404` with the error message as body, debug or not
//! 3. debug mode: `500` with kind, message and cause chain as plain text
//! 4. otherwise: `500` with an empty body

use std::error::Error as StdError;

use tracing::{error, warn};

use crate::error::DispatchError;
use crate::response::Response;

/// How a failure will be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Hand the error to the registered callback.
    Delegate,
    /// `404` with the not-found message.
    NotFound,
    /// `500` with full detail for a human reader.
    Detailed,
    /// `500` with no detail.
    Generic,
}

impl ErrorDisposition {
    /// Status code written by [`render`], `None` when delegated.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            ErrorDisposition::Delegate => None,
            ErrorDisposition::NotFound => Some(404),
            ErrorDisposition::Detailed | ErrorDisposition::Generic => Some(500),
        }
    }
}

/// Decide how `err` is surfaced. `debug` is ignored when a callback exists.
#[must_use]
pub fn classify(err: &DispatchError, debug: bool, has_callback: bool) -> ErrorDisposition {
    if has_callback {
        ErrorDisposition::Delegate
    } else if err.is_not_found() {
        ErrorDisposition::NotFound
    } else if debug {
        ErrorDisposition::Detailed
    } else {
        ErrorDisposition::Generic
    }
}

/// Write the outcome of `disposition` into `res`.
///
/// `res` should be a fresh response so nothing the failed stage wrote leaks
/// into the error page. [`ErrorDisposition::Delegate`] writes nothing.
pub fn render(disposition: ErrorDisposition, err: &DispatchError, res: &mut Response) {
    match disposition {
        ErrorDisposition::Delegate => {}
        ErrorDisposition::NotFound => {
            warn!(error = %err, "Action not found");
            res.status(404).text(err.to_string());
        }
        ErrorDisposition::Detailed => {
            error!(kind = err.kind(), error = %err, "Dispatch failed");
            res.status(500).text(detail(err));
        }
        ErrorDisposition::Generic => {
            error!(kind = err.kind(), error = %err, "Dispatch failed");
            res.status(500);
        }
    }
}

/// Plain-text description of `err`: kind, message, then causes.
///
/// Unhandled errors use anyhow's debug form, which includes the backtrace
/// when `RUST_BACKTRACE` enables capture.
#[must_use]
pub fn detail(err: &DispatchError) -> String {
    let mut out = format!("{}: {}\n", err.kind(), err);
    if let DispatchError::Unhandled(inner) = err {
        out.push_str(&format!("\n{inner:?}\n"));
        return out;
    }
    let mut source = err.source();
    if source.is_some() {
        out.push_str("\nCaused by:\n");
    }
    let mut idx = 0;
    while let Some(cause) = source {
        out.push_str(&format!("    {idx}: {cause}\n"));
        source = cause.source();
        idx += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::markdown::CommonMarkRenderer;
    use http::Method;
    use std::sync::Arc;

    fn not_found() -> DispatchError {
        DispatchError::PageNotFound {
            method: Method::GET,
            action: "missing".to_string(),
        }
    }

    fn response() -> Response {
        Response::new(Arc::new(AppConfig::default()), Arc::new(CommonMarkRenderer))
    }

    #[test]
    fn test_callback_wins_over_everything() {
        assert_eq!(classify(&not_found(), true, true), ErrorDisposition::Delegate);
        assert_eq!(
            classify(&DispatchError::Configuration("x".into()), false, true),
            ErrorDisposition::Delegate
        );
    }

    #[test]
    fn test_not_found_ignores_debug() {
        assert_eq!(classify(&not_found(), true, false), ErrorDisposition::NotFound);
        assert_eq!(classify(&not_found(), false, false), ErrorDisposition::NotFound);
    }

    #[test]
    fn test_debug_flag_selects_detail() {
        let err = DispatchError::Route {
            action: "bad name!".into(),
        };
        assert_eq!(classify(&err, true, false), ErrorDisposition::Detailed);
        assert_eq!(classify(&err, false, false), ErrorDisposition::Generic);
    }

    #[test]
    fn test_render_not_found() {
        let mut res = response();
        render(ErrorDisposition::NotFound, &not_found(), &mut res);
        assert_eq!(res.status_code(), 404);
        assert_eq!(
            res.body_bytes(),
            b"Action 'missing' with method GET not found"
        );
    }

    #[test]
    fn test_render_generic_has_no_detail() {
        let mut res = response();
        let err = DispatchError::Unhandled(anyhow::anyhow!("db password is hunter2"));
        render(ErrorDisposition::Generic, &err, &mut res);
        assert_eq!(res.status_code(), 500);
        assert!(res.body_bytes().is_empty());
    }

    #[test]
    fn test_detail_includes_cause_chain() {
        let err = DispatchError::Response {
            message: "Markdown conversion error".into(),
            source: Some(anyhow::anyhow!("renderer unavailable")),
        };
        let text = detail(&err);
        assert!(text.starts_with("response error: Markdown conversion error"));
        assert!(text.contains("0: renderer unavailable"));
    }

    #[test]
    fn test_detail_for_unhandled_uses_anyhow_context() {
        let err = DispatchError::Unhandled(
            anyhow::anyhow!("connection refused").context("loading profile"),
        );
        let text = detail(&err);
        assert!(text.contains("unhandled error: loading profile"));
        assert!(text.contains("connection refused"));
    }

    #[test]
    fn test_delegate_writes_nothing() {
        let mut res = response();
        render(ErrorDisposition::Delegate, &not_found(), &mut res);
        assert_eq!(res.status_code(), 200);
        assert_eq!(ErrorDisposition::Delegate.status(), None);
    }
}
