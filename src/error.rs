//! # Error Module
//!
//! Every failure raised during a dispatch cycle is a [`DispatchError`]. The
//! dispatcher funnels all of them into a single top-level handler (see
//! [`crate::dispatcher::error_handler`]) which decides what the client sees.
//!
//! | Variant        | Raised when                                              |
//! |----------------|----------------------------------------------------------|
//! | `Configuration`| base URL unset or invalid, action key malformed          |
//! | `Route`        | a registered action name is malformed                    |
//! | `PageNotFound` | no registered action matches the method and action name  |
//! | `Response`     | unsupported body value or Markdown conversion failure    |
//! | `Unhandled`    | anything else raised by a handler or middleware          |
//!
//! Handlers and middleware return `anyhow::Result`, so a `DispatchError`
//! raised inside user code travels through `anyhow` and is recovered with
//! [`DispatchError::from_anyhow`].

use http::Method;
use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Failure raised by any stage of the dispatch pipeline.
#[derive(Debug)]
pub enum DispatchError {
    /// Invalid or incomplete dispatcher configuration.
    Configuration(String),
    /// A registered action name does not match the action-name format.
    Route {
        /// The offending action name, as registered
        action: String,
    },
    /// No registered action matched the current method and action name.
    PageNotFound {
        /// HTTP method of the request
        method: Method,
        /// Resolved action name
        action: String,
    },
    /// A response-shaping operation failed.
    Response {
        /// Human readable description
        message: String,
        /// Underlying failure, if any
        source: Option<anyhow::Error>,
    },
    /// Any other failure raised by a handler or middleware.
    Unhandled(anyhow::Error),
}

impl DispatchError {
    /// Build a [`DispatchError::Response`] without an underlying cause.
    pub fn response(message: impl Into<String>) -> Self {
        DispatchError::Response {
            message: message.into(),
            source: None,
        }
    }

    /// Short, stable label for logs and debug output.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Configuration(_) => "configuration error",
            DispatchError::Route { .. } => "route error",
            DispatchError::PageNotFound { .. } => "page not found",
            DispatchError::Response { .. } => "response error",
            DispatchError::Unhandled(_) => "unhandled error",
        }
    }

    /// Whether this is the not-found outcome of action matching.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DispatchError::PageNotFound { .. })
    }

    /// Recover a typed error that user code propagated through `anyhow`.
    ///
    /// If the error is a `DispatchError`, possibly under `.context(..)`
    /// layers, that value is returned as-is so that e.g. a `Response` error
    /// raised by `Response::body` keeps its classification. The context
    /// messages are dropped. Everything else becomes
    /// [`DispatchError::Unhandled`].
    pub fn from_anyhow(err: anyhow::Error) -> Self {
        match err.downcast::<DispatchError>() {
            Ok(typed) => typed,
            Err(other) => DispatchError::Unhandled(other),
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Configuration(message) => write!(f, "{message}"),
            DispatchError::Route { action } => write!(
                f,
                "Invalid action name '{action}'. Action names may only contain letters, digits, '_', '.' and '-'"
            ),
            DispatchError::PageNotFound { method, action } => {
                write!(f, "Action '{action}' with method {method} not found")
            }
            DispatchError::Response { message, .. } => write!(f, "{message}"),
            DispatchError::Unhandled(err) => write!(f, "{err}"),
        }
    }
}

impl StdError for DispatchError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            DispatchError::Response {
                source: Some(err), ..
            } => Some(&**err),
            DispatchError::Unhandled(err) => err.source(),
            _ => None,
        }
    }
}

/// Run user code (a handler or middleware), turning both returned errors and
/// panics into a [`DispatchError`].
pub(crate) fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> Result<T, DispatchError> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result.map_err(DispatchError::from_anyhow),
        Err(payload) => {
            let panic_message = panic_message(payload.as_ref());
            let backtrace = std::backtrace::Backtrace::capture();
            error!(
                panic_message = %panic_message,
                backtrace = %backtrace,
                "Panic caught during dispatch"
            );
            Err(DispatchError::Unhandled(anyhow::anyhow!(
                "panicked: {panic_message}"
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
