//! Action lookup within a single router.

use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::core::{Action, Router};
use crate::error::DispatchError;

#[allow(clippy::expect_used)]
static ACTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("valid action name regex"));

/// Outcome of searching one router.
#[derive(Debug)]
pub enum ActionLookup<'a> {
    Found(&'a Action),
    NotFound,
}

/// Whether `name` is a well-formed action name.
#[must_use]
pub fn is_valid_action_name(name: &str) -> bool {
    ACTION_NAME_RE.is_match(name)
}

/// Find the first action in `router` named `action` that answers `method`.
///
/// Candidates are visited in registration order and each name is validated
/// as it is visited, including candidates that would not match. The scan
/// stops at the first hit, so a malformed name registered after the match is
/// never inspected.
///
/// # Errors
///
/// [`DispatchError::Route`] for the first malformed name encountered. This
/// aborts the whole dispatch, not just this candidate.
pub fn find_action<'a>(
    router: &'a Router,
    method: &Method,
    action: &str,
) -> Result<ActionLookup<'a>, DispatchError> {
    for candidate in router.actions() {
        if !is_valid_action_name(candidate.name()) {
            return Err(DispatchError::Route {
                action: candidate.name().to_string(),
            });
        }
        if candidate.name() == action && candidate.method().matches(method) {
            debug!(
                action = %action,
                method = %method,
                registered_method = %candidate.method(),
                "Action matched"
            );
            return Ok(ActionLookup::Found(candidate));
        }
    }
    Ok(ActionLookup::NotFound)
}
