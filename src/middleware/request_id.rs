use tracing::debug;

use super::{Middleware, MiddlewareOutcome};
use crate::ids::RequestId;
use crate::request::Request;
use crate::response::Response;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "X-Request-ID";
/// Data-bag key the id is stored under.
pub const REQUEST_ID_KEY: &str = "request_id";

/// Tags each request with a [`RequestId`].
///
/// An inbound `X-Request-ID` that parses as a ULID is kept; anything else is
/// replaced. The id is stored in the data bag under [`REQUEST_ID_KEY`] and
/// echoed in the response header, so later middleware, the handler and the
/// client all see the same value.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestIdMiddleware;

impl Middleware for RequestIdMiddleware {
    fn handle(&self, req: Request, res: &mut Response) -> anyhow::Result<MiddlewareOutcome> {
        let id = RequestId::from_header_or_new(req.header(REQUEST_ID_HEADER));
        debug!(request_id = %id, action = %req.action(), "Request id assigned");
        res.set_header(REQUEST_ID_HEADER, &id.to_string());
        Ok(MiddlewareOutcome::Continue(req.with_data(REQUEST_ID_KEY, id)))
    }
}
