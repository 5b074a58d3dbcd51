use std::collections::HashMap;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};

use may_minihttp::{HttpService, Request, Response};
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::dispatcher::App;
use crate::request::RequestContext;
use crate::response::{SentResponse, POWERED_BY_LINE};

/// `may_minihttp` service running one dispatch cycle per request.
#[derive(Clone)]
pub struct ActionService {
    app: Arc<App>,
}

impl ActionService {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &App {
        &self.app
    }
}

/// Reason phrase for a status code, `"Unknown"` when it has none.
pub fn status_reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown")
}

/// Distinct header lines kept in the intern table before new ones stop
/// being shared.
const MAX_INTERNED_LINES: usize = 4096;

static INTERNED_LINES: Lazy<Mutex<HashMap<String, &'static str>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// `'static` copy of a header line for `may_minihttp`.
///
/// Repeated lines (content types, fixed redirects) are leaked once and shared
/// through a bounded table, and the identification header is a literal.
/// Lines unique to one response, such as an `X-Request-ID` or a session
/// `Set-Cookie`, still leak their own bytes: `may_minihttp` only accepts
/// `'static` header lines.
fn static_line(line: String) -> &'static str {
    if line == POWERED_BY_LINE {
        return POWERED_BY_LINE;
    }
    let mut table = match INTERNED_LINES.lock() {
        Ok(table) => table,
        Err(poisoned) => poisoned.into_inner(),
    };
    if let Some(interned) = table.get(&line).copied() {
        return interned;
    }
    if table.len() >= MAX_INTERNED_LINES {
        return Box::leak(line.into_boxed_str());
    }
    let interned: &'static str = Box::leak(line.clone().into_boxed_str());
    table.insert(line, interned);
    interned
}

/// Copy a finalized response onto the wire.
pub fn write_sent_response(res: &mut Response, sent: SentResponse) {
    res.status_code(usize::from(sent.status), status_reason(sent.status));
    for line in sent.headers {
        res.header(static_line(line));
    }
    res.body_vec(sent.body);
}

impl HttpService for ActionService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let method = req.method().to_string();
        let target = req.path().to_string();
        let headers: Vec<(String, String)> = req
            .headers()
            .iter()
            .map(|h| {
                (
                    h.name.to_string(),
                    String::from_utf8_lossy(h.value).into_owned(),
                )
            })
            .collect();

        let mut body = Vec::new();
        if let Err(err) = req.body().read_to_end(&mut body) {
            warn!(error = %err, target = %target, "Failed to read request body");
        }

        let ctx = match RequestContext::parse(&method, &target, headers, body) {
            Ok(ctx) => ctx,
            Err(err) => {
                warn!(method = %method, error = %err, "Rejected request with invalid method");
                res.status_code(400, "Bad Request");
                return Ok(());
            }
        };

        let sent = self.app.run(ctx);
        debug!(status = sent.status, body_bytes = sent.body.len(), "Writing response");
        write_sent_response(res, sent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(302), "Found");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(599), "Unknown");
    }

    #[test]
    fn test_repeated_header_lines_share_one_allocation() {
        assert!(std::ptr::eq(
            static_line("X-Powered-By: metime".to_string()),
            POWERED_BY_LINE
        ));

        let first = static_line("Content-Type: text/x-interned-check".to_string());
        let second = static_line("Content-Type: text/x-interned-check".to_string());
        assert_eq!(first, "Content-Type: text/x-interned-check");
        assert!(std::ptr::eq(first, second));
    }
}
