#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use metime::middleware::{from_fn, FnMiddleware, MiddlewareOutcome};
use metime::{App, Request, RequestContext, Response};

/// Ordered record of which stages ran.
#[derive(Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    /// Middleware that records `name` and continues.
    pub fn recorder(
        &self,
        name: &'static str,
    ) -> FnMiddleware<impl Fn(Request, &mut Response) -> anyhow::Result<MiddlewareOutcome> + Send + Sync>
    {
        let trace = self.clone();
        from_fn(move |req, _res| {
            trace.push(name);
            Ok(MiddlewareOutcome::next(req))
        })
    }
}

pub fn app() -> App {
    let mut app = App::new();
    app.set_base_url("http://x/");
    app
}

pub fn get(action: &str) -> RequestContext {
    RequestContext::default().with_query("_", action)
}
