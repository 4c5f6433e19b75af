//! Host-side contracts
//!
//! An embedding host drives compiled code through a [`Handler`]: it hands in
//! a request body as a runtime string and gets a [`Response`] back. Anything
//! implementing `Fn(&Runtime, Str) -> Response` is a handler.

use tracing::debug;

use super::context::Runtime;
use super::str::Str;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: i32,
    pub body: Str,
}

impl Response {
    pub fn new(status: i32, body: Str) -> Self {
        Self { status, body }
    }

    /// A 200 response.
    pub fn ok(body: Str) -> Self {
        Self::new(200, body)
    }
}

pub trait Handler {
    fn handle(&self, rt: &Runtime, request: Str) -> Response;
}

impl<F> Handler for F
where
    F: Fn(&Runtime, Str) -> Response,
{
    fn handle(&self, rt: &Runtime, request: Str) -> Response {
        self(rt, request)
    }
}

/// Copy `body` into a runtime string and run `handler` on it.
pub fn invoke(rt: &Runtime, handler: &dyn Handler, body: &[u8]) -> Response {
    let request = Str::from_bytes(rt, body);
    let response = handler.handle(rt, request);
    debug!(
        request_len = body.len(),
        status = response.status,
        response_len = response.body.len(),
        "handler returned"
    );
    response
}
