use std::collections::HashMap;

use crate::context::CancellationContext;
use crate::method::Method;
use crate::version::Version;

/// Case-sensitive header map. The only key the core inspects itself is
/// `Content-Length`; everything else passes through untouched for handlers.
pub type Headers = HashMap<String, String>;

/// Path parameters populated by the router when the matched pattern
/// contains a named segment; empty when the pattern has none.
pub type Params = HashMap<String, String>;

/// A single parsed HTTP/1.x request, owned by exactly one worker for the
/// duration of handler execution plus response write (spec §3).
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub version: Version,
    pub headers: Headers,
    pub params: Params,
    pub body: Vec<u8>,
    ctx: Option<CancellationContext>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        version: Version,
        headers: Headers,
        body: Vec<u8>,
    ) -> Self {
        Self {
            method,
            path,
            version,
            headers,
            params: Params::new(),
            body,
            ctx: None,
        }
    }

    /// A blank shell, as handed out by the pool before the parser fills it in.
    pub(crate) fn empty() -> Self {
        Self::new(
            Method::Get,
            String::new(),
            Version::Http11,
            Headers::new(),
            Vec::new(),
        )
    }

    /// Attaches the owning connection's cancellation context. Done by the
    /// server before the request becomes visible to a handler (spec §3
    /// invariant: "the context is non-null before the request is visible to
    /// a handler").
    pub(crate) fn attach_context(&mut self, ctx: CancellationContext) {
        self.ctx = Some(ctx);
    }

    /// The cancellation context of the connection that produced this
    /// request. Handlers poll `context().is_done()` to honor shutdown
    /// during long-running work.
    pub fn context(&self) -> &CancellationContext {
        self.ctx
            .as_ref()
            .expect("request context attached before handler dispatch")
    }

    /// Resets every mutable field so the shell can be returned to its pool
    /// without leaking state across connections (spec §4.F pooling
    /// invariant).
    pub(crate) fn reset(&mut self) {
        self.headers.clear();
        self.params.clear();
        self.body.clear();
        self.path.clear();
        self.ctx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_every_mutable_field() {
        let mut req = Request::new(
            Method::Get,
            "/a".to_string(),
            Version::Http11,
            Headers::from([("Host".to_string(), "x".to_string())]),
            vec![1, 2, 3],
        );
        req.params.insert("name".to_string(), "bob".to_string());
        req.attach_context(CancellationContext::new());

        req.reset();

        assert!(req.headers.is_empty());
        assert!(req.params.is_empty());
        assert!(req.body.is_empty());
        assert!(req.path.is_empty());
    }
}
