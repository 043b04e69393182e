//! An embeddable HTTP/1.x origin server: a TCP accept loop over a bounded
//! worker pool, a radix-tree router with per-method handlers and path
//! parameters, and pooled request/response objects. See `SPEC_FULL.md` for
//! the full design.

mod config;
mod context;
mod error;
mod method;
mod parser;
mod pool;
mod request;
mod response;
mod router;
mod server;
mod status;
mod version;

pub use config::{
    ServerOptions, DEFAULT_CONN_READ_TIMEOUT, DEFAULT_CONN_TIMEOUT, DEFAULT_CONN_WRITE_TIMEOUT,
    DEFAULT_MAX_BODY_SIZE, DEFAULT_MAX_HEADER_SIZE,
};
pub use context::CancellationContext;
pub use error::{HttpError, ParseError};
pub use method::Method;
pub use request::{Headers, Params, Request};
pub use response::ResponseWriter;
pub use router::{Group, Handler, HandlerFn, Middleware, Router};
pub use server::{Server, SpawnedServer};
pub use status::StatusCode;
pub use version::Version;
