use std::time::Duration;

use crate::router::Router;

/// Default values from spec §4.G, mirrored here as named constants so
/// `ServerOptions::new` and its docs stay in sync.
pub const DEFAULT_MAX_HEADER_SIZE: usize = 16;
pub const DEFAULT_MAX_BODY_SIZE: usize = 10_000_000;
pub const DEFAULT_CONN_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CONN_READ_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CONN_WRITE_TIMEOUT: Duration = Duration::from_secs(15);

/// Server configuration (spec §4.G). Built with a consuming, ownership-
/// passing builder in the same style as the teacher's
/// `RestServer::get/post/put/patch/delete` (`self -> Self`, no external
/// builder-pattern crate).
pub struct ServerOptions {
    pub(crate) addr: String,
    pub(crate) router: Router,
    pub(crate) max_header_size: usize,
    pub(crate) max_body_size: usize,
    pub(crate) concurrency: usize,
    pub(crate) conn_timeout: Duration,
    pub(crate) conn_read_timeout: Duration,
    pub(crate) conn_write_timeout: Duration,
}

impl ServerOptions {
    /// `addr` is a `host:port` string passed straight to `TcpListener::bind`.
    /// Every other field takes its spec §4.G default; use the `with_*`
    /// methods to override one at a time.
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        Self {
            addr: addr.into(),
            router,
            max_header_size: DEFAULT_MAX_HEADER_SIZE,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            concurrency: num_cpus::get(),
            conn_timeout: DEFAULT_CONN_TIMEOUT,
            conn_read_timeout: DEFAULT_CONN_READ_TIMEOUT,
            conn_write_timeout: DEFAULT_CONN_WRITE_TIMEOUT,
        }
    }

    pub fn with_max_header_size(mut self, size: usize) -> Self {
        self.max_header_size = size;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Number of worker threads in the bounded pool. Falls back to the
    /// detected CPU count if set to zero.
    pub fn with_concurrency(mut self, workers: usize) -> Self {
        self.concurrency = workers.max(1);
        self
    }

    pub fn with_conn_timeout(mut self, timeout: Duration) -> Self {
        self.conn_timeout = timeout;
        self
    }

    pub fn with_conn_read_timeout(mut self, timeout: Duration) -> Self {
        self.conn_read_timeout = timeout;
        self
    }

    pub fn with_conn_write_timeout(mut self, timeout: Duration) -> Self {
        self.conn_write_timeout = timeout;
        self
    }
}
