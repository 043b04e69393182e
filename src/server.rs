use std::io::{self, BufReader, Write};
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::config::ServerOptions;
use crate::context::CancellationContext;
use crate::error::{HttpError, ParseError};
use crate::parser::parse_request;
use crate::pool::Pools;
use crate::router::Router;
use crate::status::StatusCode;

/// How often the accept loop re-checks for cancellation while the listener
/// has no pending connection. Mirrors the teacher's shutdown-flag poll loop
/// (`examples/hammer90-embeddable-rest-server/src/lib.rs` `RestServer::start`),
/// just on a nonblocking listener instead of a blocking one.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounded worker-pool HTTP/1.x origin server (spec §4.F).
pub struct Server {
    listener: TcpListener,
    router: Arc<Router>,
    pools: Arc<Pools>,
    cancel: CancellationContext,
    max_body_size: usize,
    concurrency: usize,
    conn_timeout: Duration,
    conn_read_timeout: Duration,
    conn_write_timeout: Duration,
}

impl Server {
    pub fn new(options: ServerOptions) -> Result<Self, HttpError> {
        let listener = TcpListener::bind(&options.addr)?;
        listener.set_nonblocking(true)?;
        Ok(Self {
            listener,
            router: Arc::new(options.router),
            pools: Arc::new(Pools::new(options.max_header_size)),
            cancel: CancellationContext::new(),
            max_body_size: options.max_body_size,
            concurrency: options.concurrency,
            conn_timeout: options.conn_timeout,
            conn_read_timeout: options.conn_read_timeout,
            conn_write_timeout: options.conn_write_timeout,
        })
    }

    /// A clone of the context threaded into every `Request` this server
    /// hands to a handler. Call `.cancel()` on it (or use `SpawnedServer`)
    /// to request shutdown.
    pub fn cancellation_context(&self) -> CancellationContext {
        self.cancel.clone()
    }

    pub fn local_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Runs the accept loop until cancelled. Spawns a bounded pool of
    /// `concurrency` workers pulling off a `sync_channel` work queue
    /// (spec §5's bounded-concurrency model), then blocks accepting
    /// connections and handing them off. Returns once every worker has
    /// drained the queue and joined.
    pub fn serve(&self) -> Result<(), HttpError> {
        let (tx, rx) = sync_channel::<TcpStream>(self.concurrency);
        let rx = Arc::new(Mutex::new(rx));

        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(self.concurrency);
        for _ in 0..self.concurrency {
            let rx = Arc::clone(&rx);
            let router = Arc::clone(&self.router);
            let pools = Arc::clone(&self.pools);
            let cancel = self.cancel.clone();
            let max_body_size = self.max_body_size;
            let conn_timeout = self.conn_timeout;
            let conn_read_timeout = self.conn_read_timeout;
            let conn_write_timeout = self.conn_write_timeout;

            workers.push(thread::spawn(move || loop {
                let received = {
                    let guard = rx.lock().unwrap();
                    guard.recv()
                };
                let Ok(stream) = received else { break };
                if let Err(err) = handle_connection(
                    stream,
                    &router,
                    &pools,
                    &cancel,
                    max_body_size,
                    conn_timeout,
                    conn_read_timeout,
                    conn_write_timeout,
                ) {
                    log::warn!("connection error: {err}");
                }
            }));
        }

        while !self.cancel.is_done() {
            match self.listener.accept() {
                Ok((stream, _)) => {
                    if tx.send(stream).is_err() {
                        break;
                    }
                }
                Err(ref err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) => {
                    log::error!("accept failed: {err}");
                    drop(tx);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(HttpError::AcceptFailed(err));
                }
            }
        }

        drop(tx);
        for worker in workers {
            let _ = worker.join();
        }
        Ok(())
    }
}

/// A `Server` running on its own thread, with a handle to request shutdown.
/// Grounded on the teacher's `SpawnedRestServer`.
pub struct SpawnedServer {
    handle: Option<JoinHandle<Result<(), HttpError>>>,
    cancel: CancellationContext,
}

impl SpawnedServer {
    pub fn spawn(server: Server) -> io::Result<Self> {
        let cancel = server.cancellation_context();
        let handle = thread::Builder::new().spawn(move || server.serve())?;
        Ok(Self {
            handle: Some(handle),
            cancel,
        })
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_done()
    }

    /// Blocks until the server thread has drained its workers and returned.
    pub fn join(mut self) -> Result<(), HttpError> {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or(Ok(())),
            None => Ok(()),
        }
    }
}

impl Drop for SpawnedServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_connection(
    stream: TcpStream,
    router: &Router,
    pools: &Pools,
    cancel: &CancellationContext,
    max_body_size: usize,
    conn_timeout: Duration,
    conn_read_timeout: Duration,
    conn_write_timeout: Duration,
) -> io::Result<()> {
    stream.set_read_timeout(Some(conn_read_timeout))?;
    stream.set_write_timeout(Some(conn_write_timeout))?;

    let mut deadline = Instant::now() + conn_timeout;
    let mut reader = BufReader::new(&stream);

    loop {
        if cancel.is_done() || Instant::now() >= deadline {
            return Ok(());
        }

        match parse_request(&mut reader, pools, max_body_size) {
            Ok(mut request) => {
                request.attach_context(cancel.clone());
                let mut writer = pools.get_writer();

                match router.match_route(request.method, &request.path) {
                    Some((handler, params)) => {
                        request.params = params;
                        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                            handler(&mut writer, &mut request);
                        }))
                        .is_err()
                        {
                            log::error!("handler panicked");
                            pools.put_writer(writer);
                            pools.put_request(request);
                            write_error(&mut (&stream), StatusCode::INTERNAL_SERVER_ERROR)?;
                            return Ok(());
                        }
                    }
                    None => {
                        writer.set_status(StatusCode::NOT_FOUND);
                    }
                }

                let version = request.version;
                let flush_result = writer.flush(&mut (&stream), version);
                pools.put_writer(writer);
                pools.put_request(request);
                flush_result?;
                deadline = Instant::now() + conn_timeout;
            }
            Err(ParseError::EndOfStream) => return Ok(()),
            Err(ParseError::Io(ref err))
                if matches!(err.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) =>
            {
                return Ok(());
            }
            Err(err) => {
                if let Some(status) = err.status() {
                    write_error(&mut (&stream), status)?;
                }
                return Ok(());
            }
        }
    }
}

/// Writes a minimal error response directly to the socket, bypassing
/// `ResponseWriter`/the object pools entirely — used when the request never
/// parsed far enough to reach routing (spec §7).
fn write_error<W: Write>(sink: &mut W, code: StatusCode) -> io::Result<()> {
    let body = format!("{}\n", code.reason());
    write!(
        sink,
        "HTTP/1.1 {} {}\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n{}",
        code,
        code.reason(),
        body.len(),
        body
    )?;
    sink.flush()
}
