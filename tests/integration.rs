use embeddable_http_server::{Router, Server, ServerOptions, SpawnedServer, StatusCode};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

fn spawn_test_server(
    mut router: Router,
    configure: impl FnOnce(ServerOptions) -> ServerOptions,
) -> (SpawnedServer, std::net::SocketAddr) {
    router.get("/noop", |_, _| {});
    let options = configure(ServerOptions::new("127.0.0.1:0", router));
    let server = Server::new(options).unwrap();
    let addr = server.local_addr().unwrap();
    (SpawnedServer::spawn(server).unwrap(), addr)
}

fn request(addr: std::net::SocketAddr, raw: &[u8]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    stream.write_all(raw).unwrap();
    let mut buf = Vec::new();
    let _ = stream.read_to_end(&mut buf);
    buf
}

#[test]
fn s1_get_returns_200() {
    let mut router = Router::new();
    router.get("/health", |w, _| {
        w.write(b"ok");
    });
    let (server, addr) = spawn_test_server(router, |o| o);
    let resp = request(addr, b"GET /health HTTP/1.1\r\nConnection: close\r\n\r\n");
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.ends_with("ok"));
    server.stop();
}

#[test]
fn s2_post_body_is_echoed_with_201() {
    let mut router = Router::new();
    router.post("/echo", |w, r| {
        w.set_status(StatusCode::CREATED);
        w.write(&r.body);
    });
    let (server, addr) = spawn_test_server(router, |o| o);
    let resp = request(
        addr,
        b"POST /echo HTTP/1.1\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
    );
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 201 Created\r\n"));
    assert!(text.ends_with("hello"));
    server.stop();
}

#[test]
fn s3_oversize_body_rejected_with_413() {
    let router = Router::new();
    let (server, addr) = spawn_test_server(router, |o| o.with_max_body_size(4));
    let resp = request(
        addr,
        b"POST /noop HTTP/1.1\r\nContent-Length: 10\r\n\r\n0123456789",
    );
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 413"));
    server.stop();
}

#[test]
fn s4_bad_version_rejected_with_505() {
    let router = Router::new();
    let (server, addr) = spawn_test_server(router, |o| o);
    let resp = request(addr, b"GET / HTTP/2.0\r\n\r\n");
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 505"));
    server.stop();
}

#[test]
fn s5_unmatched_route_returns_404() {
    let router = Router::new();
    let (server, addr) = spawn_test_server(router, |o| o);
    let resp = request(addr, b"GET /nowhere HTTP/1.1\r\nConnection: close\r\n\r\n");
    let text = String::from_utf8_lossy(&resp);
    assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    server.stop();
}

#[test]
fn s6_keep_alive_serves_two_requests_on_one_connection() {
    let mut router = Router::new();
    router.get("/ping", |w, _| {
        w.write(b"pong");
    });
    let (server, addr) = spawn_test_server(router, |o| o);

    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(2))).unwrap();

    stream.write_all(b"GET /ping HTTP/1.1\r\n\r\n").unwrap();
    let mut buf = [0u8; 256];
    let n1 = stream.read(&mut buf).unwrap();
    assert!(String::from_utf8_lossy(&buf[..n1]).contains("pong"));

    stream.write_all(b"GET /ping HTTP/1.1\r\n\r\n").unwrap();
    let n2 = stream.read(&mut buf).unwrap();
    assert!(String::from_utf8_lossy(&buf[..n2]).contains("pong"));

    server.stop();
}

#[test]
fn s7_radix_split_disambiguates_sibling_patterns() {
    let mut router = Router::new();
    router.get("/abc", |w, _| {
        w.write(b"abc");
    });
    router.get("/abd", |w, _| {
        w.write(b"abd");
    });
    let (server, addr) = spawn_test_server(router, |o| o);

    let abc = request(addr, b"GET /abc HTTP/1.1\r\nConnection: close\r\n\r\n");
    assert!(String::from_utf8_lossy(&abc).contains("abc"));

    let short = request(addr, b"GET /ab HTTP/1.1\r\nConnection: close\r\n\r\n");
    assert!(String::from_utf8_lossy(&short).starts_with("HTTP/1.1 404"));

    let long = request(addr, b"GET /abcd HTTP/1.1\r\nConnection: close\r\n\r\n");
    assert!(String::from_utf8_lossy(&long).starts_with("HTTP/1.1 404"));

    server.stop();
}

#[test]
fn s8_graceful_shutdown_completes_promptly() {
    let router = Router::new();
    let (server, _addr) = spawn_test_server(router, |o| o);
    let start = std::time::Instant::now();
    server.stop();
    server.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(15));
}
