use embeddable_http_server::{Router, Server, ServerOptions, StatusCode};

fn main() {
    env_logger::init();

    let mut router = Router::new();
    router.get("/", |w, _| {
        w.write(b"Hello\n");
    });
    router.get("/greeting/{name}", |w, r| {
        let name = r.params.get("name").cloned().unwrap_or_default();
        w.write(format!("Hello, {name}\n").as_bytes());
    });
    router.post("/echo", |w, r| {
        w.set_status(StatusCode::CREATED);
        w.write(&r.body);
    });
    router.get("/bad", |w, _| {
        w.set_status(StatusCode::BAD_REQUEST);
        w.write(b"This was bad\n");
    });

    let options = ServerOptions::new("0.0.0.0:8080", router);
    let server = Server::new(options).expect("bind listener");
    log::info!("listening on 0.0.0.0:8080");
    if let Err(err) = server.serve() {
        log::error!("server exited: {err}");
    }
}
