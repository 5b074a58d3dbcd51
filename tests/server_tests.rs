//! The may_minihttp adapter, exercised over loopback.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use metime::server::{ActionServer, ServerHandle};
use metime::{App, Router};

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn start() -> ServerHandle {
    may::config().set_stack_size(0x8000);
    let port = free_port();
    let mut router = Router::new();
    router
        .get("home", |_req, _res| Ok("home page"))
        .post("echo", |req, _res| {
            Ok(req.input("msg").unwrap_or("").to_string())
        });
    let mut app = App::new();
    app.set_base_url(format!("http://127.0.0.1:{port}/"))
        .set_debug(false)
        .add_router(router);

    let handle = ActionServer::new(Arc::new(app))
        .start(("127.0.0.1", port))
        .unwrap();
    handle.wait_ready(Duration::from_secs(2)).unwrap();
    assert_eq!(handle.url(), format!("http://127.0.0.1:{port}/"));
    handle
}

/// Send a raw request and read until `marker` shows up or the read times out.
fn send(handle: &ServerHandle, raw: &str, marker: &str) -> String {
    let mut stream = TcpStream::connect(handle.addr()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    stream.write_all(raw.as_bytes()).unwrap();

    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    while !String::from_utf8_lossy(&out).contains(marker) {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => out.extend_from_slice(&buf[..n]),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[test]
fn test_server_dispatches_actions() {
    let handle = start();

    let home = send(
        &handle,
        "GET /?_=home HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "home page",
    );
    assert!(home.starts_with("HTTP/1.1 200"));
    assert!(home.contains("X-Powered-By: metime"));
    assert!(home.contains("home page"));

    let redirect = send(
        &handle,
        "GET /?lang=en HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "\r\n\r\n",
    );
    assert!(redirect.starts_with("HTTP/1.1 302"));
    assert!(redirect.contains("?lang=en&_=home"));

    let body = "msg=hi+there";
    let echo = send(
        &handle,
        &format!(
            "POST /?_=echo HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{body}",
            body.len()
        ),
        "hi there",
    );
    assert!(echo.contains("hi there"));

    let missing = send(
        &handle,
        "GET /?_=nope HTTP/1.1\r\nHost: localhost\r\n\r\n",
        "not found",
    );
    assert!(missing.starts_with("HTTP/1.1 404"));

    handle.stop();
}
