//! End-to-end coverage for the HTTP transport against a minimal
//! single-purpose HTTP server speaking just enough HTTP/1.1 for ureq.

use crate::support::user_server;
use barrister_rpc::Client;
use barrister_rpc::HttpTransport;
use barrister_rpc::Server;
use barrister_rpc::Transport;
use barrister_rpc::ERR_UNKNOWN;
use serde_json::json;
use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;

/// Serve JSON-RPC over HTTP on an OS-assigned port; returns the URL.
fn spawn_http_server(server: Arc<Server>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
    let url = format!("http://{}/api", listener.local_addr().unwrap());
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            let server = server.clone();
            thread::spawn(move || handle_connection(stream, &server));
        }
    });
    url
}

fn handle_connection(mut stream: TcpStream, server: &Server) {
    let Some((headers, body)) = read_request(&mut stream) else {
        return;
    };
    assert!(
        headers
            .to_ascii_lowercase()
            .contains("content-type: application/json"),
        "transport must send JSON content type, headers were: {headers}"
    );
    let response = server.handle_bytes(&body);
    write_response(&mut stream, 200, &response);
}

fn read_request(stream: &mut TcpStream) -> Option<(String, Vec<u8>)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_header_end(&buf) {
            break pos;
        }
    };

    let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = headers
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    Some((headers, body))
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn write_response(stream: &mut TcpStream, status: u16, body: &[u8]) {
    let reason = if status == 200 { "OK" } else { "Error" };
    let head = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(body);
}

#[test]
fn client_calls_over_http() {
    let url = spawn_http_server(user_server());
    let client = Client::connect(HttpTransport::new(&url)).expect("connect over HTTP");
    let svc = client.interface("UserService").unwrap();

    let count = svc.call("countUsers", vec![]).unwrap();
    assert_eq!(count["count"], json!(0));
}

#[test]
fn batch_works_over_http() {
    let url = spawn_http_server(user_server());
    let client = Client::connect(HttpTransport::new(&url)).unwrap();

    let mut batch = client.start_batch();
    batch.add("UserService", "countUsers", vec![]).unwrap();
    batch.add("UserService", "validateEmail", vec![json!("u")]).unwrap();
    let results = batch.send().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results.get(1).unwrap()["status"], json!("ok"));
}

#[test]
fn custom_headers_are_sent() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api", listener.local_addr().unwrap());
    let checker = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let (headers, _body) = read_request(&mut stream).unwrap();
        write_response(&mut stream, 200, br#"{"jsonrpc":"2.0","id":"1","result":[]}"#);
        headers
    });

    let transport = HttpTransport::new(url).header("X-Api-Key", "secret");
    transport.request(&json!({"jsonrpc": "2.0", "id": "1", "method": "barrister-idl"})).unwrap();

    let headers = checker.join().unwrap();
    assert!(headers.contains("X-Api-Key: secret"), "headers: {headers}");
}

#[test]
fn non_2xx_status_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/api", listener.local_addr().unwrap());
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let _ = read_request(&mut stream);
        write_response(&mut stream, 500, b"{}");
    });

    let transport = HttpTransport::new(url);
    let err = transport
        .request(&json!({"jsonrpc": "2.0", "id": "1", "method": "x.y"}))
        .unwrap_err();
    assert_eq!(err.code, ERR_UNKNOWN);
    assert!(err.message.contains("500"), "got: {err}");
}
