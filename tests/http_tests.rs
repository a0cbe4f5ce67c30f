use rpcgate::transport::{GatewayService, HttpServer, ServerHandle};
use rpcgate::{service, Gateway, StatusError};
use serde::Deserialize;
use serde_json::Value;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Once};
use std::time::Duration;

static MAY_INIT: Once = Once::new();

fn setup_may_runtime() {
    MAY_INIT.call_once(|| {
        may::config().set_stack_size(0x8000);
    });
}

pub struct Math;

#[derive(Deserialize)]
pub struct AddInput {
    a: i64,
    b: i64,
}

#[service]
impl Math {
    pub fn add(&self, input: &AddInput) -> Result<i64, StatusError> {
        Ok(input.a + input.b)
    }

    pub fn divide(&self, input: &AddInput) -> Result<i64, StatusError> {
        input
            .a
            .checked_div(input.b)
            .ok_or_else(|| StatusError::unprocessable("division by zero"))
    }

    pub fn echo_query(&self) -> Result<&'static str, StatusError> {
        Ok("ok")
    }
}

fn free_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

fn start_server() -> ServerHandle {
    setup_may_runtime();
    let gateway = Arc::new(Gateway::new(Math));
    let handle = HttpServer(GatewayService::new(gateway))
        .start(free_port())
        .unwrap();
    handle.wait_ready().unwrap();
    handle
}

fn send_request(addr: &SocketAddr, req: &str) -> String {
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.write_all(req.as_bytes()).unwrap();
    stream
        .set_read_timeout(Some(Duration::from_millis(500)))
        .unwrap();
    let mut buf = Vec::new();
    loop {
        let mut tmp = [0u8; 1024];
        match stream.read(&mut tmp) {
            Ok(0) => break,
            Ok(n) => {
                buf.extend_from_slice(&tmp[..n]);
                if response_complete(&buf) {
                    break;
                }
            }
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                break
            }
            Err(e) => panic!("read error: {e:?}"),
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn response_complete(buf: &[u8]) -> bool {
    let text = String::from_utf8_lossy(buf);
    let Some((head, body)) = text.split_once("\r\n\r\n") else {
        return false;
    };
    let length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);
    body.len() >= length
}

fn parse_response(resp: &str) -> (u16, Value) {
    let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
    let status = head
        .lines()
        .next()
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = serde_json::from_str(body).unwrap_or(Value::Null);
    (status, body)
}

fn post(addr: &SocketAddr, path: &str, body: &str) -> (u16, Value) {
    let req = format!(
        "POST {path} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{body}",
        body.len()
    );
    parse_response(&send_request(addr, &req))
}

#[test]
fn test_post_method_round_trip() {
    let handle = start_server();
    let addr = handle.addr();

    assert_eq!(post(&addr, "/add", r#"{"a": 5, "b": 10}"#), (200, Value::from(15)));
    assert_eq!(
        post(&addr, "/public/Divide", r#"{"a": 5, "b": 0}"#),
        (422, Value::from("division by zero"))
    );
    assert_eq!(post(&addr, "/nothing", "{}"), (404, Value::from("Not Found")));
    assert_eq!(
        post(&addr, "/add", "a=5&b=10"),
        (400, Value::from("Malformed Request Body"))
    );
    assert_eq!(
        post(&addr, "/add", "5"),
        (400, Value::from("Malformed Request Body"))
    );

    handle.stop();
}

#[test]
fn test_text_body_is_only_decoded_by_methods_with_input() {
    let handle = start_server();
    let addr = handle.addr();

    assert_eq!(post(&addr, "/echo_query", "hello"), (200, Value::from("ok")));
    assert_eq!(post(&addr, "/nothing", "hello"), (404, Value::from("Not Found")));
    assert_eq!(
        post(&addr, "/add", "hello"),
        (400, Value::from("Malformed Request Body"))
    );

    handle.stop();
}

#[test]
fn test_get_without_body() {
    let handle = start_server();
    let addr = handle.addr();

    let resp = send_request(
        &addr,
        "GET /echo_query?x=1 HTTP/1.1\r\nHost: localhost\r\nX-Request-Id: abc\r\n\r\n",
    );
    assert_eq!(parse_response(&resp), (200, Value::from("ok")));

    handle.stop();
}
