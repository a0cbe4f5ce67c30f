//! HTTP adapter on top of `may_minihttp`.
//!
//! `<ANY VERB> /{method}?query` with a JSON body is turned into an inbound
//! event and dispatched:
//!
//! - `params.path.method`: last non-empty path segment
//! - `params.header`: request headers, lower-cased names
//! - `params.querystring`: decoded query parameters
//! - `context`: `http_method`, `resource_path`, `request_id` (from
//!   `x-request-id`, or a fresh ULID) and `user_agent`
//! - `body`: the JSON body, `null` when empty, or the body text as a JSON
//!   string when it is not JSON. Only methods with an input look at it.
//!
//! The envelope's status becomes the HTTP status and its body is written as JSON.

use may::coroutine::JoinHandle;
use may_minihttp::{HttpServerWithHeaders, HttpService, Request as HttpRequest, Response as HttpResponse};
use serde_json::Value;
use std::collections::HashMap;
use std::io::{self, Read};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info};

use crate::dispatcher::Gateway;
use crate::error::GatewayError;
use crate::ids::RequestId;
use crate::request::{Params, PathParams, Request, RequestContext};
use crate::response::{Responder, Response};

/// `may_minihttp` service that forwards every request to a [`Gateway`].
#[derive(Clone)]
pub struct GatewayService {
    gateway: Arc<Gateway>,
}

impl GatewayService {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway }
    }

    /// Answer one HTTP exchange, already split into its parts.
    #[must_use]
    pub fn respond(
        &self,
        method: &str,
        raw_path: &str,
        headers: HashMap<String, String>,
        body: &[u8],
    ) -> Response {
        self.gateway
            .dispatch(build_request(method, raw_path, headers, body))
    }
}

/// Last non-empty segment of the path, query string excluded.
fn method_segment(path: &str) -> &str {
    path.split('?')
        .next()
        .unwrap_or_default()
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or_default()
}

fn parse_query(raw_path: &str) -> HashMap<String, String> {
    match raw_path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect(),
        None => HashMap::new(),
    }
}

/// Build the inbound event for an HTTP exchange.
///
/// A body that is not JSON is carried as a JSON string of its text; whether
/// that fits is decided once the method's input shape is known.
#[must_use]
pub fn build_request(
    method: &str,
    raw_path: &str,
    headers: HashMap<String, String>,
    body: &[u8],
) -> Request {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        serde_json::from_slice(body).unwrap_or_else(|e| {
            debug!(error = %e, "Request body is not JSON, passing it on as text");
            Value::String(String::from_utf8_lossy(body).into_owned())
        })
    };

    let resource_path = raw_path.split('?').next().unwrap_or_default();
    let mut context = RequestContext::new();
    context.insert("http_method", method);
    context.insert("resource_path", resource_path);
    context.insert(
        "request_id",
        RequestId::resolve(headers.get("x-request-id").map(String::as_str)),
    );
    if let Some(agent) = headers.get("user-agent") {
        context.insert("user_agent", agent.as_str());
    }

    Request {
        body,
        params: Params {
            path: PathParams {
                method: method_segment(raw_path).to_string(),
            },
            querystring: parse_query(raw_path),
            header: headers,
        },
        context,
    }
}

fn reason(status: u16) -> &'static str {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

/// Write an envelope as an HTTP response.
pub fn write_response(res: &mut HttpResponse, response: &Response) {
    res.status_code(usize::from(response.status), reason(response.status));
    res.header("Content-Type: application/json");
    match serde_json::to_vec(&response.body) {
        Ok(bytes) => res.body_vec(bytes),
        Err(e) => {
            error!(error = %e, "Failed to encode response body");
            res.status_code(500, reason(500));
            res.body_vec(br#""Internal Server Error""#.to_vec());
        }
    }
}

impl HttpService for GatewayService {
    fn call(&mut self, req: HttpRequest, res: &mut HttpResponse) -> io::Result<()> {
        let method = req.method().to_string();
        let raw_path = req.path().to_string();
        let headers: HashMap<String, String> = req
            .headers()
            .iter()
            .map(|h| {
                (
                    h.name.to_ascii_lowercase(),
                    String::from_utf8_lossy(h.value).into_owned(),
                )
            })
            .collect();

        let mut body = Vec::new();
        if let Err(e) = req.body().read_to_end(&mut body) {
            debug!(error = %e, "Failed to read request body");
            let err = GatewayError::MalformedRequest(serde_json::Error::io(e));
            write_response(res, &Response::new(err.status(), err.body()));
            return Ok(());
        }

        let response = self.respond(&method, &raw_path, headers, &body);
        write_response(res, &response);
        Ok(())
    }
}

/// Wrapper around may_minihttp's HTTP server.
///
/// Accepts up to 32 request headers, enough for traffic that passed through
/// API gateways and proxies.
pub struct HttpServer<T>(pub T);

/// Handle to a running HTTP server
pub struct ServerHandle {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ServerHandle {
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Poll the listen address until it accepts connections.
    ///
    /// # Errors
    ///
    /// `TimedOut` if the server is not reachable within about 250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Cancel the server coroutine and wait for it to finish.
    pub fn stop(self) {
        info!(addr = %self.addr, "Stopping HTTP server");
        // SAFETY: cancelling is how a may coroutine is shut down; the handle is
        // owned here and joined right after, so nothing observes it afterwards.
        unsafe {
            self.handle.coroutine().cancel();
        }
        let _ = self.handle.join();
    }

    /// Block until the server coroutine exits.
    ///
    /// # Errors
    ///
    /// Returns the panic payload if the server coroutine panicked.
    pub fn join(self) -> std::thread::Result<()> {
        self.handle.join()
    }
}

impl<T: HttpService + Clone + Send + Sync + 'static> HttpServer<T> {
    /// Bind `addr` and start serving.
    ///
    /// # Errors
    ///
    /// Fails if the address does not resolve or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let handle = HttpServerWithHeaders::<_, 32>(self.0).start(addr)?;
        info!(addr = %addr, "HTTP server listening");
        Ok(ServerHandle { addr, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_segment() {
        assert_eq!(method_segment("/add"), "add");
        assert_eq!(method_segment("/v1/math/add_some_numbers/?x=1"), "add_some_numbers");
        assert_eq!(method_segment("/"), "");
        assert_eq!(method_segment(""), "");
    }

    #[test]
    fn test_build_request() {
        let mut headers = HashMap::new();
        headers.insert("x-request-id".to_string(), "req-1".to_string());
        headers.insert("user-agent".to_string(), "curl/8.0".to_string());
        let req = build_request("POST", "/add?debug=true&x=a%20b", headers, br#"{"a": 5, "b": 10}"#);
        assert_eq!(req.method_name(), "add");
        assert_eq!(req.body, json!({"a": 5, "b": 10}));
        assert_eq!(req.get_query_param("x"), Some("a b"));
        assert_eq!(req.context.request_id(), Some("req-1"));
        assert_eq!(req.context.http_method(), Some("POST"));
        assert_eq!(req.context.resource_path(), Some("/add"));
        assert_eq!(req.context.user_agent(), Some("curl/8.0"));
    }

    #[test]
    fn test_empty_body_is_null() {
        let req = build_request("GET", "/no_input", HashMap::new(), b"  \n");
        assert_eq!(req.body, Value::Null);
        assert!(req.context.request_id().is_some());
    }

    #[test]
    fn test_non_json_body_is_text() {
        let req = build_request("POST", "/add", HashMap::new(), b"a=5&b=10");
        assert_eq!(req.method_name(), "add");
        assert_eq!(req.body, json!("a=5&b=10"));
    }

    #[test]
    fn test_reason() {
        assert_eq!(reason(200), "OK");
        assert_eq!(reason(422), "Unprocessable Entity");
        assert_eq!(reason(799), "Unknown");
    }
}
