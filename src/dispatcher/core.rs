use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::ids::RequestId;
use crate::registry::{MethodDescriptor, Registry, Service};
use crate::request::Request;
use crate::response::{Outcome, Response};

/// Dispatch engine bound to one service.
///
/// Cheap to share: wrap it in an `Arc` and hand clones to every transport.
pub struct Gateway {
    registry: Registry,
    config: GatewayConfig,
}

impl Gateway {
    /// Bind `service` with default options.
    pub fn new<S: Service>(service: S) -> Self {
        Self::with_config(service, GatewayConfig::default())
    }

    pub fn with_config<S: Service>(service: S, config: GatewayConfig) -> Self {
        Self::from_arc(Arc::new(service), config)
    }

    /// Bind a service the caller keeps a handle to.
    pub fn from_arc<S: Service>(service: Arc<S>, config: GatewayConfig) -> Self {
        let registry = Registry::build_with(service, config.verbose);
        Self { registry, config }
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> GatewayConfig {
        self.config
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&MethodDescriptor> {
        self.registry.lookup(name)
    }

    /// Canonical names of all registered methods, sorted.
    #[must_use]
    pub fn methods(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// Handle one raw payload. Never fails: every outcome is an envelope.
    #[must_use]
    pub fn handle(&self, raw: &[u8]) -> Response {
        match Request::decode(raw) {
            Ok(request) => self.dispatch(request),
            Err(err) => reject_unparsed(&err),
        }
    }

    /// Handle a payload that has already been parsed as JSON.
    #[must_use]
    pub fn handle_value(&self, event: Value) -> Response {
        match Request::from_value(event) {
            Ok(request) => self.dispatch(request),
            Err(err) => reject_unparsed(&err),
        }
    }

    /// Resolve, decode, invoke and normalize one request.
    #[must_use]
    pub fn dispatch(&self, request: Request) -> Response {
        let request_id = RequestId::resolve(request.context.request_id());
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %request.method_name()
        );
        let _entered = span.enter();
        let start = Instant::now();

        let response = match self.invoke(request) {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    GatewayError::OperationFailed(detail) => {
                        error!(detail = %detail, "Operation failed")
                    }
                    other => warn!(error = %other, status = other.status_code(), "Request rejected"),
                }
                Response::from_responder(&err)
            }
        };

        info!(
            status = response.status,
            latency_us = start.elapsed().as_micros() as u64,
            "Dispatch complete"
        );
        response
    }

    fn invoke(&self, request: Request) -> Result<Response, GatewayError> {
        let Request { body, params, .. } = request;
        let name = params.path.method;

        let Some(descriptor) = self.registry.lookup(&name) else {
            return Err(GatewayError::MethodNotFound(name));
        };
        debug!(
            resolved = descriptor.name(),
            takes_input = descriptor.takes_input(),
            "Method resolved"
        );

        // methods without an input never see the body
        let input = descriptor.takes_input().then_some(body);

        let result = panic::catch_unwind(AssertUnwindSafe(|| descriptor.invoke(input)));
        let outcome = match result {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(source)) => {
                return Err(GatewayError::MalformedRequestBody {
                    method: descriptor.name().to_string(),
                    source,
                })
            }
            Err(payload) => {
                let backtrace = std::backtrace::Backtrace::capture();
                error!(
                    method = descriptor.name(),
                    backtrace = %backtrace,
                    "Operation panicked"
                );
                return Err(GatewayError::OperationFailed(format!(
                    "panicked: {}",
                    panic_message(payload.as_ref())
                )));
            }
        };

        match outcome {
            Outcome::Failed(detail) => Err(GatewayError::OperationFailed(detail)),
            Outcome::Rejected(response) => {
                debug!(status = response.status, "Operation returned a responder error");
                Ok(response)
            }
            other => Ok(other.into_response()),
        }
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

fn reject_unparsed(err: &GatewayError) -> Response {
    warn!(error = %err, "Malformed request");
    Response::from_responder(err)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
