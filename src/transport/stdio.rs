//! Line-delimited JSON event loop.
//!
//! Each input line is one invocation:
//!
//! ```json
//! {"event": {"body": {"a": 5, "b": 10}, "params": {"path": {"method": "add"}}}, "context": {"deadline_ms": 3000}}
//! ```
//!
//! and produces exactly one output line, either `{"value": <envelope>}` or, when
//! the line itself is not an invocation, `{"error": "<message>"}`. Blank lines are
//! skipped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::io::{self, BufRead, Write};
use tracing::{debug, info, warn};

use crate::dispatcher::Gateway;
use crate::response::Response;

#[derive(Debug, Deserialize)]
struct Invocation {
    #[serde(default)]
    event: Value,
    /// Runtime-supplied context (deadline, function name, ...), only logged
    #[serde(default)]
    context: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Reply {
    Value(Response),
    Error(String),
}

/// Answer one invocation line.
fn answer(gateway: &Gateway, line: &[u8]) -> Reply {
    let invocation: Invocation = match serde_json::from_slice(line) {
        Ok(invocation) => invocation,
        Err(e) => {
            warn!(error = %e, "Unreadable invocation");
            return Reply::Error(format!("invalid invocation: {e}"));
        }
    };
    if !invocation.context.is_null() {
        debug!(runtime_context = %invocation.context, "Invocation context");
    }
    Reply::Value(gateway.handle_value(invocation.event))
}

/// Serve invocations from `input` until EOF. Returns the number of
/// invocations answered.
///
/// # Errors
///
/// Propagates read and write errors. A bad invocation is not an error; it is
/// answered with an `error` line.
pub fn serve<R: BufRead, W: Write>(gateway: &Gateway, mut input: R, mut output: W) -> io::Result<usize> {
    info!("Event loop started");
    let mut answered = 0usize;
    // read raw bytes so a line that is not UTF-8 still gets an `error` reply
    let mut line = Vec::new();
    loop {
        line.clear();
        if input.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        let reply = answer(gateway, &line);
        serde_json::to_writer(&mut output, &reply).map_err(io::Error::from)?;
        output.write_all(b"\n")?;
        output.flush()?;
        answered += 1;
    }
    info!(answered, "Event loop finished");
    Ok(answered)
}
