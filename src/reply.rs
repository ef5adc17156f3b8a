use crate::error::BridgeError;
use serde_json::{json, Value};
use tokio::sync::oneshot;

/// The single answer a command produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Success(Value),
    /// Declined by the user or the platform. Carries the falsy value the
    /// caller receives in place of a result.
    Cancelled(Value),
    Error(BridgeError),
}

impl Reply {
    pub fn ok(value: impl Into<Value>) -> Self {
        Reply::Success(value.into())
    }

    /// Host-facing JSON. Cancellation looks like success with a falsy value.
    pub fn to_wire(&self) -> Value {
        match self {
            Reply::Success(value) => json!({ "status": "success", "value": value }),
            Reply::Cancelled(value) => json!({ "status": "success", "value": value }),
            Reply::Error(BridgeError::NotImplemented(method)) => json!({
                "status": "not_implemented",
                "method": method
            }),
            Reply::Error(err) => json!({
                "status": "error",
                "code": err.wire_code(),
                "message": err.to_string()
            }),
        }
    }
}

impl From<Result<Value, BridgeError>> for Reply {
    fn from(result: Result<Value, BridgeError>) -> Self {
        match result {
            Ok(value) => Reply::Success(value),
            Err(BridgeError::PlatformUnsupported { .. }) => Reply::Success(json!(false)),
            Err(err) => Reply::Error(err),
        }
    }
}

type Deliver = Box<dyn FnOnce(Reply) + Send + 'static>;

/// Write-once channel back to the caller. Resolving consumes the sink, so a
/// second resolution cannot be expressed. A sink dropped unresolved answers
/// with a cancellation so the caller is never left waiting.
pub struct ReplySink {
    method: String,
    deliver: Option<Deliver>,
}

impl ReplySink {
    pub fn new<F>(method: impl Into<String>, deliver: F) -> Self
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        Self {
            method: method.into(),
            deliver: Some(Box::new(deliver)),
        }
    }

    /// Sink backed by a oneshot channel.
    pub fn channel(method: impl Into<String>) -> (Self, oneshot::Receiver<Reply>) {
        let (tx, rx) = oneshot::channel();
        let sink = Self::new(method, move |reply| {
            let _ = tx.send(reply);
        });
        (sink, rx)
    }

    pub fn resolve(mut self, reply: Reply) {
        tracing::debug!(method = %self.method, reply = ?reply, "resolving reply sink");
        if let Some(deliver) = self.deliver.take() {
            deliver(reply);
        }
    }

    pub fn success(self, value: impl Into<Value>) {
        self.resolve(Reply::ok(value));
    }

    pub fn error(self, err: BridgeError) {
        self.resolve(Reply::Error(err));
    }
}

impl std::fmt::Debug for ReplySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplySink")
            .field("method", &self.method)
            .field("resolved", &self.deliver.is_none())
            .finish()
    }
}

impl Drop for ReplySink {
    fn drop(&mut self) {
        if let Some(deliver) = self.deliver.take() {
            tracing::warn!(method = %self.method, "reply sink dropped unresolved");
            deliver(Reply::Cancelled(Value::Null));
        }
    }
}
