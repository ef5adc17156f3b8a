use crate::request_code::RequestCode;

/// Everything a command can fail with. All of these travel back through the
/// command's reply sink; none escape the dispatch boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BridgeError {
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("method `{0}` is not implemented")]
    NotImplemented(String),

    #[error("a {pending:?} request is still pending")]
    SlotBusy { pending: RequestCode },

    #[error("platform sdk {sdk} does not support media permission negotiation")]
    PlatformUnsupported { sdk: u32 },

    #[error("pending {code:?} request timed out")]
    TimedOut { code: RequestCode },

    #[error("platform error: {0}")]
    Platform(String),

    #[error("decode failed: {0}")]
    Decode(String),
}

impl BridgeError {
    pub fn invalid_argument(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    /// Stable code reported to the host alongside the message.
    pub fn wire_code(&self) -> &'static str {
        match self {
            Self::InvalidArgument { .. } => "invalid_argument",
            Self::NotImplemented(_) => "not_implemented",
            Self::SlotBusy { .. } => "slot_busy",
            Self::PlatformUnsupported { .. } => "platform_unsupported",
            Self::TimedOut { .. } => "timed_out",
            Self::Platform(_) => "platform_error",
            Self::Decode(_) => "decode_failed",
        }
    }
}
