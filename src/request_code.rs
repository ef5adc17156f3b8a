use serde::Serialize;
use serde_json::{json, Value};

/// Codes correlating an external request with its later completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RequestCode {
    Select,
    ReadImage,
    PermissionNegotiation,
}

/// What happens when a completion for a code succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continuation {
    /// Deliver the payload and release the slot.
    Finalize,
    /// Launch the follow-up request and re-arm the slot under the given code.
    Chain(RequestCode),
}

impl RequestCode {
    pub const ALL: [RequestCode; 3] = [
        RequestCode::Select,
        RequestCode::ReadImage,
        RequestCode::PermissionNegotiation,
    ];

    pub const fn code(self) -> i32 {
        match self {
            RequestCode::Select => 601,
            RequestCode::ReadImage => 603,
            RequestCode::PermissionNegotiation => 801,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    pub const fn continuation(self) -> Continuation {
        match self {
            RequestCode::Select => Continuation::Finalize,
            RequestCode::ReadImage => Continuation::Chain(RequestCode::Select),
            RequestCode::PermissionNegotiation => Continuation::Finalize,
        }
    }

    /// Falsy value the caller sees when a request under this code is cancelled.
    pub fn cancelled_payload(self) -> Value {
        match self {
            RequestCode::Select | RequestCode::ReadImage => json!([]),
            RequestCode::PermissionNegotiation => json!(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(RequestCode::from_code(601), Some(RequestCode::Select));
        assert_eq!(RequestCode::from_code(603), Some(RequestCode::ReadImage));
        assert_eq!(
            RequestCode::from_code(801),
            Some(RequestCode::PermissionNegotiation)
        );
        assert_eq!(RequestCode::from_code(602), None);
    }

    #[test]
    fn only_read_image_chains() {
        assert_eq!(
            RequestCode::ReadImage.continuation(),
            Continuation::Chain(RequestCode::Select)
        );
        assert_eq!(RequestCode::Select.continuation(), Continuation::Finalize);
        assert_eq!(
            RequestCode::PermissionNegotiation.continuation(),
            Continuation::Finalize
        );
    }

    #[test]
    fn cancelled_payloads_are_falsy() {
        assert_eq!(RequestCode::Select.cancelled_payload(), json!([]));
        assert_eq!(RequestCode::ReadImage.cancelled_payload(), json!([]));
        assert_eq!(
            RequestCode::PermissionNegotiation.cancelled_payload(),
            json!(false)
        );
    }
}
