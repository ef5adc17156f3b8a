use crate::error::BridgeError;
use crate::platform::Permission;
use crate::reply::{Reply, ReplySink};
use crate::request_code::RequestCode;
use crate::slot::Pending;
use crate::state::Bridge;
use serde::Deserialize;
use serde_json::Value;

/// Android's `PackageManager.PERMISSION_GRANTED`.
pub const PERMISSION_GRANTED: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn from_type(value: i64) -> Option<Self> {
        match value {
            1 => Some(MediaKind::Image),
            2 => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// Permissions backing one kind of media access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapabilitySet {
    pub permissions: &'static [Permission],
    /// Partial grant (user picked a subset of items) that still counts as
    /// access.
    pub partial: Option<Permission>,
}

const IMAGE_CAPABILITIES: CapabilitySet = CapabilitySet {
    permissions: &[
        Permission::ReadMediaImages,
        Permission::ReadMediaVisualUserSelected,
    ],
    partial: Some(Permission::ReadMediaVisualUserSelected),
};

const VIDEO_CAPABILITIES: CapabilitySet = CapabilitySet {
    permissions: &[
        Permission::ReadMediaVideo,
        Permission::ReadMediaVisualUserSelected,
    ],
    partial: Some(Permission::ReadMediaVisualUserSelected),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Full,
    Partial,
    Denied,
}

impl CapabilitySet {
    pub const fn for_kind(kind: MediaKind) -> Self {
        match kind {
            MediaKind::Image => IMAGE_CAPABILITIES,
            MediaKind::Video => VIDEO_CAPABILITIES,
        }
    }

    pub fn access_level(&self, granted: impl Fn(Permission) -> bool) -> AccessLevel {
        if self.permissions.iter().all(|p| granted(*p)) {
            AccessLevel::Full
        } else if self.partial.is_some_and(&granted) {
            AccessLevel::Partial
        } else {
            AccessLevel::Denied
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Negotiation {
    /// Answered without talking to the platform.
    Resolved(bool),
    /// A grant request is out; the slot holds the caller.
    Pending,
    /// Another request holds the slot; the caller got `SlotBusy`.
    Busy,
}

/// Runs the negotiation for `kind`, answering `sink` directly when no
/// round-trip is needed.
pub fn negotiate(bridge: &Bridge, kind: MediaKind, sink: ReplySink) -> Negotiation {
    let sdk = bridge.sdk_int();
    if sdk < bridge.config().negotiation_min_sdk {
        tracing::info!(sdk, "media permission negotiation unsupported");
        sink.resolve(Reply::from(Err::<Value, _>(BridgeError::PlatformUnsupported { sdk })));
        return Negotiation::Resolved(false);
    }

    let set = CapabilitySet::for_kind(kind);
    let platform = bridge.platform();
    let level = set.access_level(|p| platform.check_granted(p));
    tracing::debug!(kind = ?kind, level = ?level, "media access before negotiation");
    // Negotiation wants every permission; partial access still asks.
    if level == AccessLevel::Full {
        sink.success(true);
        return Negotiation::Resolved(true);
    }

    if bridge
        .slot()
        .arm(Pending::PermissionNegotiation { sink })
        .is_err()
    {
        return Negotiation::Busy;
    }
    if let Err(e) = platform.request_grant(set.permissions, RequestCode::PermissionNegotiation) {
        tracing::error!(error = %e, "permission request failed to launch");
        if let Some(sink) = bridge.slot().take(RequestCode::PermissionNegotiation) {
            sink.error(BridgeError::Platform(format!("request_failed:{e}")));
        }
    }
    Negotiation::Pending
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GrantPayload {
    Detailed {
        #[serde(default)]
        permissions: Vec<String>,
        #[serde(rename = "grantResults")]
        grant_results: Vec<i32>,
    },
    Bare(Vec<i32>),
}

/// True iff the platform reported at least one result and every result is
/// a grant. Order does not matter.
pub fn grant_outcome(payload: &Value) -> bool {
    let results = match GrantPayload::deserialize(payload) {
        Ok(GrantPayload::Detailed {
            permissions,
            grant_results,
        }) => {
            tracing::debug!(permissions = ?permissions, results = ?grant_results, "grant results");
            grant_results
        }
        Ok(GrantPayload::Bare(results)) => results,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable grant results");
            return false;
        }
    };
    !results.is_empty() && results.iter().all(|r| *r == PERMISSION_GRANTED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fake_bridge;
    use serde_json::json;

    #[test]
    fn kinds_map_to_type_codes() {
        assert_eq!(MediaKind::from_type(1), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_type(2), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_type(3), None);
    }

    #[test]
    fn partial_grant_satisfies_capability() {
        let set = CapabilitySet::for_kind(MediaKind::Video);
        let partial_only = |p: Permission| p == Permission::ReadMediaVisualUserSelected;
        assert_eq!(set.access_level(partial_only), AccessLevel::Partial);
        assert_eq!(set.access_level(|_| true), AccessLevel::Full);
        assert_eq!(
            set.access_level(|p| p == Permission::ReadMediaVideo),
            AccessLevel::Denied
        );
    }

    #[test]
    fn grant_outcome_is_all_or_nothing() {
        assert!(grant_outcome(&json!({
            "permissions": ["a", "b"],
            "grantResults": [0, 0]
        })));
        assert!(!grant_outcome(&json!({ "grantResults": [0, -1] })));
        assert!(!grant_outcome(&json!({ "grantResults": [-1, 0] })));
        assert!(grant_outcome(&json!([0])));
        assert!(!grant_outcome(&json!([])));
        assert!(!grant_outcome(&json!("granted")));
    }

    #[test]
    fn negotiation_outcomes_follow_slot_and_grants() {
        let (platform, bridge) = fake_bridge(34);
        let (sink, _rx) = ReplySink::channel("requestMediaPermissions");
        assert_eq!(negotiate(&bridge, MediaKind::Image, sink), Negotiation::Pending);

        let (sink, mut rx) = ReplySink::channel("requestMediaPermissions");
        assert_eq!(negotiate(&bridge, MediaKind::Video, sink), Negotiation::Busy);
        assert_eq!(
            rx.try_recv().unwrap(),
            Reply::Error(BridgeError::SlotBusy {
                pending: RequestCode::PermissionNegotiation
            })
        );
        assert_eq!(platform.calls().len(), 1);

        let (_platform, old) = fake_bridge(33);
        let (sink, _rx) = ReplySink::channel("requestMediaPermissions");
        assert_eq!(
            negotiate(&old, MediaKind::Image, sink),
            Negotiation::Resolved(false)
        );
    }
}
