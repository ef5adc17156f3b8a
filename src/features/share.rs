use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::features::storage::parse_file_uri_path;
use crate::platform::PlatformInfo;
use crate::state::Bridge;
use serde::Serialize;

/// How the shared file is exposed to the receiving app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShareTarget {
    /// Resolved by the host through its FileProvider.
    FileProvider { authority: String, path: String },
    FileUri { uri: String },
}

/// `ACTION_SEND` chooser request, serialized as-is for the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShareIntent {
    pub target: ShareTarget,
    pub mime_type: String,
    pub chooser_title: String,
    pub text: String,
    pub sms_body: String,
}

pub fn build_share_intent(
    file_path: &str,
    info: &PlatformInfo,
    config: &BridgeConfig,
) -> Result<ShareIntent, BridgeError> {
    let path = parse_file_uri_path(file_path)
        .ok_or_else(|| BridgeError::invalid_argument("filePath", "expected an absolute path"))?;
    let path = path.to_string_lossy().into_owned();

    let target = if info.sdk_int >= config.file_provider_min_sdk {
        ShareTarget::FileProvider {
            authority: format!("{}{}", info.package_name, config.file_provider_suffix),
            path,
        }
    } else {
        ShareTarget::FileUri {
            uri: format!("file://{path}"),
        }
    };

    Ok(ShareIntent {
        target,
        mime_type: config.share_mime_type.clone(),
        chooser_title: config.share_chooser_title.clone(),
        text: String::new(),
        sms_body: String::new(),
    })
}

/// Fires the chooser and returns without waiting for the user.
pub fn share_file(bridge: &Bridge, file_path: &str) -> Result<(), BridgeError> {
    let intent = build_share_intent(file_path, bridge.platform().info(), bridge.config())?;
    tracing::debug!(target = ?intent.target, "presenting share chooser");
    bridge
        .platform()
        .present_share_chooser(&intent)
        .map_err(|e| BridgeError::Platform(format!("share_failed:{e}")))
}
