use crate::error::BridgeError;
use crate::platform::Permission;
use crate::reply::ReplySink;
use crate::request_code::RequestCode;
use crate::slot::Pending;
use crate::state::Bridge;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything the picker screen needs. The bridge only looks at
/// `camera_mime_type`; the rest is handed to the picker untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerArgs {
    pub gallery_mode: String,
    pub show_gif: bool,
    pub ui_color: BTreeMap<String, f64>,
    pub select_count: i64,
    pub show_camera: bool,
    pub enable_crop: bool,
    pub width: i64,
    pub height: i64,
    pub compress_size: i64,
    #[serde(default)]
    pub camera_mime_type: Option<String>,
    pub video_record_max_second: i64,
    pub video_record_min_second: i64,
    pub video_select_max_second: i64,
    pub video_select_min_second: i64,
    pub language: String,
}

/// One picked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    #[serde(default)]
    pub original_path: Option<String>,
    pub compressed_path: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerStep {
    /// Show the permission screen first, then the picker.
    RequestingAccess(Vec<Permission>),
    Picking,
}

pub fn parse_args(arguments: &Value) -> Result<PickerArgs, BridgeError> {
    PickerArgs::deserialize(arguments)
        .map_err(|e| BridgeError::invalid_argument("getPickerPaths", e.to_string()))
}

pub fn path_records(payload: Value) -> Result<Vec<PathRecord>, String> {
    serde_json::from_value(payload).map_err(|e| e.to_string())
}

pub fn first_step(args: &PickerArgs, sdk_int: u32, fine_grained_min_sdk: u32) -> PickerStep {
    if args.camera_mime_type.is_some() {
        PickerStep::RequestingAccess(vec![Permission::Camera])
    } else if sdk_int >= fine_grained_min_sdk {
        PickerStep::RequestingAccess(vec![Permission::ReadMediaImages, Permission::ReadMediaVideo])
    } else {
        PickerStep::Picking
    }
}

pub fn start(bridge: &Bridge, args: PickerArgs, sink: ReplySink) {
    let step = first_step(
        &args,
        bridge.sdk_int(),
        bridge.config().fine_grained_media_min_sdk,
    );
    tracing::debug!(step = ?step, camera_mime = ?args.camera_mime_type, "picker flow");
    match step {
        PickerStep::RequestingAccess(permissions) => {
            let pending = Pending::ReadImage {
                sink,
                args: args.clone(),
            };
            if bridge.slot().arm(pending).is_err() {
                return;
            }
            if let Err(e) =
                bridge
                    .platform()
                    .launch_permission_screen(&permissions, &args, RequestCode::ReadImage)
            {
                abort(bridge, RequestCode::ReadImage, e);
            }
        }
        PickerStep::Picking => {
            if bridge.slot().arm(Pending::Select { sink }).is_err() {
                return;
            }
            launch_picker(bridge, &args);
        }
    }
}

/// Second step of the chain; the slot is already armed under `Select`.
pub fn launch_picker(bridge: &Bridge, args: &PickerArgs) {
    if let Err(e) = bridge.platform().launch_picker(args, RequestCode::Select) {
        abort(bridge, RequestCode::Select, e);
    }
}

fn abort(bridge: &Bridge, code: RequestCode, err: String) {
    tracing::error!(code = ?code, error = %err, "external launch failed");
    if let Some(sink) = bridge.slot().take(code) {
        sink.error(BridgeError::Platform(format!("launch_failed:{err}")));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;

    pub(crate) fn sample_args_json() -> Value {
        json!({
            "galleryMode": "image",
            "showGif": true,
            "uiColor": { "a": 255, "r": 40, "g": 60, "b": 80, "l": 1.0 },
            "selectCount": 9,
            "showCamera": false,
            "enableCrop": true,
            "width": 1080,
            "height": 1920,
            "compressSize": 500,
            "videoRecordMaxSecond": 120,
            "videoRecordMinSecond": 1,
            "videoSelectMaxSecond": 120,
            "videoSelectMinSecond": 1,
            "language": "en"
        })
    }

    pub(crate) fn sample_args() -> PickerArgs {
        parse_args(&sample_args_json()).expect("sample args parse")
    }

    #[test]
    fn parses_full_bundle() {
        let args = sample_args();
        assert_eq!(args.gallery_mode, "image");
        assert_eq!(args.select_count, 9);
        assert_eq!(args.ui_color.get("l"), Some(&1.0));
        assert_eq!(args.camera_mime_type, None);
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let mut raw = sample_args_json();
        raw.as_object_mut().unwrap().remove("showGif");
        let err = parse_args(&raw).unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument { .. }));
        assert!(err.to_string().contains("showGif"));
    }

    #[test]
    fn wrong_type_is_invalid() {
        let mut raw = sample_args_json();
        raw["selectCount"] = json!("nine");
        assert!(parse_args(&raw).is_err());
    }

    #[test]
    fn camera_override_always_requests_camera() {
        let mut args = sample_args();
        args.camera_mime_type = Some("image/jpeg".into());
        for sdk in [21, 29, 33, 34] {
            assert_eq!(
                first_step(&args, sdk, 33),
                PickerStep::RequestingAccess(vec![Permission::Camera])
            );
        }
    }

    #[test]
    fn media_permissions_gate_on_sdk() {
        let args = sample_args();
        assert_eq!(first_step(&args, 32, 33), PickerStep::Picking);
        assert_eq!(
            first_step(&args, 33, 33),
            PickerStep::RequestingAccess(vec![
                Permission::ReadMediaImages,
                Permission::ReadMediaVideo
            ])
        );
    }

    #[test]
    fn path_records_accept_missing_original() {
        let records = path_records(json!([
            { "originalPath": "/dcim/a.jpg", "compressedPath": "/cache/a.jpg" },
            { "compressedPath": "/cache/b.jpg" }
        ]))
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].original_path, None);
        assert!(path_records(json!({ "compressedPath": "x" })).is_err());
    }

    #[test]
    fn args_serialize_back_to_host_names() {
        let value = serde_json::to_value(sample_args()).unwrap();
        assert_eq!(value.get("videoSelectMaxSecond"), Some(&json!(120)));
        assert_eq!(value.get("cameraMimeType"), Some(&Value::Null));
    }
}
