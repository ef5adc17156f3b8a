//! Boundary to the host platform. Everything here is implemented by the host
//! (JNI in production, a recording fake in tests); the core never performs UI.

use crate::features::picker::PickerArgs;
use crate::features::share::ShareIntent;
use crate::request_code::RequestCode;
use serde::Deserialize;
use std::path::PathBuf;

/// Runtime permissions the bridge reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    ReadMediaImages,
    ReadMediaVideo,
    ReadMediaVisualUserSelected,
    Camera,
}

impl Permission {
    pub const fn as_str(self) -> &'static str {
        match self {
            Permission::ReadMediaImages => "android.permission.READ_MEDIA_IMAGES",
            Permission::ReadMediaVideo => "android.permission.READ_MEDIA_VIDEO",
            Permission::ReadMediaVisualUserSelected => {
                "android.permission.READ_MEDIA_VISUAL_USER_SELECTED"
            }
            Permission::Camera => "android.permission.CAMERA",
        }
    }
}

/// Static facts about the running device, captured once at attach.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformInfo {
    pub sdk_int: u32,
    pub release: String,
    pub package_name: String,
    pub database_dir: PathBuf,
    pub files_dir: PathBuf,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Collaborators the bridge drives. Launch methods only start the external
/// work; their outcome comes back later through the completion ingress under
/// the given request code. Failures to launch are reported as strings.
pub trait Platform: Send + Sync {
    fn info(&self) -> &PlatformInfo;

    fn check_granted(&self, permission: Permission) -> bool;

    fn request_grant(&self, permissions: &[Permission], code: RequestCode) -> Result<(), String>;

    /// Shows the permission pre-check screen; the picker arguments ride along
    /// so the completion can hand them back.
    fn launch_permission_screen(
        &self,
        permissions: &[Permission],
        args: &PickerArgs,
        code: RequestCode,
    ) -> Result<(), String>;

    fn launch_picker(&self, args: &PickerArgs, code: RequestCode) -> Result<(), String>;

    fn present_share_chooser(&self, intent: &ShareIntent) -> Result<(), String>;

    fn move_task_to_back(&self);
}
