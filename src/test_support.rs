//! Recording fake of the host platform shared by the unit tests.

use crate::config::BridgeConfig;
use crate::features::picker::PickerArgs;
use crate::features::share::ShareIntent;
use crate::platform::{Permission, Platform, PlatformInfo};
use crate::request_code::RequestCode;
use crate::state::Bridge;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    RequestGrant(Vec<Permission>, RequestCode),
    PermissionScreen(Vec<Permission>, PickerArgs, RequestCode),
    Picker(PickerArgs, RequestCode),
    Share(ShareIntent),
    MoveTaskToBack,
}

pub struct FakePlatform {
    info: PlatformInfo,
    granted: Mutex<HashSet<Permission>>,
    calls: Mutex<Vec<Call>>,
    fail_launches: AtomicBool,
}

impl FakePlatform {
    pub fn new(sdk_int: u32) -> Self {
        Self::with_dirs(sdk_int, PathBuf::from("/data/user/0/com.ox.chat"))
    }

    pub fn with_dirs(sdk_int: u32, root: PathBuf) -> Self {
        Self {
            info: PlatformInfo {
                sdk_int,
                release: "14".into(),
                package_name: "com.ox.chat".into(),
                database_dir: root.join("databases"),
                files_dir: root.join("files"),
                device_id: Some("a1b2c3".into()),
            },
            granted: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
            fail_launches: AtomicBool::new(false),
        }
    }

    pub fn grant(&self, permission: Permission) {
        self.granted.lock().unwrap().insert(permission);
    }

    pub fn fail_launches(&self) {
        self.fail_launches.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) -> Result<(), String> {
        self.calls.lock().unwrap().push(call);
        if self.fail_launches.load(Ordering::SeqCst) {
            Err("activity_not_found".into())
        } else {
            Ok(())
        }
    }
}

impl Platform for FakePlatform {
    fn info(&self) -> &PlatformInfo {
        &self.info
    }

    fn check_granted(&self, permission: Permission) -> bool {
        self.granted.lock().unwrap().contains(&permission)
    }

    fn request_grant(&self, permissions: &[Permission], code: RequestCode) -> Result<(), String> {
        self.record(Call::RequestGrant(permissions.to_vec(), code))
    }

    fn launch_permission_screen(
        &self,
        permissions: &[Permission],
        args: &PickerArgs,
        code: RequestCode,
    ) -> Result<(), String> {
        self.record(Call::PermissionScreen(permissions.to_vec(), args.clone(), code))
    }

    fn launch_picker(&self, args: &PickerArgs, code: RequestCode) -> Result<(), String> {
        self.record(Call::Picker(args.clone(), code))
    }

    fn present_share_chooser(&self, intent: &ShareIntent) -> Result<(), String> {
        self.record(Call::Share(intent.clone()))
    }

    fn move_task_to_back(&self) {
        self.calls.lock().unwrap().push(Call::MoveTaskToBack);
    }
}

pub fn fake_bridge(sdk_int: u32) -> (Arc<FakePlatform>, Bridge) {
    fake_bridge_with(FakePlatform::new(sdk_int), BridgeConfig::default())
}

pub fn fake_bridge_with(platform: FakePlatform, config: BridgeConfig) -> (Arc<FakePlatform>, Bridge) {
    let platform = Arc::new(platform);
    let bridge = Bridge::new(Arc::clone(&platform) as Arc<dyn Platform>, config);
    (platform, bridge)
}
