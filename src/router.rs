use crate::error::BridgeError;
use crate::features::compression::{clamp_quality, compress_image};
use crate::features::permissions::{self, MediaKind};
use crate::features::picker::{self, PickerArgs};
use crate::features::share;
use crate::features::storage::{database_path, output_dir};
use crate::reply::{Reply, ReplySink};
use crate::request_code::RequestCode;
use crate::slot::RouterDecision;
use crate::state::Bridge;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{mpsc, Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread;

/// `Activity.RESULT_OK`.
pub const RESULT_OK: i32 = -1;

/// A named call from the host. The answer goes to the `ReplySink` handed to
/// `Bridge::dispatch` alongside it.
#[derive(Debug, Clone, Deserialize)]
pub struct Command {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl Command {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// An asynchronous answer from the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalCompletion {
    pub request_code: i32,
    pub success: bool,
    pub payload: Value,
}

impl ExternalCompletion {
    pub fn from_activity_result(request_code: i32, result_code: i32, payload: Value) -> Self {
        Self {
            request_code,
            success: result_code == RESULT_OK,
            payload,
        }
    }
}

#[derive(Debug)]
enum Action {
    DatabaseFilePath { db_name: String },
    ScanPath { path: String },
    PickerPaths(PickerArgs),
    BackToDesktop,
    PlatformVersion,
    SysShare { file_path: String },
    MediaPermissions { kind: MediaKind },
    DeviceId,
    CompressionImg { file_path: String, quality: u8 },
}

fn parse_action(command: &Command) -> Result<Action, BridgeError> {
    let args = &command.arguments;
    match command.method.as_str() {
        "getDatabaseFilePath" => Ok(Action::DatabaseFilePath {
            db_name: required_str(args, "dbName")?,
        }),
        "scan_path" => Ok(Action::ScanPath {
            path: required_str(args, "path")?,
        }),
        "getPickerPaths" => picker::parse_args(args).map(Action::PickerPaths),
        "backToDesktop" => Ok(Action::BackToDesktop),
        "getPlatformVersion" => Ok(Action::PlatformVersion),
        "callSysShare" => {
            let file_path = required_str(args, "filePath")?;
            if file_path.is_empty() {
                return Err(BridgeError::invalid_argument("filePath", "empty"));
            }
            Ok(Action::SysShare { file_path })
        }
        "requestMediaPermissions" => {
            let raw = required_i64(args, "type")?;
            let kind = MediaKind::from_type(raw).ok_or_else(|| {
                BridgeError::invalid_argument("type", format!("unknown media type {raw}"))
            })?;
            Ok(Action::MediaPermissions { kind })
        }
        "getDeviceId" => Ok(Action::DeviceId),
        "getCompressionImg" => Ok(Action::CompressionImg {
            file_path: required_str(args, "filePath")?,
            quality: clamp_quality(optional_i64(args, "quality")?),
        }),
        other => Err(BridgeError::NotImplemented(other.to_string())),
    }
}

fn required_str(args: &Value, key: &str) -> Result<String, BridgeError> {
    match args.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => Err(BridgeError::invalid_argument(key, "missing")),
        Some(other) => Err(BridgeError::invalid_argument(
            key,
            format!("expected string, got {other}"),
        )),
    }
}

fn optional_i64(args: &Value, key: &str) -> Result<Option<i64>, BridgeError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            BridgeError::invalid_argument(key, format!("expected integer, got {value}"))
        }),
    }
}

fn required_i64(args: &Value, key: &str) -> Result<i64, BridgeError> {
    optional_i64(args, key)?.ok_or_else(|| BridgeError::invalid_argument(key, "missing"))
}

impl Bridge {
    /// Routes one command. Every path answers `sink` exactly once, either
    /// here or later through `on_external_result`.
    pub fn dispatch(&self, command: Command, sink: ReplySink) {
        tracing::debug!(method = %command.method, "dispatch");
        let action = match parse_action(&command) {
            Ok(action) => action,
            Err(err) => {
                tracing::warn!(method = %command.method, error = %err, "command rejected");
                sink.error(err);
                return;
            }
        };

        let info = self.platform().info();
        match action {
            Action::DatabaseFilePath { db_name } => {
                match database_path(&info.database_dir, &db_name) {
                    Ok(path) => sink.success(path.to_string_lossy().into_owned()),
                    Err(e) => sink.error(BridgeError::invalid_argument("dbName", e)),
                }
            }
            Action::ScanPath { path } => match self.decoder().decode(Path::new(&path)) {
                Ok(text) => sink.success(text),
                Err(e) => sink.error(BridgeError::Decode(e)),
            },
            Action::PickerPaths(args) => picker::start(self, args, sink),
            Action::BackToDesktop => {
                // Leaving the app settles whatever was pending, related or not.
                if let Some(code) = self.slot().force_resolve(Reply::ok(true)) {
                    tracing::info!(code = ?code, "pending request settled by backToDesktop");
                }
                sink.success(true);
                self.platform().move_task_to_back();
            }
            Action::PlatformVersion => sink.success(format!("Android {}", info.release)),
            Action::SysShare { file_path } => match share::share_file(self, &file_path) {
                Ok(()) => sink.success(Value::Null),
                Err(e) => sink.error(e),
            },
            Action::MediaPermissions { kind } => {
                let outcome = permissions::negotiate(self, kind, sink);
                tracing::debug!(kind = ?kind, outcome = ?outcome, "media permissions");
            }
            Action::DeviceId => sink.success(info.device_id.clone()),
            Action::CompressionImg { file_path, quality } => {
                let compressed = output_dir(&info.files_dir, &self.config().compression_dir)
                    .and_then(|dir| compress_image(Path::new(&file_path), &dir, quality));
                match compressed {
                    Ok(path) => sink.success(path.to_string_lossy().into_owned()),
                    Err(e) => {
                        tracing::warn!(path = %file_path, error = %e, "image compression failed");
                        sink.success(Value::Null);
                    }
                }
            }
        }
    }

    /// Single ingress for platform completions. Returns whether the
    /// completion matched the pending request.
    pub fn on_external_result(&self, completion: ExternalCompletion) -> bool {
        let Some(code) = RequestCode::from_code(completion.request_code) else {
            tracing::debug!(code = completion.request_code, "completion for foreign request code");
            return false;
        };
        match self
            .slot()
            .resolve(code, completion.success, completion.payload)
        {
            RouterDecision::Ignored => false,
            RouterDecision::Deliver { sink, reply } => {
                sink.resolve(reply);
                true
            }
            RouterDecision::LaunchPicker { args } => {
                picker::launch_picker(self, &args);
                true
            }
        }
    }

    pub fn sweep_expired(&self) -> Option<RequestCode> {
        self.slot().sweep_expired()
    }
}

struct GlobalState {
    bridge: Mutex<Option<Arc<Bridge>>>,
    router: OnceLock<RouterRuntime>,
}

impl GlobalState {
    const fn new() -> Self {
        Self {
            bridge: Mutex::new(None),
            router: OnceLock::new(),
        }
    }

    fn bridge_lock(&self) -> MutexGuard<'_, Option<Arc<Bridge>>> {
        self.bridge.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bridge(&self) -> Option<Arc<Bridge>> {
        self.bridge_lock().clone()
    }

    fn router(&self) -> &RouterRuntime {
        self.router.get_or_init(|| RouterRuntime::new(route))
    }
}

static STATE: GlobalState = GlobalState::new();

type Route = Arc<dyn Fn(ExternalCompletion) -> bool + Send + Sync>;

/// Consumes completions one at a time off the caller's thread. Without a
/// worker, or once the worker is gone, completions are routed inline.
struct RouterRuntime {
    sender: Option<mpsc::Sender<ExternalCompletion>>,
    route: Route,
}

impl RouterRuntime {
    fn new(route: impl Fn(ExternalCompletion) -> bool + Send + Sync + 'static) -> Self {
        let route: Route = Arc::new(route);
        let (tx, rx) = mpsc::channel::<ExternalCompletion>();
        let worker = Arc::clone(&route);
        let spawned = thread::Builder::new()
            .name("ox-common-router".into())
            .spawn(move || {
                while let Ok(completion) = rx.recv() {
                    worker(completion);
                }
            });
        match spawned {
            Ok(_) => Self {
                sender: Some(tx),
                route,
            },
            Err(e) => {
                tracing::error!(error = %e, "router thread unavailable, routing inline");
                Self::inline(route)
            }
        }
    }

    fn inline(route: Route) -> Self {
        Self {
            sender: None,
            route,
        }
    }

    fn enqueue(&self, completion: ExternalCompletion) {
        let Some(tx) = &self.sender else {
            (self.route)(completion);
            return;
        };
        if let Err(mpsc::SendError(completion)) = tx.send(completion) {
            tracing::warn!(code = completion.request_code, "router worker gone, routing inline");
            (self.route)(completion);
        }
    }
}

fn route(completion: ExternalCompletion) -> bool {
    match STATE.bridge() {
        Some(bridge) => bridge.on_external_result(completion),
        None => {
            tracing::warn!(code = completion.request_code, "completion with no attached bridge");
            false
        }
    }
}

/// Installs the bridge serving the JNI entry points. A replaced bridge
/// cancels its pending request when dropped.
pub fn attach(bridge: Bridge) {
    let previous = STATE.bridge_lock().replace(Arc::new(bridge));
    if previous.is_some() {
        tracing::info!("bridge re-attached");
    }
}

pub fn detach() {
    let previous = STATE.bridge_lock().take();
    if let Some(bridge) = previous {
        bridge.slot().cancel_pending();
    }
}

pub fn dispatch(command: Command, sink: ReplySink) {
    match STATE.bridge() {
        Some(bridge) => bridge.dispatch(command, sink),
        None => sink.error(BridgeError::Platform("not_attached".into())),
    }
}

/// Queues a completion for the router. Returns whether the code belongs to
/// this bridge; the match against the pending request happens on the router.
pub fn submit_completion(completion: ExternalCompletion) -> bool {
    if RequestCode::from_code(completion.request_code).is_none() {
        return false;
    }
    STATE.router().enqueue(completion);
    true
}

pub fn sweep_expired() -> Option<RequestCode> {
    STATE.bridge().and_then(|bridge| bridge.sweep_expired())
}
