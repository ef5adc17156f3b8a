//! JNI side of `Platform`: every collaborator call lands on a method of the
//! Java plugin object that attached the bridge.

use crate::features::picker::PickerArgs;
use crate::features::share::ShareIntent;
use crate::platform::{Permission, Platform, PlatformInfo};
use crate::reply::ReplySink;
use crate::request_code::RequestCode;
use jni::objects::{GlobalRef, JObject, JObjectArray, JValue};
use jni::{JNIEnv, JavaVM};
use std::sync::Arc;

const LOCAL_FRAME: i32 = 16;

#[derive(Clone)]
struct Host {
    vm: Arc<JavaVM>,
    plugin: GlobalRef,
}

impl Host {
    fn new(env: &mut JNIEnv, plugin: &JObject) -> Result<Self, String> {
        let vm = env
            .get_java_vm()
            .map_err(|e| format!("jni_vm_failed:{e}"))?;
        let plugin = env
            .new_global_ref(plugin)
            .map_err(|e| format!("jni_global_ref_failed:{e}"))?;
        Ok(Self {
            vm: Arc::new(vm),
            plugin,
        })
    }

    /// Runs `f` on an attached env inside a local frame. A pending Java
    /// exception is cleared and turned into the error.
    fn with_env<T>(
        &self,
        f: impl FnOnce(&mut JNIEnv, &JObject) -> jni::errors::Result<T>,
    ) -> Result<T, String> {
        let mut env = self
            .vm
            .attach_current_thread()
            .map_err(|e| format!("jni_attach_failed:{e}"))?;
        let plugin = self.plugin.as_obj();
        let result = env.with_local_frame(LOCAL_FRAME, |env| f(env, plugin));
        if env.exception_check().unwrap_or(false) {
            let _ = env.exception_describe();
            let _ = env.exception_clear();
        }
        result.map_err(|e| format!("jni_call_failed:{e}"))
    }

    fn call_void(
        &self,
        name: &str,
        sig: &str,
        build: impl for<'local> FnOnce(&mut JNIEnv<'local>) -> jni::errors::Result<Vec<Arg<'local>>>,
    ) -> Result<(), String> {
        self.with_env(|env, plugin| {
            let args = build(env)?;
            let values: Vec<JValue> = args.iter().map(Arg::as_value).collect();
            env.call_method(plugin, name, sig, &values)?;
            Ok(())
        })
    }
}

/// Owned JNI argument; keeps local refs alive until the call returns.
enum Arg<'local> {
    Object(JObject<'local>),
    Int(i32),
    Long(i64),
}

impl Arg<'_> {
    fn as_value(&self) -> JValue<'_, '_> {
        match self {
            Arg::Object(obj) => JValue::Object(obj),
            Arg::Int(v) => JValue::Int(*v),
            Arg::Long(v) => JValue::Long(*v),
        }
    }
}

fn string_arg<'local>(env: &mut JNIEnv<'local>, text: &str) -> jni::errors::Result<Arg<'local>> {
    Ok(Arg::Object(env.new_string(text)?.into()))
}

fn string_array<'local>(
    env: &mut JNIEnv<'local>,
    permissions: &[Permission],
) -> jni::errors::Result<Arg<'local>> {
    let array: JObjectArray = env.new_object_array(
        permissions.len() as i32,
        "java/lang/String",
        JObject::null(),
    )?;
    for (i, permission) in permissions.iter().enumerate() {
        let name = env.new_string(permission.as_str())?;
        env.set_object_array_element(&array, i as i32, &name)?;
    }
    Ok(Arg::Object(array.into()))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("serialize_failed:{e}"))
}

pub struct JniPlatform {
    host: Host,
    info: PlatformInfo,
}

impl JniPlatform {
    pub fn new(env: &mut JNIEnv, plugin: &JObject, info: PlatformInfo) -> Result<Self, String> {
        Ok(Self {
            host: Host::new(env, plugin)?,
            info,
        })
    }
}

impl Platform for JniPlatform {
    fn info(&self) -> &PlatformInfo {
        &self.info
    }

    fn check_granted(&self, permission: Permission) -> bool {
        let granted = self.host.with_env(|env, plugin| {
            let name = env.new_string(permission.as_str())?;
            env.call_method(
                plugin,
                "checkSelfPermission",
                "(Ljava/lang/String;)Z",
                &[(&name).into()],
            )?
            .z()
        });
        granted.unwrap_or_else(|e| {
            tracing::warn!(permission = permission.as_str(), error = %e, "permission check failed");
            false
        })
    }

    fn request_grant(&self, permissions: &[Permission], code: RequestCode) -> Result<(), String> {
        self.host.call_void(
            "requestPermissions",
            "([Ljava/lang/String;I)V",
            |env| Ok(vec![string_array(env, permissions)?, Arg::Int(code.code())]),
        )
    }

    fn launch_permission_screen(
        &self,
        permissions: &[Permission],
        args: &PickerArgs,
        code: RequestCode,
    ) -> Result<(), String> {
        let args = to_json(args)?;
        self.host.call_void(
            "startPermissionActivity",
            "([Ljava/lang/String;Ljava/lang/String;I)V",
            |env| {
                Ok(vec![
                    string_array(env, permissions)?,
                    string_arg(env, &args)?,
                    Arg::Int(code.code()),
                ])
            },
        )
    }

    fn launch_picker(&self, args: &PickerArgs, code: RequestCode) -> Result<(), String> {
        let args = to_json(args)?;
        self.host.call_void("startPickerActivity", "(Ljava/lang/String;I)V", |env| {
            Ok(vec![string_arg(env, &args)?, Arg::Int(code.code())])
        })
    }

    fn present_share_chooser(&self, intent: &ShareIntent) -> Result<(), String> {
        let intent = to_json(intent)?;
        self.host
            .call_void("startShareChooser", "(Ljava/lang/String;)V", |env| {
                Ok(vec![string_arg(env, &intent)?])
            })
    }

    fn move_task_to_back(&self) {
        if let Err(e) = self.host.call_void("moveTaskToBack", "()V", |_| Ok(Vec::new())) {
            tracing::error!(error = %e, "moveTaskToBack failed");
        }
    }
}

/// Sink that posts the wire reply to `onNativeReply(callId, json)` on the
/// plugin, from whichever thread resolves it.
pub fn reply_sink(
    env: &mut JNIEnv,
    plugin: &JObject,
    call_id: i64,
    method: &str,
) -> Result<ReplySink, String> {
    let host = Host::new(env, plugin)?;
    Ok(ReplySink::new(method, move |reply| {
        let wire = reply.to_wire().to_string();
        let posted = host.call_void("onNativeReply", "(JLjava/lang/String;)V", |env| {
            Ok(vec![Arg::Long(call_id), string_arg(env, &wire)?])
        });
        if let Err(e) = posted {
            tracing::error!(call_id, error = %e, "reply could not be posted");
        }
    }))
}
