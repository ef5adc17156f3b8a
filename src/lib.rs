//! Native core of the ox_common plugin: one pending-request slot bridging the
//! host's activity results back to the commands that started them.

pub mod config;
pub mod error;
pub mod features;
mod host;
pub mod logging;
pub mod platform;
pub mod reply;
pub mod request_code;
pub mod router;
pub mod slot;
pub mod state;
#[cfg(test)]
mod test_support;

use config::BridgeConfig;
use error::BridgeError;
use host::JniPlatform;
use jni::objects::{JIntArray, JObject, JObjectArray, JString};
use jni::sys::{jboolean, jint, jlong, JNI_FALSE, JNI_TRUE};
use jni::JNIEnv;
use platform::PlatformInfo;
use router::{Command, ExternalCompletion};
use serde_json::{json, Value};
use state::Bridge;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

fn guarded<T>(entry: &str, fallback: T, f: impl FnOnce() -> T) -> T {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            tracing::error!(entry, "panic at JNI boundary");
            fallback
        }
    }
}

fn read_string(env: &mut JNIEnv, input: &JString) -> String {
    if input.is_null() {
        return String::new();
    }
    env.get_string(input).map(|s| s.into()).unwrap_or_default()
}

/// Empty input is `null`; anything else must be valid JSON.
fn read_json(env: &mut JNIEnv, input: &JString) -> Result<Value, String> {
    let raw = read_string(env, input);
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&raw).map_err(|e| format!("invalid_json:{e}"))
}

fn to_jboolean(value: bool) -> jboolean {
    if value {
        JNI_TRUE
    } else {
        JNI_FALSE
    }
}

/// Logging goes up before the environment overrides so their warnings are
/// not lost.
fn load_config(raw: &str) -> Result<BridgeConfig, String> {
    let mut config = BridgeConfig::from_json(raw)?;
    logging::init(&config.log_level);
    config.apply_env();
    Ok(config)
}

fn attach(
    env: &mut JNIEnv,
    plugin: &JObject,
    config_json: &JString,
    platform_json: &JString,
) -> Result<(), String> {
    let config = load_config(&read_string(env, config_json))?;
    let info: PlatformInfo = serde_json::from_str(&read_string(env, platform_json))
        .map_err(|e| format!("platform_info_invalid:{e}"))?;
    tracing::info!(sdk = info.sdk_int, package = %info.package_name, "attaching bridge");
    let platform = JniPlatform::new(env, plugin, info)?;
    router::attach(Bridge::new(Arc::new(platform), config));
    Ok(())
}

#[no_mangle]
pub extern "system" fn Java_com_ox_ox_1common_OXCommonPlugin_nativeAttach(
    mut env: JNIEnv,
    this: JObject,
    config_json: JString,
    platform_json: JString,
) -> jboolean {
    guarded("nativeAttach", JNI_FALSE, || {
        match attach(&mut env, &this, &config_json, &platform_json) {
            Ok(()) => JNI_TRUE,
            Err(e) => {
                tracing::error!(error = %e, "attach failed");
                JNI_FALSE
            }
        }
    })
}

#[no_mangle]
pub extern "system" fn Java_com_ox_ox_1common_OXCommonPlugin_nativeDetach(
    _env: JNIEnv,
    _this: JObject,
) {
    guarded("nativeDetach", (), router::detach)
}

#[no_mangle]
pub extern "system" fn Java_com_ox_ox_1common_OXCommonPlugin_nativeDispatch(
    mut env: JNIEnv,
    this: JObject,
    call_id: jlong,
    method: JString,
    args_json: JString,
) {
    guarded("nativeDispatch", (), || {
        let method = read_string(&mut env, &method);
        let sink = match host::reply_sink(&mut env, &this, call_id, &method) {
            Ok(sink) => sink,
            Err(e) => {
                tracing::error!(call_id, method = %method, error = %e, "no reply channel");
                return;
            }
        };
        match read_json(&mut env, &args_json) {
            Ok(arguments) => router::dispatch(Command::new(method, arguments), sink),
            Err(e) => sink.error(BridgeError::invalid_argument("arguments", e)),
        }
    })
}

#[no_mangle]
pub extern "system" fn Java_com_ox_ox_1common_OXCommonPlugin_nativeOnActivityResult(
    mut env: JNIEnv,
    _this: JObject,
    request_code: jint,
    result_code: jint,
    payload_json: JString,
) -> jboolean {
    guarded("nativeOnActivityResult", JNI_FALSE, || {
        let payload = read_json(&mut env, &payload_json).unwrap_or_else(|e| {
            tracing::warn!(request_code, error = %e, "activity result payload dropped");
            Value::Null
        });
        to_jboolean(router::submit_completion(
            ExternalCompletion::from_activity_result(request_code, result_code, payload),
        ))
    })
}

fn grant_payload(
    env: &mut JNIEnv,
    permissions: &JObjectArray,
    grant_results: &JIntArray,
) -> jni::errors::Result<Value> {
    let mut names = Vec::new();
    if !permissions.is_null() {
        let len = env.get_array_length(permissions)?;
        for i in 0..len {
            let element = JString::from(env.get_object_array_element(permissions, i)?);
            names.push(read_string(env, &element));
        }
    }
    let mut results = Vec::new();
    if !grant_results.is_null() {
        let len = env.get_array_length(grant_results)?;
        results = vec![0; len as usize];
        env.get_int_array_region(grant_results, 0, &mut results)?;
    }
    Ok(json!({ "permissions": names, "grantResults": results }))
}

#[no_mangle]
pub extern "system" fn Java_com_ox_ox_1common_OXCommonPlugin_nativeOnRequestPermissionsResult(
    mut env: JNIEnv,
    _this: JObject,
    request_code: jint,
    permissions: JObjectArray,
    grant_results: JIntArray,
) -> jboolean {
    guarded("nativeOnRequestPermissionsResult", JNI_FALSE, || {
        let payload = grant_payload(&mut env, &permissions, &grant_results).unwrap_or_else(|e| {
            tracing::warn!(request_code, error = %e, "grant results unreadable");
            Value::Null
        });
        to_jboolean(router::submit_completion(ExternalCompletion {
            request_code,
            success: true,
            payload,
        }))
    })
}

/// Returns the request code answered with a timeout, or 0.
#[no_mangle]
pub extern "system" fn Java_com_ox_ox_1common_OXCommonPlugin_nativeSweep(
    _env: JNIEnv,
    _this: JObject,
) -> jint {
    guarded("nativeSweep", 0, || {
        router::sweep_expired().map_or(0, |code| code.code())
    })
}
