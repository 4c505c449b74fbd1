//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to a `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! A session lives on the Rust heap and is addressed by the `jlong`
//! handle returned from `createSession`; Kotlin must pass it back to every
//! call and release it with `destroySession`. Events are buffered and
//! handed over as JSON by `onFrame` and `drainEvents`.

use jni::objects::{JClass, JString};
use jni::sys::{jboolean, jdouble, jlong, jstring};
use jni::JNIEnv;
use log::error;
use serde::Serialize;

use crate::alerts::Incident;
use crate::config::NavConfig;
use crate::error::{NavError, Result};
use crate::events::NavEvent;
use crate::geo::Coordinate;
use crate::route::{PositionSample, Route};
use crate::session::{ManualScheduler, NavigationSession};
use crate::smoother::SmoothedPosition;

type JniSession = NavigationSession<ManualScheduler, Vec<NavEvent>>;

#[derive(Serialize)]
struct FrameOutput {
    smoothed: Option<SmoothedPosition>,
    events: Vec<NavEvent>,
}

fn throw(env: &mut JNIEnv, e: &NavError) {
    let class = match e {
        NavError::InvalidConfig(_) | NavError::InvalidRoute(_) | NavError::Json(_) => {
            "java/lang/IllegalArgumentException"
        }
        NavError::WakeLock(_) | NavError::Jni(_) => "java/lang/IllegalStateException",
    };
    if env.throw_new(class, e.to_string()).is_err() {
        error!("Failed to raise Java exception for: {e}");
    }
}

fn session_mut<'a>(handle: jlong) -> Result<&'a mut JniSession> {
    if handle == 0 {
        return Err(NavError::Jni("null session handle".into()));
    }
    // SAFETY: non-zero handles come from createSession and stay valid
    // until destroySession, which Kotlin calls exactly once.
    Ok(unsafe { &mut *(handle as *mut JniSession) })
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Result<String> {
    Ok(env.get_string(value)?.into())
}

fn create_session(config_json: &str) -> Result<JniSession> {
    let config = if config_json.trim().is_empty() {
        NavConfig::default()
    } else {
        NavConfig::from_json(config_json)?
    };
    Ok(NavigationSession::new(&config, ManualScheduler::default(), Vec::new()))
}

fn run_frame(session: &mut JniSession, dt_s: f64) -> Result<String> {
    let smoothed = match session.scheduler().pending() {
        Some(id) => session.on_frame(id, dt_s),
        None => None,
    };
    let output = FrameOutput {
        smoothed,
        events: std::mem::take(session.sink_mut()),
    };
    Ok(serde_json::to_string(&output)?)
}

fn drain_events(session: &mut JniSession) -> Result<String> {
    Ok(serde_json::to_string(&std::mem::take(session.sink_mut()))?)
}

fn position_sample(lat: f64, lon: f64, heading: f64) -> PositionSample {
    let sample = PositionSample::new(Coordinate::new(lat, lon));
    if heading.is_nan() {
        sample
    } else {
        sample.with_heading(heading)
    }
}

fn to_jstring(env: &mut JNIEnv, result: Result<String>) -> jstring {
    match result.and_then(|s| Ok(env.new_string(s)?)) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            throw(env, &e);
            std::ptr::null_mut()
        }
    }
}

/// Runs `f` on the session behind `handle`, raising a Java exception on error.
fn with_session<T>(
    env: &mut JNIEnv,
    handle: jlong,
    default: T,
    f: impl FnOnce(&mut JniSession) -> T,
) -> T {
    match session_mut(handle) {
        Ok(session) => f(session),
        Err(e) => {
            throw(env, &e);
            default
        }
    }
}

#[cfg(target_os = "android")]
fn init_logging() {
    android_logger::init_once(
        android_logger::Config::default()
            .with_max_level(log::LevelFilter::Debug)
            .with_tag("navcore"),
    );
}

#[cfg(not(target_os = "android"))]
fn init_logging() {}

/// Returns the rust-core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_version(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&mut env, Ok(crate::VERSION.to_string()))
}

/// Maps to: RustBridge.init()
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_init(_env: JNIEnv, _class: JClass) {
    init_logging();
}

/// Maps to: RustBridge.createSession(configJson: String) -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_createSession(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let created = read_string(&mut env, &config_json).and_then(|json| create_session(&json));
    match created {
        Ok(session) => Box::into_raw(Box::new(session)) as jlong,
        Err(e) => {
            throw(&mut env, &e);
            0
        }
    }
}

/// Maps to: RustBridge.destroySession(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_destroySession(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: see session_mut; the handle is not used after this call.
        drop(unsafe { Box::from_raw(handle as *mut JniSession) });
    }
}

/// Maps to: RustBridge.setRoute(handle: Long, routeJson: String) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_setRoute(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    route_json: JString,
) -> jboolean {
    let result = read_string(&mut env, &route_json)
        .and_then(|json| Route::from_json(&json))
        .and_then(|route| Ok(session_mut(handle)?.set_route(route)));
    match result {
        Ok(changed) => jboolean::from(changed),
        Err(e) => {
            throw(&mut env, &e);
            jboolean::from(false)
        }
    }
}

/// Maps to: RustBridge.setIncidents(handle: Long, incidentsJson: String)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_setIncidents(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    incidents_json: JString,
) {
    let result = read_string(&mut env, &incidents_json).and_then(|json| {
        let incidents: Vec<Incident> = serde_json::from_str(&json)?;
        session_mut(handle)?.set_incidents(incidents);
        Ok(())
    });
    if let Err(e) = result {
        throw(&mut env, &e);
    }
}

/// Maps to: RustBridge.pushPosition(handle: Long, lat: Double, lon: Double, heading: Double)
///
/// Pass NaN as heading when the device reports none.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_pushPosition(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lon: jdouble,
    heading: jdouble,
) {
    with_session(&mut env, handle, (), |s| {
        s.push_position(position_sample(lat, lon, heading))
    });
}

/// Maps to: RustBridge.startNavigation(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_startNavigation(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    with_session(&mut env, handle, (), |s| s.start_navigation());
}

/// Maps to: RustBridge.stopNavigation(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_stopNavigation(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    with_session(&mut env, handle, (), |s| s.stop_navigation());
}

/// Maps to: RustBridge.startFollowing(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_startFollowing(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    with_session(&mut env, handle, (), |s| s.start_following());
}

/// Maps to: RustBridge.stopFollowing(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_stopFollowing(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    with_session(&mut env, handle, (), |s| s.stop_following());
}

/// Maps to: RustBridge.nextStep(handle: Long) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_nextStep(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    with_session(&mut env, handle, 0, |s| jboolean::from(s.go_to_next_step()))
}

/// Maps to: RustBridge.previousStep(handle: Long) -> Boolean
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_previousStep(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jboolean {
    with_session(&mut env, handle, 0, |s| jboolean::from(s.go_to_previous_step()))
}

/// Maps to: RustBridge.recalculationFailed(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_recalculationFailed(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    with_session(&mut env, handle, (), |s| s.recalculation_failed());
}

/// Runs the pending frame, if any, and returns
/// `{"smoothed": {...} | null, "events": [...]}`.
/// Maps to: RustBridge.onFrame(handle: Long, dtSeconds: Double) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_onFrame(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    dt_seconds: jdouble,
) -> jstring {
    let result = session_mut(handle).and_then(|s| run_frame(s, dt_seconds));
    to_jstring(&mut env, result)
}

/// Returns buffered events as a JSON array, e.g. after stopNavigation.
/// Maps to: RustBridge.drainEvents(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_drainEvents(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = session_mut(handle).and_then(drain_events);
    to_jstring(&mut env, result)
}

/// Maps to: RustBridge.smoothedPosition(handle: Long) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_navcore_app_RustBridge_smoothedPosition(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let result = session_mut(handle)
        .and_then(|s| Ok(serde_json::to_string(&s.smoothed())?));
    to_jstring(&mut env, result)
}
