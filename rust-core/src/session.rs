//! Navigation session: wires the smoother, progress tracker, off-route
//! monitor, camera, and alerts to a frame loop and an event sink.
//!
//! Everything runs on one logical thread. Each frame smooths first and
//! only then evaluates progress on the freshly smoothed position, so
//! evaluation never sees a stale position. Progress and alerts follow
//! every smoothed update; the off-route monitor runs once per raw fix,
//! keeping its debounce counted in fixes rather than frames.

use log::{debug, info, warn};

use crate::alerts::{DestinationWatcher, Incident, IncidentWatcher};
use crate::camera::CameraController;
use crate::config::NavConfig;
use crate::events::{EventSink, NavEvent};
use crate::format::{format_distance, format_duration};
use crate::geo::Coordinate;
use crate::keep_awake::{KeepAwake, WakeLock};
use crate::off_route::OffRouteMonitor;
use crate::progress::{ProgressThresholds, RouteProgressTracker};
use crate::route::{PositionSample, Route, RouteVersion};
use crate::smoother::{PositionSmoother, SmoothedPosition, SmootherConfig};

pub type FrameId = u64;

/// The platform render loop (requestAnimationFrame / Choreographer).
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

/// Scheduler for hosts that pump frames themselves: it only remembers
/// which frame is pending.
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    next_id: FrameId,
    pending: Option<FrameId>,
}

impl ManualScheduler {
    pub fn pending(&self) -> Option<FrameId> {
        self.pending
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) -> FrameId {
        self.next_id += 1;
        self.pending = Some(self.next_id);
        self.next_id
    }

    fn cancel_frame(&mut self, id: FrameId) {
        if self.pending == Some(id) {
            self.pending = None;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No frame loop running.
    Idle,
    /// Smoothing for map follow, no route tracking.
    Following,
    Navigating,
}

pub struct NavigationSession<S: FrameScheduler, K: EventSink> {
    scheduler: S,
    sink: K,
    mode: Mode,
    pending_frame: Option<FrameId>,
    sample_pending: bool,
    /// Return to map follow when navigation stops.
    follow_after_navigation: bool,
    route: Option<Route>,
    /// `route.tracking_path()`, kept for per-frame use.
    path: Vec<Coordinate>,
    route_version: Option<RouteVersion>,
    incidents: Vec<Incident>,
    smoother: PositionSmoother,
    tracker: RouteProgressTracker,
    monitor: OffRouteMonitor,
    camera: CameraController,
    incident_watcher: IncidentWatcher,
    destination_watcher: DestinationWatcher,
    keep_awake: Option<KeepAwake<Box<dyn WakeLock>>>,
}

impl<S: FrameScheduler, K: EventSink> NavigationSession<S, K> {
    pub fn new(config: &NavConfig, scheduler: S, sink: K) -> Self {
        Self {
            scheduler,
            sink,
            mode: Mode::Idle,
            pending_frame: None,
            sample_pending: false,
            follow_after_navigation: false,
            route: None,
            path: Vec::new(),
            route_version: None,
            incidents: Vec::new(),
            smoother: PositionSmoother::new(SmootherConfig::from(config)),
            tracker: RouteProgressTracker::new(ProgressThresholds::from(config)),
            monitor: OffRouteMonitor::from_config(config),
            camera: CameraController::new(config.camera_zoom, config.camera_tilt),
            incident_watcher: IncidentWatcher::from_config(config),
            destination_watcher: DestinationWatcher::from_config(config),
            keep_awake: None,
        }
    }

    /// Keep the device awake while navigating.
    pub fn with_wake_lock(mut self, lock: impl WakeLock + 'static) -> Self {
        let lock: Box<dyn WakeLock> = Box::new(lock);
        self.keep_awake = Some(KeepAwake::new(lock));
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn route_version(&self) -> Option<RouteVersion> {
        self.route_version
    }

    pub fn tracker(&self) -> &RouteProgressTracker {
        &self.tracker
    }

    pub fn monitor(&self) -> &OffRouteMonitor {
        &self.monitor
    }

    pub fn smoothed(&self) -> Option<SmoothedPosition> {
        self.smoother.current()
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.pending_frame
    }

    pub fn is_keeping_awake(&self) -> bool {
        self.keep_awake.as_ref().is_some_and(KeepAwake::is_held)
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    /// Accept a route from the routing service.
    ///
    /// Returns true if its content differs from the current route, in which
    /// case all progress and off-route state restarts from scratch.
    pub fn set_route(&mut self, route: Route) -> bool {
        let version = route.version();
        if self.route_version == Some(version) {
            debug!("Route unchanged, keeping progress");
            self.route = Some(route);
            return false;
        }

        info!(
            "New route: {}, {}, {} steps",
            format_distance(route.total_distance_meters),
            format_duration(route.duration_in_traffic_seconds.unwrap_or(route.total_duration_seconds)),
            route.steps.len()
        );
        let path = route.tracking_path().into_owned();
        if !route.has_trackable_steps() || path.len() < 2 {
            warn!("Route is degenerate, tracking is suspended until a usable route arrives");
        }

        self.tracker.reset_for(&route);
        self.monitor.reset_for(&route);
        self.destination_watcher.reset();
        self.smoother.reset_heading();
        self.route_version = Some(version);
        self.route = Some(route);
        self.path = path;

        let heading = self.smoothed().and_then(|s| s.heading);
        if let Some(command) = self.camera.route_changed(version, heading) {
            self.sink.emit(NavEvent::Camera { command });
        }
        true
    }

    pub fn clear_route(&mut self) {
        self.route = None;
        self.route_version = None;
        self.path.clear();
        self.tracker.reset();
        if self.monitor.is_active() {
            self.monitor.set_active(false);
            self.monitor.set_active(true);
        }
        self.destination_watcher.reset();
    }

    pub fn set_incidents(&mut self, incidents: Vec<Incident>) {
        self.incidents = incidents;
    }

    /// Record a raw fix. Invalid fixes are dropped; nothing here can fail.
    pub fn push_position(&mut self, sample: PositionSample) {
        if self.smoother.push_sample(sample) {
            self.sample_pending = true;
        }
    }

    /// The host could not deliver the requested route.
    pub fn recalculation_failed(&mut self) {
        self.monitor.recalculation_failed();
    }

    pub fn start_following(&mut self) {
        if self.mode == Mode::Idle {
            self.mode = Mode::Following;
            self.ensure_frame();
        }
    }

    pub fn stop_following(&mut self) {
        match self.mode {
            Mode::Following => {
                self.mode = Mode::Idle;
                self.cancel_frame();
            }
            Mode::Navigating => self.follow_after_navigation = false,
            Mode::Idle => {}
        }
    }

    pub fn start_navigation(&mut self) {
        if self.mode == Mode::Navigating {
            return;
        }
        info!("Navigation started");
        self.follow_after_navigation = self.mode == Mode::Following;
        self.mode = Mode::Navigating;
        self.monitor.set_active(true);
        if let Some(route) = &self.route {
            self.tracker.reset_for(route);
            self.monitor.reset_for(route);
        }
        if let Some(guard) = &mut self.keep_awake {
            guard.hold();
        }

        let heading = self.smoothed().and_then(|s| s.heading);
        if let Some(command) = self.camera.activate(self.route_version, heading) {
            self.sink.emit(NavEvent::Camera { command });
        }
        self.ensure_frame();
    }

    /// Leave navigation mode. The pending frame is cancelled before this
    /// returns, so no navigation smoothing or event can follow. A session
    /// that was following the map before navigation resumes following on
    /// a freshly requested frame.
    pub fn stop_navigation(&mut self) {
        if self.mode != Mode::Navigating {
            return;
        }
        info!("Navigation stopped");
        self.cancel_frame();
        self.sample_pending = false;
        self.mode = if std::mem::take(&mut self.follow_after_navigation) {
            Mode::Following
        } else {
            Mode::Idle
        };

        self.monitor.set_active(false);
        self.tracker.reset();
        self.incident_watcher.reset();
        self.destination_watcher.reset();
        self.smoother.reset_heading();
        if let Some(guard) = &mut self.keep_awake {
            guard.release();
        }

        if let Some(command) = self.camera.deactivate() {
            self.sink.emit(NavEvent::Camera { command });
        }
        if self.mode == Mode::Following {
            self.ensure_frame();
        }
    }

    pub fn go_to_next_step(&mut self) -> bool {
        self.tracker.go_to_next_step()
    }

    pub fn go_to_previous_step(&mut self) -> bool {
        self.tracker.go_to_previous_step()
    }

    fn ensure_frame(&mut self) {
        if self.pending_frame.is_none() {
            self.pending_frame = Some(self.scheduler.request_frame());
        }
    }

    fn cancel_frame(&mut self) {
        if let Some(id) = self.pending_frame.take() {
            self.scheduler.cancel_frame(id);
        }
    }

    /// Run one render frame. Frames other than the pending one are ignored.
    pub fn on_frame(&mut self, id: FrameId, dt_s: f64) -> Option<SmoothedPosition> {
        if self.pending_frame != Some(id) {
            debug!("Ignoring stale frame {id}");
            return None;
        }
        self.pending_frame = None;

        let navigating = self.mode == Mode::Navigating;
        let path = (navigating && self.path.len() >= 2).then_some(self.path.as_slice());
        let emitted = self.smoother.tick(dt_s, path);

        let new_fix = std::mem::take(&mut self.sample_pending);
        if navigating && (new_fix || emitted.is_some()) {
            if let Some(smoothed) = self.smoother.current() {
                self.evaluate(smoothed.position, new_fix);
            }
        }

        self.ensure_frame();
        emitted
    }

    /// Progress and alerts are idempotent and run on every smoothed update.
    /// The off-route monitor counts raw fixes, so it only runs on `new_fix`.
    fn evaluate(&mut self, position: Coordinate, new_fix: bool) {
        if let Some(route) = &self.route {
            self.tracker.update(route, position, &mut self.sink);
        }
        if new_fix {
            self.monitor.update(self.route.as_ref(), Some(position), &mut self.sink);
        }
        self.incident_watcher.check(position, &self.incidents, &mut self.sink);

        let destination = self.route.as_ref().and_then(Route::destination);
        self.destination_watcher.check(position, destination, &mut self.sink);
    }
}

impl<S: FrameScheduler, K: EventSink> Drop for NavigationSession<S, K> {
    fn drop(&mut self) {
        self.cancel_frame();
    }
}
