//! Navigation tracking core: geometry, turn-by-turn progress, off-route
//! detection, and render-rate position smoothing for the mobile app.

pub mod alerts;
pub mod android_jni;
pub mod camera;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod geo;
pub mod keep_awake;
pub mod off_route;
pub mod progress;
pub mod route;
pub mod session;
pub mod smoother;

pub use config::NavConfig;
pub use error::{NavError, Result};
pub use events::{EventSink, NavEvent};
pub use geo::Coordinate;
pub use route::{PositionSample, Route, RouteStep, RouteVersion};
pub use session::{FrameScheduler, ManualScheduler, NavigationSession};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
