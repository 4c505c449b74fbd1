//! Navigation camera state machine.
//!
//! ```text
//! Inactive --activate--> Active      emits Snap once
//! Active   --new route-> Active      emits Snap once per route version
//! Active   --deactivate-> Inactive   emits Reset once
//! ```
//!
//! The machine only produces commands; applying them is the map's job.

use serde::Serialize;

use crate::route::RouteVersion;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum CameraCommand {
    /// Jump to the navigation view.
    Snap {
        zoom: f64,
        tilt: f64,
        heading: Option<f64>,
    },
    /// Return to the neutral overview.
    Reset { tilt: f64, heading: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CameraState {
    Inactive,
    Active { route: Option<RouteVersion> },
}

#[derive(Debug, Clone)]
pub struct CameraController {
    zoom: f64,
    tilt: f64,
    state: CameraState,
}

impl CameraController {
    pub fn new(zoom: f64, tilt: f64) -> Self {
        Self {
            zoom,
            tilt,
            state: CameraState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CameraState::Active { .. })
    }

    fn snap(&self, heading: Option<f64>) -> CameraCommand {
        CameraCommand::Snap {
            zoom: self.zoom,
            tilt: self.tilt,
            heading,
        }
    }

    /// Enter navigation view. Returns None if already active.
    pub fn activate(
        &mut self,
        route: Option<RouteVersion>,
        heading: Option<f64>,
    ) -> Option<CameraCommand> {
        match self.state {
            CameraState::Active { .. } => None,
            CameraState::Inactive => {
                self.state = CameraState::Active { route };
                Some(self.snap(heading))
            }
        }
    }

    /// A route was accepted. Re-snaps once if active and the version is new.
    pub fn route_changed(
        &mut self,
        route: RouteVersion,
        heading: Option<f64>,
    ) -> Option<CameraCommand> {
        match self.state {
            CameraState::Active { route: Some(current) } if current == route => None,
            CameraState::Active { .. } => {
                self.state = CameraState::Active { route: Some(route) };
                Some(self.snap(heading))
            }
            CameraState::Inactive => None,
        }
    }

    /// Leave navigation view. Returns None if already inactive.
    pub fn deactivate(&mut self) -> Option<CameraCommand> {
        match self.state {
            CameraState::Inactive => None,
            CameraState::Active { .. } => {
                self.state = CameraState::Inactive;
                Some(CameraCommand::Reset {
                    tilt: 0.0,
                    heading: 0.0,
                })
            }
        }
    }
}
