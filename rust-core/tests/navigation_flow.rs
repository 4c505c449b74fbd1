use crossbeam::channel::{unbounded, Receiver, Sender};
use navcore::camera::CameraCommand;
use navcore::route::TrafficStatus;
use navcore::session::Mode;
use navcore::{
    Coordinate, ManualScheduler, NavConfig, NavEvent, NavigationSession, PositionSample, Route,
    RouteStep,
};

type Session = NavigationSession<ManualScheduler, Sender<NavEvent>>;

const DT: f64 = 1.0 / 60.0;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pt(lat: f64, lon: f64) -> Coordinate {
    Coordinate::new(lat, lon)
}

fn step(instruction: &str, at: Coordinate) -> RouteStep {
    RouteStep {
        instruction: instruction.into(),
        distance_meters: 222.0,
        duration_seconds: 30.0,
        maneuver_location: Some(at),
        detailed_path: Vec::new(),
        traffic_status: TrafficStatus::Normal,
    }
}

/// Due east along the equator, a left turn halfway.
fn east_route() -> Route {
    Route {
        total_distance_meters: 445.0,
        total_duration_seconds: 60.0,
        duration_in_traffic_seconds: None,
        polyline: vec![pt(0.0, 0.0), pt(0.0, 0.002), pt(0.0, 0.004)],
        steps: vec![
            step("Turn left", pt(0.0, 0.002)),
            step("Arrive", pt(0.0, 0.004)),
        ],
    }
}

fn new_session() -> (Session, Receiver<NavEvent>) {
    init_logging();
    let (tx, rx) = unbounded();
    let session = NavigationSession::new(&NavConfig::default(), ManualScheduler::default(), tx);
    (session, rx)
}

/// Deliver one fix and let a second of frames run.
fn drive_to(session: &mut Session, position: Coordinate) {
    session.push_position(PositionSample::new(position));
    for _ in 0..60 {
        if let Some(id) = session.pending_frame() {
            session.on_frame(id, DT);
        }
    }
}

fn count(events: &[NavEvent], pred: impl Fn(&NavEvent) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

#[test]
fn drives_a_route_to_arrival() {
    let (mut session, rx) = new_session();
    session.set_route(east_route());
    session.start_navigation();

    for i in 0..=40 {
        drive_to(&mut session, pt(0.0, i as f64 * 0.0001));
    }
    for _ in 0..3 {
        drive_to(&mut session, pt(0.0, 0.004));
    }

    let events: Vec<NavEvent> = rx.try_iter().collect();

    assert_eq!(count(&events, |e| matches!(e, NavEvent::Approaching { step_index: 0, .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, NavEvent::StepComplete { step_index: 0, .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, NavEvent::Approaching { step_index: 1, .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, NavEvent::Arrived { step_index: 1 })), 1);
    assert_eq!(count(&events, |e| matches!(e, NavEvent::RecalculateRequested)), 0);
    assert_eq!(session.tracker().current_step_index(), 1);

    // The approach announcement precedes the step change
    let approach = events
        .iter()
        .position(|e| matches!(e, NavEvent::Approaching { step_index: 0, .. }))
        .unwrap();
    let complete = events
        .iter()
        .position(|e| matches!(e, NavEvent::StepComplete { step_index: 0, .. }))
        .unwrap();
    assert!(approach < complete);

    // Heading follows the road east
    let heading = session.smoothed().unwrap().heading;
    assert!(heading.is_none() || (heading.unwrap() - 90.0).abs() < 5.0, "{heading:?}");
}

#[test]
fn leaving_the_route_requests_one_recalculation() {
    let (mut session, rx) = new_session();
    session.set_route(east_route());
    session.start_navigation();

    drive_to(&mut session, pt(0.0, 0.0005));
    // ~222 m north of the road
    for _ in 0..6 {
        drive_to(&mut session, pt(0.002, 0.001));
    }

    let events: Vec<NavEvent> = rx.try_iter().collect();
    assert_eq!(count(&events, |e| matches!(e, NavEvent::OffRoute { .. })), 1);
    assert_eq!(count(&events, |e| matches!(e, NavEvent::RecalculateRequested)), 1);
    assert!(session.monitor().is_recalculating());

    // The router answers with a route from the current position
    let mut rerouted = east_route();
    rerouted.polyline.insert(0, pt(0.002, 0.001));
    rerouted.polyline.insert(1, pt(0.0, 0.001));
    assert!(session.set_route(rerouted));
    assert!(!session.monitor().is_recalculating());
    assert!(!session.monitor().is_off_route());

    let events: Vec<NavEvent> = rx.try_iter().collect();
    assert!(matches!(
        events[..],
        [NavEvent::Camera { command: CameraCommand::Snap { .. } }]
    ));

    // Back on the new route: no further requests
    for _ in 0..4 {
        drive_to(&mut session, pt(0.002, 0.001));
    }
    let events: Vec<NavEvent> = rx.try_iter().collect();
    assert_eq!(count(&events, |e| matches!(e, NavEvent::RecalculateRequested)), 0);
}

#[test]
fn stopping_halts_everything() {
    let (mut session, rx) = new_session();
    session.set_route(east_route());
    session.start_navigation();
    drive_to(&mut session, pt(0.0, 0.0005));
    let stale = session.pending_frame().unwrap();

    session.stop_navigation();
    assert_eq!(session.mode(), Mode::Idle);
    assert!(session.pending_frame().is_none());
    assert!(session.scheduler().pending().is_none());
    assert_eq!(session.monitor().consecutive_off_samples(), 0);

    let before: Vec<NavEvent> = rx.try_iter().collect();
    assert!(matches!(
        before.last(),
        Some(NavEvent::Camera { command: CameraCommand::Reset { .. } })
    ));

    session.push_position(PositionSample::new(pt(0.0, 0.002)));
    assert!(session.on_frame(stale, DT).is_none());
    assert!(rx.try_iter().next().is_none());
}

#[test]
fn manual_step_override() {
    let (mut session, rx) = new_session();
    session.set_route(east_route());
    session.start_navigation();

    assert!(session.go_to_next_step());
    assert!(!session.go_to_next_step());
    assert!(session.go_to_previous_step());
    assert!(!session.go_to_previous_step());

    // The first step was re-armed by going back
    drive_to(&mut session, pt(0.0, 0.002));
    let events: Vec<NavEvent> = rx.try_iter().collect();
    assert_eq!(count(&events, |e| matches!(e, NavEvent::StepComplete { step_index: 0, .. })), 1);
}
