//! Startup-recovery tests: every persisted-flag combination must produce
//! a deterministic (state, timer-armed) pair, and an interrupted travel
//! cycle must replay its full duration.

use crate::mock_hw::{MockFlagStore, MockHardware, RecordingSink, RelayCall};

use shutters::app::events::AppEvent;
use shutters::app::inbox::CommandInbox;
use shutters::app::service::ShutterService;
use shutters::config::SystemConfig;
use shutters::fsm::context::{MotionDirection, MotionTimer, ShutterPosition};
use shutters::fsm::StateId;

fn recovered_service(store: &MockFlagStore) -> (ShutterService, RecordingSink) {
    let mut service = ShutterService::new(SystemConfig::default());
    let mut sink = RecordingSink::new();
    service.recover(store, &mut sink).unwrap();
    (service, sink)
}

#[test]
fn recovery_matrix_is_deterministic() {
    // (down, in_progress) -> (state, position, timer armed?)
    let cases = [
        (false, false, StateId::Idle, ShutterPosition::Up, false),
        (true, false, StateId::Idle, ShutterPosition::Down, false),
        // Restarted mid-motion: position not yet flipped implies the
        // direction that was in flight.
        (false, true, StateId::Lowering, ShutterPosition::Up, true),
        (true, true, StateId::Raising, ShutterPosition::Down, true),
    ];

    for (down, in_progress, state, position, timer_armed) in cases {
        let store = MockFlagStore::with_flags(down, in_progress);
        let (service, sink) = recovered_service(&store);

        assert_eq!(service.state(), state, "flags ({down}, {in_progress})");
        assert_eq!(service.position(), position, "flags ({down}, {in_progress})");
        assert_eq!(
            service.motion().is_active(),
            timer_armed,
            "flags ({down}, {in_progress})"
        );
        assert_eq!(
            sink.events,
            vec![AppEvent::Started { state, position }],
            "flags ({down}, {in_progress})"
        );
    }
}

#[test]
fn fresh_store_means_idle_and_up() {
    let store = MockFlagStore::new();
    let (service, _) = recovered_service(&store);
    assert_eq!(service.state(), StateId::Idle);
    assert_eq!(service.position(), ShutterPosition::Up);
    assert_eq!(service.motion(), MotionTimer::None);
}

#[test]
fn interrupted_lowering_replays_full_duration() {
    // Persisted (position=up, in-progress=true): a lower was cut short.
    let mut store = MockFlagStore::with_flags(false, true);
    let (mut service, mut sink) = recovered_service(&store);
    let mut hw = MockHardware::new();
    let mut inbox = CommandInbox::new();

    assert_eq!(service.state(), StateId::Lowering);
    assert!(matches!(service.motion(), MotionTimer::LoweringSince(0)));

    // Full travel duration again — not a partial remainder.
    let travel_ticks = SystemConfig::default().travel_ticks();
    for _ in 0..travel_ticks {
        service.tick(&mut hw, &mut inbox, &mut store, &mut sink).unwrap();
    }
    assert_eq!(
        service.state(),
        StateId::Idle,
        "cycle must complete after exactly the full travel duration"
    );
    assert_eq!(service.position(), ShutterPosition::Down);
    assert_eq!(store.flag("down"), Some(true));
    assert_eq!(store.flag("in-progress"), Some(false));

    // The motor ran continuously until the completion tick.
    let driven = hw
        .calls
        .iter()
        .filter(|c| matches!(c, RelayCall::Drive(MotionDirection::Lower)))
        .count();
    assert_eq!(driven as u64, travel_ticks - 1);
}

#[test]
fn interrupted_raising_replays_full_duration() {
    let mut store = MockFlagStore::with_flags(true, true);
    let (mut service, mut sink) = recovered_service(&store);
    let mut hw = MockHardware::new();
    let mut inbox = CommandInbox::new();

    assert_eq!(service.state(), StateId::Raising);
    assert!(matches!(service.motion(), MotionTimer::RaisingSince(0)));

    let travel_ticks = SystemConfig::default().travel_ticks();
    for _ in 0..travel_ticks {
        service.tick(&mut hw, &mut inbox, &mut store, &mut sink).unwrap();
    }
    assert_eq!(service.state(), StateId::Idle);
    assert_eq!(service.position(), ShutterPosition::Up);
    assert_eq!(store.flag("down"), Some(false));
    assert_eq!(store.flag("in-progress"), Some(false));
}

#[test]
fn recovery_does_not_rewrite_unchanged_flags() {
    // Mid-motion restart: in-progress is already true in flash, so the
    // first motion tick must not write it again.
    let mut store = MockFlagStore::with_flags(false, true);
    let (mut service, mut sink) = recovered_service(&store);
    let mut hw = MockHardware::new();
    let mut inbox = CommandInbox::new();

    for _ in 0..3 {
        service.tick(&mut hw, &mut inbox, &mut store, &mut sink).unwrap();
    }
    assert!(
        store.writes.is_empty(),
        "no writes expected while flags match flash: {:?}",
        store.writes
    );
}
