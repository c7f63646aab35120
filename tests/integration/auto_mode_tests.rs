//! Auto light-sensing behaviour through the full service stack.

use crate::mock_hw::{MockFlagStore, MockHardware, RecordingSink};

use shutters::app::inbox::CommandInbox;
use shutters::app::service::ShutterService;
use shutters::config::SystemConfig;
use shutters::fsm::context::ShutterPosition;
use shutters::fsm::StateId;

struct Rig {
    service: ShutterService,
    hw: MockHardware,
    inbox: CommandInbox,
    store: MockFlagStore,
    sink: RecordingSink,
}

impl Rig {
    fn with_position(down: bool) -> Self {
        let store = MockFlagStore::with_flags(down, false);
        let mut service = ShutterService::new(SystemConfig::default());
        let mut sink = RecordingSink::new();
        service.recover(&store, &mut sink).unwrap();
        Self {
            service,
            hw: MockHardware::new(),
            inbox: CommandInbox::new(),
            store,
            sink,
        }
    }

    fn tick_with_lux(&mut self, lux: u16) {
        self.hw.set_lux(lux);
        self.service
            .tick(&mut self.hw, &mut self.inbox, &mut self.store, &mut self.sink)
            .unwrap();
    }
}

#[test]
fn five_dark_samples_trigger_lowering() {
    let mut rig = Rig::with_position(false);
    rig.inbox.accept("enable-auto");

    for _ in 0..4 {
        rig.tick_with_lux(60);
        assert_eq!(rig.service.state(), StateId::Idle);
    }
    rig.tick_with_lux(60);
    assert_eq!(rig.service.state(), StateId::Lowering);
}

#[test]
fn five_bright_samples_raise_a_lowered_shutter() {
    let mut rig = Rig::with_position(true);
    rig.inbox.accept("enable-auto");

    for _ in 0..5 {
        rig.tick_with_lux(450);
    }
    assert_eq!(rig.service.state(), StateId::Raising);
}

#[test]
fn streak_reset_law_no_hidden_carry_over() {
    // 4 dark, 1 bright, 4 dark: must NOT trigger lowering.
    let mut rig = Rig::with_position(false);
    rig.inbox.accept("enable-auto");

    for _ in 0..4 {
        rig.tick_with_lux(60);
    }
    rig.tick_with_lux(300);
    for _ in 0..4 {
        rig.tick_with_lux(60);
    }
    assert_eq!(rig.service.state(), StateId::Idle);
    assert_eq!(rig.service.streak_len(), 4);
}

#[test]
fn command_precedence_beats_mid_streak_and_clears_it() {
    let mut rig = Rig::with_position(false);
    rig.inbox.accept("enable-auto");

    // Mid-way toward an auto lower...
    for _ in 0..3 {
        rig.tick_with_lux(60);
    }
    assert_eq!(rig.service.streak_len(), 3);

    // ...a raise command wins and clears the streak context.
    rig.inbox.accept("raise");
    rig.tick_with_lux(60);
    assert_eq!(rig.service.state(), StateId::Raising);
    assert_eq!(rig.service.streak_len(), 0);
}

#[test]
fn disable_auto_freezes_light_reaction() {
    let mut rig = Rig::with_position(false);
    rig.inbox.accept("enable-auto");
    rig.inbox.accept("disable-auto");

    for _ in 0..20 {
        rig.tick_with_lux(10);
    }
    assert_eq!(rig.service.state(), StateId::Idle);
    assert_eq!(rig.service.streak_len(), 0);
}

#[test]
fn auto_cycle_completes_and_reports_down() {
    let mut rig = Rig::with_position(false);
    rig.inbox.accept("enable-auto");

    let travel_ticks = SystemConfig::default().travel_ticks();
    for _ in 0..5 {
        rig.tick_with_lux(60);
    }
    for _ in 0..travel_ticks {
        rig.tick_with_lux(60);
    }

    assert_eq!(rig.service.state(), StateId::Idle);
    assert_eq!(rig.service.position(), ShutterPosition::Down);
    assert_eq!(rig.store.flag("down"), Some(true));

    // While down in the dark, no new streak builds toward anything.
    for _ in 0..10 {
        rig.tick_with_lux(60);
    }
    assert_eq!(rig.service.state(), StateId::Idle);
    assert_eq!(rig.service.streak_len(), 0);
}
