//! Command handling, publication and telemetry through the board service.

use pdu::adapters::console::{ConsoleCommand, parse_line};
use pdu::app::commands::{AppCommand, ChannelCommand, OverrideAction};
use pdu::app::events::AppEvent;
use pdu::app::service::BoardService;
use pdu::config::SystemConfig;
use pdu::drivers::fan::PhaseControlFan;
use pdu::error::{CommandError, Error};
use pdu::model::{ChannelKind, OutputIndex};

use crate::mock_hw::{
    IsrState, MockDelay, MockHardware, MockPin, RecordingSink, TestService, started_service,
};

fn y(n: u8) -> OutputIndex {
    OutputIndex::new(ChannelKind::Y, n).unwrap()
}

fn x(n: u8) -> OutputIndex {
    OutputIndex::new(ChannelKind::X, n).unwrap()
}

fn cmd(kind: ChannelKind, number: u8, on: bool) -> ChannelCommand {
    ChannelCommand { kind, number, on }
}

/// Lock module 0 via an override and one thermal tick.
fn lock_module_0(svc: &mut TestService<'_>, hw: &mut MockHardware, sink: &mut RecordingSink) {
    svc.request_override(0, OverrideAction::Set(80.0)).unwrap();
    svc.poll(2000, 2_000_000, hw, sink);
    assert!(svc.modules()[0].is_locked());
}

#[test]
fn start_announces_and_idles_fan() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    assert!(matches!(sink.events.first(), Some(AppEvent::Started)));
    assert_eq!(svc.fan_speed_pct(), 0);
    assert_eq!(svc.outputs().bits(), 0);
}

#[test]
fn invalid_config_is_rejected_at_construction() {
    let isr = IsrState::new();
    let config = SystemConfig {
        fan_lvl1_out_c: 40.0,
        ..SystemConfig::default()
    };
    let fan = PhaseControlFan::new(MockPin::default(), MockDelay::default(), 100);
    let res = BoardService::new(config, isr.shared(), fan, 0);
    assert!(matches!(res, Err(Error::Config(_))));
}

#[test]
fn switch_command_drives_hardware_and_table() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    svc.handle_command(cmd(ChannelKind::Y, 5, true), &mut hw, &mut sink)
        .unwrap();
    svc.handle_command(cmd(ChannelKind::X, 10, true), &mut hw, &mut sink)
        .unwrap();

    assert!(hw.is_on(y(5)));
    assert!(hw.is_on(x(10)));
    assert!(svc.outputs().is_on(y(5)));
    assert_eq!(svc.outputs().bits(), (1 << 5) | (1 << 26));

    assert_eq!(
        svc.handle_command(cmd(ChannelKind::Y, 16, true), &mut hw, &mut sink),
        Err(CommandError::InvalidChannel)
    );
}

#[test]
fn on_for_locked_module_is_refused_with_notification() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    lock_module_0(&mut svc, &mut hw, &mut sink);
    let writes_before = hw.writes.len();

    assert_eq!(
        svc.handle_command(cmd(ChannelKind::Y, 2, true), &mut hw, &mut sink),
        Err(CommandError::ModuleLocked { module: 0 })
    );
    assert!(!hw.is_on(y(2)));
    assert_eq!(hw.writes.len(), writes_before);
    assert!(sink.notifications().contains(&"Command rejected"));
}

#[test]
fn off_is_always_honoured() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    lock_module_0(&mut svc, &mut hw, &mut sink);
    svc.handle_command(cmd(ChannelKind::Y, 1, false), &mut hw, &mut sink)
        .unwrap();
    assert_eq!(hw.writes.last(), Some(&(y(1), false)));
}

#[test]
fn x_channels_ignore_module_lockout() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    svc.handle_command(cmd(ChannelKind::X, 0, true), &mut hw, &mut sink)
        .unwrap();
    lock_module_0(&mut svc, &mut hw, &mut sink);

    assert!(hw.is_on(x(0)));
    svc.handle_command(cmd(ChannelKind::X, 1, true), &mut hw, &mut sink)
        .unwrap();
    assert!(hw.is_on(x(1)));
}

#[test]
fn dirty_outputs_drain_one_at_a_time_in_index_order() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    svc.handle_command(cmd(ChannelKind::X, 3, true), &mut hw, &mut sink)
        .unwrap();
    svc.handle_command(cmd(ChannelKind::Y, 7, true), &mut hw, &mut sink)
        .unwrap();
    svc.handle_command(cmd(ChannelKind::Y, 7, false), &mut hw, &mut sink)
        .unwrap();

    assert_eq!(svc.next_dirty_output(), Some((y(7), false)));
    assert_eq!(svc.next_dirty_output(), Some((x(3), true)));
    assert_eq!(svc.next_dirty_output(), None);
}

#[test]
fn telemetry_on_interval_reflects_state() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    svc.handle_command(cmd(ChannelKind::Y, 0, true), &mut hw, &mut sink)
        .unwrap();
    svc.poll(29_999, 29_999_000, &mut hw, &mut sink);
    assert_eq!(sink.telemetry_count(), 0);
    svc.poll(30_000, 30_000_000, &mut hw, &mut sink);
    assert_eq!(sink.telemetry_count(), 1);

    let Some(AppEvent::Telemetry(t)) = sink.events.last() else {
        panic!("expected telemetry");
    };
    assert_eq!(t.uptime_ms, 30_000);
    assert_eq!(t.outputs, 1);
    assert!(t.modules.iter().all(|m| !m.locked && !m.overridden));
    assert!(t.modules[0].temperature_c.is_some());

    let json = serde_json::to_string(t).unwrap();
    assert!(json.contains("\"fan_level\""));
}

#[test]
fn output_walk_skips_locked_module_and_restores_state() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    svc.handle_command(cmd(ChannelKind::Y, 12, true), &mut hw, &mut sink)
        .unwrap();
    lock_module_0(&mut svc, &mut hw, &mut sink);
    hw.writes.clear();

    let mut delay = MockDelay::default();
    let pulsed = svc.run_output_walk(&mut hw, &mut delay, 20);

    assert_eq!(pulsed, 28);
    assert!(hw.writes.iter().all(|(idx, _)| idx.module() != Some(0)));
    assert!(hw.is_on(y(12)));
    assert!(!hw.is_on(y(13)));
    assert_eq!(delay.total_ns, 28 * 20 * 1_000_000);
}

#[test]
fn console_lines_dispatch_into_the_service() {
    let isr = IsrState::new();
    let mut hw = MockHardware::new();
    let mut sink = RecordingSink::new();
    let mut svc = started_service(&isr, SystemConfig::default(), &mut hw, &mut sink);

    for line in ["Y3 ON", "x15 1", "T1 77"] {
        let Ok(ConsoleCommand::App(c)) = parse_line(line) else {
            panic!("{line} should parse to a service command");
        };
        svc.dispatch(c, &mut hw, &mut sink).unwrap();
    }
    assert!(hw.is_on(y(3)));
    assert!(hw.is_on(x(15)));

    svc.poll(2000, 2_000_000, &mut hw, &mut sink);
    assert!(svc.modules()[1].is_locked());

    assert_eq!(
        svc.dispatch(
            AppCommand::SetChannel(cmd(ChannelKind::Y, 4, true)),
            &mut hw,
            &mut sink
        ),
        Err(CommandError::ModuleLocked { module: 1 })
    );
}
