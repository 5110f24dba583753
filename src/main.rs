//! Power-distribution board firmware: main entry point.
//!
//! Hexagonal architecture around a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   Console     UptimeClock   │
//! │  (AdcPort+OutputPort) (EventSink)    (commands)  (clock)       │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            BoardService (pure logic)                   │    │
//! │  │  RMS · Energy · Thermal FSM · Fan                      │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  esp_timer sampler (4 kHz) · zero-cross ISR · ADC arbiter      │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use log::{info, warn};

use pdu::adapters::console::{self, CONSOLE_CHANNEL, ConsoleCommand};
use pdu::adapters::hardware::{GpioLine, HardwareAdapter};
use pdu::adapters::log_sink::LogEventSink;
use pdu::adapters::time::UptimeClock;
use pdu::app::events::AppEvent;
use pdu::app::ports::EventSink;
use pdu::app::service::BoardService;
use pdu::config::SystemConfig;
use pdu::diagnostics;
use pdu::drivers::fan::PhaseControlFan;
use pdu::drivers::task_pin::{self, Core};
use pdu::drivers::{hw_init, hw_timer, watchdog::Watchdog};
use pdu::error::Error;
use pdu::{isr, pins};

const CONSOLE_STACK_KB: usize = 4;
const CONSOLE_PRIORITY: u8 = 2;

// ── Console reader ────────────────────────────────────────────
//
// Blocking stdin reads live on their own task on CPU1; parsed commands
// reach the control loop through CONSOLE_CHANNEL, which it drains without
// blocking.

fn spawn_console() -> Result<()> {
    task_pin::spawn_on_core(Core::App, CONSOLE_PRIORITY, CONSOLE_STACK_KB, "console\0", || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { continue };
            console::submit_line(&CONSOLE_CHANNEL, &line);
        }
    })?;
    Ok(())
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PDU-16 v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();

    // ── 3. Peripherals ────────────────────────────────────────
    hw_init::init_peripherals().map_err(Error::from)?;
    hw_timer::create_sampler_timer()
        .map_err(|code| anyhow::anyhow!("sampler timer create failed: {code}"))?;
    hw_init::init_isr_service().map_err(Error::from)?;

    // ── 4. Adapters ───────────────────────────────────────────
    let time = UptimeClock::new();
    let mut hw = HardwareAdapter::new();
    let mut log_sink = LogEventSink::new();
    let mut delay = Ets;
    let fan = PhaseControlFan::new(GpioLine::new(pins::FAN_GATE_GPIO), Ets, config.gate_pulse_us);

    // ── 5. Board service ──────────────────────────────────────
    let sampler_period_us = config.sampler_period_us;
    let mut app = BoardService::new(config, isr::shared(), fan, time.uptime_ms())?;

    // Offsets are measured with every output off and before the sampler
    // starts touching the ADC.
    app.calibrate(&mut hw, &mut delay);
    app.start(&mut log_sink);
    isr::ADC_ARBITER.gate().start(sampler_period_us);
    info!("Sampler running every {sampler_period_us} us");

    let mut watchdog = Watchdog::default();
    spawn_console()?;

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        let now_us = time.uptime_us();
        let now_ms = time.uptime_ms();

        app.poll(now_ms, now_us, &mut hw, &mut log_sink);

        while let Ok(cmd) = CONSOLE_CHANNEL.try_receive() {
            match cmd {
                ConsoleCommand::App(c) => {
                    if let Err(e) = app.dispatch(c, &mut hw, &mut log_sink) {
                        warn!("command refused: {e}");
                    }
                }
                ConsoleCommand::Capture { channel } => {
                    match app.capture_raw(
                        &mut hw,
                        &mut delay,
                        usize::from(channel),
                        diagnostics::MAX_CAPTURE_SAMPLES,
                    ) {
                        Ok(cap) => info!(
                            "CAP Y{}: offset={} min={} max={} mean={:.1} p-p={}",
                            cap.channel,
                            cap.offset,
                            cap.min,
                            cap.max,
                            cap.mean,
                            cap.peak_to_peak()
                        ),
                        Err(e) => warn!("capture Y{channel}: {e}"),
                    }
                    watchdog.feed(time.uptime_ms());
                }
                ConsoleCommand::Walk => {
                    app.run_output_walk(&mut hw, &mut delay, diagnostics::WALK_DWELL_MS);
                    watchdog.feed(time.uptime_ms());
                }
                ConsoleCommand::Status => {
                    log_sink.emit(&AppEvent::Telemetry(app.build_telemetry(now_ms)));
                }
            }
        }

        // One changed output per pass keeps the publisher off the
        // sampler's back.
        if let Some((idx, on)) = app.next_dirty_output() {
            info!("OUT   | {idx}={}", if on { "ON" } else { "OFF" });
        }

        watchdog.feed(time.uptime_ms());
        FreeRtos::delay_ms(1);
    }
}
