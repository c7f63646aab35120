//! Shutters firmware — main entry point.
//!
//! Hexagonal architecture with a single-threaded cooperative event loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    NvsAdapter      WifiMonitor   MqttChannel  │
//! │  (Light+Motor)      (Flags+Config)  (link state)  (EventSink)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ShutterService (pure logic)                 │    │
//! │  │  recovery · FSM · persistence · reports                │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Scheduler (delegate-driven) · Event queue · Blinker           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::{Context, Result};
use log::{info, warn};

use shutters::adapters::hardware::HardwareAdapter;
use shutters::adapters::mqtt::MqttChannel;
use shutters::adapters::nvs::NvsAdapter;
use shutters::adapters::wifi::{LinkState, WifiMonitor};
use shutters::app::inbox::CommandInbox;
use shutters::app::ports::{ConfigPort, SchedulerDelegate};
use shutters::app::service::ShutterService;
use shutters::config::SystemConfig;
use shutters::drivers::hw_init;
use shutters::drivers::relay::RelayDriver;
use shutters::drivers::status_led::Blinker;
use shutters::events::{self, push_event, Event};
use shutters::scheduler::{Schedule, Scheduler};
use shutters::sensors::light::LightSensor;

// ── Scheduler delegate ────────────────────────────────────────
//
// Bridges the scheduler (which knows nothing about the event system)
// to the event queue.  The scheduler calls `on_schedule_fired`, and
// this impl translates the label into an event pushed onto the queue.

struct EventQueueDelegate;

impl SchedulerDelegate for EventQueueDelegate {
    fn on_schedule_fired(&mut self, label: &str) {
        let event = match label {
            "light-sample" => Event::LightSampleTick,
            "shutter-control" => Event::ControlTick,
            "command-inbox" => Event::CommandPoll,
            "link-monitor" => Event::LinkPoll,
            other => {
                warn!("unknown schedule label '{}'", other);
                return;
            }
        };
        push_event(event);
    }
}

/// Blink count per coarse device state (connecting = 1, setup = 2,
/// normal = 3).
fn blink_count_for(link: LinkState, provisioned: bool) -> u8 {
    if !provisioned {
        return 2;
    }
    match link {
        LinkState::Disconnected | LinkState::Connecting => 1,
        LinkState::Connected => 3,
    }
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init().context("logger init")?;

    info!("shutters v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals() {
        log::error!("HAL init failed: {}", e);
        return Err(shutters::error::Error::Init("peripheral init failed").into());
    }

    // ── 3. Storage + configuration ────────────────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(nvs) => nvs,
        Err(e) => {
            log::error!("NVS init failed: {}", e);
            return Err(shutters::error::Error::Config("NVS unavailable").into());
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Adapters ───────────────────────────────────────────
    let mut hw = HardwareAdapter::new(
        LightSensor::new(shutters::pins::LIGHT_ADC_GPIO),
        RelayDriver::new(),
    );
    let mut blinker = Blinker::new();
    let mut inbox = CommandInbox::new();
    let mut mqtt = MqttChannel::new();

    let mut wifi = WifiMonitor::new(&config);
    let provisioned = match nvs.load_wifi_credentials() {
        Some((ssid, password)) => {
            if let Err(e) = wifi.set_credentials(&ssid, &password) {
                warn!("stored credentials invalid ({}), entering setup", e);
                false
            } else {
                wifi.begin()
                    .map(|()| true)
                    .unwrap_or_else(|e| {
                        warn!("WiFi start failed: {}", e);
                        false
                    })
            }
        }
        None => {
            warn!("no WiFi credentials stored, entering setup");
            false
        }
    };

    // ── 5. Control core + startup recovery ────────────────────
    let mut service = ShutterService::new(config.clone());
    service
        .recover(&nvs, &mut mqtt)
        .context("startup recovery")?;

    // ── 6. Schedules (per-component cadence + startup stagger) ─
    let mut sched = Scheduler::new();
    let mut sched_delegate = EventQueueDelegate;
    sched.add(Schedule {
        label: "light-sample",
        interval_secs: config.light_sample_interval_ms / 1000,
        initial_delay_secs: 3,
        enabled: true,
    });
    sched.add(Schedule {
        label: "shutter-control",
        interval_secs: config.control_loop_interval_ms / 1000,
        initial_delay_secs: 5,
        enabled: true,
    });
    sched.add(Schedule {
        label: "command-inbox",
        interval_secs: 1,
        initial_delay_secs: 6,
        enabled: true,
    });
    sched.add(Schedule {
        label: "link-monitor",
        interval_secs: 1,
        initial_delay_secs: 1,
        enabled: true,
    });

    info!("System ready. Entering event loop.");

    // ── 7. Event loop ─────────────────────────────────────────
    //
    // Base tick is 100 ms: fine enough for the blinker, and the
    // scheduler scales every per-second schedule onto it.
    const BASE_TICK_MS: u64 = 100;
    loop {
        std::thread::sleep(std::time::Duration::from_millis(BASE_TICK_MS));
        sched.tick(BASE_TICK_MS as f32 / 1000.0, &mut sched_delegate);

        let mut tick_result: Result<(), shutters::error::Error> = Ok(());

        events::drain_events(|event| match event {
            Event::LightSampleTick => {
                let _ = hw.sample_light();
            }

            Event::ControlTick => {
                if tick_result.is_ok() {
                    tick_result = service.tick(&mut hw, &mut inbox, &mut nvs, &mut mqtt);
                }
            }

            Event::CommandPoll => {
                mqtt.poll(&mut inbox);
            }

            Event::LinkPoll => {
                wifi.poll();
                mqtt.set_link_up(wifi.is_connected());
            }
        });

        // Status blinker runs on the fine-grained base tick.
        blinker.set_blink_count(blink_count_for(wifi.state(), provisioned));
        blinker.tick();

        // A storage fault is unrecoverable here: propagate and let the
        // supervisor restart the device into the recovery path.
        tick_result.context("control tick")?;
    }
}
