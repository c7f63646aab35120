//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements          | Connects to                |
//! |------------|---------------------|----------------------------|
//! | `hardware` | LightPort           | ESP32 ADC (KY-018)         |
//! |            | MotorPort           | ESP32 GPIO (relay pair)    |
//! | `nvs`      | FlagStore           | NVS / in-memory store      |
//! |            | ConfigPort          |                            |
//! | `wifi`     | —                   | ESP-IDF WiFi STA           |
//! | `mqtt`     | EventSink           | MQTT command/status topics |

pub mod hardware;
pub mod mqtt;
pub mod nvs;
pub mod wifi;
