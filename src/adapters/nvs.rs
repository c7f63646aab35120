//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`FlagStore`] and [`ConfigPort`] for the shutter
//! controller.
//!
//! The namespace is opened, the single operation performed, and the
//! handle closed again on every call — storage is never held across a
//! control tick.  Flag writes commit before returning, so a value is
//! durable once `put_bool` succeeds.  ESP-IDF NVS commits are atomic
//! per `nvs_commit()`; the in-memory simulation achieves this trivially.

use crate::app::ports::{ConfigError, ConfigPort, FlagStore, StorageError};
use crate::config::SystemConfig;
use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// Namespace for the two persisted shutter flags.
const SHUTTER_NAMESPACE: &str = "shutters";
/// Namespace and key for the config blob.
const CONFIG_NAMESPACE: &str = "config";
const CONFIG_KEY: &str = "syscfg";
/// Namespace for WiFi credentials.
const CRED_NAMESPACE: &str = "storage";

#[allow(dead_code)]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                let ret2 = unsafe { nvs_flash_erase() };
                if ret2 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                let ret3 = unsafe { nvs_flash_init() };
                if ret3 != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_buf(key: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let kb = key.as_bytes();
        let kl = kb.len().min(15);
        buf[..kl].copy_from_slice(&kb[..kl]);
        buf
    }

    /// Read the WiFi credentials stored at provisioning time.
    /// Returns `None` when either value is absent or empty.
    pub fn load_wifi_credentials(&self) -> Option<(String, String)> {
        let ssid = self.get_string(CRED_NAMESPACE, "ssid")?;
        let password = self.get_string(CRED_NAMESPACE, "password")?;
        if ssid.is_empty() || password.is_empty() {
            return None;
        }
        Some((ssid, password))
    }

    #[cfg(not(target_os = "espidf"))]
    fn get_string(&self, namespace: &str, key: &str) -> Option<String> {
        let composite = Self::composite_key(namespace, key);
        self.store
            .borrow()
            .get(&composite)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    #[cfg(target_os = "espidf")]
    fn get_string(&self, namespace: &str, key: &str) -> Option<String> {
        let result = Self::with_nvs_handle(namespace, false, |handle| {
            let key_buf = Self::key_buf(key);
            let mut size: usize = 0;
            let ret = unsafe {
                nvs_get_str(handle, key_buf.as_ptr() as *const _, core::ptr::null_mut(), &mut size)
            };
            if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                return Err(ret);
            }
            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_str(handle, key_buf.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            // Drop the trailing NUL.
            buf.truncate(size.saturating_sub(1));
            Ok(buf)
        });
        result.ok().map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Store the WiFi credentials (host-side provisioning helper).
    #[cfg(not(target_os = "espidf"))]
    pub fn store_wifi_credentials(&mut self, ssid: &str, password: &str) {
        let mut store = self.store.borrow_mut();
        store.insert(
            Self::composite_key(CRED_NAMESPACE, "ssid"),
            ssid.as_bytes().to_vec(),
        );
        store.insert(
            Self::composite_key(CRED_NAMESPACE, "password"),
            password.as_bytes().to_vec(),
        );
    }
}

// ── Config validation ─────────────────────────────────────────

fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(1_000..=120_000).contains(&cfg.travel_duration_ms) {
        return Err(ConfigError::ValidationFailed(
            "travel_duration_ms must be 1000–120000",
        ));
    }
    if cfg.lux_threshold == 0 {
        return Err(ConfigError::ValidationFailed("lux_threshold must be > 0"));
    }
    if !(1..=60).contains(&cfg.streak_window) {
        return Err(ConfigError::ValidationFailed("streak_window must be 1–60"));
    }
    if !(100..=5000).contains(&cfg.control_loop_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "control_loop_interval_ms must be 100–5000",
        ));
    }
    if !(100..=5000).contains(&cfg.light_sample_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "light_sample_interval_ms must be 100–5000",
        ));
    }
    if !(5..=3600).contains(&cfg.link_retry_interval_secs) {
        return Err(ConfigError::ValidationFailed(
            "link_retry_interval_secs must be 5–3600",
        ));
    }
    if !(5..=120).contains(&cfg.link_connect_timeout_secs) {
        return Err(ConfigError::ValidationFailed(
            "link_connect_timeout_secs must be 5–120",
        ));
    }
    Ok(())
}

// ── FlagStore ─────────────────────────────────────────────────

impl FlagStore for NvsAdapter {
    fn get_bool(&self, key: &str, default: bool) -> Result<bool, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(SHUTTER_NAMESPACE, key);
            match self.store.borrow().get(&composite) {
                Some(bytes) => Ok(bytes.first().is_some_and(|b| *b != 0)),
                None => Ok(default),
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(SHUTTER_NAMESPACE, false, |handle| {
                let key_buf = Self::key_buf(key);
                let mut value: u8 = 0;
                let ret = unsafe { nvs_get_u8(handle, key_buf.as_ptr() as *const _, &mut value) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(value != 0)
            });
            match result {
                Ok(value) => Ok(value),
                // Absent key or never-opened namespace: freshly provisioned
                // device, indistinguishable from "written false" on purpose.
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(default),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn put_bool(&mut self, key: &str, value: bool) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let composite = Self::composite_key(SHUTTER_NAMESPACE, key);
            self.store.borrow_mut().insert(composite, vec![u8::from(value)]);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(SHUTTER_NAMESPACE, true, |handle| {
                let key_buf = Self::key_buf(key);
                let ret =
                    unsafe { nvs_set_u8(handle, key_buf.as_ptr() as *const _, u8::from(value)) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            result.map_err(|_| StorageError::IoError)
        }
    }
}

// ── ConfigPort ────────────────────────────────────────────────

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key_buf = Self::key_buf(CONFIG_KEY);
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }

                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key_buf = Self::key_buf(CONFIG_KEY);
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_buf.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}
