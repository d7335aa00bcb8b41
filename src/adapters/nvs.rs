//! NVS (Non-Volatile Storage) settings adapter.
//!
//! Implements [`SettingsPort`]: the [`GatewayConfig`] is stored as a single
//! `postcard` blob under the `gateway` namespace.
//!
//! - **`feature = "espidf"`**: ESP-IDF NVS flash, one atomic
//!   `nvs_commit()` per save.
//! - otherwise: an in-memory map (bench and tests).
//!
//! Every save is validated first; invalid ranges are rejected, never
//! clamped.

use log::{info, warn};

use crate::app::ports::{SettingsError, SettingsPort};
use crate::config::GatewayConfig;

#[cfg(not(feature = "espidf"))]
use std::cell::RefCell;
#[cfg(not(feature = "espidf"))]
use std::collections::HashMap;

#[cfg(feature = "espidf")]
use esp_idf_svc::sys::*;

const SETTINGS_NAMESPACE: &str = "gateway";
#[cfg(not(feature = "espidf"))]
const SETTINGS_KEY: &str = "gwcfg";

#[cfg(feature = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(feature = "espidf"))]
    blobs: RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.
    ///
    /// On a full partition or a version change the partition is erased
    /// and re-initialised once; any further failure is an `IoError`.
    pub fn new() -> Result<Self, SettingsError> {
        #[cfg(feature = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS use.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(SettingsError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(SettingsError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
            Ok(Self {})
        }

        #[cfg(not(feature = "espidf"))]
        {
            info!("NvsAdapter: simulation backend");
            Ok(Self {
                blobs: RefCell::new(HashMap::new()),
            })
        }
    }

    /// Load settings, falling back to defaults on a corrupt blob.
    pub fn load_or_default(&self) -> GatewayConfig {
        match self.load() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!("NvsAdapter: {e}, using defaults");
                GatewayConfig::default()
            }
        }
    }

    /// Overwrite the stored blob without validation (simulation only).
    #[cfg(not(feature = "espidf"))]
    pub fn put_raw(&self, bytes: Vec<u8>) {
        self.blobs.borrow_mut().insert(Self::blob_key(), bytes);
    }

    #[cfg(not(feature = "espidf"))]
    fn blob_key() -> String {
        format!("{SETTINGS_NAMESPACE}::{SETTINGS_KEY}")
    }

    /// Open the settings namespace, run `f` with the handle, then close.
    #[cfg(feature = "espidf")]
    fn with_handle<T>(
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, i32>,
    ) -> Result<T, i32> {
        let mut ns = [0u8; 16];
        let bytes = SETTINGS_NAMESPACE.as_bytes();
        ns[..bytes.len()].copy_from_slice(bytes);

        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(ns.as_ptr().cast(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }
}

fn decode(bytes: &[u8]) -> Result<GatewayConfig, SettingsError> {
    let cfg: GatewayConfig = postcard::from_bytes(bytes).map_err(|_| SettingsError::Corrupted)?;
    // A blob that decodes but fails range checks is treated as corrupt.
    cfg.validate().map_err(|_| SettingsError::Corrupted)?;
    Ok(cfg)
}

fn validate(cfg: &GatewayConfig) -> Result<(), SettingsError> {
    cfg.validate().map_err(|e| match e {
        crate::error::Error::Config(msg) => SettingsError::ValidationFailed(msg),
        _ => SettingsError::ValidationFailed("invalid gateway config"),
    })
}

impl SettingsPort for NvsAdapter {
    fn load(&self) -> Result<GatewayConfig, SettingsError> {
        #[cfg(not(feature = "espidf"))]
        {
            match self.blobs.borrow().get(&Self::blob_key()) {
                Some(bytes) => {
                    let cfg = decode(bytes)?;
                    info!("NvsAdapter: loaded settings ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                None => {
                    info!("NvsAdapter: no stored settings, using defaults");
                    Ok(GatewayConfig::default())
                }
            }
        }

        #[cfg(feature = "espidf")]
        {
            const KEY: &[u8] = b"gwcfg\0";
            let result = Self::with_handle(false, |handle| {
                let mut size: usize = 0;
                let ret = unsafe {
                    nvs_get_blob(handle, KEY.as_ptr().cast(), core::ptr::null_mut(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ESP_FAIL);
                }
                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(handle, KEY.as_ptr().cast(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });
            match result {
                Ok(bytes) => {
                    let cfg = decode(&bytes)?;
                    info!("NvsAdapter: loaded settings from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(ESP_ERR_NVS_NOT_FOUND) => {
                    info!("NvsAdapter: no stored settings, using defaults");
                    Ok(GatewayConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {e}");
                    Err(SettingsError::IoError)
                }
            }
        }
    }

    fn save(&mut self, config: &GatewayConfig) -> Result<(), SettingsError> {
        validate(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| SettingsError::IoError)?;

        #[cfg(not(feature = "espidf"))]
        {
            info!("NvsAdapter: settings saved ({} bytes, simulation)", bytes.len());
            self.blobs.borrow_mut().insert(Self::blob_key(), bytes);
            Ok(())
        }

        #[cfg(feature = "espidf")]
        {
            const KEY: &[u8] = b"gwcfg\0";
            let result = Self::with_handle(true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(handle, KEY.as_ptr().cast(), bytes.as_ptr().cast(), bytes.len())
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                match unsafe { nvs_commit(handle) } {
                    ESP_OK => Ok(()),
                    e => Err(e),
                }
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: settings saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {e}");
                    Err(SettingsError::IoError)
                }
            }
        }
    }
}
