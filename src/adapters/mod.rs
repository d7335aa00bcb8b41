//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements      | Connects to                      |
//! |----------------|-----------------|----------------------------------|
//! | `memory_store` | ConfigStore     | In-memory JSON tree (bench/test) |
//! | `log_sink`     | LogSink         | Serial log / store error log     |
//! | `sim_node`     | CommandChannel  | Simulated sensor/actuator node   |
//! | `nvs`          | SettingsPort    | NVS / in-memory blob store       |
//! | `time`         | —               | ESP32 system timer / host clock  |

pub mod log_sink;
pub mod memory_store;
pub mod nvs;
pub mod sim_node;
pub mod time;
