//! Application core — gateway orchestration behind port traits.
//!
//! All interaction with the cloud store, the wireless link and the remote
//! log happens through the **port traits** in [`ports`], so the service
//! and every controller it drives run unchanged against in-memory fakes.

pub mod events;
pub mod ports;
pub mod service;
