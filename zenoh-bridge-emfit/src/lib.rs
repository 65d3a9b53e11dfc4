//! Zenoh bridge for Emfit QS sleep monitors.
//!
//! The bridge polls the device's local status page (`/dvmstatus.htm`),
//! parses its `key=value` lines and publishes a small set of metrics to
//! Zenoh as telemetry.
//!
//! - [`record`] - Status page parsing (`StatusRecord`)
//! - [`throttle`] - Minimum-interval guard shared by the fetcher and derived metrics
//! - [`fetcher`] - HTTP source and the throttled, shared `StatusFetcher`
//! - [`descriptor`] - Compile-time metric table (`MetricKind`, `MetricDescriptor`)
//! - [`presence`] - Time-in-bed state machine
//! - [`metric`] - Per-metric views polled by the host (`MetricView`, `Sensor`)
//! - [`platform`] - Setup: builds the fetcher and one view per configured resource
//! - [`poller`] - Host glue: polls views and publishes telemetry to Zenoh
//!
//! # Key Expressions
//!
//! ```text
//! zensight/emfit/<serial>/<metric>
//! zensight/emfit/@/status
//! ```
//!
//! Where:
//! - `<serial>` - Device serial number reported in the `ser` field
//! - `<metric>` - `heart_rate`, `respiratory_rate`, `activity_level` or `seconds_in_bed`

pub mod config;
pub mod descriptor;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod metric;
pub mod platform;
pub mod poller;
pub mod presence;
pub mod record;
pub mod session;
pub mod telemetry;
pub mod throttle;

#[cfg(test)]
pub(crate) mod mock;

pub use config::{EmfitBridgeConfig, EmfitConfig};
pub use descriptor::{ATTRIBUTION, MetricDescriptor, MetricKind, MetricSource, StateClass};
pub use fetcher::{HttpStatusSource, Refresh, StatusFetcher, StatusSource};
pub use metric::{MetricValue, MetricView, Sensor};
pub use platform::{setup_platform, setup_platform_with_source};
pub use record::StatusRecord;
pub use throttle::Throttle;
