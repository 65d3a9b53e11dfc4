//! Polls the metric views and publishes their values to Zenoh.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use zenoh::Session;

use crate::descriptor::MetricKind;
use crate::error::{BridgeError, Result};
use crate::fetcher::StatusSource;
use crate::metric::{MetricValue, MetricView, Sensor};
use crate::telemetry::{Format, TelemetryPoint, TelemetryValue, encode};

/// Drives the views of one device on a fixed cadence.
pub struct EmfitPoller<S: StatusSource> {
    views: Vec<MetricView<S>>,
    key_prefix: String,
    interval: Duration,
    session: Arc<Session>,
    format: Format,
}

impl<S: StatusSource> EmfitPoller<S> {
    pub fn new(
        views: Vec<MetricView<S>>,
        key_prefix: impl Into<String>,
        interval: Duration,
        session: Arc<Session>,
        format: Format,
    ) -> Self {
        Self {
            views,
            key_prefix: key_prefix.into(),
            interval,
            session,
            format,
        }
    }

    /// Run the polling loop.
    pub async fn run(mut self) {
        info!(
            "Starting Emfit poller for {} metric(s) (interval: {}s)",
            self.views.len(),
            self.interval.as_secs()
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let count = self.poll_once().await;
            debug!("Published {} telemetry point(s)", count);
        }
    }

    /// Poll every view, then publish those holding a value.
    async fn poll_once(&mut self) -> usize {
        for view in &mut self.views {
            view.poll().await;
        }

        let mut count = 0;
        for view in &self.views {
            let Some(point) = telemetry_point(view) else {
                continue;
            };

            let key = key_expr(&self.key_prefix, &point.source, view.kind());
            match self.publish(&key, &point).await {
                Ok(()) => count += 1,
                Err(e) => warn!(error = %e, "Failed to publish telemetry"),
            }
        }

        count
    }

    async fn publish(&self, key: &str, point: &TelemetryPoint) -> Result<()> {
        let payload = encode(point, self.format)?;
        self.session
            .put(key, payload)
            .await
            .map_err(|e| BridgeError::Publish {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        debug!("Published: {} = {:?}", key, point.value);
        Ok(())
    }
}

/// Build a key expression for an Emfit metric.
pub fn key_expr(prefix: &str, serial: &str, kind: MetricKind) -> String {
    format!("{}/{}/{}", prefix, serial, kind.as_str())
}

/// Key expression for bridge status.
pub fn status_key(prefix: &str) -> String {
    format!("{}/@/status", prefix)
}

/// Convert a metric value into a telemetry value.
///
/// Field values that read as numbers become gauges; anything else is text.
pub fn telemetry_value(value: &MetricValue) -> TelemetryValue {
    match value {
        MetricValue::Seconds(n) => TelemetryValue::Counter(*n),
        MetricValue::Raw(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => TelemetryValue::Gauge(v),
            _ => TelemetryValue::Text(raw.clone()),
        },
    }
}

/// Snapshot a view as a telemetry point, if it holds a value.
pub fn telemetry_point<S: StatusSource>(view: &MetricView<S>) -> Option<TelemetryPoint> {
    let value = view.value()?;
    let descriptor = view.descriptor();

    let mut point = TelemetryPoint::new(
        view.serial(),
        view.kind().as_str(),
        telemetry_value(value),
    )
    .with_label("name", view.name())
    .with_label("icon", descriptor.icon)
    .with_label("state_class", descriptor.state_class.as_str());

    if !descriptor.unit.is_empty() {
        point = point.with_label("unit", descriptor.unit);
    }
    for (key, value) in view.attributes() {
        point = point.with_label(key, value);
    }

    Some(point)
}
