//! Per-metric views polled by the host.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::descriptor::{
    ATTRIBUTION, MetricDescriptor, MetricKind, MetricSource, NAME_PREFIX, PRESENCE_FIELD, PRESENT,
};
use crate::error::PollError;
use crate::fetcher::{HttpStatusSource, Refresh, StatusFetcher, StatusSource};
use crate::presence::PresenceTracker;
use crate::throttle::Throttle;

/// Latest value held by a metric view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricValue {
    /// Field value exactly as the device reported it.
    Raw(String),
    /// Derived whole seconds.
    Seconds(u64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Raw(s) => write!(f, "{}", s),
            MetricValue::Seconds(n) => write!(f, "{}", n),
        }
    }
}

/// What the host needs from a polled metric.
pub trait Sensor {
    /// Display name.
    fn name(&self) -> &str;

    fn kind(&self) -> MetricKind;

    /// Current value; `None` until a poll produced one.
    fn value(&self) -> Option<&MetricValue>;

    /// Extra state attributes shown alongside the value.
    fn attributes(&self) -> BTreeMap<&'static str, String>;

    /// Refresh the value from the device. Never fails; problems are logged.
    fn poll(&mut self) -> impl Future<Output = ()> + Send;

    fn descriptor(&self) -> &'static MetricDescriptor {
        self.kind().descriptor()
    }
}

#[derive(Debug)]
enum Derivation {
    Field(&'static str),
    TimeInBed {
        throttle: Throttle,
        tracker: PresenceTracker,
    },
}

/// One metric of one device.
///
/// Simple kinds copy a status field verbatim. `seconds_in_bed` derives
/// its value from the presence flag and has a throttle of its own.
#[derive(Debug)]
pub struct MetricView<S = HttpStatusSource> {
    serial: String,
    name: String,
    kind: MetricKind,
    fetcher: Arc<StatusFetcher<S>>,
    value: Option<MetricValue>,
    derivation: Derivation,
}

impl<S: StatusSource> MetricView<S> {
    /// Create a view; `interval` throttles the derived metric's polls.
    pub fn new(
        serial: impl Into<String>,
        kind: MetricKind,
        fetcher: Arc<StatusFetcher<S>>,
        interval: Duration,
    ) -> Self {
        let serial = serial.into();
        let descriptor = kind.descriptor();
        let derivation = match descriptor.source {
            MetricSource::Field(key) => Derivation::Field(key),
            MetricSource::Presence => Derivation::TimeInBed {
                throttle: Throttle::new(interval),
                tracker: PresenceTracker::new(Instant::now()),
            },
        };

        Self {
            name: format!("{} {} {}", NAME_PREFIX, serial, descriptor.label),
            serial,
            kind,
            fetcher,
            value: None,
            derivation,
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    async fn poll_field(&mut self, key: &'static str) -> Result<MetricValue, PollError> {
        self.fetcher.refresh().await;
        self.fetcher
            .field(key)
            .map(MetricValue::Raw)
            .ok_or(PollError::MissingField(key))
    }

    async fn poll_time_in_bed(&mut self) -> Result<Option<MetricValue>, PollError> {
        let Derivation::TimeInBed { throttle, tracker } = &mut self.derivation else {
            return Ok(None);
        };

        // Polls that share a fetch cycle are charged to its start.
        let cycle = self.fetcher.cycle_start().unwrap_or_else(Instant::now);
        if !throttle.try_acquire_at(cycle) {
            return Ok(None);
        }

        let before = self.fetcher.field(PRESENCE_FIELD);
        let outcome = self.fetcher.refresh().await;
        if outcome == Refresh::Failed || self.fetcher.is_stale() {
            return Err(PollError::StaleRecord);
        }

        let after = self
            .fetcher
            .field(PRESENCE_FIELD)
            .ok_or(PollError::MissingField(PRESENCE_FIELD))?;

        if before.as_deref() != Some(after.as_str()) {
            info!(
                serial = %self.serial,
                from = before.as_deref().unwrap_or("unknown"),
                to = %after,
                "Presence changed"
            );
        }

        let seconds = tracker.observe(after == PRESENT, Instant::now());
        Ok(Some(MetricValue::Seconds(seconds)))
    }
}

impl<S: StatusSource> Sensor for MetricView<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MetricKind {
        self.kind
    }

    fn value(&self) -> Option<&MetricValue> {
        self.value.as_ref()
    }

    fn attributes(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([("attribution", ATTRIBUTION.to_string())])
    }

    async fn poll(&mut self) {
        let result = match self.derivation {
            Derivation::Field(key) => self.poll_field(key).await.map(Some),
            Derivation::TimeInBed { .. } => self.poll_time_in_bed().await,
        };

        match result {
            Ok(Some(value)) => {
                debug!(metric = %self.kind, value = %value, "Metric updated");
                self.value = Some(value);
            }
            Ok(None) => {}
            Err(e) => {
                warn!(metric = %self.kind, serial = %self.serial, error = %e, "Keeping previous value");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSource;

    const INTERVAL: Duration = Duration::from_secs(10);

    fn body(presence: &str) -> String {
        format!("SER=001234\r\nHR=62\r\nRR=14\r\nPRES={}\r\nACT=3\r\n", presence)
    }

    fn fetcher(source: MockSource, interval: Duration) -> Arc<StatusFetcher<MockSource>> {
        Arc::new(StatusFetcher::new(source, interval))
    }

    #[tokio::test(start_paused = true)]
    async fn test_heart_rate_reads_raw_field() {
        let fetcher = fetcher(MockSource::ok(&body("1")), INTERVAL);
        let mut view = MetricView::new("001234", MetricKind::HeartRate, fetcher, INTERVAL);

        assert_eq!(view.value(), None);
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Raw("62".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_names_and_metadata() {
        let fetcher = fetcher(MockSource::ok(&body("1")), INTERVAL);
        let view = MetricView::new("001234", MetricKind::RespiratoryRate, fetcher, INTERVAL);

        assert_eq!(view.name(), "EmfitQS 001234 Respiratory Rate");
        assert_eq!(view.serial(), "001234");
        assert_eq!(view.descriptor().unit, "bpm");
        assert_eq!(view.descriptor().icon, "mdi:pinwheel");
        assert_eq!(
            view.attributes().get("attribution").map(String::as_str),
            Some("Data provided by Emfit QS")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_views_share_one_fetch() {
        let fetcher = fetcher(MockSource::ok(&body("1")), INTERVAL);
        let mut hr = MetricView::new("001234", MetricKind::HeartRate, fetcher.clone(), INTERVAL);
        let mut rr = MetricView::new("001234", MetricKind::RespiratoryRate, fetcher.clone(), INTERVAL);
        let mut act = MetricView::new("001234", MetricKind::ActivityLevel, fetcher.clone(), INTERVAL);

        hr.poll().await;
        rr.poll().await;
        act.poll().await;

        assert_eq!(fetcher.source().calls(), 1);
        assert_eq!(rr.value(), Some(&MetricValue::Raw("14".to_string())));
        assert_eq!(act.value(), Some(&MetricValue::Raw("3".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_field_keeps_previous_value() {
        let source = MockSource::scripted(vec![
            MockSource::body("HR=62\r\n"),
            MockSource::body("RR=14\r\n"),
        ]);
        let fetcher = fetcher(source, INTERVAL);
        let mut view = MetricView::new("001234", MetricKind::HeartRate, fetcher, INTERVAL);

        view.poll().await;
        tokio::time::advance(INTERVAL).await;
        view.poll().await;

        assert_eq!(view.value(), Some(&MetricValue::Raw("62".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_field_never_fetched_stays_unknown() {
        let source = MockSource::scripted(vec![MockSource::server_error()]);
        let fetcher = fetcher(source, INTERVAL);
        let mut view = MetricView::new("001234", MetricKind::HeartRate, fetcher, INTERVAL);

        view.poll().await;
        assert_eq!(view.value(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reads_are_idempotent_between_polls() {
        let fetcher = fetcher(MockSource::ok(&body("1")), INTERVAL);
        let mut view = MetricView::new("001234", MetricKind::ActivityLevel, fetcher, INTERVAL);

        view.poll().await;
        let first = view.value().cloned();
        tokio::time::advance(Duration::from_secs(60)).await;

        assert_eq!(view.value().cloned(), first);
        assert_eq!(view.value().cloned(), first);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_in_bed_sequence() {
        let step = Duration::from_secs(1);
        let source = MockSource::ok(&body("0"));
        let fetcher = fetcher(source, Duration::ZERO);
        let mut view = MetricView::new("001234", MetricKind::SecondsInBed, fetcher.clone(), Duration::ZERO);

        let mut values = Vec::new();
        for presence in ["0", "1", "1", "1", "0"] {
            fetcher.source().set(vec![MockSource::body(&body(presence))]);
            view.poll().await;
            values.push(view.value().cloned());
            tokio::time::advance(step).await;
        }

        let expected: Vec<_> = [0, 1, 2, 3, 0]
            .into_iter()
            .map(|s| Some(MetricValue::Seconds(s)))
            .collect();
        assert_eq!(values, expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_in_bed_stays_zero_while_absent() {
        let fetcher = fetcher(MockSource::ok(&body("1")), Duration::ZERO);
        let mut view = MetricView::new("001234", MetricKind::SecondsInBed, fetcher.clone(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(30)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(30)));

        fetcher.source().set(vec![MockSource::body(&body("0"))]);
        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(30)).await;
            view.poll().await;
            assert_eq!(view.value(), Some(&MetricValue::Seconds(0)));
        }

        fetcher.source().set(vec![MockSource::body(&body("1"))]);
        tokio::time::advance(Duration::from_secs(30)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_in_bed_throttles_its_own_polls() {
        let fetcher = fetcher(MockSource::ok(&body("1")), INTERVAL);
        let mut view = MetricView::new("001234", MetricKind::SecondsInBed, fetcher.clone(), INTERVAL);

        tokio::time::advance(Duration::from_secs(5)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(5)));

        tokio::time::advance(Duration::from_secs(4)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(5)));

        tokio::time::advance(Duration::from_secs(6)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(15)));
        assert_eq!(fetcher.source().calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_in_bed_advances_every_cycle_despite_latency() {
        let page = body("1");
        let responses = (0..6)
            .map(|i| {
                let latency = if i % 2 == 0 { 300 } else { 100 };
                MockSource::slow(&page, Duration::from_millis(latency))
            })
            .collect();
        let fetcher = fetcher(MockSource::scripted(responses), INTERVAL);
        let mut hr = MetricView::new("001234", MetricKind::HeartRate, fetcher.clone(), INTERVAL);
        let mut bed =
            MetricView::new("001234", MetricKind::SecondsInBed, fetcher.clone(), INTERVAL);

        let mut ticker = tokio::time::interval(INTERVAL);
        let mut values = Vec::new();
        for _ in 0..6 {
            ticker.tick().await;
            hr.poll().await;
            bed.poll().await;
            values.push(bed.value().cloned());
        }

        let expected: Vec<_> = [0, 10, 20, 30, 40, 50]
            .into_iter()
            .map(|s| Some(MetricValue::Seconds(s)))
            .collect();
        assert_eq!(values, expected);
        assert_eq!(fetcher.source().calls(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_in_bed_keeps_value_on_fetch_failure() {
        let fetcher = fetcher(MockSource::ok(&body("1")), Duration::ZERO);
        let mut view = MetricView::new("001234", MetricKind::SecondsInBed, fetcher.clone(), Duration::ZERO);

        tokio::time::advance(Duration::from_secs(20)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(20)));

        fetcher.source().set(vec![MockSource::server_error()]);
        tokio::time::advance(Duration::from_secs(20)).await;
        view.poll().await;

        assert_eq!(view.value(), Some(&MetricValue::Seconds(20)));
        assert_eq!(fetcher.field(PRESENCE_FIELD).as_deref(), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_in_bed_missing_presence_keeps_value() {
        let fetcher = fetcher(MockSource::ok("SER=001234\r\nHR=60\r\n"), Duration::ZERO);
        let mut view = MetricView::new("001234", MetricKind::SecondsInBed, fetcher, Duration::ZERO);

        view.poll().await;
        assert_eq!(view.value(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_one_presence_is_absent() {
        let fetcher = fetcher(MockSource::ok(&body("yes")), Duration::ZERO);
        let mut view = MetricView::new("001234", MetricKind::SecondsInBed, fetcher, Duration::ZERO);

        tokio::time::advance(Duration::from_secs(10)).await;
        view.poll().await;
        assert_eq!(view.value(), Some(&MetricValue::Seconds(0)));
    }
}
