//! Status page retrieval and the shared, throttled status record.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::{Client, StatusCode, Url};
use tokio::time::Instant;
use tracing::{debug, error, trace};

use crate::error::{FetchError, SetupError};
use crate::record::StatusRecord;
use crate::throttle::Throttle;

/// Path of the status page on the device.
pub const STATUS_PATH: &str = "/dvmstatus.htm";

/// Default minimum interval between two fetches.
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

/// Default HTTP timeout for one fetch.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can produce the raw status page body.
pub trait StatusSource: Send + Sync + 'static {
    /// Fetch the status page body.
    fn fetch(&self) -> impl Future<Output = Result<String, FetchError>> + Send;

    /// Human-readable location of the source, used in logs.
    fn describe(&self) -> String;
}

/// Fetches the status page over plain HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatusSource {
    client: Client,
    url: Url,
}

impl HttpStatusSource {
    /// Create a source for `http://<host>/dvmstatus.htm`.
    ///
    /// `host` may carry a port (`192.168.1.40:8080`).
    pub fn new(host: &str, timeout: Duration) -> Result<Self, SetupError> {
        let url = status_url(host)?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl StatusSource for HttpStatusSource {
    async fn fetch(&self) -> Result<String, FetchError> {
        let response = self.client.get(self.url.clone()).send().await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }

        Ok(response.text().await?)
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Build the status page URL for a device host.
pub fn status_url(host: &str) -> Result<Url, SetupError> {
    let host = host.trim();
    let invalid = |reason: String| SetupError::InvalidHost {
        host: host.to_string(),
        reason,
    };

    if host.is_empty() {
        return Err(invalid("host is empty".to_string()));
    }
    if host.contains('/') {
        return Err(invalid("expected a host name or address, not a URL".to_string()));
    }

    let url = Url::parse(&format!("http://{}{}", host, STATUS_PATH))
        .map_err(|e| invalid(e.to_string()))?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host name".to_string()));
    }

    Ok(url)
}

/// Outcome of a [`StatusFetcher::refresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// A new record was fetched, holding this many fields.
    Updated(usize),
    /// Skipped: the previous attempt was too recent.
    Throttled,
    /// The attempt failed; the previous record is kept.
    Failed,
}

/// Holds the latest status record of one device.
///
/// Shared by all metric views of the device. [`refresh`](Self::refresh)
/// never issues more than one request per minimum interval and never
/// replaces the record with a partial or failed result.
#[derive(Debug)]
pub struct StatusFetcher<S = HttpStatusSource> {
    source: S,
    throttle: Throttle,
    record: RwLock<StatusRecord>,
    stale: AtomicBool,
}

impl<S: StatusSource> StatusFetcher<S> {
    pub fn new(source: S, min_interval: Duration) -> Self {
        Self {
            source,
            throttle: Throttle::new(min_interval),
            record: RwLock::new(StatusRecord::default()),
            stale: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and parse the status page, unless throttled.
    ///
    /// Failures are logged and swallowed; the held record stays as it was.
    pub async fn refresh(&self) -> Refresh {
        if !self.throttle.try_acquire() {
            trace!(
                source = %self.source.describe(),
                remaining_ms = self.throttle.remaining().as_millis() as u64,
                "Status refresh throttled"
            );
            return Refresh::Throttled;
        }

        match self.fetch_record().await {
            Ok(record) => {
                let count = record.len();
                debug!(source = %self.source.describe(), fields = count, "Status refreshed");
                *self.record.write() = record;
                self.stale.store(false, Ordering::Release);
                Refresh::Updated(count)
            }
            Err(e) => {
                error!(source = %self.source.describe(), error = %e, "Status refresh failed");
                self.stale.store(true, Ordering::Release);
                Refresh::Failed
            }
        }
    }

    async fn fetch_record(&self) -> Result<StatusRecord, FetchError> {
        let body = self.source.fetch().await?;
        Ok(StatusRecord::parse(&body)?)
    }

    /// Snapshot of the held record.
    pub fn record(&self) -> StatusRecord {
        self.record.read().clone()
    }

    /// Current value of one field.
    pub fn field(&self, key: &str) -> Option<String> {
        self.record.read().get(key).map(str::to_string)
    }

    /// Start of the current fetch cycle, if a refresh was admitted within
    /// the minimum interval.
    pub fn cycle_start(&self) -> Option<Instant> {
        self.throttle.window_start()
    }

    /// Whether the most recent fetch attempt failed.
    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}
