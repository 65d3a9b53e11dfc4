//! Device setup: one shared fetcher and one view per configured resource.

use std::sync::Arc;

use tracing::{error, info};

use crate::config::EmfitConfig;
use crate::descriptor::{MetricKind, SERIAL_FIELD};
use crate::error::SetupError;
use crate::fetcher::{HttpStatusSource, Refresh, StatusFetcher, StatusSource};
use crate::metric::MetricView;

/// Set up the device at `config.host` and hand its metric views to
/// `add_entities`.
///
/// Returns `false` (after logging why) if any part of the setup fails,
/// including an unusable host; `add_entities` is then never called.
pub async fn setup_platform<F>(config: &EmfitConfig, add_entities: F) -> bool
where
    F: FnOnce(Vec<MetricView>),
{
    let views = match HttpStatusSource::new(&config.host, config.timeout()) {
        Ok(source) => build_views(config, source).await,
        Err(e) => Err(e),
    };
    register(config, views, add_entities)
}

/// Like [`setup_platform`], reading the status page from `source`.
pub async fn setup_platform_with_source<S, F>(
    config: &EmfitConfig,
    source: S,
    add_entities: F,
) -> bool
where
    S: StatusSource,
    F: FnOnce(Vec<MetricView<S>>),
{
    let views = build_views(config, source).await;
    register(config, views, add_entities)
}

fn register<S, F>(
    config: &EmfitConfig,
    views: Result<Vec<MetricView<S>>, SetupError>,
    add_entities: F,
) -> bool
where
    F: FnOnce(Vec<MetricView<S>>),
{
    match views {
        Ok(views) => {
            info!(
                host = %config.host,
                metrics = views.len(),
                "Emfit QS device set up"
            );
            add_entities(views);
            true
        }
        Err(e) => {
            error!(host = %config.host, error = %e, "Emfit QS setup failed");
            false
        }
    }
}

/// Build the shared fetcher, read the serial and create the views.
pub async fn build_views<S: StatusSource>(
    config: &EmfitConfig,
    source: S,
) -> Result<Vec<MetricView<S>>, SetupError> {
    let kinds = config
        .resources
        .iter()
        .map(|r| r.parse::<MetricKind>())
        .collect::<Result<Vec<_>, _>>()?;

    let interval = config.min_refresh_interval();
    let fetcher = Arc::new(StatusFetcher::new(source, interval));

    if let Refresh::Failed = fetcher.refresh().await {
        return Err(SetupError::Unreachable(fetcher.source().describe()));
    }

    let serial = fetcher
        .field(SERIAL_FIELD)
        .ok_or(SetupError::MissingSerial(SERIAL_FIELD))?;

    Ok(kinds
        .into_iter()
        .map(|kind| MetricView::new(serial.clone(), kind, fetcher.clone(), interval))
        .collect())
}
