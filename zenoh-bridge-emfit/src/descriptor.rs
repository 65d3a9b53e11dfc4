//! Static description of the metrics a device exposes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SetupError;

/// Attribution attached to every metric.
pub const ATTRIBUTION: &str = "Data provided by Emfit QS";

/// Prefix of every metric display name.
pub const NAME_PREFIX: &str = "EmfitQS";

/// Field holding the device serial number.
pub const SERIAL_FIELD: &str = "ser";

/// Field holding the bed presence flag (`"1"` when occupied).
pub const PRESENCE_FIELD: &str = "pres";

/// Presence value meaning "occupied".
pub const PRESENT: &str = "1";

/// Metric kinds a device can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    HeartRate,
    RespiratoryRate,
    ActivityLevel,
    SecondsInBed,
}

/// How a metric obtains its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricSource {
    /// Raw value of a status field.
    Field(&'static str),
    /// Seconds continuously present, derived from [`PRESENCE_FIELD`].
    Presence,
}

/// Whether a value is an instantaneous reading or a running total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    Measurement,
    Total,
}

impl StateClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateClass::Measurement => "measurement",
            StateClass::Total => "total",
        }
    }
}

/// Display and source metadata for one metric kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDescriptor {
    pub label: &'static str,
    pub unit: &'static str,
    pub icon: &'static str,
    pub source: MetricSource,
    pub state_class: StateClass,
}

static HEART_RATE: MetricDescriptor = MetricDescriptor {
    label: "Heart Rate",
    unit: "bpm",
    icon: "mdi:heart",
    source: MetricSource::Field("hr"),
    state_class: StateClass::Measurement,
};

static RESPIRATORY_RATE: MetricDescriptor = MetricDescriptor {
    label: "Respiratory Rate",
    unit: "bpm",
    icon: "mdi:pinwheel",
    source: MetricSource::Field("rr"),
    state_class: StateClass::Measurement,
};

static ACTIVITY_LEVEL: MetricDescriptor = MetricDescriptor {
    label: "Activity",
    unit: "",
    icon: "mdi:vibrate",
    source: MetricSource::Field("act"),
    state_class: StateClass::Measurement,
};

static SECONDS_IN_BED: MetricDescriptor = MetricDescriptor {
    label: "Seconds in Bed",
    unit: "s",
    icon: "mdi:timer",
    source: MetricSource::Presence,
    state_class: StateClass::Total,
};

impl MetricKind {
    pub const ALL: [MetricKind; 4] = [
        MetricKind::HeartRate,
        MetricKind::RespiratoryRate,
        MetricKind::ActivityLevel,
        MetricKind::SecondsInBed,
    ];

    /// Identifier used in configuration and key expressions.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::HeartRate => "heart_rate",
            MetricKind::RespiratoryRate => "respiratory_rate",
            MetricKind::ActivityLevel => "activity_level",
            MetricKind::SecondsInBed => "seconds_in_bed",
        }
    }

    pub fn descriptor(&self) -> &'static MetricDescriptor {
        match self {
            MetricKind::HeartRate => &HEART_RATE,
            MetricKind::RespiratoryRate => &RESPIRATORY_RATE,
            MetricKind::ActivityLevel => &ACTIVITY_LEVEL,
            MetricKind::SecondsInBed => &SECONDS_IN_BED,
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = SetupError;

    /// Case-insensitive lookup by identifier.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        MetricKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| SetupError::UnknownResource(s.to_string()))
    }
}
