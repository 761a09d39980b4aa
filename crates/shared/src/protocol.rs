use serde::{Deserialize, Serialize};

use crate::domain::{DateCount, LocationNode};

/// Which time series a data file holds; also its URL path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesKind {
    Cases,
    Deaths,
}

impl SeriesKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SeriesKind::Cases => "cases",
            SeriesKind::Deaths => "deaths",
        }
    }
}

/// Body of `/data/cases/...json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cases {
    pub name: String,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(rename = "cases", default)]
    pub series: Vec<DateCount>,
}

/// Body of `/data/deaths/...json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deaths {
    pub name: String,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(rename = "deaths", default)]
    pub series: Vec<DateCount>,
}

impl Cases {
    pub fn last(&self) -> Option<&DateCount> {
        self.series.last()
    }

    /// Population when reported and non-zero.
    pub fn known_population(&self) -> Option<u64> {
        self.population.filter(|p| *p > 0)
    }
}

impl Deaths {
    pub fn last(&self) -> Option<&DateCount> {
        self.series.last()
    }

    pub fn known_population(&self) -> Option<u64> {
        self.population.filter(|p| *p > 0)
    }
}

/// Body of `/data/locations.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationData {
    #[serde(default)]
    pub countries: Vec<LocationNode>,
}
