use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use crate::error::ChoroplethError;

/// Percentage as it appears on the wire: some releases of the dataset quote it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawPercentage {
    Number(f64),
    Text(String),
}

/// One row of the education dataset before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCountyStat {
    pub fips: u32,
    pub state: String,
    pub area_name: String,
    #[serde(rename = "bachelorsOrHigher")]
    pub bachelors_or_higher: RawPercentage,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountyStat {
    pub fips: u32,
    pub state: String,
    pub area_name: String,
    pub bachelors_or_higher: f64,
}

impl TryFrom<RawCountyStat> for CountyStat {
    type Error = ChoroplethError;

    fn try_from(raw: RawCountyStat) -> Result<Self, Self::Error> {
        let invalid = |text: String| ChoroplethError::InvalidPercentage {
            fips: raw.fips,
            raw: text,
        };
        let value = match &raw.bachelors_or_higher {
            RawPercentage::Number(n) => *n,
            RawPercentage::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| invalid(s.clone()))?,
        };
        if !value.is_finite() {
            return Err(invalid(value.to_string()));
        }
        Ok(CountyStat {
            fips: raw.fips,
            state: raw.state,
            area_name: raw.area_name,
            bachelors_or_higher: value,
        })
    }
}

/// A county geometry after the join, annotated with whatever statistics matched its id.
#[derive(Debug, Clone)]
pub struct CountyFeature {
    pub fips: u32,
    pub geometry: MultiPolygon<f64>,
    pub percentage: Option<f64>,
    pub county: Option<String>,
    pub state: Option<String>,
}

impl CountyFeature {
    pub fn county_label(&self) -> &str {
        self.county.as_deref().unwrap_or("Unknown county")
    }

    pub fn state_label(&self) -> &str {
        self.state.as_deref().unwrap_or("??")
    }
}
