//! Lookup from county fips to bachelor's-degree percentage, plus the
//! name/state attributes the renderer labels each county with.

use std::collections::HashMap;
use tracing::{info, warn};

use crate::error::{ChoroplethError, Result};
use crate::types::{CountyStat, RawCountyStat};

/// Observed percentage range across all counties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

/// Immutable fips → percentage mapping built once from the statistics rows.
///
/// When several rows share a fips, the first one wins, both for the
/// percentage and for the name/state attributes.
#[derive(Debug, Clone)]
pub struct StatIndex {
    rows: Vec<CountyStat>,
    percentages: HashMap<u32, f64>,
    bounds: Bounds,
    duplicates: usize,
}

impl StatIndex {
    /// Validates raw rows (explicit numeric parse) and indexes them.
    pub fn from_raw(raw: Vec<RawCountyStat>) -> Result<Self> {
        let rows = raw
            .into_iter()
            .map(CountyStat::try_from)
            .collect::<Result<Vec<_>>>()?;
        Self::build(rows)
    }

    pub fn build(rows: Vec<CountyStat>) -> Result<Self> {
        if rows.is_empty() {
            return Err(ChoroplethError::EmptyStatistics);
        }

        let mut percentages = HashMap::with_capacity(rows.len());
        let mut duplicates = 0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for row in &rows {
            if percentages.contains_key(&row.fips) {
                duplicates += 1;
                continue;
            }
            percentages.insert(row.fips, row.bachelors_or_higher);
            min = min.min(row.bachelors_or_higher);
            max = max.max(row.bachelors_or_higher);
        }

        if duplicates > 0 {
            warn!(duplicates, "statistics contain repeated fips codes; keeping the first row of each");
        }
        info!(counties = percentages.len(), min, max, "built statistics index");

        Ok(Self {
            rows,
            percentages,
            bounds: Bounds { min, max },
            duplicates,
        })
    }

    pub fn get(&self, fips: u32) -> Option<f64> {
        self.percentages.get(&fips).copied()
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Percentages of every indexed county (one per fips), in no particular order.
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.percentages.values().copied()
    }

    pub fn len(&self) -> usize {
        self.percentages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.percentages.is_empty()
    }

    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    /// County name and state of the first row carrying `fips` (linear scan).
    pub fn attributes(&self, fips: u32) -> Option<(&str, &str)> {
        self.rows
            .iter()
            .find(|row| row.fips == fips)
            .map(|row| (row.area_name.as_str(), row.state.as_str()))
    }

    /// O(1) equivalent of [`StatIndex::attributes`] for bulk joins.
    pub fn attribute_index(&self) -> AttributeIndex<'_> {
        let mut by_fips = HashMap::with_capacity(self.percentages.len());
        for row in &self.rows {
            by_fips
                .entry(row.fips)
                .or_insert((row.area_name.as_str(), row.state.as_str()));
        }
        AttributeIndex { by_fips }
    }
}

pub struct AttributeIndex<'a> {
    by_fips: HashMap<u32, (&'a str, &'a str)>,
}

impl<'a> AttributeIndex<'a> {
    pub fn get(&self, fips: u32) -> Option<(&'a str, &'a str)> {
        self.by_fips.get(&fips).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RawPercentage;

    fn stat(fips: u32, name: &str, value: f64) -> CountyStat {
        CountyStat {
            fips,
            state: "AL".into(),
            area_name: name.into(),
            bachelors_or_higher: value,
        }
    }

    #[test]
    fn literal_pair_round_trips_through_the_index() {
        let raw = vec![
            RawCountyStat {
                fips: 1001,
                state: "AL".into(),
                area_name: "Autauga County".into(),
                bachelors_or_higher: RawPercentage::Text("21.9".into()),
            },
            RawCountyStat {
                fips: 1003,
                state: "AL".into(),
                area_name: "Baldwin County".into(),
                bachelors_or_higher: RawPercentage::Text("26.7".into()),
            },
        ];
        let index = StatIndex::from_raw(raw).unwrap();
        assert_eq!(index.get(1001), Some(21.9));
        assert_eq!(index.get(1003), Some(26.7));
        assert_eq!(index.get(9999), None);
        assert_eq!(index.bounds(), Bounds { min: 21.9, max: 26.7 });
    }

    #[test]
    fn first_row_wins_for_duplicate_fips() {
        let index = StatIndex::build(vec![
            stat(1001, "Autauga County", 21.9),
            stat(1001, "Shadow County", 80.0),
            stat(1003, "Baldwin County", 26.7),
        ])
        .unwrap();
        assert_eq!(index.duplicates(), 1);
        assert_eq!(index.get(1001), Some(21.9));
        assert_eq!(index.bounds().max, 26.7);
        assert_eq!(index.attributes(1001), Some(("Autauga County", "AL")));
        assert_eq!(index.attribute_index().get(1001), Some(("Autauga County", "AL")));
    }

    #[test]
    fn attribute_index_agrees_with_linear_scan() {
        let index = StatIndex::build(
            (0..50)
                .map(|i| stat(1000 + i % 20, &format!("County {i}"), i as f64))
                .collect(),
        )
        .unwrap();
        let fast = index.attribute_index();
        for fips in 990..1030 {
            assert_eq!(index.attributes(fips), fast.get(fips));
        }
    }

    #[test]
    fn empty_and_invalid_inputs_fail() {
        assert!(matches!(StatIndex::build(Vec::new()), Err(ChoroplethError::EmptyStatistics)));

        let raw = vec![RawCountyStat {
            fips: 5,
            state: "AL".into(),
            area_name: "Nowhere".into(),
            bachelors_or_higher: RawPercentage::Text("".into()),
        }];
        assert!(matches!(
            StatIndex::from_raw(raw),
            Err(ChoroplethError::InvalidPercentage { fips: 5, .. })
        ));
    }
}
