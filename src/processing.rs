use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::MissingDataPolicy;
use crate::error::{ChoroplethError, Result};
use crate::stats::StatIndex;
use crate::topology::TopoFeature;
use crate::types::CountyFeature;

/// Attaches percentage, county name and state to every county geometry.
///
/// Name and state come from the first statistics row with a matching fips.
/// Features whose fips has no statistics are handled according to `policy`;
/// features without any usable id are dropped.
pub fn join_features(
    features: Vec<TopoFeature>,
    index: &StatIndex,
    policy: MissingDataPolicy,
) -> Result<Vec<CountyFeature>> {
    let attributes = index.attribute_index();
    let total = features.len();

    let joined: Vec<CountyFeature> = features
        .into_par_iter()
        .filter_map(|feature| {
            let fips = feature.id?;
            let (county, state) = match attributes.get(fips) {
                Some((county, state)) => (Some(county.to_string()), Some(state.to_string())),
                None => (None, None),
            };
            Some(CountyFeature {
                fips,
                geometry: feature.geometry,
                percentage: index.get(fips),
                county,
                state,
            })
        })
        .collect();

    let unidentified = total - joined.len();
    if unidentified > 0 {
        warn!(unidentified, "dropped county geometries without a fips id");
    }

    let missing: Vec<u32> = joined
        .iter()
        .filter(|f| f.percentage.is_none())
        .map(|f| f.fips)
        .collect();
    if let Some(&first) = missing.first() {
        match policy {
            MissingDataPolicy::Fail => {
                return Err(ChoroplethError::MissingStatistics { fips: first });
            }
            MissingDataPolicy::NoData | MissingDataPolicy::Propagate => {
                warn!(count = missing.len(), first, ?policy, "counties without statistics");
            }
        }
    }

    info!(features = joined.len(), missing = missing.len(), "joined geometry with statistics");
    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CountyStat;
    use geo::{polygon, MultiPolygon};

    fn square(id: Option<u32>) -> TopoFeature {
        TopoFeature {
            id,
            geometry: MultiPolygon::new(vec![polygon![
                (x: 0.0, y: 0.0),
                (x: 1.0, y: 0.0),
                (x: 1.0, y: 1.0),
                (x: 0.0, y: 1.0),
            ]]),
        }
    }

    fn index() -> StatIndex {
        StatIndex::build(vec![
            CountyStat {
                fips: 1001,
                state: "AL".into(),
                area_name: "Autauga County".into(),
                bachelors_or_higher: 21.9,
            },
            CountyStat {
                fips: 1003,
                state: "AL".into(),
                area_name: "Baldwin County".into(),
                bachelors_or_higher: 26.7,
            },
            CountyStat {
                fips: 1001,
                state: "ZZ".into(),
                area_name: "Duplicate County".into(),
                bachelors_or_higher: 99.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn joins_by_fips_with_first_row_attributes() {
        let joined = join_features(
            vec![square(Some(1003)), square(Some(1001))],
            &index(),
            MissingDataPolicy::NoData,
        )
        .unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[0].fips, 1003);
        assert_eq!(joined[0].percentage, Some(26.7));
        assert_eq!(joined[1].county.as_deref(), Some("Autauga County"));
        assert_eq!(joined[1].state.as_deref(), Some("AL"));
        assert_eq!(joined[1].percentage, Some(21.9));
    }

    #[test]
    fn missing_statistics_follow_policy() {
        let features = || vec![square(Some(1001)), square(Some(2020))];

        let kept = join_features(features(), &index(), MissingDataPolicy::NoData).unwrap();
        assert_eq!(kept[1].percentage, None);
        assert_eq!(kept[1].county, None);

        let err = join_features(features(), &index(), MissingDataPolicy::Fail).unwrap_err();
        assert!(matches!(err, ChoroplethError::MissingStatistics { fips: 2020 }));
    }

    #[test]
    fn features_without_id_are_dropped() {
        let joined = join_features(
            vec![square(None), square(Some(1001))],
            &index(),
            MissingDataPolicy::Propagate,
        )
        .unwrap();
        assert_eq!(joined.len(), 1);
    }
}
