//! Machine-readable copies of the joined county data.

use anyhow::{Context, Result};
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::pipeline::ChoroplethMap;
use crate::tooltip::round1;

#[derive(Debug, Serialize)]
struct CountyRow<'a> {
    fips: u32,
    state: &'a str,
    county: &'a str,
    education: Option<f64>,
    bucket: Option<usize>,
    fill: Option<String>,
}

pub fn feature_collection(map: &ChoroplethMap) -> FeatureCollection {
    let features = map
        .counties
        .iter()
        .map(|county| {
            let mut properties = JsonObject::new();
            properties.insert("fips".into(), county.fips.into());
            properties.insert("county".into(), county.county.clone().into());
            properties.insert("state".into(), county.state.clone().into());
            properties.insert("education".into(), county.percentage.map(round1).into());
            properties.insert("bucket".into(), map.bucket(county).into());
            properties.insert("fill".into(), map.fill(county).into());

            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::from(&county.geometry))),
                id: Some(geojson::feature::Id::Number(county.fips.into())),
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_geojson(path: &Path, map: &ChoroplethMap) -> Result<()> {
    let geojson = GeoJson::from(feature_collection(map));
    fs::write(path, geojson.to_string())
        .with_context(|| format!("Failed to write GeoJSON: {:?}", path))?;
    Ok(())
}

pub fn write_csv(path: &Path, map: &ChoroplethMap) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {:?}", path))?;
    for county in &map.counties {
        writer.serialize(CountyRow {
            fips: county.fips,
            state: county.state_label(),
            county: county.county_label(),
            education: county.percentage.map(round1),
            bucket: map.bucket(county),
            fill: map.fill(county),
        })?;
    }
    writer.flush()?;
    Ok(())
}
