use anyhow::{Context, Result};
use geo::MultiLineString;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::config::{AppConfig, MapConfig, MissingDataPolicy};
use crate::data::{self, Datasets};
use crate::scale::{Legend, QuantileScale};
use crate::stats::StatIndex;
use crate::tooltip::round1;
use crate::types::CountyFeature;
use crate::{error, export, processing, render};

pub const COUNTIES_OBJECT: &str = "counties";
pub const STATES_OBJECT: &str = "states";

/// Everything the renderer needs, computed once from the two datasets.
#[derive(Debug, Clone)]
pub struct ChoroplethMap {
    pub index: StatIndex,
    pub scale: QuantileScale,
    pub legend: Legend,
    pub counties: Vec<CountyFeature>,
    pub state_borders: MultiLineString<f64>,
    pub missing_data: MissingDataPolicy,
    pub no_data_color: String,
}

impl ChoroplethMap {
    /// Index → scale/legend → join, over already loaded datasets.
    pub fn build(datasets: Datasets, map: &MapConfig) -> error::Result<Self> {
        let Datasets {
            education,
            topology,
        } = datasets;

        let index = StatIndex::from_raw(education)?;
        let scale = QuantileScale::new(index.values(), &map.palette)?;
        let legend = Legend::new(index.bounds(), &scale)?;
        info!(thresholds = ?scale.thresholds(), "built quantile color scale");

        let features = topology.features(COUNTIES_OBJECT)?;
        let counties = processing::join_features(features, &index, map.missing_data)?;
        let state_borders = topology.mesh(STATES_OBJECT, |a, b| a != b)?;

        Ok(Self {
            index,
            scale,
            legend,
            counties,
            state_borders,
            missing_data: map.missing_data,
            no_data_color: map.no_data_color.clone(),
        })
    }

    /// Fill color of a county; `None` only under the `propagate` policy.
    pub fn fill(&self, county: &CountyFeature) -> Option<String> {
        match (county.percentage, self.missing_data) {
            (Some(p), _) => Some(self.scale.color(p).to_string()),
            (None, MissingDataPolicy::Propagate) => None,
            (None, _) => Some(self.no_data_color.clone()),
        }
    }

    pub fn bucket(&self, county: &CountyFeature) -> Option<usize> {
        county.percentage.map(|p| self.scale.bucket(p))
    }

    /// Value of the `data-education` attribute.
    pub fn education_attr(&self, county: &CountyFeature) -> String {
        match (county.percentage, self.missing_data) {
            (Some(p), _) => round1(p).to_string(),
            (None, MissingDataPolicy::Propagate) => "undefined".to_string(),
            (None, _) => "NA".to_string(),
        }
    }

    /// Number of counties painted with each palette color.
    pub fn bucket_counts(&self) -> Vec<usize> {
        self.scale.bucket_counts(self.index.values())
    }
}

/// Loads both datasets and builds the map. Any failure aborts the whole run.
pub async fn run(config: &AppConfig) -> Result<ChoroplethMap> {
    let datasets = data::load_datasets(&config.input)
        .await
        .context("Failed to load datasets")?;
    let map = ChoroplethMap::build(datasets, &config.map).context("Failed to build choropleth")?;
    Ok(map)
}

/// Writes the page, the standalone SVG and the optional data exports.
pub fn write_outputs(config: &AppConfig, map: &ChoroplethMap) -> Result<Vec<PathBuf>> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;

    let svg = render::render_svg(&config.map, map)?;
    let mut written = Vec::new();

    let html_path = dir.join("index.html");
    fs::write(&html_path, render::render_page(&config.map, &svg)?)
        .with_context(|| format!("Failed to write {:?}", html_path))?;
    written.push(html_path);

    let svg_path = dir.join("choropleth.svg");
    fs::write(&svg_path, &svg).with_context(|| format!("Failed to write {:?}", svg_path))?;
    written.push(svg_path);

    if config.output.geojson {
        let path = dir.join("counties.geojson");
        export::write_geojson(&path, map)?;
        written.push(path);
    }
    if config.output.csv {
        let path = dir.join("counties.csv");
        export::write_csv(&path, map)?;
        written.push(path);
    }

    info!(files = written.len(), dir = ?dir, "wrote outputs");
    Ok(written)
}

/// Replaces the page with a visible error message so a failed run never leaves a blank map.
pub fn write_error_page(config: &AppConfig, err: &anyhow::Error) -> Result<PathBuf> {
    let dir = &config.output.dir;
    fs::create_dir_all(dir).with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    let path = dir.join("index.html");
    fs::write(&path, render::render_error_page(&config.map, err)?)
        .with_context(|| format!("Failed to write {:?}", path))?;
    Ok(path)
}
