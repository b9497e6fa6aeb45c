use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const EDUCATION_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/for_user_education.json";
pub const COUNTIES_URL: &str =
    "https://cdn.freecodecamp.org/testable-projects-fcc/data/choropleth_map/counties.json";

/// ColorBrewer "Greens", lightest to darkest.
pub const SCHEME_GREENS: [&str; 9] = [
    "#f7fcf5", "#e5f5e0", "#c7e9c0", "#a1d99b", "#74c476", "#41ab5d", "#238b45", "#006d2c",
    "#00441b",
];

pub const PALETTE_SIZE: usize = SCHEME_GREENS.len();

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub map: MapConfig,
    pub output: OutputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InputConfig {
    /// URL or local path of the per-county statistics.
    pub education: String,
    /// URL or local path of the county/state topology.
    pub counties: String,
    pub timeout_secs: Option<u64>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            education: EDUCATION_URL.to_string(),
            counties: COUNTIES_URL.to_string(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self {
            top: 20.0,
            right: 60.0,
            bottom: 80.0,
            left: 80.0,
        }
    }
}

/// What to do with a county geometry that has no statistics row.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MissingDataPolicy {
    Fail,
    #[default]
    NoData,
    Propagate,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MapConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub title: String,
    pub subtitle: String,
    pub palette: Vec<String>,
    pub legend_offset_x: f64,
    pub legend_block_width: f64,
    pub legend_block_height: f64,
    pub missing_data: MissingDataPolicy,
    pub no_data_color: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 600.0,
            margin: Margin::default(),
            title: "United States Educational Attainment".to_string(),
            subtitle: "Percentage of adults age 25 and older with a bachelor's degree or higher (2010-2014)"
                .to_string(),
            palette: SCHEME_GREENS.iter().map(|c| c.to_string()).collect(),
            legend_offset_x: 400.0,
            legend_block_width: 40.0,
            legend_block_height: 15.0,
            missing_data: MissingDataPolicy::default(),
            no_data_color: "#cccccc".to_string(),
        }
    }
}

impl MapConfig {
    /// Top-left corner of the legend group in SVG coordinates.
    pub fn legend_origin(&self) -> (f64, f64) {
        (self.margin.left + self.legend_offset_x, self.margin.top)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub geojson: bool,
    pub csv: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            geojson: true,
            csv: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` when it exists, otherwise falls back to the built-in defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            tracing::info!(?path, "config file not found, using built-in defaults");
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.map.palette.len() != PALETTE_SIZE {
            bail!(
                "palette must have exactly {} colors, found {}",
                PALETTE_SIZE,
                self.map.palette.len()
            );
        }
        if self.map.width <= 0.0 || self.map.height <= 0.0 {
            bail!("map dimensions must be positive");
        }
        if self.map.legend_block_width <= 0.0 || self.map.legend_block_height <= 0.0 {
            bail!("legend block dimensions must be positive");
        }
        Ok(())
    }
}
