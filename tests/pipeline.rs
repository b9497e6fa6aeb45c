use edu_choropleth::config::{AppConfig, MissingDataPolicy};
use edu_choropleth::data::load_datasets;
use edu_choropleth::error::ChoroplethError;
use edu_choropleth::pipeline::{self, ChoroplethMap};
use edu_choropleth::tooltip::round1;
use std::fs;
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn scratch_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "edu-choropleth-{}-{}",
        label,
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn config(label: &str) -> AppConfig {
    let mut config = AppConfig::default();
    config.input.education = fixture("education.json").display().to_string();
    config.input.counties = fixture("counties.json").display().to_string();
    config.output.dir = scratch_dir(label);
    config
}

fn with_education(mut config: AppConfig, rows: &str) -> AppConfig {
    let path = config.output.dir.join("education-override.json");
    fs::write(&path, rows).unwrap();
    config.input.education = path.display().to_string();
    config
}

#[tokio::test]
async fn generate_writes_joined_and_colored_map() {
    let config = config("generate");
    let map = pipeline::run(&config).await.unwrap();

    assert_eq!(map.index.len(), 5);
    assert_eq!(map.index.duplicates(), 1);
    assert_eq!(map.index.get(1001), Some(21.9));
    assert_eq!(map.counties.len(), 4);
    assert_eq!(map.bucket_counts().iter().sum::<usize>(), 5);

    let written = pipeline::write_outputs(&config, &map).unwrap();
    assert_eq!(written.len(), 4);

    let html = fs::read_to_string(config.output.dir.join("index.html")).unwrap();
    assert!(html.contains(r#"<h1 id="title""#));
    assert!(html.contains(r#"<div id="tooltip" style="opacity:0"></div>"#));
    assert!(html.contains(
        r##"<path class="county" fill="#a1d99b" data-fips="1001" data-education="21.9" data-county="Autauga County" data-state="AL" data-tooltip="Autauga County, AL: 21.9%" d="M0,100L0,0L100,0L100,100Z"><title>21.9%</title></path>"##
    ));
    assert!(html.contains(r##"fill="#00441b" data-fips="2020" data-education="45""##));
    assert!(html.contains(r#"<g id="legend" transform="translate(480,20)">"#));
    assert_eq!(html.matches(r#"class="legend-color""#).count(), 9);
    assert_eq!(html.matches(r#"class="tick""#).count(), 10);
    assert!(html.contains(r#"<path class="states" fill="none""#));
    assert!(html.contains(r#"d="M0,100L100,100M100,100L200,100""#));

    // legend is drawn before counties, borders after
    let legend_at = html.find(r#"id="legend""#).unwrap();
    let county_at = html.find(r#"class="county""#).unwrap();
    let states_at = html.find(r#"class="states""#).unwrap();
    assert!(legend_at < county_at && county_at < states_at);

    let svg = fs::read_to_string(config.output.dir.join("choropleth.svg")).unwrap();
    assert!(svg.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));

    let csv = fs::read_to_string(config.output.dir.join("counties.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("fips,state,county,education,bucket,fill"));
    assert_eq!(lines.next(), Some("1001,AL,Autauga County,21.9,3,#a1d99b"));

    let geojson: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(config.output.dir.join("counties.geojson")).unwrap(),
    )
    .unwrap();
    assert_eq!(geojson["type"], "FeatureCollection");
    assert_eq!(geojson["features"].as_array().unwrap().len(), 4);
    assert_eq!(geojson["features"][1]["properties"]["county"], "Baldwin County");
    assert_eq!(geojson["features"][1]["properties"]["fill"], "#41ab5d");
}

#[tokio::test]
async fn rendered_percentages_match_the_index() {
    let config = with_education(
        config("percentages"),
        r#"[{"fips":1001,"state":"AL","area_name":"Autauga County","bachelorsOrHigher":21.96},
            {"fips":1003,"state":"AL","area_name":"Baldwin County","bachelorsOrHigher":"26.74"},
            {"fips":2010,"state":"AK","area_name":"Aleutians East Borough","bachelorsOrHigher":10.25},
            {"fips":2020,"state":"AK","area_name":"Anchorage Municipality","bachelorsOrHigher":45.0}]"#,
    );
    let map = pipeline::run(&config).await.unwrap();
    for county in &map.counties {
        let expected = round1(map.index.get(county.fips).unwrap());
        assert_eq!(map.education_attr(county), expected.to_string());
    }

    pipeline::write_outputs(&config, &map).unwrap();
    let html = fs::read_to_string(config.output.dir.join("index.html")).unwrap();
    assert!(html.contains(
        r#"data-fips="1001" data-education="22" data-county="Autauga County" data-state="AL" data-tooltip="Autauga County, AL: 22%""#
    ));
    assert!(html.contains("<title>21.96%</title>"));
    assert!(html.contains(r#"data-fips="1003" data-education="26.7""#));
    assert!(html.contains(r#"data-tooltip="Baldwin County, AL: 26.7%""#));
}

#[tokio::test]
async fn empty_palette_is_a_build_error() {
    let mut config = config("palette");
    config.map.palette.clear();
    let datasets = load_datasets(&config.input).await.unwrap();
    let err = ChoroplethMap::build(datasets, &config.map).unwrap_err();
    assert!(matches!(err, ChoroplethError::EmptyPalette));
}

#[tokio::test]
async fn missing_statistics_render_as_no_data_by_default() {
    let config = with_education(
        config("nodata"),
        r#"[{"fips":1001,"state":"AL","area_name":"Autauga County","bachelorsOrHigher":21.9},
            {"fips":1003,"state":"AL","area_name":"Baldwin County","bachelorsOrHigher":26.7},
            {"fips":2010,"state":"AK","area_name":"Aleutians East Borough","bachelorsOrHigher":10.2}]"#,
    );
    let map = pipeline::run(&config).await.unwrap();
    let anchorage = map.counties.iter().find(|c| c.fips == 2020).unwrap();
    assert_eq!(anchorage.percentage, None);
    assert_eq!(map.fill(anchorage).as_deref(), Some("#cccccc"));

    pipeline::write_outputs(&config, &map).unwrap();
    let html = fs::read_to_string(config.output.dir.join("index.html")).unwrap();
    assert!(html.contains(
        r##"fill="#cccccc" data-fips="2020" data-education="NA" data-county="Unknown county""##
    ));
}

#[tokio::test]
async fn missing_statistics_can_propagate_or_fail() {
    let rows = r#"[{"fips":1001,"state":"AL","area_name":"Autauga County","bachelorsOrHigher":21.9},
                   {"fips":1003,"state":"AL","area_name":"Baldwin County","bachelorsOrHigher":26.7}]"#;

    let mut propagate = with_education(config("propagate"), rows);
    propagate.map.missing_data = MissingDataPolicy::Propagate;
    let map = pipeline::run(&propagate).await.unwrap();
    let svg = edu_choropleth::render::render_svg(&propagate.map, &map).unwrap();
    assert!(svg.contains(r#"<path class="county" data-fips="2010" data-education="undefined""#));
    assert!(svg.contains("<title>undefined%</title>"));

    let mut fail = with_education(config("fail"), rows);
    fail.map.missing_data = MissingDataPolicy::Fail;
    let datasets = load_datasets(&fail.input).await.unwrap();
    let err = ChoroplethMap::build(datasets, &fail.map).unwrap_err();
    assert!(matches!(err, ChoroplethError::MissingStatistics { fips: 2010 | 2020 }));
}

#[tokio::test]
async fn degenerate_range_fails_with_diagnostic_and_error_page() {
    let config = with_education(
        config("degenerate"),
        r#"[{"fips":1001,"state":"AL","area_name":"Autauga County","bachelorsOrHigher":20.0},
            {"fips":1003,"state":"AL","area_name":"Baldwin County","bachelorsOrHigher":"20.0"}]"#,
    );
    let err = pipeline::run(&config).await.unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("same percentage (20)"), "{message}");

    let page = pipeline::write_error_page(&config, &err).unwrap();
    let html = fs::read_to_string(page).unwrap();
    assert!(html.contains("The map could not be rendered."));
    assert!(!html.contains("<svg"));
}

#[tokio::test]
async fn non_numeric_percentage_is_rejected() {
    let config = with_education(
        config("nonnumeric"),
        r#"[{"fips":1001,"state":"AL","area_name":"Autauga County","bachelorsOrHigher":"twenty"}]"#,
    );
    let err = pipeline::run(&config).await.unwrap_err();
    let cause = err.downcast_ref::<ChoroplethError>().unwrap();
    assert!(matches!(cause, ChoroplethError::InvalidPercentage { fips: 1001, .. }));
}

#[tokio::test]
async fn unreachable_source_aborts_before_rendering() {
    let mut config = config("unreachable");
    config.input.counties = config.output.dir.join("nope.json").display().to_string();
    let err = pipeline::run(&config).await.unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to load datasets"));
    assert!(!config.output.dir.join("choropleth.svg").exists());
}
