use crate::pipeline::ChoroplethMap;
use crate::tooltip::{self, PointerEvent, TooltipInstruction};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use geo::{BoundingRect, Contains, Point};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info};

// Wrapper for RTree indexing
pub struct CountyIndex {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for CountyIndex {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

pub struct AppState {
    pub map: ChoroplethMap,
    pub tree: RTree<CountyIndex>,
}

impl AppState {
    pub fn new(map: ChoroplethMap) -> Self {
        let items: Vec<CountyIndex> = map
            .counties
            .iter()
            .enumerate()
            .filter_map(|(i, county)| {
                let rect = county.geometry.bounding_rect()?;
                Some(CountyIndex {
                    index: i,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();
        let tree = RTree::bulk_load(items);
        info!(counties = tree.size(), "built spatial index for hover queries");
        Self { map, tree }
    }

    /// County whose shape contains the SVG-space point `(x, y)`.
    pub fn locate(&self, x: f64, y: f64) -> Option<usize> {
        let point = Point::new(x, y);
        self.tree
            .locate_in_envelope_intersecting(&AABB::from_point([x, y]))
            .map(|candidate| candidate.index)
            .find(|&i| self.map.counties[i].geometry.contains(&point))
    }

    fn info(&self, i: usize) -> CountyInfo {
        let county = &self.map.counties[i];
        CountyInfo {
            fips: county.fips,
            county: county.county.clone(),
            state: county.state.clone(),
            education: county.percentage.map(tooltip::round1),
            fill: self.map.fill(county),
            tooltip: tooltip::tooltip_text(county),
        }
    }

    fn position(&self, fips: u32) -> Option<usize> {
        self.map.counties.iter().position(|c| c.fips == fips)
    }
}

#[derive(Debug, Deserialize)]
pub struct PointQuery {
    x: f64,
    y: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HoverKind {
    Enter,
    Leave,
}

#[derive(Debug, Deserialize)]
pub struct HoverQuery {
    fips: u32,
    event: HoverKind,
    #[serde(default)]
    page_x: f64,
    #[serde(default)]
    page_y: f64,
}

impl HoverQuery {
    fn pointer_event(&self) -> PointerEvent {
        match self.event {
            HoverKind::Enter => PointerEvent::Enter {
                page_x: self.page_x,
                page_y: self.page_y,
            },
            HoverKind::Leave => PointerEvent::Leave,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CountyInfo {
    pub fips: u32,
    pub county: Option<String>,
    pub state: Option<String>,
    pub education: Option<f64>,
    pub fill: Option<String>,
    pub tooltip: String,
}

pub fn router(state: Arc<AppState>, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/county/:fips", get(county_handler))
        .route("/api/query", get(query_handler))
        .route("/api/hover", get(hover_handler))
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start_server(map: ChoroplethMap, static_dir: PathBuf, port: u16) -> Result<()> {
    let state = Arc::new(AppState::new(map));
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    println!("Starting server on http://{}", addr);

    let app = router(state, static_dir);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn county_handler(
    State(state): State<Arc<AppState>>,
    Path(fips): Path<u32>,
) -> Result<Json<CountyInfo>, StatusCode> {
    debug!(fips, "county lookup");
    state
        .position(fips)
        .map(|i| Json(state.info(i)))
        .ok_or(StatusCode::NOT_FOUND)
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PointQuery>,
) -> Json<Option<CountyInfo>> {
    debug!(x = params.x, y = params.y, "point query");
    Json(state.locate(params.x, params.y).map(|i| state.info(i)))
}

async fn hover_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HoverQuery>,
) -> Result<Json<TooltipInstruction>, StatusCode> {
    let i = state.position(params.fips).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(tooltip::hover(&state.map.counties[i], params.pointer_event())))
}
