//! TopoJSON decoding: shared arcs are stitched back into `geo` polygons for
//! per-county features, or kept as bare line strings for border meshes.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::{ChoroplethError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct Topology {
    pub objects: HashMap<String, TopoGeometry>,
    pub arcs: Vec<Vec<[f64; 2]>>,
    #[serde(default)]
    pub transform: Option<Transform>,
}

/// Quantization transform; when present, arc positions are delta-encoded integers.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Transform {
    pub scale: [f64; 2],
    pub translate: [f64; 2],
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GeometryId {
    Number(u64),
    Text(String),
}

impl GeometryId {
    pub fn fips(&self) -> Option<u32> {
        match self {
            GeometryId::Number(n) => u32::try_from(*n).ok(),
            GeometryId::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum TopoGeometry {
    GeometryCollection {
        geometries: Vec<TopoGeometry>,
    },
    Polygon {
        #[serde(default)]
        id: Option<GeometryId>,
        arcs: Vec<Vec<i64>>,
    },
    MultiPolygon {
        #[serde(default)]
        id: Option<GeometryId>,
        arcs: Vec<Vec<Vec<i64>>>,
    },
    #[serde(other)]
    Unsupported,
}

/// A polygonal geometry pulled out of a topology object.
#[derive(Debug, Clone)]
pub struct TopoFeature {
    pub id: Option<u32>,
    pub geometry: MultiPolygon<f64>,
}

impl Topology {
    pub fn object(&self, name: &str) -> Result<&TopoGeometry> {
        self.objects
            .get(name)
            .ok_or_else(|| ChoroplethError::MissingObject(name.to_string()))
    }

    /// Absolute coordinates of every arc, with the quantization undone.
    pub fn decoded_arcs(&self) -> Vec<Vec<Coord<f64>>> {
        self.arcs
            .iter()
            .map(|arc| match self.transform {
                Some(t) => {
                    let (mut x, mut y) = (0.0, 0.0);
                    arc.iter()
                        .map(|[dx, dy]| {
                            x += dx;
                            y += dy;
                            Coord {
                                x: x * t.scale[0] + t.translate[0],
                                y: y * t.scale[1] + t.translate[1],
                            }
                        })
                        .collect()
                }
                None => arc.iter().map(|[x, y]| Coord { x: *x, y: *y }).collect(),
            })
            .collect()
    }

    /// Converts every polygonal geometry under `object` into a feature.
    pub fn features(&self, object: &str) -> Result<Vec<TopoFeature>> {
        let arcs = self.decoded_arcs();
        let mut features = Vec::new();
        for geometry in flatten(self.object(object)?) {
            let (id, polygons) = match geometry {
                TopoGeometry::Polygon { id, arcs: rings } => (id, vec![polygon(&arcs, rings)?]),
                TopoGeometry::MultiPolygon { id, arcs: parts } => (
                    id,
                    parts
                        .iter()
                        .map(|rings| polygon(&arcs, rings))
                        .collect::<Result<Vec<_>>>()?,
                ),
                _ => continue,
            };
            features.push(TopoFeature {
                id: id.as_ref().and_then(GeometryId::fips),
                geometry: MultiPolygon::new(polygons),
            });
        }
        Ok(features)
    }

    /// Collects the arcs of `object` whose first and last referencing
    /// geometries (by index) satisfy `filter`. `|a, b| a != b` keeps only
    /// borders shared between two geometries. Lines come out in arc order,
    /// each in its stored direction regardless of how geometries reference it.
    pub fn mesh<F>(&self, object: &str, filter: F) -> Result<MultiLineString<f64>>
    where
        F: Fn(usize, usize) -> bool,
    {
        let decoded = self.decoded_arcs();
        let mut geoms_by_arc: HashMap<usize, Vec<usize>> = HashMap::new();

        let polygonal = flatten(self.object(object)?)
            .into_iter()
            .filter(|g| matches!(g, TopoGeometry::Polygon { .. } | TopoGeometry::MultiPolygon { .. }));
        for (geom_index, geometry) in polygonal.enumerate() {
            let refs: Vec<i64> = match geometry {
                TopoGeometry::Polygon { arcs, .. } => arcs.iter().flatten().copied().collect(),
                TopoGeometry::MultiPolygon { arcs, .. } => {
                    arcs.iter().flatten().flatten().copied().collect()
                }
                _ => continue,
            };
            for r in refs {
                let arc = arc_index(r);
                if arc >= decoded.len() {
                    return Err(ChoroplethError::InvalidArc { index: r });
                }
                let users = geoms_by_arc.entry(arc).or_default();
                if users.last() != Some(&geom_index) {
                    users.push(geom_index);
                }
            }
        }

        let mut kept: Vec<usize> = geoms_by_arc
            .into_iter()
            .filter(|(_, users)| match (users.first(), users.last()) {
                (Some(&a), Some(&b)) => filter(a, b),
                _ => false,
            })
            .map(|(arc, _)| arc)
            .collect();
        kept.sort_unstable();

        Ok(MultiLineString::new(
            kept.into_iter()
                .map(|arc| LineString::new(decoded[arc].clone()))
                .collect(),
        ))
    }
}

fn flatten(geometry: &TopoGeometry) -> Vec<&TopoGeometry> {
    match geometry {
        TopoGeometry::GeometryCollection { geometries } => {
            geometries.iter().flat_map(flatten).collect()
        }
        other => vec![other],
    }
}

fn arc_index(reference: i64) -> usize {
    if reference < 0 {
        (!reference) as usize
    } else {
        reference as usize
    }
}

fn ring(arcs: &[Vec<Coord<f64>>], refs: &[i64]) -> Result<LineString<f64>> {
    let mut points: Vec<Coord<f64>> = Vec::new();
    for &r in refs {
        let arc = arcs
            .get(arc_index(r))
            .ok_or(ChoroplethError::InvalidArc { index: r })?;
        // consecutive arcs share their joint point
        if !points.is_empty() {
            points.pop();
        }
        if r < 0 {
            points.extend(arc.iter().rev());
        } else {
            points.extend(arc.iter());
        }
    }
    Ok(LineString::new(points))
}

fn polygon(arcs: &[Vec<Coord<f64>>], rings: &[Vec<i64>]) -> Result<Polygon<f64>> {
    let mut rings = rings.iter().map(|refs| ring(arcs, refs));
    let exterior = match rings.next() {
        Some(exterior) => exterior?,
        None => LineString::new(Vec::new()),
    };
    let interiors = rings.collect::<Result<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}
