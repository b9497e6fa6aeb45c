//! Quantile color scale and the evenly spaced legend drawn beside it.

use serde::Serialize;

use crate::error::{ChoroplethError, Result};
use crate::stats::Bounds;

/// Maps a percentage to one of `palette.len()` colors so that each color
/// covers (as near as possible) the same number of observed counties.
#[derive(Debug, Clone)]
pub struct QuantileScale {
    thresholds: Vec<f64>,
    palette: Vec<String>,
}

impl QuantileScale {
    pub fn new<I>(values: I, palette: &[String]) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        if palette.is_empty() {
            return Err(ChoroplethError::EmptyPalette);
        }
        let mut sorted: Vec<f64> = values.into_iter().collect();
        sorted.sort_by(f64::total_cmp);

        let (first, last) = match (sorted.first(), sorted.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return Err(ChoroplethError::EmptyStatistics),
        };
        if first == last {
            return Err(ChoroplethError::DegenerateRange { value: first });
        }

        // Bucket j starts at rank ceil(j * n / k); a value falls in the
        // last bucket whose starting value it reaches.
        let n = sorted.len();
        let k = palette.len();
        let thresholds = (1..k)
            .map(|j| sorted[((j * n).div_ceil(k)).min(n - 1)])
            .collect();

        Ok(Self {
            thresholds,
            palette: palette.to_vec(),
        })
    }

    pub fn bucket(&self, value: f64) -> usize {
        self.thresholds.partition_point(|t| *t <= value)
    }

    pub fn color(&self, value: f64) -> &str {
        &self.palette[self.bucket(value)]
    }

    /// How many of `values` land in each bucket.
    pub fn bucket_counts<I>(&self, values: I) -> Vec<usize>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut counts = vec![0; self.palette.len()];
        for value in values {
            counts[self.bucket(value)] += 1;
        }
        counts
    }

    pub fn palette(&self) -> &[String] {
        &self.palette
    }

    /// Inner bucket boundaries, ascending; `palette.len() - 1` of them.
    pub fn thresholds(&self) -> &[f64] {
        &self.thresholds
    }

    /// Half-open `[lower, upper)` range of values assigned to `bucket`.
    /// The first bucket is unbounded below and the last unbounded above.
    pub fn bucket_range(&self, bucket: usize) -> (Option<f64>, Option<f64>) {
        let lower = bucket.checked_sub(1).and_then(|i| self.thresholds.get(i)).copied();
        let upper = self.thresholds.get(bucket).copied();
        (lower, upper)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendBlock {
    /// Evenly spaced breakpoint this block starts at.
    pub lower: f64,
    pub upper: f64,
    pub color: String,
    /// Values the quantile scale actually paints with `color`.
    pub quantile_lower: Option<f64>,
    pub quantile_upper: Option<f64>,
}

/// Legend breakpoints: a linear subdivision of `[min, max]` into one block per color.
#[derive(Debug, Clone, Serialize)]
pub struct Legend {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub blocks: Vec<LegendBlock>,
}

impl Legend {
    pub fn new(bounds: Bounds, scale: &QuantileScale) -> Result<Self> {
        let Bounds { min, max } = bounds;
        if max <= min {
            return Err(ChoroplethError::DegenerateRange { value: min });
        }
        let k = scale.palette().len();
        let step = (max - min) / k as f64;

        let blocks = (0..k)
            .map(|i| {
                let (quantile_lower, quantile_upper) = scale.bucket_range(i);
                LegendBlock {
                    lower: min + i as f64 * step,
                    upper: if i + 1 == k {
                        max
                    } else {
                        min + (i + 1) as f64 * step
                    },
                    color: scale.palette()[i].clone(),
                    quantile_lower,
                    quantile_upper,
                }
            })
            .collect();

        Ok(Self {
            min,
            max,
            step,
            blocks,
        })
    }

    /// Block start values: ascending, within `[min, max)`.
    pub fn breakpoints(&self) -> Vec<f64> {
        self.blocks.iter().map(|b| b.lower).collect()
    }

    /// Block end values: from `min + step` up to exactly `max`.
    pub fn upper_bounds(&self) -> Vec<f64> {
        self.blocks.iter().map(|b| b.upper).collect()
    }

    /// Axis tick values: every breakpoint followed by `max`.
    pub fn tick_values(&self) -> Vec<f64> {
        let mut ticks = self.breakpoints();
        ticks.push(self.max);
        ticks
    }

    pub fn axis(&self, block_width: f64) -> LegendAxis {
        LegendAxis {
            domain: (self.min / 100.0, self.max / 100.0),
            range: (0.0, block_width * self.blocks.len() as f64),
        }
    }
}

/// Linear mapping from a percentage expressed as a fraction to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendAxis {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LegendAxis {
    pub fn position(&self, fraction: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        r0 + (fraction - d0) / (d1 - d0) * (r1 - r0)
    }
}

/// Formats a fraction as a whole-number percentage, e.g. `0.261` → `"26%"`.
pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}
