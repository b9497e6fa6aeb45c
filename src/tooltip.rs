//! Hover behavior as a pure function of the hovered county and the pointer event.

use serde::Serialize;

use crate::types::CountyFeature;

pub const VISIBLE_OPACITY: f64 = 0.7;
pub const FADE_IN_MS: u32 = 200;
pub const FADE_OUT_MS: u32 = 500;
pub const OFFSET_X: f64 = 14.0;
pub const OFFSET_Y: f64 = -28.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Enter { page_x: f64, page_y: f64 },
    Leave,
}

/// What the tooltip element should do in response to a pointer event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TooltipInstruction {
    Show {
        text: String,
        education: Option<f64>,
        left_px: f64,
        top_px: f64,
        opacity: f64,
        transition_ms: u32,
    },
    Hide {
        opacity: f64,
        transition_ms: u32,
    },
}

impl TooltipInstruction {
    pub fn opacity(&self) -> f64 {
        match self {
            TooltipInstruction::Show { opacity, .. } | TooltipInstruction::Hide { opacity, .. } => {
                *opacity
            }
        }
    }
}

/// Rounds to one decimal place, half away from zero.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `"{county}, {state}: {percentage}%"`, or `": no data"` when the county has no statistics.
pub fn tooltip_text(feature: &CountyFeature) -> String {
    match feature.percentage {
        Some(p) => format!(
            "{}, {}: {}%",
            feature.county_label(),
            feature.state_label(),
            round1(p)
        ),
        None => format!("{}, {}: no data", feature.county_label(), feature.state_label()),
    }
}

pub fn hover(feature: &CountyFeature, event: PointerEvent) -> TooltipInstruction {
    match event {
        PointerEvent::Enter { page_x, page_y } => TooltipInstruction::Show {
            text: tooltip_text(feature),
            education: feature.percentage,
            left_px: page_x + OFFSET_X,
            top_px: page_y + OFFSET_Y,
            opacity: VISIBLE_OPACITY,
            transition_ms: FADE_IN_MS,
        },
        PointerEvent::Leave => TooltipInstruction::Hide {
            opacity: 0.0,
            transition_ms: FADE_OUT_MS,
        },
    }
}
