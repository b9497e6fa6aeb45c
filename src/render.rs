use anyhow::Result;
use geo::{LineString, MultiLineString, MultiPolygon};
use rayon::prelude::*;
use std::fmt::Write as FmtWrite;

use crate::config::{MapConfig, MissingDataPolicy};
use crate::pipeline::ChoroplethMap;
use crate::scale::format_percent;
use crate::tooltip::{self, tooltip_text};

const TICK_SIZE: f64 = 2.0;
const TICK_PADDING: f64 = 5.0;

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Shortest decimal form with at most three fractional digits.
fn num(value: f64) -> String {
    let mut s = format!("{:.3}", value);
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}

fn push_ring(d: &mut String, ring: &LineString<f64>, close: bool) {
    let mut coords: &[geo::Coord<f64>] = &ring.0;
    if close && coords.len() > 1 && coords.first() == coords.last() {
        coords = &coords[..coords.len() - 1];
    }
    for (i, c) in coords.iter().enumerate() {
        d.push(if i == 0 { 'M' } else { 'L' });
        d.push_str(&num(c.x));
        d.push(',');
        d.push_str(&num(c.y));
    }
    if close && !coords.is_empty() {
        d.push('Z');
    }
}

/// SVG path data for a polygonal geometry; every ring is closed with `Z`.
pub fn polygon_path(geometry: &MultiPolygon<f64>) -> String {
    let mut d = String::new();
    for polygon in geometry {
        push_ring(&mut d, polygon.exterior(), true);
        for interior in polygon.interiors() {
            push_ring(&mut d, interior, true);
        }
    }
    d
}

/// SVG path data for open line work such as borders.
pub fn line_path(lines: &MultiLineString<f64>) -> String {
    let mut d = String::new();
    for line in lines {
        push_ring(&mut d, line, false);
    }
    d
}

fn legend_block_title(lower: Option<f64>, upper: Option<f64>) -> String {
    match (lower, upper) {
        (None, Some(u)) => format!("below {}%", tooltip::round1(u)),
        (Some(l), Some(u)) => format!("{}% to {}%", tooltip::round1(l), tooltip::round1(u)),
        (Some(l), None) => format!("{}% and above", tooltip::round1(l)),
        (None, None) => "all counties".to_string(),
    }
}

fn render_legend(svg: &mut String, config: &MapConfig, map: &ChoroplethMap) -> Result<()> {
    let (x, y) = config.legend_origin();
    let w = config.legend_block_width;
    let h = config.legend_block_height;

    writeln!(svg, r#"<g id="legend" transform="translate({},{})">"#, num(x), num(y))?;
    for (i, block) in map.legend.blocks.iter().enumerate() {
        writeln!(
            svg,
            r#"<rect class="legend-color" height="{}" width="{}" x="{}" fill="{}" stroke="gray"><title>{}</title></rect>"#,
            num(h),
            num(w),
            num(i as f64 * w),
            escape(&block.color),
            escape(&legend_block_title(block.quantile_lower, block.quantile_upper))
        )?;
    }

    let axis = map.legend.axis(w);
    writeln!(
        svg,
        r#"<g class="legend-axis" transform="translate(0,{})" fill="none" font-size="10" font-family="sans-serif" text-anchor="middle">"#,
        num(h)
    )?;
    for tick in map.legend.tick_values() {
        let fraction = tick / 100.0;
        writeln!(
            svg,
            r#"<g class="tick" transform="translate({},0)"><line stroke="currentColor" y2="{}"></line><text fill="currentColor" y="{}" dy="0.71em">{}</text></g>"#,
            num(axis.position(fraction)),
            num(TICK_SIZE),
            num(TICK_SIZE + TICK_PADDING),
            format_percent(fraction)
        )?;
    }
    writeln!(svg, "</g>")?;
    writeln!(svg, "</g>")?;
    Ok(())
}

fn render_counties(svg: &mut String, map: &ChoroplethMap) {
    let paths: Vec<String> = map
        .counties
        .par_iter()
        .map(|county| {
            let fill = match map.fill(county) {
                Some(color) => format!(r#" fill="{}""#, escape(&color)),
                None => String::new(),
            };
            let title = match (county.percentage, map.missing_data) {
                (Some(p), _) => format!("{}%", p),
                (None, MissingDataPolicy::Propagate) => "undefined%".to_string(),
                (None, _) => "no data".to_string(),
            };
            format!(
                r#"<path class="county"{} data-fips="{}" data-education="{}" data-county="{}" data-state="{}" data-tooltip="{}" d="{}"><title>{}</title></path>"#,
                fill,
                county.fips,
                escape(&map.education_attr(county)),
                escape(county.county_label()),
                escape(county.state_label()),
                escape(&tooltip_text(county)),
                polygon_path(&county.geometry),
                escape(&title)
            )
        })
        .collect();

    svg.push_str("<g class=\"counties\">\n");
    for path in paths {
        svg.push_str(&path);
        svg.push('\n');
    }
    svg.push_str("</g>\n");
}

/// Legend, county shapes and the state border overlay, in drawing order.
pub fn render_svg(config: &MapConfig, map: &ChoroplethMap) -> Result<String> {
    let mut svg = String::with_capacity(4 * 1024 * 1024);
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" class="choropleth-map" width="{}" height="{}">"#,
        num(config.width),
        num(config.height)
    )?;
    render_legend(&mut svg, config, map)?;
    render_counties(&mut svg, map);
    writeln!(
        svg,
        r##"<path class="states" fill="none" stroke="#fff" stroke-linejoin="round" d="{}"></path>"##,
        line_path(&map.state_borders)
    )?;
    writeln!(svg, "</svg>")?;
    Ok(svg)
}

const HOVER_SCRIPT: &str = r#"<script>
(() => {
  const tip = document.getElementById("tooltip");
  document.querySelectorAll("path.county").forEach((shape) => {
    shape.addEventListener("mouseover", (event) => {
      tip.style.transition = "opacity __FADE_IN__ms";
      tip.style.opacity = __OPACITY__;
      tip.textContent = shape.dataset.tooltip;
      tip.setAttribute("data-education", shape.dataset.education);
      tip.style.left = event.pageX + (__OFFSET_X__) + "px";
      tip.style.top = event.pageY + (__OFFSET_Y__) + "px";
    });
    shape.addEventListener("mouseout", () => {
      tip.style.transition = "opacity __FADE_OUT__ms";
      tip.style.opacity = 0;
    });
  });
})();
</script>"#;

fn write_head(html: &mut String, title: &str) -> Result<()> {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\">")?;
    writeln!(html, "<head>")?;
    writeln!(html, "<meta charset=\"utf-8\"/>")?;
    writeln!(html, "<title>{}</title>", escape(title))?;
    writeln!(html, "<style>")?;
    writeln!(html, "body{{font-family:Arial,Helvetica,sans-serif;margin:0;}}")?;
    writeln!(html, "main{{display:flex;flex-direction:column;align-items:center;}}")?;
    writeln!(html, "header{{text-align:center;}}")?;
    writeln!(html, ".county:hover{{stroke:#333;stroke-width:0.5;}}")?;
    writeln!(
        html,
        "#tooltip{{position:absolute;pointer-events:none;padding:6px 10px;background:#222;color:#fff;border-radius:4px;font-size:12px;}}"
    )?;
    writeln!(html, ".error{{color:#c00000;border:1px solid #c00000;padding:12px 16px;max-width:800px;white-space:pre-wrap;}}")?;
    writeln!(html, "</style>")?;
    writeln!(html, "</head>")?;
    Ok(())
}

fn write_header(html: &mut String, config: &MapConfig) -> Result<()> {
    writeln!(html, "<header>")?;
    writeln!(
        html,
        "<h1 id=\"title\" style=\"margin:20px 0 5px 0\">{}</h1>",
        escape(&config.title)
    )?;
    writeln!(
        html,
        "<h3 id=\"description\" style=\"margin:5px 0 10px 0\">{}</h3>",
        escape(&config.subtitle)
    )?;
    writeln!(html, "</header>")?;
    Ok(())
}

/// Full page: header, embedded SVG, hidden tooltip and the hover wiring.
pub fn render_page(config: &MapConfig, svg: &str) -> Result<String> {
    let mut html = String::with_capacity(svg.len() + 8 * 1024);
    write_head(&mut html, &config.title)?;
    writeln!(html, "<body>")?;
    writeln!(html, "<main>")?;
    write_header(&mut html, config)?;
    html.push_str(svg);
    writeln!(html, "</main>")?;
    writeln!(html, "<div id=\"tooltip\" style=\"opacity:0\"></div>")?;
    let script = HOVER_SCRIPT
        .replace("__FADE_IN__", &tooltip::FADE_IN_MS.to_string())
        .replace("__FADE_OUT__", &tooltip::FADE_OUT_MS.to_string())
        .replace("__OPACITY__", &tooltip::VISIBLE_OPACITY.to_string())
        .replace("__OFFSET_X__", &tooltip::OFFSET_X.to_string())
        .replace("__OFFSET_Y__", &tooltip::OFFSET_Y.to_string());
    writeln!(html, "{}", script)?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}

pub fn render_error_page(config: &MapConfig, err: &anyhow::Error) -> Result<String> {
    let mut html = String::new();
    write_head(&mut html, &config.title)?;
    writeln!(html, "<body>")?;
    writeln!(html, "<main>")?;
    write_header(&mut html, config)?;
    writeln!(
        html,
        "<div class=\"error\" id=\"error\">The map could not be rendered.\n{}</div>",
        escape(&format!("{:#}", err))
    )?;
    writeln!(html, "</main>")?;
    writeln!(html, "</body>")?;
    writeln!(html, "</html>")?;
    Ok(html)
}
