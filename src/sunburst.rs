//! Radial tree rendering for a [`FlattenedTree`].
//!
//! Every root of the flattened tree sits on the innermost ring and each
//! generation below it one ring further out. A node's angular span is
//! proportional to the number of leaves under it, so a whole branch always
//! fits inside its ancestor's wedge.

use crate::flatten::FlattenedTree;
use crate::person::Sex;
use crate::session::RenderContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::f64::consts::TAU;

pub const DEFAULT_MALE_COLOR: &str = "#b3e0ff";
pub const DEFAULT_FEMALE_COLOR: &str = "#fce4ec";

/// Hex colour in `#rrggbb` form
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HexColor(pub u8, pub u8, pub u8);

impl HexColor {
    pub fn parse(raw: &str) -> Option<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
        Some(HexColor(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Fill colour per sex
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SexColors {
    pub male: HexColor,
    pub female: HexColor,
}

impl Default for SexColors {
    fn default() -> Self {
        SexColors {
            male: HexColor(0xb3, 0xe0, 0xff),
            female: HexColor(0xfc, 0xe4, 0xec),
        }
    }
}

impl SexColors {
    /// Builds a palette from picker values, keeping the default for any
    /// value that is not a valid hex colour
    pub fn from_hex(male: Option<&str>, female: Option<&str>) -> Self {
        let defaults = SexColors::default();
        SexColors {
            male: male.and_then(HexColor::parse).unwrap_or(defaults.male),
            female: female.and_then(HexColor::parse).unwrap_or(defaults.female),
        }
    }

    pub fn for_sex(&self, sex: Sex) -> HexColor {
        match sex {
            Sex::Male | Sex::Unknown => self.male,
            Sex::Female => self.female,
        }
    }
}

/// Placement of one flattened node
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Wedge {
    /// Position of the node in the flattened sequences
    pub index: usize,
    /// 1 for layout roots, increasing outwards
    pub ring: u32,
    /// Radians, clockwise from twelve o'clock
    pub start: f64,
    pub end: f64,
    /// Leaves under this node, itself if it has no children
    pub leaves: usize,
}

impl Wedge {
    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    pub fn mid_angle(&self) -> f64 {
        (self.start + self.end) / 2.0
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SunburstLayout {
    /// One wedge per flattened node, same order as the tree
    pub wedges: Vec<Wedge>,
    pub rings: u32,
}

/// Computes ring and angle for every node of `tree`
///
/// A node whose parent id cannot be found is treated as a layout root.
pub fn layout(tree: &FlattenedTree) -> SunburstLayout {
    let count = tree.len();
    if count == 0 {
        return SunburstLayout::default();
    }

    let position: HashMap<&str, usize> = tree
        .ids
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();

    let mut parent_of: Vec<Option<usize>> = vec![None; count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (i, parent) in tree.parents.iter().enumerate() {
        if let Some(&p) = position.get(parent.as_str()) {
            if p < i {
                parent_of[i] = Some(p);
                children[p].push(i);
            }
        }
    }

    // Parents precede children, so a reverse sweep sees every child first
    let mut leaves = vec![0usize; count];
    for i in (0..count).rev() {
        if children[i].is_empty() {
            leaves[i] = 1;
        }
        if let Some(p) = parent_of[i] {
            leaves[p] += leaves[i];
        }
    }

    let roots: Vec<usize> = (0..count).filter(|&i| parent_of[i].is_none()).collect();
    let total: usize = roots.iter().map(|&r| leaves[r]).sum();

    let mut wedges: Vec<Option<Wedge>> = vec![None; count];
    let mut stack: Vec<(usize, u32, f64, f64)> = Vec::new();
    let mut cursor = 0.0;
    for &root in &roots {
        let span = TAU * leaves[root] as f64 / total as f64;
        stack.push((root, 1, cursor, cursor + span));
        cursor += span;
    }

    let mut rings = 0;
    while let Some((node, ring, start, end)) = stack.pop() {
        rings = rings.max(ring);
        wedges[node] = Some(Wedge {
            index: node,
            ring,
            start,
            end,
            leaves: leaves[node],
        });

        let mut child_start = start;
        for &child in &children[node] {
            let span = (end - start) * leaves[child] as f64 / leaves[node] as f64;
            stack.push((child, ring + 1, child_start, child_start + span));
            child_start += span;
        }
    }

    SunburstLayout {
        wedges: wedges.into_iter().flatten().collect(),
        rings,
    }
}

/// Point on a circle, angles clockwise from twelve o'clock
pub fn polar(center: (f64, f64), radius: f64, angle: f64) -> (i32, i32) {
    (
        (center.0 + radius * angle.sin()).round() as i32,
        (center.1 - radius * angle.cos()).round() as i32,
    )
}

/// Outline of an annular sector, inner arc then outer arc reversed
pub fn wedge_outline(center: (f64, f64), inner: f64, outer: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = ((end - start) / (TAU / 180.0)).ceil().max(2.0) as usize;
    let angle_at = |k: usize| start + (end - start) * k as f64 / steps as f64;

    let mut points = Vec::with_capacity(2 * (steps + 1));
    if inner > 0.0 {
        points.extend((0..=steps).map(|k| polar(center, inner, angle_at(k))));
    } else {
        points.push(polar(center, 0.0, start));
    }
    points.extend((0..=steps).rev().map(|k| polar(center, outer, angle_at(k))));
    points
}

/// Ring geometry for a canvas of the given side
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RingGeometry {
    pub center: (f64, f64),
    pub ring_width: f64,
}

impl RingGeometry {
    const MARGIN: f64 = 10.0;

    pub fn new(size: u32, rings: u32) -> Self {
        let half = size as f64 / 2.0;
        RingGeometry {
            center: (half, half),
            ring_width: (half - Self::MARGIN).max(1.0) / rings.max(1) as f64,
        }
    }

    // The first ring is a full disc when there is a single root
    pub fn radii(&self, ring: u32) -> (f64, f64) {
        let inner = self.ring_width * (ring - 1) as f64;
        (inner, inner + self.ring_width)
    }
}

/// Fits `label` into a wedge, dropping trailing words and then characters
pub fn fit_label(label: &str, max_chars: usize) -> Option<String> {
    if max_chars < 2 {
        return None;
    }
    if label.chars().count() <= max_chars {
        return Some(label.to_string());
    }

    let mut fitted = String::new();
    for word in label.split(' ') {
        let candidate = if fitted.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", fitted, word)
        };
        if candidate.chars().count() > max_chars {
            break;
        }
        fitted = candidate;
    }

    if fitted.is_empty() {
        fitted = label.chars().take(max_chars - 1).collect();
        fitted.push('…');
    }
    Some(fitted)
}

#[cfg(feature = "web")]
pub use render::{render_png, render_rgb, render_svg};

#[cfg(feature = "web")]
mod render {
    use super::*;
    use crate::graph::encode_png;
    use plotters::coord::Shift;
    use plotters::prelude::*;
    use plotters::style::text_anchor::{HPos, Pos, VPos};
    use std::error::Error;

    // Average glyph width relative to font size, for label fitting
    const GLYPH_WIDTH: f64 = 0.6;

    fn rgb(color: HexColor) -> RGBColor {
        RGBColor(color.0, color.1, color.2)
    }

    fn draw<DB>(
        area: &DrawingArea<DB, Shift>,
        tree: &FlattenedTree,
        colors: &SexColors,
        context: &RenderContext,
    ) -> Result<SunburstLayout, Box<dyn Error>>
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        area.fill(&WHITE)?;

        let layout = layout(tree);
        let geometry = RingGeometry::new(context.canvas_size(), layout.rings);
        let font_size = context.font_size();
        let stroke = ShapeStyle {
            color: RGBColor(128, 128, 128).to_rgba(),
            filled: false,
            stroke_width: ((1.5 * context.zoom).round() as u32).max(1),
        };
        let text_style = TextStyle::from(("sans-serif", font_size).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));

        for wedge in &layout.wedges {
            let (inner, outer) = geometry.radii(wedge.ring);
            let mut outline = wedge_outline(geometry.center, inner, outer, wedge.start, wedge.end);
            let fill = rgb(colors.for_sex(tree.sexes[wedge.index]));

            area.draw(&Polygon::new(outline.clone(), fill.filled()))?;
            if let Some(first) = outline.first().copied() {
                outline.push(first);
            }
            area.draw(&PathElement::new(outline, stroke))?;
        }

        for wedge in &layout.wedges {
            let (inner, outer) = geometry.radii(wedge.ring);
            let mid_radius = if inner == 0.0 && wedge.span() >= TAU - 1e-9 {
                0.0
            } else {
                (inner + outer) / 2.0
            };
            let available = if mid_radius == 0.0 {
                outer * 2.0
            } else {
                (wedge.span() * mid_radius).min(outer * 2.0)
            };
            let max_chars = (available / (font_size as f64 * GLYPH_WIDTH)) as usize;

            if let Some(text) = fit_label(&tree.labels[wedge.index], max_chars) {
                let at = polar(geometry.center, mid_radius, wedge.mid_angle());
                area.draw(&Text::new(text, at, text_style.clone()))?;
            }
        }

        area.present()?;
        Ok(layout)
    }

    /// Renders the tree as an SVG document with a hover tooltip per wedge
    pub fn render_svg(
        tree: &FlattenedTree,
        colors: &SexColors,
        context: &RenderContext,
    ) -> Result<String, Box<dyn Error>> {
        let size = context.canvas_size();
        let mut svg = String::new();
        let layout = {
            let area = SVGBackend::with_string(&mut svg, (size, size)).into_drawing_area();
            draw(&area, tree, colors, context)?
        };

        let geometry = RingGeometry::new(size, layout.rings);
        let mut overlay = String::from("<g class=\"tooltips\">\n");
        for wedge in &layout.wedges {
            let (inner, outer) = geometry.radii(wedge.ring);
            let points: Vec<String> = wedge_outline(geometry.center, inner, outer, wedge.start, wedge.end)
                .iter()
                .map(|(x, y)| format!("{},{}", x, y))
                .collect();
            overlay.push_str(&format!(
                "<polygon points=\"{}\" fill=\"transparent\" data-id=\"{}\"><title>{}</title></polygon>\n",
                points.join(" "),
                escape_xml(&tree.ids[wedge.index]),
                escape_xml(&tree.hover_texts[wedge.index]),
            ));
        }
        overlay.push_str("</g>\n");

        match svg.rfind("</svg>") {
            Some(end) => svg.insert_str(end, &overlay),
            None => return Err("renderer produced no closing svg tag".into()),
        }
        Ok(svg)
    }

    /// Renders the tree into a packed RGB buffer, returning it with its side
    pub fn render_rgb(
        tree: &FlattenedTree,
        colors: &SexColors,
        context: &RenderContext,
    ) -> Result<(Vec<u8>, u32), Box<dyn Error>> {
        let size = context.canvas_size();
        let mut buffer = vec![0u8; (size * size * 3) as usize];
        {
            let area = BitMapBackend::with_buffer(&mut buffer, (size, size)).into_drawing_area();
            draw(&area, tree, colors, context)?;
        }
        Ok((buffer, size))
    }

    pub fn render_png(
        tree: &FlattenedTree,
        colors: &SexColors,
        context: &RenderContext,
    ) -> Result<Vec<u8>, Box<dyn Error>> {
        let (buffer, size) = render_rgb(tree, colors, context)?;
        encode_png(buffer, size, size)
    }

    fn escape_xml(text: &str) -> String {
        text.replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;")
            .replace('"', "&quot;")
            .replace('\n', "&#10;")
    }
}
