//! Typeface JSON fonts (the facetype.js format): glyph outlines in font
//! units, laid out into closed 2D contours.

use std::collections::HashMap;
use std::str::SplitWhitespace;

use glam::Vec2;
use serde::Deserialize;

use crate::error::AssetError;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "yMin")]
    pub y_min: f32,
    #[serde(rename = "yMax")]
    pub y_max: f32,
}

#[derive(Debug, Deserialize)]
struct RawGlyph {
    ha: f32,
    #[serde(default)]
    o: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTypeface {
    glyphs: HashMap<String, RawGlyph>,
    resolution: f32,
    #[serde(rename = "boundingBox")]
    bounding_box: BoundingBox,
    #[serde(rename = "underlineThickness", default)]
    underline_thickness: f32,
    #[serde(rename = "familyName", default)]
    family_name: String,
}

/// One outline command, end point first like the file stores it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    Move(Vec2),
    Line(Vec2),
    Quad { to: Vec2, ctrl: Vec2 },
    Cubic { to: Vec2, ctrl1: Vec2, ctrl2: Vec2 },
}

#[derive(Debug, Clone)]
pub struct Glyph {
    /// Horizontal advance in font units.
    pub advance: f32,
    pub commands: Vec<PathCommand>,
}

#[derive(Debug, Clone)]
pub struct Typeface {
    pub family_name: String,
    pub resolution: f32,
    pub bounding_box: BoundingBox,
    pub underline_thickness: f32,
    pub glyphs: HashMap<char, Glyph>,
}

/// A filled region: one outer contour and the holes cut out of it.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    pub outer: Vec<Vec2>,
    pub holes: Vec<Vec<Vec2>>,
}

fn coords(tokens: &mut SplitWhitespace<'_>) -> Result<Vec2, String> {
    let mut next = || -> Result<f32, String> {
        let token = tokens.next().ok_or("missing coordinate")?;
        token.parse::<f32>().map_err(|e| format!("{token}: {e}"))
    };
    Ok(Vec2::new(next()?, next()?))
}

fn parse_outline(path: &str, ch: char, outline: &str) -> Result<Vec<PathCommand>, AssetError> {
    let mut tokens = outline.split_whitespace();
    let mut commands = Vec::new();
    while let Some(op) = tokens.next() {
        let command = match op {
            "m" => coords(&mut tokens).map(PathCommand::Move),
            "l" => coords(&mut tokens).map(PathCommand::Line),
            "q" => coords(&mut tokens).and_then(|to| Ok(PathCommand::Quad { to, ctrl: coords(&mut tokens)? })),
            "b" => coords(&mut tokens).and_then(|to| {
                let ctrl1 = coords(&mut tokens)?;
                Ok(PathCommand::Cubic { to, ctrl1, ctrl2: coords(&mut tokens)? })
            }),
            // `z` and anything unknown carry no coordinates
            _ => continue,
        };
        let command = command.map_err(|reason| AssetError::Glyph {
            path: path.to_string(),
            glyph: ch,
            reason: format!("`{op}` {reason}"),
        })?;
        commands.push(command);
    }
    Ok(commands)
}

impl Typeface {
    pub fn from_json(path: &str, bytes: &[u8]) -> Result<Self, AssetError> {
        let raw: RawTypeface =
            serde_json::from_slice(bytes).map_err(|source| AssetError::Font { path: path.to_string(), source })?;

        let mut glyphs = HashMap::with_capacity(raw.glyphs.len());
        for (key, glyph) in raw.glyphs {
            let mut chars = key.chars();
            let (Some(ch), None) = (chars.next(), chars.next()) else { continue };
            let commands = match &glyph.o {
                Some(outline) => parse_outline(path, ch, outline)?,
                None => Vec::new(),
            };
            glyphs.insert(ch, Glyph { advance: glyph.ha, commands });
        }

        Ok(Self {
            family_name: raw.family_name,
            resolution: raw.resolution,
            bounding_box: raw.bounding_box,
            underline_thickness: raw.underline_thickness,
            glyphs,
        })
    }

    /// Missing characters fall back to `?`.
    pub fn glyph(&self, ch: char) -> Option<&Glyph> {
        self.glyphs.get(&ch).or_else(|| self.glyphs.get(&'?'))
    }

    /// Closed contours of `text` at `size` world units per em, laid out from
    /// the origin along +X. `\n` starts a new line below.
    pub fn layout(&self, text: &str, size: f32, curve_segments: u32) -> Vec<Vec<Vec<Vec2>>> {
        let scale = size / self.resolution;
        let line_height =
            (self.bounding_box.y_max - self.bounding_box.y_min + self.underline_thickness) * scale;
        let mut offset = Vec2::ZERO;
        let mut glyphs = Vec::new();

        for ch in text.chars() {
            if ch == '\n' {
                offset = Vec2::new(0.0, offset.y - line_height);
                continue;
            }
            let Some(glyph) = self.glyph(ch) else {
                tracing::warn!(%ch, family = %self.family_name, "character not in typeface");
                continue;
            };
            glyphs.push(flatten(&glyph.commands, scale, offset, curve_segments));
            offset.x += glyph.advance * scale;
        }
        glyphs
    }
}

fn push_point(contour: &mut Vec<Vec2>, p: Vec2) {
    if contour.last().map_or(true, |last| last.distance_squared(p) > f32::EPSILON) {
        contour.push(p);
    }
}

fn finish(contours: &mut Vec<Vec<Vec2>>, mut contour: Vec<Vec2>) {
    if contour.len() > 1 && contour[0].distance_squared(contour[contour.len() - 1]) <= f32::EPSILON {
        contour.pop();
    }
    if contour.len() >= 3 {
        contours.push(contour);
    }
}

/// Outline commands to polylines; each curve becomes `segments` pieces.
pub fn flatten(commands: &[PathCommand], scale: f32, offset: Vec2, segments: u32) -> Vec<Vec<Vec2>> {
    let segments = segments.max(1);
    let at = |p: Vec2| p * scale + offset;
    let mut contours = Vec::new();
    let mut current: Vec<Vec2> = Vec::new();

    for command in commands {
        match *command {
            PathCommand::Move(p) => {
                finish(&mut contours, std::mem::take(&mut current));
                current.push(at(p));
            }
            PathCommand::Line(p) => push_point(&mut current, at(p)),
            PathCommand::Quad { to, ctrl } => {
                let start = current.last().copied().unwrap_or(at(to));
                let (c, end) = (at(ctrl), at(to));
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    let u = 1.0 - t;
                    push_point(&mut current, start * (u * u) + c * (2.0 * u * t) + end * (t * t));
                }
            }
            PathCommand::Cubic { to, ctrl1, ctrl2 } => {
                let start = current.last().copied().unwrap_or(at(to));
                let (c1, c2, end) = (at(ctrl1), at(ctrl2), at(to));
                for i in 1..=segments {
                    let t = i as f32 / segments as f32;
                    let u = 1.0 - t;
                    let p = start * (u * u * u) + c1 * (3.0 * u * u * t) + c2 * (3.0 * u * t * t) + end * (t * t * t);
                    push_point(&mut current, p);
                }
            }
        }
    }
    finish(&mut contours, current);
    contours
}

/// Twice the signed area; positive for counter-clockwise contours.
pub fn signed_area(contour: &[Vec2]) -> f32 {
    let n = contour.len();
    (0..n).map(|i| contour[i].perp_dot(contour[(i + 1) % n])).sum()
}

pub fn contains(contour: &[Vec2], p: Vec2) -> bool {
    let n = contour.len();
    let mut inside = false;
    let mut j = n.wrapping_sub(1);
    for i in 0..n {
        let (a, b) = (contour[i], contour[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Group one glyph's contours into shapes. A contour nested inside an odd
/// number of others is a hole of the smallest one around it. Outers come
/// back counter-clockwise, holes clockwise.
pub fn to_shapes(contours: Vec<Vec<Vec2>>) -> Vec<Shape> {
    let depth_and_parent: Vec<(usize, Option<usize>)> = contours
        .iter()
        .enumerate()
        .map(|(i, contour)| {
            let first = contour[0];
            let mut depth = 0;
            let mut parent: Option<usize> = None;
            for (j, other) in contours.iter().enumerate() {
                if i == j || !contains(other, first) {
                    continue;
                }
                depth += 1;
                let smaller = parent.map_or(true, |p| signed_area(other).abs() < signed_area(&contours[p]).abs());
                if smaller {
                    parent = Some(j);
                }
            }
            (depth, parent)
        })
        .collect();

    let mut shapes: Vec<Shape> = Vec::new();
    let mut shape_of = vec![None; contours.len()];
    for (i, contour) in contours.iter().enumerate() {
        if depth_and_parent[i].0 % 2 == 0 {
            let mut outer = contour.clone();
            if signed_area(&outer) < 0.0 {
                outer.reverse();
            }
            shape_of[i] = Some(shapes.len());
            shapes.push(Shape { outer, holes: Vec::new() });
        }
    }
    for (i, mut contour) in contours.into_iter().enumerate() {
        let (depth, parent) = depth_and_parent[i];
        if depth % 2 == 0 {
            continue;
        }
        let Some(shape) = parent.and_then(|p| shape_of[p]) else { continue };
        if signed_area(&contour) > 0.0 {
            contour.reverse();
        }
        shapes[shape].holes.push(contour);
    }
    shapes
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two glyphs in a 1000-unit em: a square `O` with a square counter and
    /// a curved `D`, plus a space without outline.
    pub(crate) const TEST_FONT: &str = r#"{
        "glyphs": {
            "O": {"ha": 800, "x_min": 0, "x_max": 700,
                  "o": "m 0 0 l 0 700 l 700 700 l 700 0 l 0 0 z m 200 200 l 500 200 l 500 500 l 200 500 l 200 200 z"},
            "D": {"ha": 700, "x_min": 0, "x_max": 600,
                  "o": "m 0 0 l 0 700 l 300 700 b 600 350 500 700 600 550 q 300 0 600 0 l 0 0 z"},
            " ": {"ha": 300, "x_min": 0, "x_max": 0}
        },
        "familyName": "Test Sans",
        "resolution": 1000,
        "boundingBox": {"yMin": -200, "xMin": 0, "yMax": 900, "xMax": 800},
        "underlineThickness": 50
    }"#;

    pub(crate) fn test_font() -> Typeface {
        Typeface::from_json("/fonts/test.typeface.json", TEST_FONT.as_bytes()).unwrap()
    }

    #[test]
    fn outlines_parse_end_point_first() {
        let font = test_font();
        let d = font.glyph('D').unwrap();
        assert_eq!(d.advance, 700.0);
        assert_eq!(
            d.commands[3],
            PathCommand::Cubic {
                to: Vec2::new(600.0, 350.0),
                ctrl1: Vec2::new(500.0, 700.0),
                ctrl2: Vec2::new(600.0, 550.0)
            }
        );
        assert_eq!(d.commands[4], PathCommand::Quad { to: Vec2::new(300.0, 0.0), ctrl: Vec2::new(600.0, 0.0) });
        assert!(font.glyph(' ').unwrap().commands.is_empty());
        // no `?` glyph to fall back on
        assert!(font.glyph('Z').is_none());
    }

    #[test]
    fn broken_files_are_reported() {
        assert!(matches!(
            Typeface::from_json("/f.json", b"{\"glyphs\": 3}"),
            Err(AssetError::Font { .. })
        ));
        let truncated = r#"{"glyphs": {"A": {"ha": 1, "o": "m 0"}}, "resolution": 1000,
            "boundingBox": {"yMin": 0, "yMax": 1}}"#;
        assert!(matches!(
            Typeface::from_json("/f.json", truncated.as_bytes()),
            Err(AssetError::Glyph { glyph: 'A', .. })
        ));
    }

    #[test]
    fn layout_scales_and_advances() {
        let font = test_font();
        let glyphs = font.layout("O O", 2.0, 5);
        assert_eq!(glyphs.len(), 3);
        assert!(glyphs[1].is_empty());
        // second O starts after 800 + 300 units at 2/1000 per unit
        let min_x = glyphs[2][0].iter().map(|p| p.x).fold(f32::MAX, f32::min);
        assert_relative_eq!(min_x, 2.2, epsilon = 1e-5);

        let lines = font.layout("O\nO", 1.0, 5);
        let min_y = lines[1][0].iter().map(|p| p.y).fold(f32::MAX, f32::min);
        assert_relative_eq!(min_y, -1.15, epsilon = 1e-5);
    }

    #[test]
    fn curves_are_split_into_segments() {
        let font = test_font();
        let d = &font.layout("D", 1.0, 5)[0];
        assert_eq!(d.len(), 1);
        // 3 corners, 5 points per curve, the closing line back to the start dropped
        assert_eq!(d[0].len(), 3 + 5 + 5);
        assert!(d[0][7].abs_diff_eq(Vec2::new(0.6, 0.35), 1e-6));
        assert!(d[0][12].abs_diff_eq(Vec2::new(0.3, 0.0), 1e-6));
    }

    #[test]
    fn counters_become_holes() {
        let font = test_font();
        let contours = font.layout("O", 1.0, 5).remove(0);
        let shapes = to_shapes(contours);
        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].holes.len(), 1);
        assert!(signed_area(&shapes[0].outer) > 0.0);
        assert!(signed_area(&shapes[0].holes[0]) < 0.0);
        assert_relative_eq!(signed_area(&shapes[0].outer) / 2.0, 0.49, epsilon = 1e-5);
    }
}
