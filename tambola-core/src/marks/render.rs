use base64::{engine::general_purpose, Engine as _};
use std::fmt;

use crate::marks::TicketImage;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Rgba,
    pub width: f64,
}

/// 2D drawing target for the mark overlay.
pub trait Surface {
    fn resize(&mut self, width: u32, height: u32);

    fn set_pointer_enabled(&mut self, enabled: bool);

    /// Puts the decoded ticket underneath the overlay.
    fn show_image(&mut self, _image: &TicketImage) {}

    fn clear(&mut self);

    fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke);

    fn stroke_segments(&mut self, segments: &[(Point, Point)], stroke: Stroke);
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Circle {
        center: Point,
        radius: f64,
        stroke: Stroke,
    },
    Segments {
        segments: Vec<(Point, Point)>,
        stroke: Stroke,
    },
}

struct Background {
    mime: &'static str,
    encoded: String,
}

/// Records draw calls and serializes them as an SVG document.
#[derive(Default)]
pub struct SvgSurface {
    width: u32,
    height: u32,
    pointer_enabled: bool,
    background: Option<Background>,
    shapes: Vec<Shape>,
}

impl SvgSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pointer_enabled(&self) -> bool {
        self.pointer_enabled
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn to_svg(&self) -> String {
        let mut svg = format!(
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">\n",
            w = self.width,
            h = self.height
        );

        if let Some(background) = &self.background {
            svg.push_str(&format!(
                "  <image href=\"data:{};base64,{}\" x=\"0\" y=\"0\" width=\"{}\" height=\"{}\"/>\n",
                background.mime, background.encoded, self.width, self.height
            ));
        }

        // Document order is paint order
        for shape in &self.shapes {
            match shape {
                Shape::Circle {
                    center,
                    radius,
                    stroke,
                } => svg.push_str(&format!(
                    "  <circle cx=\"{}\" cy=\"{}\" r=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
                    center.x, center.y, radius, stroke.color, stroke.width
                )),
                Shape::Segments { segments, stroke } => {
                    let path = segments
                        .iter()
                        .map(|(from, to)| format!("M {} {} L {} {}", from.x, from.y, to.x, to.y))
                        .collect::<Vec<_>>()
                        .join(" ");
                    svg.push_str(&format!(
                        "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\"/>\n",
                        path, stroke.color, stroke.width
                    ));
                }
            }
        }

        svg.push_str("</svg>\n");
        svg
    }
}

impl Surface for SvgSurface {
    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn set_pointer_enabled(&mut self, enabled: bool) {
        self.pointer_enabled = enabled;
    }

    fn show_image(&mut self, image: &TicketImage) {
        self.background = Some(Background {
            mime: image.mime_type(),
            encoded: general_purpose::STANDARD.encode(image.bytes()),
        });
    }

    fn clear(&mut self) {
        self.shapes.clear();
    }

    fn stroke_circle(&mut self, center: Point, radius: f64, stroke: Stroke) {
        self.shapes.push(Shape::Circle {
            center,
            radius,
            stroke,
        });
    }

    fn stroke_segments(&mut self, segments: &[(Point, Point)], stroke: Stroke) {
        self.shapes.push(Shape::Segments {
            segments: segments.to_vec(),
            stroke,
        });
    }
}
