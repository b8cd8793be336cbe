//! Curves that particles travel along.
//!
//! The engine only needs two capabilities from a curve: its total arclength
//! and the point at a given arclength. [`PathCurve`] provides both for
//! SVG-style paths of straight runs and cubic Béziers, and for dense point
//! lists sampled by an external renderer.

use std::fmt::Write as _;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// Number of straight pieces each cubic is flattened into.
const CUBIC_STEPS: usize = 64;

/// Screen-space point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn distance(self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Affine blend: `self + (other - self) * t`.
    #[inline]
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self + (other - self) * t
    }
}

impl Add for Point {
    type Output = Point;
    #[inline]
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    #[inline]
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    #[inline]
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

/// A renderable curve with arclength queries.
pub trait Curve: Send + Sync {
    /// Total arclength.
    fn total_length(&self) -> f64;

    /// Point at arclength `s`, clamped to `[0, total_length()]`.
    fn point_at_length(&self, s: f64) -> Point;
}

/// One drawing command of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Line { to: Point },
    Cubic { c1: Point, c2: Point, to: Point },
}

/// Builder for [`PathCurve`], mirroring the SVG path commands used by the layouts.
#[derive(Debug, Clone)]
pub struct PathBuilder {
    start: Point,
    segments: Vec<Segment>,
}

impl PathBuilder {
    pub fn move_to(x: f64, y: f64) -> Self {
        Self {
            start: Point::new(x, y),
            segments: Vec::new(),
        }
    }

    pub fn line_to(mut self, x: f64, y: f64) -> Self {
        self.segments.push(Segment::Line {
            to: Point::new(x, y),
        });
        self
    }

    pub fn cubic_to(mut self, c1: (f64, f64), c2: (f64, f64), to: (f64, f64)) -> Self {
        self.segments.push(Segment::Cubic {
            c1: Point::new(c1.0, c1.1),
            c2: Point::new(c2.0, c2.1),
            to: Point::new(to.0, to.1),
        });
        self
    }

    pub fn build(self) -> PathCurve {
        let mut vertices = vec![self.start];
        let mut current = self.start;
        for segment in &self.segments {
            match *segment {
                Segment::Line { to } => vertices.push(to),
                Segment::Cubic { c1, c2, to } => {
                    for step in 1..=CUBIC_STEPS {
                        let t = step as f64 / CUBIC_STEPS as f64;
                        vertices.push(cubic_point(current, c1, c2, to, t));
                    }
                }
            }
            current = match *segment {
                Segment::Line { to } | Segment::Cubic { to, .. } => to,
            };
        }

        let mut curve = PathCurve::from_points(vertices);
        curve.start = self.start;
        curve.segments = self.segments;
        curve
    }
}

#[inline]
fn cubic_point(p0: Point, c1: Point, c2: Point, p3: Point, t: f64) -> Point {
    let mt = 1.0 - t;
    p0 * (mt * mt * mt) + c1 * (3.0 * mt * mt * t) + c2 * (3.0 * mt * t * t) + p3 * (t * t * t)
}

/// Polyline curve with a cumulative arclength table.
#[derive(Debug, Clone)]
pub struct PathCurve {
    vertices: Vec<Point>,
    /// `cumulative[i]` = arclength from the first vertex to vertex `i`.
    cumulative: Vec<f64>,
    start: Point,
    segments: Vec<Segment>,
}

impl PathCurve {
    /// Curve through dense points, e.g. sampled externally from a rendered path.
    pub fn from_points(vertices: Vec<Point>) -> Self {
        let mut cumulative = Vec::with_capacity(vertices.len());
        let mut length = 0.0;
        for (i, v) in vertices.iter().enumerate() {
            if i > 0 {
                length += vertices[i - 1].distance(*v);
            }
            cumulative.push(length);
        }

        let start = vertices.first().copied().unwrap_or_default();
        let segments = vertices
            .iter()
            .skip(1)
            .map(|&to| Segment::Line { to })
            .collect();

        Self {
            vertices,
            cumulative,
            start,
            segments,
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// SVG `d` attribute for drawing the route.
    pub fn to_svg(&self) -> String {
        let mut d = format!("M{},{}", self.start.x, self.start.y);
        for segment in &self.segments {
            // Writing to a String cannot fail.
            let _ = match segment {
                Segment::Line { to } => write!(d, "L{},{}", to.x, to.y),
                Segment::Cubic { c1, c2, to } => write!(
                    d,
                    "C{},{},{},{},{},{}",
                    c1.x, c1.y, c2.x, c2.y, to.x, to.y
                ),
            };
        }
        d
    }
}

impl Curve for PathCurve {
    fn total_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    fn point_at_length(&self, s: f64) -> Point {
        let Some(&first) = self.vertices.first() else {
            return Point::default();
        };
        let s = s.clamp(0.0, self.total_length());

        // First vertex strictly beyond `s`, minus one, is the piece containing it.
        let upper = self.cumulative.partition_point(|&c| c <= s);
        if upper == 0 {
            return first;
        }
        if upper >= self.vertices.len() {
            return self.vertices[self.vertices.len() - 1];
        }
        let i = upper - 1;
        let piece = self.cumulative[upper] - self.cumulative[i];
        if piece <= 0.0 {
            return self.vertices[i];
        }
        self.vertices[i].lerp(self.vertices[upper], (s - self.cumulative[i]) / piece)
    }
}
