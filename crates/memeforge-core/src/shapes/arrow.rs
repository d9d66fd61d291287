//! Arrow shape.

use super::{ShapeId, ShapeStyle, ShapeTrait};
use kurbo::{Affine, BezPath, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A straight arrow: a shaft plus two open head strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arrow {
    pub(crate) id: ShapeId,
    /// Start point.
    pub start: Point,
    /// End point (where the arrowhead points).
    pub end: Point,
    /// Length of each head stroke along the shaft.
    pub head_size: f64,
    /// Style properties.
    pub style: ShapeStyle,
}

impl Arrow {
    pub const DEFAULT_HEAD_SIZE: f64 = 10.0;

    /// Create a new arrow.
    pub fn new(start: Point, end: Point) -> Self {
        Self {
            id: Uuid::new_v4(),
            start,
            end,
            head_size: Self::DEFAULT_HEAD_SIZE,
            style: ShapeStyle::stroked(super::SerializableColor::black(), 3.0),
        }
    }

    pub fn with_style(mut self, style: ShapeStyle) -> Self {
        self.style = style;
        self
    }

    /// Get the direction vector (normalized).
    pub fn direction(&self) -> Vec2 {
        let d = self.end - self.start;
        let len = d.hypot();
        if len < f64::EPSILON {
            Vec2::new(1.0, 0.0)
        } else {
            d / len
        }
    }

    /// Get the length of the arrow shaft.
    pub fn length(&self) -> f64 {
        (self.end - self.start).hypot()
    }

    /// End points of the two head strokes.
    pub fn head_points(&self) -> (Point, Point) {
        let dir = self.direction();
        let perp = Vec2::new(-dir.y, dir.x);
        let back = self.end - dir * self.head_size;
        (back + perp * self.head_size, back - perp * self.head_size)
    }
}

impl ShapeTrait for Arrow {
    fn id(&self) -> ShapeId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let (left, right) = self.head_points();
        Rect::from_points(self.start, self.end)
            .union_pt(left)
            .union_pt(right)
    }

    fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let reach = tolerance + self.style.stroke_width / 2.0;
        let (left, right) = self.head_points();
        super::point_to_segment_dist(point, self.start, self.end) <= reach
            || super::point_to_segment_dist(point, self.end, left) <= reach
            || super::point_to_segment_dist(point, self.end, right) <= reach
    }

    fn to_path(&self) -> BezPath {
        let mut path = BezPath::new();
        if self.start == self.end {
            return path;
        }
        let (left, right) = self.head_points();

        path.move_to(self.start);
        path.line_to(self.end);
        path.line_to(left);
        path.move_to(self.end);
        path.line_to(right);
        path
    }

    fn style(&self) -> &ShapeStyle {
        &self.style
    }

    fn style_mut(&mut self) -> &mut ShapeStyle {
        &mut self.style
    }

    fn transform(&mut self, affine: Affine) {
        self.start = affine * self.start;
        self.end = affine * self.end;
        let scale = affine.as_coeffs();
        self.head_size *= (scale[0].abs() + scale[3].abs()) / 2.0;
    }
}
