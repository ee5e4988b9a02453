use serde::{Deserialize, Serialize};

/// 2-D point in image pixel coordinates
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Detected text region, a quadrilateral in practice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Axis-aligned quadrilateral, clockwise from the top-left corner
    pub fn rect(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Self {
        Self::new(vec![
            Point::new(x_min, y_min),
            Point::new(x_max, y_min),
            Point::new(x_max, y_max),
            Point::new(x_min, y_max),
        ])
    }

    /// Bounding box as (x_min, y_min, x_max, y_max)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.points.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x_min, y_min, x_max, y_max), p| {
                (x_min.min(p.x), y_min.min(p.y), x_max.max(p.x), y_max.max(p.y))
            },
        )
    }

    /// Top-left corner of the bounding box, used for all positional rules
    pub fn top_left(&self) -> Point {
        let (x_min, y_min, _, _) = self.bounds();
        Point::new(x_min, y_min)
    }

    /// Leftmost x-coordinate (for left-to-right sorting)
    pub fn left_x(&self) -> f64 {
        self.top_left().x
    }

    pub fn area(&self) -> f64 {
        let (x_min, y_min, x_max, y_max) = self.bounds();
        ((x_max - x_min) * (y_max - y_min)).max(0.0)
    }

    /// Intersection over union of the two bounding boxes
    pub fn iou(&self, other: &Polygon) -> f64 {
        let (x1_min, y1_min, x1_max, y1_max) = self.bounds();
        let (x2_min, y2_min, x2_max, y2_max) = other.bounds();

        let inter_w = x1_max.min(x2_max) - x1_min.max(x2_min);
        let inter_h = y1_max.min(y2_max) - y1_min.max(y2_min);
        if inter_w <= 0.0 || inter_h <= 0.0 {
            return 0.0;
        }

        let inter_area = inter_w * inter_h;
        let union_area = self.area() + other.area() - inter_area;
        if union_area <= 0.0 {
            return 0.0;
        }

        inter_area / union_area
    }
}

/// One recognised string with the region it was read from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextToken {
    pub text: String,
    pub polygon: Polygon,
    pub score: f64,
}

impl TextToken {
    pub fn new(text: impl Into<String>, polygon: Polygon) -> Self {
        Self {
            text: text.into(),
            polygon,
            score: 1.0,
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_left_ignores_vertex_order() {
        let polygon = Polygon::new(vec![
            Point::new(30.0, 12.0),
            Point::new(10.0, 14.0),
            Point::new(12.0, 40.0),
            Point::new(31.0, 38.0),
        ]);

        assert_eq!(polygon.top_left(), Point::new(10.0, 12.0));
        assert_eq!(polygon.left_x(), 10.0);
    }

    #[test]
    fn test_iou_identical_and_disjoint() {
        let a = Polygon::rect(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rect(20.0, 20.0, 30.0, 30.0);

        assert!((a.iou(&a) - 1.0).abs() < 1e-9);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_iou_half_overlap() {
        let a = Polygon::rect(0.0, 0.0, 10.0, 10.0);
        let b = Polygon::rect(5.0, 0.0, 15.0, 10.0);

        // 50 / (100 + 100 - 50)
        assert!((a.iou(&b) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_token_serialization() {
        let token = TextToken::new("lv42", Polygon::rect(1.0, 2.0, 3.0, 4.0)).with_score(0.8);
        let json = serde_json::to_string(&token).unwrap();
        let back: TextToken = serde_json::from_str(&json).unwrap();
        assert_eq!(token, back);
    }
}
