// Axis-aligned geographic bounds aggregation for "zoom to layer" and
// "zoom to feature group".
use serde::{Deserialize, Serialize};

/// Axis-aligned box in lng/lat. Invariant: x_min <= x_max and
/// y_min <= y_max once at least one point has been folded in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl Bounds {
    /// A degenerate box around a single point.
    pub fn from_point(lng: f64, lat: f64) -> Self {
        Bounds {
            x_min: lng,
            x_max: lng,
            y_min: lat,
            y_max: lat,
        }
    }

    /// Parse the flat `[xMin, yMin, xMax, yMax]` array the surface bridge
    /// returns from `getSourceBounds`.
    pub fn from_flat(values: &[f64]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        Some(Bounds {
            x_min: values[0],
            y_min: values[1],
            x_max: values[2],
            y_max: values[3],
        })
    }

    pub fn fold_point(&mut self, lng: f64, lat: f64) {
        self.x_min = self.x_min.min(lng);
        self.x_max = self.x_max.max(lng);
        self.y_min = self.y_min.min(lat);
        self.y_max = self.y_max.max(lat);
    }

    pub fn fold(&mut self, other: &Bounds) {
        self.fold_point(other.x_min, other.y_min);
        self.fold_point(other.x_max, other.y_max);
    }

    /// The `[[xMin, yMin], [xMax, yMax]]` corner form `fitBounds` expects.
    pub fn to_corners(&self) -> [[f64; 2]; 2] {
        [[self.x_min, self.y_min], [self.x_max, self.y_max]]
    }
}

/// Fold a sequence of corner boxes (`[[xMin,yMin],[xMax,yMax]]`) into one.
/// Returns `None` on empty input; callers must guard.
pub fn combine(boxes: &[[[f64; 2]; 2]]) -> Option<Bounds> {
    let mut iter = boxes.iter();
    let first = iter.next()?;
    let mut acc = Bounds::from_point(first[0][0], first[0][1]);
    acc.fold_point(first[1][0], first[1][1]);
    for b in iter {
        acc.fold_point(b[0][0], b[0][1]);
        acc.fold_point(b[1][0], b[1][1]);
    }
    Some(acc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combines_two_boxes() {
        let boxes = [[[0.0, 0.0], [1.0, 1.0]], [[2.0, 2.0], [3.0, 3.0]]];
        let combined = combine(&boxes).unwrap();
        assert_eq!(
            combined,
            Bounds {
                x_min: 0.0,
                x_max: 3.0,
                y_min: 0.0,
                y_max: 3.0
            }
        );
    }

    #[test]
    fn single_box_is_unchanged() {
        let boxes = [[[-74.02, 40.70], [-73.99, 40.72]]];
        let combined = combine(&boxes).unwrap();
        assert_eq!(combined.to_corners(), boxes[0]);
    }

    #[test]
    fn empty_input_yields_none() {
        assert_eq!(combine(&[]), None);
    }

    #[test]
    fn overlapping_boxes_fold_to_envelope() {
        let boxes = [[[0.0, 5.0], [10.0, 15.0]], [[-2.0, 7.0], [8.0, 20.0]]];
        let combined = combine(&boxes).unwrap();
        assert_eq!(combined.x_min, -2.0);
        assert_eq!(combined.x_max, 10.0);
        assert_eq!(combined.y_min, 5.0);
        assert_eq!(combined.y_max, 20.0);
    }

    #[test]
    fn parses_flat_form() {
        let flat = [-74.02, 40.70, -73.99, 40.72];
        let bounds = Bounds::from_flat(&flat).unwrap();
        assert_eq!(bounds.x_min, -74.02);
        assert_eq!(bounds.y_max, 40.72);
        assert!(Bounds::from_flat(&[1.0, 2.0]).is_none());
    }
}
