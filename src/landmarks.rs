//! Face-mesh landmark lookup for the eye regions.
//!
//! Landmarks arrive normalized to `[0, 1]` relative to the frame. Lookups
//! return `Option` so a short landmark set never panics, and the iris path is
//! chosen by [`FaceLandmarks::has_iris`] rather than by probing indices.

use std::fmt;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// First index of the refined iris landmarks
pub const IRIS_LANDMARK_START: usize = 468;

/// Indices of the landmarks describing one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeLandmarkIndices {
    /// Outer eye corner
    pub outer: usize,
    /// Inner eye corner
    pub inner: usize,
    /// Iris center (refined landmarks only)
    pub iris_center: usize,
    /// Upper eyelid contour
    pub top: usize,
    /// Lower eyelid contour
    pub bottom: usize,
}

/// Left eye landmark indices
pub const LEFT_EYE: EyeLandmarkIndices = EyeLandmarkIndices {
    outer: 33,
    inner: 133,
    iris_center: 468,
    top: 159,
    bottom: 145,
};

/// Right eye landmark indices
pub const RIGHT_EYE: EyeLandmarkIndices = EyeLandmarkIndices {
    outer: 362,
    inner: 263,
    iris_center: 473,
    top: 386,
    bottom: 374,
};

/// Which eye a measurement belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Eye {
    Left,
    Right,
}

impl Eye {
    /// Landmark indices for this eye
    pub fn indices(self) -> &'static EyeLandmarkIndices {
        match self {
            Self::Left => &LEFT_EYE,
            Self::Right => &RIGHT_EYE,
        }
    }
}

impl fmt::Display for Eye {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Where an eye's iris position came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrisSource {
    /// Dedicated iris-center landmark
    Landmark,
    /// Mean of the eye corners and eyelid contour points
    ContourFallback,
}

/// Pixel-space geometry of one eye
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EyeGeometry {
    pub outer: Point2<f64>,
    pub inner: Point2<f64>,
    pub top: Point2<f64>,
    pub bottom: Point2<f64>,
    pub iris: Point2<f64>,
    pub iris_source: IrisSource,
}

impl EyeGeometry {
    /// Build geometry with the contour-mean iris proxy
    pub fn from_contour(outer: Point2<f64>, inner: Point2<f64>, top: Point2<f64>, bottom: Point2<f64>) -> Self {
        let iris = Point2::from((outer.coords + inner.coords + top.coords + bottom.coords) / 4.0);
        Self {
            outer,
            inner,
            top,
            bottom,
            iris,
            iris_source: IrisSource::ContourFallback,
        }
    }

    /// Distance between the eye corners in pixels
    pub fn width(&self) -> f64 {
        nalgebra::distance(&self.outer, &self.inner)
    }

    /// Midpoint of the eye corners
    pub fn center(&self) -> Point2<f64> {
        nalgebra::center(&self.outer, &self.inner)
    }

    /// Vertical eyelid gap in pixels
    pub fn openness(&self) -> f64 {
        (self.top.y - self.bottom.y).abs()
    }

    /// Whether the eyelid gap is below `threshold` pixels
    pub fn is_closed(&self, threshold: f64) -> bool {
        self.openness() < threshold
    }
}

/// Normalized landmarks for one detected face
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FaceLandmarks {
    points: Vec<Point2<f64>>,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Normalized landmark at `index`
    pub fn get(&self, index: usize) -> Option<Point2<f64>> {
        self.points.get(index).copied()
    }

    /// Whether the refined iris landmarks are present
    pub fn has_iris(&self) -> bool {
        self.points.len() > IRIS_LANDMARK_START
    }

    /// Landmark at `index` scaled to frame pixels
    pub fn pixel(&self, index: usize, frame_width: u32, frame_height: u32) -> Option<Point2<f64>> {
        self.get(index)
            .map(|p| Point2::new(p.x * f64::from(frame_width), p.y * f64::from(frame_height)))
    }

    /// Pixel geometry of one eye, `None` if its landmarks are missing
    pub fn eye_geometry(&self, eye: Eye, frame_width: u32, frame_height: u32) -> Option<EyeGeometry> {
        let idx = eye.indices();
        let px = |i| self.pixel(i, frame_width, frame_height);

        let outer = px(idx.outer)?;
        let inner = px(idx.inner)?;
        let top = px(idx.top)?;
        let bottom = px(idx.bottom)?;

        if self.has_iris() {
            if let Some(iris) = px(idx.iris_center) {
                return Some(EyeGeometry {
                    outer,
                    inner,
                    top,
                    bottom,
                    iris,
                    iris_source: IrisSource::Landmark,
                });
            }
        }

        Some(EyeGeometry::from_contour(outer, inner, top, bottom))
    }
}
