//! External vision collaborators
//!
//! Frame acquisition and model inference are provided from outside this
//! workspace. These traits are the seam.

use gaze::{HeadPose, Point};
use serde::{Deserialize, Serialize};

use crate::CaptureError;

/// Left iris landmark indices in a 478-point face mesh
const LEFT_IRIS: [usize; 4] = [474, 475, 476, 477];

/// Right iris landmark indices in a 478-point face mesh
const RIGHT_IRIS: [usize; 4] = [469, 470, 471, 472];

const NOSE_TIP: usize = 4;

/// Outer eye corners, image left then image right
const OUTER_EYE_CORNERS: [usize; 2] = [33, 263];

/// Eye outlines: corner, three upper lid points, corner, three lower lid points
const RIGHT_EYE_OUTLINE: [usize; 8] = [33, 160, 159, 158, 133, 153, 145, 144];
const LEFT_EYE_OUTLINE: [usize; 8] = [362, 385, 386, 387, 263, 373, 374, 380];

/// Nose tip closer than this to the frame edge means a partial face (pixels)
const EDGE_MARGIN: f64 = 50.0;

/// Expected outer eye corner distance as a fraction of frame width
const EXPECTED_EYE_SPAN: f64 = 0.15;

/// Captured frame
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw pixel data (format defined by the source)
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub sequence: u64,
}

impl Frame {
    pub fn center(&self) -> Point {
        Point::new(self.width as f64 / 2.0, self.height as f64 / 2.0)
    }
}

/// Facial landmarks for one face
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FaceLandmarks {
    /// Full face mesh in pixel coordinates, iris points included
    Mesh(Vec<Point>),
    /// Pupil centers supplied directly
    Pupils { left: Point, right: Point },
}

impl FaceLandmarks {
    /// Left and right pupil centers
    ///
    /// For a mesh, each pupil is the mean of its four iris points. Returns
    /// `None` when the mesh has no iris points.
    pub fn pupil_centers(&self) -> Option<(Point, Point)> {
        match self {
            FaceLandmarks::Pupils { left, right } => Some((*left, *right)),
            FaceLandmarks::Mesh(points) => {
                let left = iris_center(points, &LEFT_IRIS)?;
                let right = iris_center(points, &RIGHT_IRIS)?;
                Some((left, right))
            }
        }
    }

    /// Detection quality in [0, 1] from mesh geometry
    ///
    /// 0.3 when the nose tip is near the frame edge, 0.4 when the eye span
    /// is outside half to twice the expected span, 0.5 when the face is far
    /// off center, 1.0 otherwise. `None` for pupil-only landmarks or an
    /// unknown frame size.
    pub fn quality(&self, width: u32, height: u32) -> Option<f64> {
        let FaceLandmarks::Mesh(points) = self else {
            return None;
        };
        if width == 0 || height == 0 {
            return None;
        }
        let (Some(nose), Some(a), Some(b)) = (
            points.get(NOSE_TIP),
            points.get(OUTER_EYE_CORNERS[0]),
            points.get(OUTER_EYE_CORNERS[1]),
        ) else {
            return Some(0.0);
        };

        let (w, h) = (width as f64, height as f64);
        if nose.x < EDGE_MARGIN
            || nose.x > w - EDGE_MARGIN
            || nose.y < EDGE_MARGIN
            || nose.y > h - EDGE_MARGIN
        {
            return Some(0.3);
        }

        let expected = w * EXPECTED_EYE_SPAN;
        let span = a.distance(b);
        if span < expected * 0.5 || span > expected * 2.0 {
            return Some(0.4);
        }

        let center_x = (a.x + b.x) / 2.0;
        if (center_x - w / 2.0).abs() / (w / 2.0) > 0.7 {
            return Some(0.5);
        }
        Some(1.0)
    }

    /// Eye closure ratio, about 0.5 with both eyes shut and higher when open
    ///
    /// Per eye, the mean cubed lid gap over the cubed corner distance; the
    /// two eyes are combined as `(right + left + 1) / 2`. `None` unless the
    /// landmarks are a mesh with both eye outlines.
    pub fn blink_ratio(&self) -> Option<f64> {
        let FaceLandmarks::Mesh(points) = self else {
            return None;
        };
        let right = eye_opening(points, &RIGHT_EYE_OUTLINE)?;
        let left = eye_opening(points, &LEFT_EYE_OUTLINE)?;
        Some((right + left + 1.0) / 2.0)
    }
}

fn eye_opening(points: &[Point], outline: &[usize; 8]) -> Option<f64> {
    let mut eye = [Point::default(); 8];
    for (slot, &i) in eye.iter_mut().zip(outline) {
        *slot = *points.get(i)?;
    }
    let [corner_a, top_a, top_b, top_c, corner_b, bottom_c, bottom_b, bottom_a] = eye;

    let span = corner_a.distance(&corner_b);
    if span <= 0.0 {
        return None;
    }
    let gaps = top_a.distance(&bottom_a).powi(3)
        + top_b.distance(&bottom_b).powi(3)
        + top_c.distance(&bottom_c).powi(3);
    Some(gaps / (3.0 * span.powi(3)))
}

fn iris_center(points: &[Point], indices: &[usize]) -> Option<Point> {
    let mut sum = Point::default();
    for &i in indices {
        let p = points.get(i)?;
        sum.x += p.x;
        sum.y += p.y;
    }
    let n = indices.len() as f64;
    Some(Point::new(sum.x / n, sum.y / n))
}

/// A labelled detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub label: String,
    pub confidence: f64,
}

/// Frame source (camera, video file)
pub trait FrameSource {
    /// Next frame; errors are fatal to the detector loop
    fn next_frame(&mut self) -> Result<Frame, CaptureError>;
}

/// Face landmark model
pub trait LandmarkModel {
    /// Landmarks of the primary face, if one is visible
    fn landmarks(&mut self, frame: &Frame) -> Option<FaceLandmarks>;
}

/// Head pose solver
pub trait HeadPoseModel {
    /// Head pose from landmarks, or `None` if the solve fails
    fn estimate(&mut self, landmarks: &FaceLandmarks, width: u32, height: u32) -> Option<HeadPose>;
}

/// Object detection model
pub trait ObjectModel {
    /// Detections in the frame and inference time in milliseconds
    fn detect(&mut self, frame: &Frame) -> Result<(Vec<Detection>, f64), CaptureError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    #[test]
    fn test_mesh_pupils_average_iris_points() {
        let mut points = vec![Point::default(); 478];
        for (k, i) in RIGHT_IRIS.iter().enumerate() {
            points[*i] = Point::new(100.0 + k as f64 * 2.0, 50.0);
        }
        for i in LEFT_IRIS {
            points[i] = Point::new(200.0, 60.0);
        }

        let (left, right) = FaceLandmarks::Mesh(points).pupil_centers().unwrap();
        assert_eq!(left, Point::new(200.0, 60.0));
        assert_eq!(right, Point::new(103.0, 50.0));
    }

    #[test]
    fn test_mesh_without_iris_has_no_pupils() {
        let mesh = FaceLandmarks::Mesh(vec![Point::default(); 468]);
        assert!(mesh.pupil_centers().is_none());
    }

    /// Mesh with a centered face; eye lids `gap` pixels apart
    pub(crate) fn face_mesh(gap: f64) -> Vec<Point> {
        let mut points = vec![Point::default(); 478];
        points[NOSE_TIP] = Point::new(320.0, 260.0);
        for (outline, x0) in [(RIGHT_EYE_OUTLINE, 260.0), (LEFT_EYE_OUTLINE, 350.0)] {
            points[outline[0]] = Point::new(x0, 200.0);
            points[outline[4]] = Point::new(x0 + 30.0, 200.0);
            for k in 1..4 {
                let x = x0 + k as f64 * 7.5;
                points[outline[k]] = Point::new(x, 200.0 - gap / 2.0);
                points[outline[8 - k]] = Point::new(x, 200.0 + gap / 2.0);
            }
        }
        for i in RIGHT_IRIS {
            points[i] = Point::new(275.0, 200.0);
        }
        for i in LEFT_IRIS {
            points[i] = Point::new(365.0, 200.0);
        }
        points
    }

    #[test]
    fn test_quality_checks() {
        let good = FaceLandmarks::Mesh(face_mesh(10.0));
        assert_eq!(good.quality(640, 480), Some(1.0));

        let mut edge = face_mesh(10.0);
        edge[NOSE_TIP] = Point::new(20.0, 240.0);
        assert_eq!(FaceLandmarks::Mesh(edge).quality(640, 480), Some(0.3));

        // Eye span 120 px against an expected 300 px
        assert_eq!(good.quality(2000, 480), Some(0.4));

        assert_eq!(FaceLandmarks::Mesh(Vec::new()).quality(640, 480), Some(0.0));
        assert_eq!(good.quality(0, 0), None);
        let pupils = FaceLandmarks::Pupils {
            left: Point::new(1.0, 1.0),
            right: Point::new(2.0, 1.0),
        };
        assert_eq!(pupils.quality(640, 480), None);
    }

    #[test]
    fn test_blink_ratio_open_and_closed() {
        let open = FaceLandmarks::Mesh(face_mesh(10.0)).blink_ratio().unwrap();
        let closed = FaceLandmarks::Mesh(face_mesh(0.0)).blink_ratio().unwrap();
        assert!(open > 0.51, "open ratio {}", open);
        assert!((closed - 0.5).abs() < 1e-9);
        assert!(FaceLandmarks::Mesh(vec![Point::default(); 300]).blink_ratio().is_none());
    }

    #[test]
    fn test_landmarks_deserialize_untagged() {
        let pupils: FaceLandmarks =
            serde_json::from_str(r#"{"left": {"x": 1.0, "y": 2.0}, "right": {"x": 3.0, "y": 4.0}}"#)
                .unwrap();
        assert_eq!(
            pupils.pupil_centers(),
            Some((Point::new(1.0, 2.0), Point::new(3.0, 4.0)))
        );
    }
}
