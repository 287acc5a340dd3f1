//! Feature extraction: converting landmark frames into the vector forms the classifiers need.
//!
//! Two vector forms exist:
//!
//! * [`HandFeatures`]: 42 values (21 hand points × X/Y), wrist-relative and max-abs normalized,
//!   for the static hand-shape classifier. The classifier was trained on *pixel* coordinates,
//!   so the normalized landmarks are converted through the capture resolution first.
//! * [`full_body_features`]: 1662 raw values (pose 33×4 ++ face 468×3 ++ left hand 21×3 ++
//!   right hand 21×3) for the dynamic word classifier, zero-filled per absent skeleton. No
//!   normalization; the model was trained on raw coordinates.
//!
//! Averaging over the landmark history happens on *normalized* coordinates, before pixel
//! conversion. Pixel conversion floors each coordinate, so converting first and averaging
//! afterwards rounds every frame individually and yields different numbers. The history
//! averaging itself lives in the static pipeline ([`crate::filter::VecAvg`]); this module only
//! ever sees one (possibly pre-averaged) landmark set at a time.

use crate::config::Resolution;
use crate::landmark::{LandmarkFrame, Landmarks, FACE_LANDMARKS, HAND_LANDMARKS, POSE_LANDMARKS};

/// Length of the static classifier's input vector.
pub const HAND_FEATURES: usize = HAND_LANDMARKS * 2;
/// Length of the dynamic classifier's input vector.
pub const FULL_BODY_FEATURES: usize =
    POSE_LANDMARKS * 4 + FACE_LANDMARKS * 3 + HAND_LANDMARKS * 3 * 2;

/// The static classifier's input: 42 wrist-relative, max-abs-normalized values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandFeatures {
    values: [f32; HAND_FEATURES],
}

impl HandFeatures {
    #[inline]
    pub fn values(&self) -> &[f32; HAND_FEATURES] {
        &self.values
    }

    /// Returns whether every value is exactly zero (degenerate hand, all points coincident).
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|&v| v == 0.0)
    }
}

/// Flattens a hand skeleton into its 42 normalized X/Y coordinates.
///
/// Returns [`None`] when the skeleton does not carry exactly 21 points or contains non-finite
/// coordinates; downstream skips the frame instead of classifying garbage.
pub fn hand_coordinates(hand: &Landmarks) -> Option<Vec<f32>> {
    if hand.len() != HAND_LANDMARKS {
        log::trace!("hand skeleton with {} points, skipping", hand.len());
        return None;
    }

    let mut coords = Vec::with_capacity(HAND_FEATURES);
    for pos in hand.positions() {
        coords.push(pos[0]);
        coords.push(pos[1]);
    }
    if coords.iter().any(|v| !v.is_finite()) {
        log::warn!("non-finite hand landmark coordinates, skipping frame");
        return None;
    }
    Some(coords)
}

/// Builds the static classifier's input from (averaged) normalized hand coordinates.
///
/// The steps, in this order:
///
/// 1. convert each normalized coordinate to a pixel coordinate via
///    `min(floor(norm * dimension), dimension - 1)`,
/// 2. subtract the wrist (point 0) from every point,
/// 3. flatten to 42 values,
/// 4. divide every value by the maximum absolute value across all 42.
///
/// If the maximum is 0 (all points coincide with the wrist), the all-zero vector is returned
/// rather than dividing by zero.
///
/// # Panics
///
/// Panics if `coords` does not hold exactly 42 values; callers obtain it from
/// [`hand_coordinates`], which guarantees the length.
pub fn hand_features(coords: &[f32], resolution: Resolution) -> HandFeatures {
    assert_eq!(coords.len(), HAND_FEATURES);

    let width = resolution.width as f32;
    let height = resolution.height as f32;

    let mut px = [0i32; HAND_FEATURES];
    for (i, chunk) in coords.chunks_exact(2).enumerate() {
        px[i * 2] = ((chunk[0] * width).floor() as i32).min(resolution.width as i32 - 1);
        px[i * 2 + 1] = ((chunk[1] * height).floor() as i32).min(resolution.height as i32 - 1);
    }

    let (base_x, base_y) = (px[0], px[1]);
    let mut values = [0.0; HAND_FEATURES];
    for (i, out) in values.iter_mut().enumerate() {
        let base = if i % 2 == 0 { base_x } else { base_y };
        *out = (px[i] - base) as f32;
    }

    let max_value = values.iter().fold(0.0f32, |max, v| max.max(v.abs()));
    if max_value > 0.0 {
        for v in &mut values {
            *v /= max_value;
        }
    }

    HandFeatures { values }
}

fn extend_points(out: &mut Vec<f32>, skeleton: Option<&Landmarks>, count: usize, stride: usize) {
    let start = out.len();
    if let Some(lms) = skeleton {
        for pos in lms.positions().iter().take(count) {
            out.push(pos[0]);
            out.push(pos[1]);
            out.push(pos[2]);
            if stride == 4 {
                out.push(0.0);
            }
        }
        // Visibility rides in the fourth slot for pose points.
        if stride == 4 {
            for (i, lm) in lms.iter().take(count).enumerate() {
                out[start + i * 4 + 3] = lm.visibility();
            }
        }
    }
    out.resize(start + count * stride, 0.0);
}

/// Builds the dynamic classifier's input: the straight 1662-value concatenation.
///
/// Absent skeletons contribute zeros. Face meshes with refined extra points (478) are truncated
/// to the 468 the model was trained on.
pub fn full_body_features(frame: &LandmarkFrame) -> Vec<f32> {
    let mut out = Vec::with_capacity(FULL_BODY_FEATURES);
    extend_points(&mut out, frame.pose.as_ref(), POSE_LANDMARKS, 4);
    extend_points(&mut out, frame.face.as_ref(), FACE_LANDMARKS, 3);
    extend_points(&mut out, frame.left_hand.as_ref(), HAND_LANDMARKS, 3);
    extend_points(&mut out, frame.right_hand.as_ref(), HAND_LANDMARKS, 3);
    debug_assert_eq!(out.len(), FULL_BODY_FEATURES);
    out
}
