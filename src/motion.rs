//! Inter-frame motion estimation.
//!
//! A signer transitioning between word signs moves their arms; a signer holding a static
//! letter does not. The arbitration layer uses this distinction to keep the static pipeline
//! from reading a mid-transition hand as a letter. Velocity is measured over a fixed key-point
//! set (shoulders, elbows, wrists, plus each hand's centroid at double weight) and the
//! resulting boolean is debounced over a short vote window so one noisy frame cannot flip it.

use nalgebra::Vector2;

use crate::filter::{Debounce, Filter};
use crate::landmark::{LandmarkFrame, Landmarks, PoseIdx};

/// Body pose points contributing to the velocity estimate.
const KEY_POSE_POINTS: &[PoseIdx] = &[
    PoseIdx::LeftShoulder,
    PoseIdx::RightShoulder,
    PoseIdx::LeftElbow,
    PoseIdx::RightElbow,
    PoseIdx::LeftWrist,
    PoseIdx::RightWrist,
];

/// Per-frame motion estimator output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionEstimate {
    /// Mean key-point displacement between the previous and current frame, in normalized units.
    pub velocity: f32,
    /// Whether `velocity` exceeded the movement threshold this frame.
    pub raw_moving: bool,
    /// Debounced movement signal; this is what arbitration consumes.
    pub smoothed_moving: bool,
}

#[derive(Clone)]
struct Snapshot {
    pose: Option<Vec<Vector2<f32>>>,
    left_centroid: Option<Vector2<f32>>,
    right_centroid: Option<Vector2<f32>>,
}

impl Snapshot {
    fn of(frame: &LandmarkFrame) -> Self {
        Self {
            pose: frame.pose.as_ref().map(|pose| {
                KEY_POSE_POINTS
                    .iter()
                    .filter(|&&idx| (idx as usize) < pose.len())
                    .map(|&idx| {
                        let [x, y, _] = pose.get(idx as usize).position();
                        Vector2::new(x, y)
                    })
                    .collect()
            }),
            left_centroid: frame.left_hand.as_ref().map(centroid),
            right_centroid: frame.right_hand.as_ref().map(centroid),
        }
    }
}

fn centroid(hand: &Landmarks) -> Vector2<f32> {
    let [x, y, _] = hand.average_position();
    Vector2::new(x, y)
}

/// Computes a scalar velocity from consecutive frames and a debounced "is moving" boolean.
pub struct MotionEstimator {
    threshold: f32,
    debounce: Debounce,
    prev: Option<Snapshot>,
}

impl MotionEstimator {
    /// Creates an estimator flagging motion above `threshold`, smoothed by requiring
    /// `min_votes` positive samples among the last `window_size`.
    pub fn new(threshold: f32, window_size: usize, min_votes: usize) -> Self {
        Self {
            threshold,
            debounce: Debounce::new(window_size, min_votes),
            prev: None,
        }
    }

    /// Feeds the next frame and returns the updated motion estimate.
    ///
    /// The first frame only seeds the comparison cache and always reports no motion.
    pub fn update(&mut self, frame: &LandmarkFrame) -> MotionEstimate {
        let current = Snapshot::of(frame);
        let Some(prev) = self.prev.replace(current) else {
            return MotionEstimate {
                velocity: 0.0,
                raw_moving: false,
                smoothed_moving: self.debounce.push(false),
            };
        };
        // `replace` stored the new snapshot; borrow it back for the comparison.
        let current = self.prev.as_ref().unwrap();

        let mut total = 0.0;
        let mut count = 0usize;

        if let (Some(prev_pose), Some(curr_pose)) = (&prev.pose, &current.pose) {
            for (p, c) in prev_pose.iter().zip(curr_pose) {
                total += (c - p).norm();
                count += 1;
            }
        }

        // Hand centroids count once each but at double weight; hands carry the signing motion.
        for (p, c) in [
            (prev.left_centroid, current.left_centroid),
            (prev.right_centroid, current.right_centroid),
        ] {
            if let (Some(p), Some(c)) = (p, c) {
                total += (c - p).norm() * 2.0;
                count += 1;
            }
        }

        let velocity = if count > 0 { total / count as f32 } else { 0.0 };
        let raw_moving = velocity > self.threshold;
        MotionEstimate {
            velocity,
            raw_moving,
            smoothed_moving: self.debounce.push(raw_moving),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use approx::assert_abs_diff_eq;

    use crate::landmark::{Landmark, POSE_LANDMARKS};

    use super::*;

    fn pose_frame(t: u64, offset: f32) -> LandmarkFrame {
        let pose: Landmarks = (0..POSE_LANDMARKS)
            .map(|i| Landmark::new([0.1 * i as f32 + offset, 0.5, 0.0]).with_visibility(1.0))
            .collect();
        LandmarkFrame::new(Duration::from_millis(t)).with_pose(pose)
    }

    #[test]
    fn first_frame_reports_no_motion() {
        let mut est = MotionEstimator::new(0.02, 5, 4);
        let out = est.update(&pose_frame(0, 0.0));
        assert_eq!(out.velocity, 0.0);
        assert!(!out.raw_moving);
        assert!(!out.smoothed_moving);
    }

    #[test]
    fn uniform_shift_measures_as_velocity() {
        let mut est = MotionEstimator::new(0.02, 5, 4);
        est.update(&pose_frame(0, 0.0));
        let out = est.update(&pose_frame(33, 0.05));
        assert_abs_diff_eq!(out.velocity, 0.05, epsilon = 1e-5);
        assert!(out.raw_moving);
        // A single moving frame is not enough for the smoothed signal.
        assert!(!out.smoothed_moving);
    }

    #[test]
    fn smoothed_signal_needs_four_of_five() {
        let mut est = MotionEstimator::new(0.02, 5, 4);
        est.update(&pose_frame(0, 0.0));
        let mut offset = 0.0;
        let mut smoothed = false;
        for i in 1..=4 {
            offset += 0.05;
            smoothed = est.update(&pose_frame(i * 33, offset)).smoothed_moving;
        }
        assert!(smoothed);
    }

    #[test]
    fn still_frames_report_no_motion() {
        let mut est = MotionEstimator::new(0.02, 5, 4);
        est.update(&pose_frame(0, 0.0));
        let out = est.update(&pose_frame(33, 0.0));
        assert_eq!(out.velocity, 0.0);
        assert!(!out.raw_moving);
    }

    #[test]
    fn hand_centroids_weigh_double() {
        let hand = |x: f32| -> Landmarks {
            (0..21)
                .map(|_| Landmark::new([x, 0.5, 0.0]))
                .collect::<Landmarks>()
        };
        let mut est = MotionEstimator::new(0.02, 5, 4);
        est.update(&LandmarkFrame::new(Duration::ZERO).with_right_hand(hand(0.5)));
        let out = est.update(&LandmarkFrame::new(Duration::from_millis(33)).with_right_hand(hand(0.53)));
        // One key point (the hand centroid), displacement 0.03, doubled.
        assert_abs_diff_eq!(out.velocity, 0.06, epsilon = 1e-5);
    }
}
