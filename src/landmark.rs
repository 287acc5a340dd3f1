//! Landmark data model shared by all pipelines.
//!
//! A [`LandmarkFrame`] is one capture instant's worth of estimator output: up to 33 body
//! points, 468 face points, and two 21-point hand skeletons. Absence of a skeleton is explicit
//! ([`None`]), never inferred from zeroed coordinates.

use std::time::Duration;

/// Number of body pose landmarks per frame.
pub const POSE_LANDMARKS: usize = 33;
/// Number of face mesh landmarks per frame.
pub const FACE_LANDMARKS: usize = 468;
/// Number of landmarks per hand skeleton.
pub const HAND_LANDMARKS: usize = 21;

/// A landmark in 3D space.
///
/// Coordinates are normalized to `[0, 1]` in X/Y. Body pose landmarks additionally carry a
/// visibility score; hand and face landmarks do not.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Landmark {
    pos: [f32; 3],
    visibility: Option<f32>,
}

impl Landmark {
    pub fn new(position: [f32; 3]) -> Self {
        Self {
            pos: position,
            visibility: None,
        }
    }

    pub fn with_visibility(self, visibility: f32) -> Self {
        Self {
            visibility: Some(visibility),
            ..self
        }
    }

    #[inline]
    pub fn position(&self) -> [f32; 3] {
        self.pos
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.pos[0]
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.pos[1]
    }

    #[inline]
    pub fn z(&self) -> f32 {
        self.pos[2]
    }

    /// Returns the visibility score, or 0.0 for landmark kinds that don't carry one.
    #[inline]
    pub fn visibility(&self) -> f32 {
        self.visibility.unwrap_or(0.0)
    }
}

/// A fixed-length collection of landmarks making up one skeleton.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    positions: Box<[[f32; 3]]>,
    visibility: Option<Box<[f32]>>,
}

impl Landmarks {
    /// Creates a new [`Landmarks`] collection containing `len` preallocated landmarks.
    ///
    /// All landmarks will start with all coordinates at `0.0`.
    pub fn new(len: usize) -> Self {
        Self {
            positions: vec![[0.0, 0.0, 0.0]; len].into_boxed_slice(),
            visibility: None,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Landmark> + Clone + '_ {
        (0..self.positions.len()).map(|i| self.get(i))
    }

    pub fn get(&self, index: usize) -> Landmark {
        let mut lm = Landmark::new(self.positions[index]);
        if let Some(vis) = &self.visibility {
            lm = lm.with_visibility(vis[index]);
        }
        lm
    }

    pub fn set(&mut self, index: usize, landmark: Landmark) {
        let len = self.positions.len();
        self.positions[index] = landmark.pos;
        if let Some(vis) = landmark.visibility {
            self.visibility.get_or_insert_with(|| vec![0.0; len].into())[index] = vis;
        }
    }

    pub fn positions(&self) -> &[[f32; 3]] {
        &self.positions
    }

    pub fn positions_mut(&mut self) -> &mut [[f32; 3]] {
        &mut self.positions
    }

    /// Computes the centroid of all landmark positions.
    pub fn average_position(&self) -> [f32; 3] {
        let mut center = [0.0; 3];
        for pos in self.positions() {
            center[0] += pos[0] / self.positions().len() as f32;
            center[1] += pos[1] / self.positions().len() as f32;
            center[2] += pos[2] / self.positions().len() as f32;
        }
        center
    }

    /// Computes the area of the axis-aligned X/Y bounding rectangle.
    pub fn bounding_area(&self) -> f32 {
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);
        for pos in self.positions() {
            min_x = min_x.min(pos[0]);
            min_y = min_y.min(pos[1]);
            max_x = max_x.max(pos[0]);
            max_y = max_y.max(pos[1]);
        }
        if self.is_empty() {
            return 0.0;
        }
        (max_x - min_x) * (max_y - min_y)
    }
}

impl FromIterator<Landmark> for Landmarks {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        let mut positions = Vec::new();
        let mut visibility = Vec::new();
        let mut any_vis = false;
        for lm in iter {
            positions.push(lm.pos);
            visibility.push(lm.visibility.unwrap_or(0.0));
            any_vis |= lm.visibility.is_some();
        }
        Self {
            positions: positions.into_boxed_slice(),
            visibility: any_vis.then(|| visibility.into_boxed_slice()),
        }
    }
}

/// Names for the 33 body pose landmarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseIdx {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// Names for the 21 hand landmarks.
///
/// # Terminology
///
/// - **CMC**: Carpometacarpal joint, the lowest joint of the thumb, located near the wrist.
/// - **MCP**: Metacarpophalangeal joint, the lower joint forming the knuckles near the palm.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: placed on the tip of the finger, above the DIP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandIdx {
    Wrist = 0,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Which of the signer's hands a skeleton belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// One captured frame's worth of estimator output.
///
/// Every skeleton is optional; the estimator only reports what it saw. `captured_at` is the
/// capture driver's monotonic timestamp for the frame and drives all cooldown logic downstream.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame {
    pub pose: Option<Landmarks>,
    pub face: Option<Landmarks>,
    pub left_hand: Option<Landmarks>,
    pub right_hand: Option<Landmarks>,
    pub captured_at: Duration,
}

impl LandmarkFrame {
    /// Creates an empty frame (no skeletons detected) with the given capture timestamp.
    pub fn new(captured_at: Duration) -> Self {
        Self {
            pose: None,
            face: None,
            left_hand: None,
            right_hand: None,
            captured_at,
        }
    }

    pub fn with_pose(mut self, pose: Landmarks) -> Self {
        self.pose = Some(pose);
        self
    }

    pub fn with_face(mut self, face: Landmarks) -> Self {
        self.face = Some(face);
        self
    }

    pub fn with_left_hand(mut self, hand: Landmarks) -> Self {
        self.left_hand = Some(hand);
        self
    }

    pub fn with_right_hand(mut self, hand: Landmarks) -> Self {
        self.right_hand = Some(hand);
        self
    }

    /// Returns whether at least one hand skeleton was detected in this frame.
    pub fn any_hand(&self) -> bool {
        self.left_hand.is_some() || self.right_hand.is_some()
    }

    /// Selects the hand skeleton used for static hand-shape classification.
    ///
    /// The right hand is preferred when both are detected. When both hand centroids lie within
    /// `overlap_radius` of each other (normalized units), the estimator has likely reported the
    /// same physical hand twice; the skeleton with the larger bounding box wins.
    pub fn primary_hand(&self, overlap_radius: f32) -> Option<(&Landmarks, Handedness)> {
        match (&self.left_hand, &self.right_hand) {
            (None, None) => None,
            (Some(left), None) => Some((left, Handedness::Left)),
            (None, Some(right)) => Some((right, Handedness::Right)),
            (Some(left), Some(right)) => {
                let [lx, ly, _] = left.average_position();
                let [rx, ry, _] = right.average_position();
                let dist = ((lx - rx).powi(2) + (ly - ry).powi(2)).sqrt();
                if dist < overlap_radius && left.bounding_area() > right.bounding_area() {
                    Some((left, Handedness::Left))
                } else {
                    Some((right, Handedness::Right))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hand_at(cx: f32, cy: f32, size: f32) -> Landmarks {
        (0..HAND_LANDMARKS)
            .map(|i| {
                let t = i as f32 / (HAND_LANDMARKS - 1) as f32;
                Landmark::new([cx - size / 2.0 + t * size, cy - size / 2.0 + t * size, 0.0])
            })
            .collect()
    }

    #[test]
    fn primary_hand_prefers_right() {
        let frame = LandmarkFrame::new(Duration::ZERO)
            .with_left_hand(hand_at(0.2, 0.5, 0.1))
            .with_right_hand(hand_at(0.8, 0.5, 0.1));
        let (_, handedness) = frame.primary_hand(0.09).unwrap();
        assert_eq!(handedness, Handedness::Right);
    }

    #[test]
    fn overlapping_hands_resolved_by_size() {
        let frame = LandmarkFrame::new(Duration::ZERO)
            .with_left_hand(hand_at(0.5, 0.5, 0.2))
            .with_right_hand(hand_at(0.52, 0.5, 0.05));
        let (_, handedness) = frame.primary_hand(0.09).unwrap();
        assert_eq!(handedness, Handedness::Left);
    }

    #[test]
    fn visibility_only_stored_when_present() {
        let mut lms = Landmarks::new(3);
        lms.set(1, Landmark::new([0.5, 0.5, 0.0]).with_visibility(0.9));
        assert_eq!(lms.get(1).visibility(), 0.9);
        assert_eq!(lms.get(0).visibility(), 0.0);
    }
}
