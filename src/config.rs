//! Session configuration.
//!
//! Every threshold, cooldown and window size in the recognition pipelines was empirically
//! tuned against the reference signer recordings; the values here are those defaults, not
//! guaranteed-correct constants. All of them can be overridden per session without code
//! changes.

use std::time::Duration;

/// Capture resolution of the video feed the landmarks were estimated on.
///
/// The static classifier was trained on pixel coordinates, so feature extraction needs to know
/// the resolution to reproduce the training-time conversion exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
        }
    }
}

/// Tunables of the static (hand-shape) pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AlphabetConfig {
    /// Raw predictions below this top-1 probability are discarded before voting.
    pub confidence_threshold: f32,
    /// Minimum spacing between two inference calls.
    pub inference_cooldown: Duration,
    /// Minimum spacing between two emissions of the *same* label.
    pub emission_cooldown: Duration,
    /// Size of the majority-vote window.
    pub vote_window: usize,
    /// Votes required before a window may produce a winner.
    pub vote_min_entries: usize,
    /// Minimum frequency of the winning index within the window.
    pub vote_majority: usize,
    /// Buffered feature frames required before the first inference.
    pub min_buffered_frames: usize,
    /// Jitter pre-smoothing window over raw normalized landmarks.
    pub smoothing_window: usize,
    /// Normalized-landmark history depth averaged before pixel conversion.
    pub history_window: usize,
    /// Cap of the raw-feature buffer.
    pub raw_buffer_cap: usize,
}

impl Default for AlphabetConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            inference_cooldown: Duration::from_millis(500),
            emission_cooldown: Duration::from_millis(300),
            vote_window: 5,
            vote_min_entries: 3,
            vote_majority: 3,
            min_buffered_frames: 3,
            smoothing_window: 3,
            history_window: 5,
            raw_buffer_cap: 120,
        }
    }
}

/// Tunables of the dynamic (word) pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct WordConfig {
    /// Predictions at or below this top-1 probability never stabilize into an emission.
    pub confidence_threshold: f32,
    /// Minimum spacing between two inference calls.
    pub inference_cooldown: Duration,
    /// Minimum spacing between two emissions of the *same* label.
    pub emission_cooldown: Duration,
    /// Consecutive raw predictions that must agree unanimously.
    pub stability_window: usize,
    /// Exact number of frames per classified sequence.
    pub sequence_length: usize,
    /// Cap of the hand-presence sample window.
    pub presence_window: usize,
    /// Suffix of the presence window that must contain at least one hand sample.
    pub presence_suffix: usize,
}

impl Default for WordConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            inference_cooldown: Duration::from_millis(1000),
            emission_cooldown: Duration::from_millis(2000),
            stability_window: 10,
            sequence_length: 30,
            presence_window: 60,
            presence_suffix: 15,
        }
    }
}

/// Tunables of the motion estimator and the movement arbitration gate.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementConfig {
    /// Mean key-point displacement (normalized units) above which a frame counts as moving.
    pub threshold: f32,
    /// Debounce window over the per-frame movement boolean.
    pub vote_window: usize,
    /// Positive samples required within the window for the smoothed signal.
    pub min_votes: usize,
    /// How long static emissions stay suppressed after confirmed motion ends.
    pub hold_off: Duration,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            threshold: 0.02,
            vote_window: 5,
            min_votes: 4,
            hold_off: Duration::from_millis(2000),
        }
    }
}

/// Complete session configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub resolution: Resolution,
    /// Centroid distance (normalized units) below which two reported hands are treated as a
    /// double-detection of the same physical hand.
    pub hand_overlap_radius: f32,
    pub alphabet: AlphabetConfig,
    pub word: WordConfig,
    pub movement: MovementConfig,
}

impl Config {
    /// The default hand-overlap radius, roughly 60px at the default capture width.
    pub const DEFAULT_HAND_OVERLAP_RADIUS: f32 = 0.09;
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resolution: Resolution::default(),
            hand_overlap_radius: Self::DEFAULT_HAND_OVERLAP_RADIUS,
            alphabet: AlphabetConfig::default(),
            word: WordConfig::default(),
            movement: MovementConfig::default(),
        }
    }
}
