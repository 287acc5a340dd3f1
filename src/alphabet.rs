//! The static classifier pipeline: single hand shapes (digits and letters).
//!
//! Per usable hand frame, the pipeline smooths the raw normalized landmarks, accumulates them
//! in a feature buffer, and, rate-limited by its own inference cooldown, runs the hand-shape
//! model over the averaged history. A raw prediction has to clear two gates before it becomes
//! externally visible: a confidence threshold on the top-1 probability and a cross-frame
//! majority vote. The double gate suppresses the transient misclassifications that happen
//! while a hand transitions between shapes, at a latency cost of a few frames.
//!
//! The instant no hand is detected, every buffer and the emission state reset; stale votes
//! must never leak into the next gesture.

use std::time::Duration;

use crate::config::{AlphabetConfig, Resolution};
use crate::event::StablePrediction;
use crate::feature::{hand_coordinates, hand_features, HAND_FEATURES};
use crate::filter::{Filter, MajorityVote, VecAvg};
use crate::landmark::Landmarks;
use crate::nn::{tensor::Tensor, Classifier};
use crate::window::SlidingWindow;

/// Builds the label table for a hand-shape model with `num_classes` outputs.
///
/// The base vocabulary is the 36 digit and letter classes in training order; extended model
/// variants append a `Space` class (37) or `Space` and `Delete` (38).
pub fn labels(num_classes: usize) -> anyhow::Result<Vec<String>> {
    let mut table: Vec<String> = ('0'..='9').chain('A'..='Z').map(String::from).collect();
    match num_classes {
        36 => {}
        37 => table.push("Space".into()),
        38 => {
            table.push("Space".into());
            table.push("Delete".into());
        }
        _ => anyhow::bail!("unsupported hand-shape class count {num_classes}"),
    }
    Ok(table)
}

/// Static hand-shape recognition pipeline.
pub struct AlphabetPipeline {
    classifier: Box<dyn Classifier>,
    labels: Vec<String>,
    cfg: AlphabetConfig,
    resolution: Resolution,
    /// Jitter smoothing over raw normalized landmarks, ahead of the feature buffer.
    smoother: VecAvg,
    /// Buffered (smoothed) feature frames; inference requires a minimum fill.
    raw_buffer: SlidingWindow<Vec<f32>>,
    /// Normalized-landmark history averaged right before pixel conversion.
    history: VecAvg,
    vote: MajorityVote,
    last_inference: Option<Duration>,
    last_emitted: Option<(String, Duration)>,
}

impl AlphabetPipeline {
    /// Creates the pipeline around a loaded hand-shape classifier.
    ///
    /// Fails if the classifier's output width doesn't correspond to a known label table.
    pub fn new(
        classifier: Box<dyn Classifier>,
        cfg: AlphabetConfig,
        resolution: Resolution,
    ) -> anyhow::Result<Self> {
        let labels = labels(classifier.num_classes())?;
        Ok(Self {
            classifier,
            labels,
            smoother: VecAvg::new(cfg.smoothing_window, HAND_FEATURES),
            raw_buffer: SlidingWindow::new(cfg.raw_buffer_cap),
            history: VecAvg::new(cfg.history_window, HAND_FEATURES),
            vote: MajorityVote::new(cfg.vote_window, cfg.vote_min_entries, cfg.vote_majority),
            last_inference: None,
            last_emitted: None,
            cfg,
            resolution,
        })
    }

    /// Feeds one frame's hand skeleton (or its absence) into the pipeline.
    ///
    /// Returns a stabilized prediction when one passes every gate this frame. With
    /// `suppressed` set, all buffers and votes still advance but nothing is accepted or
    /// recorded as emitted; arbitration uses this to keep a non-authoritative pipeline warm.
    pub fn process(
        &mut self,
        hand: Option<&Landmarks>,
        now: Duration,
        suppressed: bool,
    ) -> Option<StablePrediction> {
        let Some(hand) = hand else {
            self.reset();
            return None;
        };

        // A partially tracked hand (fewer than 21 points) skips the frame without resetting;
        // the hand is still there, the estimator just lost part of it.
        let coords = hand_coordinates(hand)?;
        let smoothed = self.smoother.push(coords);
        self.raw_buffer.push(smoothed);

        if self.raw_buffer.len() < self.cfg.min_buffered_frames {
            return None;
        }
        if let Some(last) = self.last_inference {
            if now.saturating_sub(last) < self.cfg.inference_cooldown {
                return None;
            }
        }

        let latest = self.raw_buffer.newest()?.clone();
        let averaged = self.history.push(latest);
        let features = hand_features(&averaged, self.resolution);
        if features.is_zero() {
            log::trace!("degenerate hand features, skipping inference");
            return None;
        }

        self.last_inference = Some(now);
        let input = Tensor::from_iter(&[1, HAND_FEATURES], features.values().iter().copied());
        let probs = match self.classifier.classify(input) {
            Ok(Some(probs)) => probs,
            // Dropped or still in flight; some later frame will see the result.
            Ok(None) => return None,
            Err(err) => {
                log::warn!("hand-shape inference failed: {err}");
                return None;
            }
        };

        if !probs.all_finite() {
            log::warn!("hand-shape model produced non-finite probabilities, discarding");
            return None;
        }
        let (index, probability) = probs.top()?;
        if probability < self.cfg.confidence_threshold {
            log::trace!(
                "hand-shape prediction below confidence threshold ({probability:.2}), ignoring"
            );
            return None;
        }

        let winner = self.vote.push(index)?;
        let label = self.labels.get(winner)?.clone();
        if suppressed {
            return None;
        }

        if let Some((last_label, last_at)) = &self.last_emitted {
            let held = *last_label == label
                && now.saturating_sub(*last_at) < self.cfg.emission_cooldown;
            if held {
                return None;
            }
        }
        self.last_emitted = Some((label.clone(), now));
        log::debug!("hand shape stabilized: {label} (p={probability:.2})");
        Some(StablePrediction {
            class_index: winner,
            label,
            probability,
        })
    }

    /// Clears every buffer, the vote window, and the emission state.
    ///
    /// Called on hand loss and when recognition is switched off.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.raw_buffer.clear();
        self.history.reset();
        self.vote.clear();
        self.last_emitted = None;
    }
}
