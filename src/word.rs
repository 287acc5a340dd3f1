//! The dynamic classifier pipeline: whole-word gestures over fixed-length sequences.
//!
//! Every frame (hand present or not) contributes a full-body feature vector to a strict
//! 30-frame window; word signs tolerate brief hand occlusion, so this window is never cleared.
//! Once the window is full, inference runs on its own cooldown, and a prediction is only
//! accepted when the last ten raw class indices agree unanimously. That is stricter than the
//! static pipeline's majority vote on purpose: a dynamic gesture spans many frames, and a
//! single misread inside the window would otherwise surface as a spurious word.
//!
//! A final hand-presence gate rejects windows in which no hand was seen for a while; body sway
//! alone can classify confidently, and that is exactly the false positive to suppress.

use std::time::Duration;

use crate::config::WordConfig;
use crate::event::StablePrediction;
use crate::feature::FULL_BODY_FEATURES;
use crate::filter::UnanimousVote;
use crate::nn::{tensor::Tensor, Classifier};
use crate::window::SlidingWindow;

/// The fixed word vocabulary, in training order. The final class is the reserved idle class:
/// it is never emitted and only resets the pipeline's expectations.
pub const WORD_LABELS: [&str; 15] = [
    "actor",
    "bed",
    "dream",
    "dress",
    "evening",
    "friend",
    "goodmorning",
    "happy",
    "hello",
    "howareyou",
    "loud",
    "pleased",
    "thankyou",
    "they",
    "noaction",
];

/// Index of the reserved idle class within [`WORD_LABELS`].
pub const IDLE_CLASS: usize = WORD_LABELS.len() - 1;

/// Dynamic word recognition pipeline.
pub struct WordPipeline {
    classifier: Box<dyn Classifier>,
    cfg: WordConfig,
    /// The strict fixed-length sequence window. Never cleared.
    sequence: SlidingWindow<Vec<f32>>,
    /// Recent hand-presence samples, read at a shorter suffix by the acceptance gate.
    presence: SlidingWindow<bool>,
    stability: UnanimousVote,
    last_inference: Option<Duration>,
    last_emitted: Option<(String, Duration)>,
}

impl WordPipeline {
    /// Creates the pipeline around a loaded word classifier.
    ///
    /// Fails if the classifier's output width doesn't match the fixed vocabulary.
    pub fn new(classifier: Box<dyn Classifier>, cfg: WordConfig) -> anyhow::Result<Self> {
        if classifier.num_classes() != WORD_LABELS.len() {
            anyhow::bail!(
                "word classifier has {} classes, vocabulary has {}",
                classifier.num_classes(),
                WORD_LABELS.len(),
            );
        }
        Ok(Self {
            classifier,
            sequence: SlidingWindow::new(cfg.sequence_length),
            presence: SlidingWindow::new(cfg.presence_window),
            stability: UnanimousVote::new(cfg.stability_window),
            last_inference: None,
            last_emitted: None,
            cfg,
        })
    }

    /// Feeds one frame's full-body features and hand-presence sample into the pipeline.
    ///
    /// Returns a stabilized prediction when one passes every gate this frame. With
    /// `suppressed` set, the window and stability state still advance but nothing is accepted
    /// or recorded as emitted.
    pub fn process(
        &mut self,
        features: Vec<f32>,
        hand_present: bool,
        now: Duration,
        suppressed: bool,
    ) -> Option<StablePrediction> {
        debug_assert_eq!(features.len(), FULL_BODY_FEATURES);
        self.sequence.push(features);
        self.presence.push(hand_present);

        if !self.sequence.is_full() {
            return None;
        }
        if let Some(last) = self.last_inference {
            if now.saturating_sub(last) < self.cfg.inference_cooldown {
                return None;
            }
        }

        self.last_inference = Some(now);
        let input = Tensor::from_iter(
            &[1, self.cfg.sequence_length, FULL_BODY_FEATURES],
            self.sequence.iter().flatten().copied(),
        );
        let probs = match self.classifier.classify(input) {
            Ok(Some(probs)) => probs,
            // Dropped or still in flight; a later frame picks up the result.
            Ok(None) => return None,
            Err(err) => {
                log::warn!("word inference failed: {err}");
                return None;
            }
        };

        if !probs.all_finite() {
            log::warn!("word model produced non-finite probabilities, discarding");
            return None;
        }
        let (index, probability) = probs.top()?;
        let stable = self.stability.push(index);

        if index == IDLE_CLASS {
            if stable && self.last_emitted.take().is_some() {
                log::debug!("stable idle class, expectations reset");
            }
            return None;
        }
        if probability <= self.cfg.confidence_threshold {
            return None;
        }
        if !stable {
            log::trace!(
                "word prediction '{}' not yet stable, waiting for unanimity",
                WORD_LABELS[index]
            );
            return None;
        }
        if !self.presence.iter_last(self.cfg.presence_suffix).any(|&p| p) {
            log::debug!(
                "suppressing hand-absent word prediction '{}'",
                WORD_LABELS[index]
            );
            return None;
        }

        let label = WORD_LABELS[index].to_string();
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
        log::debug!("word stabilized: {label} (p={probability:.2})");
        Some(StablePrediction {
            class_index: index,
            label,
            probability,
        })
    }
}
