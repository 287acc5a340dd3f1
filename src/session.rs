//! The per-session recognition state machine.
//!
//! A [`RecognitionSession`] owns every window, vote buffer and flag of both pipelines, the
//! motion estimator, and the registered event sinks. Exactly one landmark-processing call runs
//! per captured frame (the capture driver invokes [`RecognitionSession::process_frame`] and
//! nothing else touches the state), so no locking is needed anywhere. Concurrent calls (e.g. a
//! second participant's video) get their own session instance.

use crate::alphabet::AlphabetPipeline;
use crate::config::Config;
use crate::event::{speakable, EventSink, Pipeline, PredictionEvent};
use crate::feature::full_body_features;
use crate::landmark::LandmarkFrame;
use crate::motion::MotionEstimator;
use crate::nn::Classifier;
use crate::word::WordPipeline;

use std::time::Duration;

/// The externally selected operating mode.
///
/// The two pipelines are never both authoritative at once, but both keep ingesting frames in
/// every active mode so that a mode switch doesn't start from cold buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Recognition disabled; frames are ignored entirely.
    Off,
    /// Static hand shapes (digits/letters) are authoritative.
    Alphabet,
    /// Dynamic word gestures are authoritative.
    Word,
}

/// Per-session recognition state: both pipelines, motion arbitration, and event fan-out.
pub struct RecognitionSession {
    config: Config,
    mode: Mode,
    motion: MotionEstimator,
    alphabet: Option<AlphabetPipeline>,
    word: Option<WordPipeline>,
    suppress_static_until: Option<Duration>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl RecognitionSession {
    /// Creates a session with no pipelines attached.
    ///
    /// Attach classifiers with [`attach_alphabet_classifier`][Self::attach_alphabet_classifier]
    /// and [`attach_word_classifier`][Self::attach_word_classifier]; a pipeline whose model
    /// failed to load simply stays unattached and the rest of the session keeps working.
    pub fn new(config: Config) -> Self {
        let motion = MotionEstimator::new(
            config.movement.threshold,
            config.movement.vote_window,
            config.movement.min_votes,
        );
        Self {
            config,
            mode: Mode::Off,
            motion,
            alphabet: None,
            word: None,
            suppress_static_until: None,
            sinks: Vec::new(),
        }
    }

    /// Attaches (or replaces) the static hand-shape classifier.
    ///
    /// On error the previous pipeline (if any) is kept; the caller may retry with a freshly
    /// loaded model.
    pub fn attach_alphabet_classifier(
        &mut self,
        classifier: Box<dyn Classifier>,
    ) -> anyhow::Result<()> {
        let pipeline = AlphabetPipeline::new(
            classifier,
            self.config.alphabet.clone(),
            self.config.resolution,
        )?;
        self.alphabet = Some(pipeline);
        Ok(())
    }

    /// Attaches (or replaces) the dynamic word classifier.
    pub fn attach_word_classifier(
        &mut self,
        classifier: Box<dyn Classifier>,
    ) -> anyhow::Result<()> {
        let pipeline = WordPipeline::new(classifier, self.config.word.clone())?;
        self.word = Some(pipeline);
        Ok(())
    }

    pub fn alphabet_available(&self) -> bool {
        self.alphabet.is_some()
    }

    pub fn word_available(&self) -> bool {
        self.word.is_some()
    }

    /// Registers a sink receiving every emitted event (speech/caption, peer broadcast, ...).
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Switches the operating mode.
    ///
    /// Switching recognition off clears the static pipeline's buffers and stabilization state,
    /// the same as losing the hand. The word sequence window deliberately survives; an
    /// in-flight inference is not cancelled either, its eventual result just cannot emit.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }
        if mode == Mode::Off {
            if let Some(alphabet) = &mut self.alphabet {
                alphabet.reset();
            }
        }
        log::debug!("recognition mode: {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
    }

    /// Processes one captured frame and returns the events it produced (usually none).
    ///
    /// Emitted events have already been delivered to all registered sinks when this returns.
    pub fn process_frame(&mut self, frame: &LandmarkFrame) -> Vec<PredictionEvent> {
        if self.mode == Mode::Off {
            return Vec::new();
        }
        let now = frame.captured_at;

        let motion = self.motion.update(frame);
        if motion.smoothed_moving {
            self.suppress_static_until = Some(now + self.config.movement.hold_off);
        }
        // Confirmed motion means the signer is transitioning or mid-word; a static letter read
        // during that span is noise, and stays suppressed for a hold-off once motion ends.
        let movement_suppressed = self
            .suppress_static_until
            .map_or(false, |until| now < until);

        let mut events = Vec::new();

        if let Some(word) = &mut self.word {
            let features = full_body_features(frame);
            if let Some(prediction) =
                word.process(features, frame.any_hand(), now, self.mode != Mode::Word)
            {
                events.push(PredictionEvent::new(prediction, Pipeline::Word));
            }
        }

        if let Some(alphabet) = &mut self.alphabet {
            let suppressed = self.mode != Mode::Alphabet || movement_suppressed;
            let hand = frame
                .primary_hand(self.config.hand_overlap_radius)
                .map(|(hand, _)| hand);
            if let Some(prediction) = alphabet.process(hand, now, suppressed) {
                events.push(PredictionEvent::new(prediction, Pipeline::Alphabet));
            }
        }

        for event in &events {
            let text = speakable(event.label());
            for sink in &mut self.sinks {
                sink.deliver(event, &text);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::config::{AlphabetConfig, WordConfig};
    use crate::landmark::{Landmark, Landmarks, HAND_LANDMARKS};
    use crate::nn::{tensor::Tensor, Probabilities};

    use super::*;

    struct FixedStub {
        index: usize,
        probability: f32,
        classes: usize,
    }

    impl Classifier for FixedStub {
        fn classify(&mut self, _input: Tensor) -> anyhow::Result<Option<Probabilities>> {
            let mut values = vec![0.0; self.classes];
            values[self.index] = self.probability;
            Ok(Some(Probabilities::new(values)))
        }

        fn num_classes(&self) -> usize {
            self.classes
        }
    }

    fn session_with_alphabet(index: usize) -> RecognitionSession {
        let mut config = Config::default();
        config.alphabet = AlphabetConfig {
            inference_cooldown: Duration::ZERO,
            ..AlphabetConfig::default()
        };
        let mut session = RecognitionSession::new(config);
        session
            .attach_alphabet_classifier(Box::new(FixedStub {
                index,
                probability: 0.9,
                classes: 36,
            }))
            .unwrap();
        session
    }

    fn hand_frame(t: u64) -> LandmarkFrame {
        let hand: Landmarks = (0..HAND_LANDMARKS)
            .map(|i| {
                let s = i as f32 / (HAND_LANDMARKS - 1) as f32;
                Landmark::new([0.3 + s * 0.2, 0.6 - s * 0.3, 0.0])
            })
            .collect();
        LandmarkFrame::new(Duration::from_millis(t)).with_right_hand(hand)
    }

    #[test]
    fn off_mode_ignores_frames() {
        let mut session = session_with_alphabet(10);
        for i in 0..10 {
            assert!(session.process_frame(&hand_frame(i * 33)).is_empty());
        }
    }

    #[test]
    fn alphabet_mode_emits_and_feeds_sinks() {
        let mut session = session_with_alphabet(10);
        session.set_mode(Mode::Alphabet);

        let spoken = Arc::new(Mutex::new(Vec::new()));
        let sink_log = spoken.clone();
        session.add_sink(Box::new(move |event: &PredictionEvent, text: &str| {
            sink_log
                .lock()
                .unwrap()
                .push((event.label().to_string(), text.to_string()));
        }));

        let mut emitted = Vec::new();
        for i in 0..6 {
            emitted.extend(session.process_frame(&hand_frame(i * 33)));
        }
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].label(), "A");
        assert_eq!(emitted[0].pipeline(), Pipeline::Alphabet);
        assert_eq!(&*spoken.lock().unwrap(), &[("A".to_string(), "A".to_string())]);
    }

    #[test]
    fn word_mode_silences_alphabet() {
        let mut session = session_with_alphabet(10);
        session.set_mode(Mode::Word);
        for i in 0..30 {
            assert!(session.process_frame(&hand_frame(i * 33)).is_empty());
        }
    }

    #[test]
    fn switching_off_resets_static_state() {
        let mut session = session_with_alphabet(10);
        session.set_mode(Mode::Alphabet);
        let mut first = 0;
        for i in 0..6 {
            first += session.process_frame(&hand_frame(i * 33)).len();
        }
        assert_eq!(first, 1);

        session.set_mode(Mode::Off);
        session.set_mode(Mode::Alphabet);

        // Re-stabilizes and re-emits well inside the emission cooldown: state was cleared.
        let mut second = 0;
        for i in 6..12 {
            second += session.process_frame(&hand_frame(i * 33)).len();
        }
        assert_eq!(second, 1);
    }

    #[test]
    fn word_pipeline_stays_warm_in_alphabet_mode() {
        let mut config = Config::default();
        config.word = WordConfig {
            inference_cooldown: Duration::ZERO,
            ..WordConfig::default()
        };
        let mut session = RecognitionSession::new(config);
        session
            .attach_word_classifier(Box::new(FixedStub {
                index: 8, // "hello"
                probability: 0.95,
                classes: 15,
            }))
            .unwrap();
        session.set_mode(Mode::Alphabet);

        // 45 hand-present frames: the word pipeline stabilizes internally but may not emit.
        for i in 0..45 {
            assert!(session.process_frame(&hand_frame(i * 33)).is_empty());
        }

        // First frame after switching: the warm window and votes emit immediately.
        session.set_mode(Mode::Word);
        let events = session.process_frame(&hand_frame(45 * 33));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].label(), "hello");
        assert_eq!(events[0].pipeline(), Pipeline::Word);
    }

    #[test]
    fn failed_attach_leaves_session_usable() {
        let mut session = session_with_alphabet(10);
        let err = session.attach_word_classifier(Box::new(FixedStub {
            index: 0,
            probability: 0.9,
            classes: 7, // wrong vocabulary size
        }));
        assert!(err.is_err());
        assert!(!session.word_available());
        assert!(session.alphabet_available());

        session.set_mode(Mode::Alphabet);
        let mut emitted = 0;
        for i in 0..6 {
            emitted += session.process_frame(&hand_frame(i * 33)).len();
        }
        assert_eq!(emitted, 1);
    }
}
