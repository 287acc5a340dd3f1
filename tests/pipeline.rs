//! End-to-end scenarios driving a [`RecognitionSession`] with stub classifiers.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use signsteady::config::{AlphabetConfig, Config, WordConfig};
use signsteady::event::{Pipeline, PredictionEvent};
use signsteady::landmark::{Landmark, LandmarkFrame, Landmarks, HAND_LANDMARKS, POSE_LANDMARKS};
use signsteady::nn::{tensor::Tensor, Classifier, Probabilities};
use signsteady::session::{Mode, RecognitionSession};

/// Predicts a fixed class at a fixed probability and counts invocations.
struct FixedStub {
    index: usize,
    probability: f32,
    classes: usize,
    calls: Arc<AtomicUsize>,
}

impl FixedStub {
    fn new(index: usize, probability: f32, classes: usize) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                index,
                probability,
                classes,
                calls: calls.clone(),
            },
            calls,
        )
    }
}

impl Classifier for FixedStub {
    fn classify(&mut self, _input: Tensor) -> anyhow::Result<Option<Probabilities>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut values = vec![0.0; self.classes];
        values[self.index] = self.probability;
        Ok(Some(Probabilities::new(values)))
    }

    fn num_classes(&self) -> usize {
        self.classes
    }
}

fn fast_config() -> Config {
    let mut config = Config::default();
    config.alphabet = AlphabetConfig {
        inference_cooldown: Duration::ZERO,
        ..AlphabetConfig::default()
    };
    config.word = WordConfig {
        inference_cooldown: Duration::ZERO,
        ..WordConfig::default()
    };
    config
}

fn steady_hand() -> Landmarks {
    (0..HAND_LANDMARKS)
        .map(|i| {
            let t = i as f32 / (HAND_LANDMARKS - 1) as f32;
            Landmark::new([0.35 + t * 0.2, 0.65 - t * 0.3, 0.0])
        })
        .collect()
}

fn steady_pose() -> Landmarks {
    (0..POSE_LANDMARKS)
        .map(|i| Landmark::new([0.02 * i as f32, 0.4, 0.0]).with_visibility(1.0))
        .collect()
}

fn frame(t_ms: u64, hand: bool) -> LandmarkFrame {
    let mut frame = LandmarkFrame::new(Duration::from_millis(t_ms)).with_pose(steady_pose());
    if hand {
        frame = frame.with_right_hand(steady_hand());
    }
    frame
}

fn run(session: &mut RecognitionSession, frames: &[LandmarkFrame]) -> Vec<PredictionEvent> {
    frames
        .iter()
        .flat_map(|f| session.process_frame(f))
        .collect()
}

#[test]
fn static_pipeline_stabilizes_and_cools_down() {
    let (stub, _) = FixedStub::new(10, 0.9, 36); // "A"
    let mut session = RecognitionSession::new(fast_config());
    session.attach_alphabet_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Alphabet);

    // One second of hand-held frames at ~30fps.
    let frames: Vec<_> = (0..30).map(|i| frame(i * 33, true)).collect();
    let events = run(&mut session, &frames);

    assert!(!events.is_empty());
    assert!(events.iter().all(|e| e.label() == "A"));
    assert!(events.iter().all(|e| e.pipeline() == Pipeline::Alphabet));
    // Identical emissions inside the 300ms cooldown collapse; ~1s yields at most 4.
    assert!(events.len() <= 4, "got {} events", events.len());
}

#[test]
fn under_three_buffered_frames_never_infers() {
    let (stub, calls) = FixedStub::new(10, 0.9, 36);
    let mut session = RecognitionSession::new(fast_config());
    session.attach_alphabet_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Alphabet);

    session.process_frame(&frame(0, true));
    session.process_frame(&frame(33, true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn hand_loss_resets_and_reemits() {
    let (stub, _) = FixedStub::new(10, 0.9, 36);
    let mut session = RecognitionSession::new(fast_config());
    session.attach_alphabet_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Alphabet);

    let mut frames = Vec::new();
    for i in 0..6 {
        frames.push(frame(i * 33, true)); // stabilize "A"
    }
    frames.push(frame(200, false)); // hand gone for one frame
    for i in 7..13 {
        frames.push(frame(i * 33, true)); // stabilize "A" again
    }
    let events = run(&mut session, &frames);

    // Both spans emit, even though the second lands inside the first's cooldown.
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.label() == "A"));
    assert!(events[1].probability() > 0.0);
}

#[test]
fn hello_scenario_emits_exactly_once() {
    let (stub, _) = FixedStub::new(8, 0.95, 15); // "hello"
    let mut session = RecognitionSession::new(fast_config());
    session.attach_word_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Word);

    // Hand present throughout; the window fills after 30 frames, then ten consecutive
    // unanimous classifications stabilize the word.
    let frames: Vec<_> = (0..45).map(|i| frame(i * 33, true)).collect();
    let events = run(&mut session, &frames);

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].label(), "hello");
    assert_eq!(events[0].pipeline(), Pipeline::Word);
    assert_eq!(events[0].class_index(), 8);
    assert!((events[0].probability() - 0.95).abs() < 1e-6);
}

#[test]
fn hand_absent_word_windows_are_suppressed() {
    let (stub, calls) = FixedStub::new(8, 0.95, 15);
    let mut session = RecognitionSession::new(fast_config());
    session.attach_word_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Word);

    // Confident classifications with no hand anywhere in the window: body sway, not a sign.
    let frames: Vec<_> = (0..60).map(|i| frame(i * 33, false)).collect();
    let events = run(&mut session, &frames);

    assert!(events.is_empty());
    assert!(calls.load(Ordering::SeqCst) >= 10);
}

#[test]
fn replaying_a_sequence_is_idempotent() {
    let frames: Vec<_> = (0..40)
        .map(|i| frame(i * 33, i % 11 != 10)) // an occasional hand dropout
        .collect();

    let run_once = || {
        let (alphabet, _) = FixedStub::new(12, 0.9, 36);
        let (word, _) = FixedStub::new(8, 0.95, 15);
        let mut session = RecognitionSession::new(fast_config());
        session.attach_alphabet_classifier(Box::new(alphabet)).unwrap();
        session.attach_word_classifier(Box::new(word)).unwrap();
        session.set_mode(Mode::Alphabet);
        run(&mut session, &frames)
    };

    let first = run_once();
    let second = run_once();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[test]
fn word_emissions_respect_their_cooldown() {
    let (stub, _) = FixedStub::new(8, 0.95, 15);
    let mut session = RecognitionSession::new(fast_config());
    session.attach_word_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Word);

    // ~4.6s of frames: the identical label may re-emit only after 2s.
    let frames: Vec<_> = (0..140).map(|i| frame(i * 33, true)).collect();
    let events = run(&mut session, &frames);
    assert_eq!(events.len(), 2);
}

#[test]
fn confirmed_motion_suppresses_static_emissions() {
    let (stub, _) = FixedStub::new(10, 0.9, 36);
    let mut session = RecognitionSession::new(fast_config());
    session.attach_alphabet_classifier(Box::new(stub)).unwrap();
    session.set_mode(Mode::Alphabet);

    // The whole body (pose + hand) sweeps across the frame fast enough to trip the 0.02
    // movement threshold every frame.
    let mut frames = Vec::new();
    for i in 0..20u64 {
        let shift = 0.03 * i as f32;
        let pose: Landmarks = steady_pose()
            .iter()
            .map(|lm| {
                let [x, y, z] = lm.position();
                Landmark::new([x + shift, y, z]).with_visibility(1.0)
            })
            .collect();
        let hand: Landmarks = steady_hand()
            .iter()
            .map(|lm| {
                let [x, y, z] = lm.position();
                Landmark::new([x + shift, y, z])
            })
            .collect();
        frames.push(
            LandmarkFrame::new(Duration::from_millis(i * 33))
                .with_pose(pose)
                .with_right_hand(hand),
        );
    }
    let events = run(&mut session, &frames);
    assert!(events.is_empty(), "moving hand still emitted {events:?}");
}
