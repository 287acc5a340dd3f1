//! Signsteady – continuous sign-language recognition from landmark streams.
//!
//! This crate turns a per-frame stream of body/face/hand landmarks (as produced by a holistic
//! pose estimator) into discrete, stabilized `(label, probability)` events. Two independently
//! trained classifiers run side by side:
//!
//! * a *static* classifier for single hand shapes (digits and letters), fed a temporally
//!   averaged, wrist-relative 42-value hand vector, and
//! * a *dynamic* classifier for whole-word gestures, fed a fixed 30-frame window of 1662-value
//!   full-body vectors.
//!
//! Both run multi-stage temporal filtering (confidence gates, majority/unanimity votes,
//! cooldowns) before anything becomes externally visible. [`session::RecognitionSession`] owns
//! all mutable state and is the single entry point: feed it one [`landmark::LandmarkFrame`] per
//! captured frame and forward the returned events.
//!
//! # Coordinates
//!
//! Landmark coordinates are normalized to `[0, 1]` relative to the capture resolution, X to the
//! right, Y down, matching the conventions of the upstream estimator. Depth (Z) is carried
//! through untouched.
//!
//! # Timestamps
//!
//! All cooldown and rate-limit logic keys off [`landmark::LandmarkFrame::captured_at`], never
//! off wall-clock reads. Replaying a recorded frame sequence therefore reproduces the exact
//! same event sequence.

use log::LevelFilter;

pub mod alphabet;
pub mod config;
pub mod event;
pub mod feature;
pub mod filter;
pub mod landmark;
pub mod motion;
pub mod nn;
pub mod session;
pub mod window;
pub mod word;
pub mod worker;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and signsteady will log at *debug* level; `RUST_LOG` overrides apply on
/// top. If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
