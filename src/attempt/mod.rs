// src/attempt/mod.rs
//
// Client side of taking an exam: the per-question countdown, the calls made to
// the server, and the state machine that walks a student through the questions.

pub mod client;
pub mod context;
pub mod sequencer;
pub mod timer;

pub use client::{ApiError, ExamApi, HttpExamApi};
pub use context::{SessionContext, SessionStore};
pub use sequencer::{Advance, AttemptError, AttemptState, ExamAttempt};
pub use timer::{Countdown, Severity, TimerProgress, TimerWatch};
