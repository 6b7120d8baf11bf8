//! Tax-rate detection, price extraction and overlay planning.

pub mod compositor;
pub mod engine;
pub mod planner;
pub mod rules;

pub use compositor::{ApplyReport, Compositor, OverlayFailure};
pub use engine::{CorrectionEngine, CorrectionReport, CorrectionWarning};
pub use planner::{OverlayPlanner, PlannedCorrection};
