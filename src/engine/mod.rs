//! Schedule evaluation engine.

mod evaluator;

pub use evaluator::{ApplyWindow, CycleReport, ScheduleEngine};
