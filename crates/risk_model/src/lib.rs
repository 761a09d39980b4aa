//! Exposure-probability estimates from a cumulative case series.
//!
//! A [`RiskModel`] turns the most recent seven-day rise in reported cases
//! into a per-person probability of being infectious, `p1`, and from there
//! into the chance that a group of `n` people contains at least one such
//! person. [`charts`] derives the point series drawn next to those figures.

pub mod charts;
mod model;

pub use model::{ModelError, RiskModel, WindowStart, WINDOW_DAYS};
