//! Closed-loop policy evaluation for robot manipulators.
//!
//! A [`control::EvalSession`] connects a [`robot::Robot`], then repeatedly
//! captures observations, asks an [`inference::InferenceClient`] for an action
//! chunk, blends overlapping chunks with the
//! [`ensemble::TemporalActionEnsembler`] and dispatches the result at a fixed
//! control frequency.

pub mod config;
pub mod control;
pub mod embodiment;
pub mod ensemble;
pub mod inference;
pub mod logging;
pub mod observation;
pub mod robot;

#[cfg(feature = "python")]
mod python;
