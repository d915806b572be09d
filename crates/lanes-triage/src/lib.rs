#![forbid(unsafe_code)]
//! lanes-triage: derived ordering for presenting issues.
//!
//! Everything here is pure. Functions take a borrowed issue slice and a
//! reference time and never touch the store.
//!
//! - [`score`]: the priority score formula.
//! - [`view`]: filter criteria, sort keys and board columns.

pub mod score;
pub mod view;
