//! Issuer Action Code (IAC) values: `Default` (9F0D), `Denial` (9F0E), and
//! `Online` (9F0F). Information can be found in EMV Book 3, section `10.7`.
//!
//! These exist as typed inputs for a future Terminal Action Analysis
//! implementation - the session orchestrator's card-action-analysis step
//! is fixed to always request `AAC` (spec §4.G, §9 Open Question) and does
//! not yet consult them.

mod default;
mod denial;
mod online;

pub use self::{default::*, denial::*, online::*};
