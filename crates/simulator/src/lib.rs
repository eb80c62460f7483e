// simulator/src/lib.rs

//! Scripted and randomized driver for a single liquidity pool
//!
//! A scenario file names two tokens, a set of funded accounts and a list of
//! steps. [`Simulation`] replays the steps against in-memory ledgers and a
//! manual clock; [`fuzz`] hammers a pool with seeded random operations while
//! checking the pool invariants after every call.

pub mod config;
pub mod fuzz;
pub mod runner;

pub use config::{AccountSpec, SimulatorConfig, Step, TokenSpec};
pub use fuzz::{fuzz, FuzzConfig, FuzzSummary};
pub use runner::{AccountReport, Simulation, SimulationReport, StepError, StepOutcome};
