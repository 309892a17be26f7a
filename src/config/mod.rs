//! Simulation Configuration Module
//!
//! Provides the simulator's configuration loaded from TOML files, replacing
//! hardcoded layout, timing and transport constants with operator-tunable
//! values.
//!
//! ## Loading Order
//!
//! 1. `FLOWSIM_CONFIG` environment variable (path to TOML file)
//! 2. `flowsim.toml` in the current working directory
//! 3. Built-in defaults (see [`defaults`])
//!
//! The loaded [`SimConfig`] is passed explicitly to the components that need
//! it; there is no process-global copy.

mod sim_config;
pub mod defaults;

pub use sim_config::*;
