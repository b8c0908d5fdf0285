//! Customer retention simulator.
//!
//! A discrete-time Markov model over five customer segments: four active
//! ones and an absorbing churn state. Runs are seeded from parameters or
//! rehydrated from a previously serialized run.

pub mod api;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod record;
pub mod rehydrate;
pub mod revenue;
pub mod segment;
pub mod steady_state;
pub mod store;
pub mod summary;
pub mod types;
