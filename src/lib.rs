//! Football match history ingestion and a Poisson-Gamma scoreline model.
//!
//! The pipeline is deliberately flat: fetch match ids and statistics from
//! the FotMob API into CSV tables, pull per-team count samples back out,
//! fit a smoothed scoring distribution per side, and combine the two into
//! outcome probabilities.

pub mod catalog;
pub mod error;
pub mod http_cache;
pub mod http_client;
pub mod ids_fetch;
pub mod outcome;
pub mod poisson_gamma;
pub mod retry;
pub mod samples;
pub mod stats_fetch;
