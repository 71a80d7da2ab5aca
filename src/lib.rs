pub mod api;
pub mod calculator;
pub mod config;
pub mod error;
pub mod estimation;
pub mod ledger;
pub mod stats;
