pub mod benchmark;
pub mod brain;
pub mod config;
pub mod decision;
pub mod error;
pub mod geometry;
pub mod host;
pub mod pilot;
pub mod predictor;
pub mod reward;
pub mod runner;
pub mod sim;
pub mod state;
pub mod strategy;
pub mod tracker;
pub mod util;
