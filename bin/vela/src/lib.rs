//! Vela command line client

pub mod cli;
pub mod scenario;
pub mod utils;
