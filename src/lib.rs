pub mod cli;
pub mod config;
pub mod results;
pub mod search;
