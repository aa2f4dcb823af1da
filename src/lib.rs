pub mod config;
pub mod errors;
pub mod evaluation;
pub mod policies;
pub mod tables;
