pub mod models;
pub mod errors;
pub mod config;
pub mod parsers;
pub mod engine;
pub mod crawler;
pub mod evaluate;
pub mod corpus;  // Token corpus analysis
pub mod mutator;
pub mod verdict;
pub mod differential;
pub mod randomness;
pub mod reporting;

// Re-export commonly used items
pub use models::*;
pub use errors::*;
pub use config::*;
pub use parsers::*;
pub use engine::*;
pub use crawler::*;
pub use evaluate::*;
pub use corpus::*;  // Re-exports all corpus analysis functionality
pub use mutator::*;
pub use verdict::*;
pub use differential::*;
pub use randomness::{run_battery_detailed, run_randomness_battery, TestOutcome};
pub use reporting::*;
