pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod llm;
pub mod logging;
pub mod outlet;
pub mod sourcing;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use config::Config;
pub use error::SourcingError;
pub use sourcing::launch;
