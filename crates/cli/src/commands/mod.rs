//! Command handlers for the docqa CLI.

pub mod ask;
pub mod ingest;
pub mod stats;

pub use ask::AskCommand;
pub use ingest::IngestCommand;
pub use stats::StatsCommand;
