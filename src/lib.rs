pub mod cli;
pub mod discover;
pub mod error;
pub mod mcp;
pub mod model;
pub mod query;
pub mod stats;
pub mod store;
pub mod tools;
