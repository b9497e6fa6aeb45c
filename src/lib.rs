pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod processing;
pub mod render;
pub mod scale;
pub mod server;
pub mod stats;
pub mod tooltip;
pub mod topology;
pub mod types;
