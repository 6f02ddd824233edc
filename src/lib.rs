pub mod agent;
pub mod config;
pub mod error;
pub mod platform;
pub mod process;
pub mod provider;
pub mod workflow;
pub mod workspace;
