mod client;
mod mapper;
pub mod remote;

pub use client::GitHubPublisher;
