//! Route handlers for the HTTP API.

pub mod health;
pub mod hls;
pub mod jobs;
pub mod media;
pub mod process;
pub mod proxy;
pub mod upload;
