//! Keeps a local Stable Diffusion installation in step with a YAML list of
//! checkpoints, LoRAs and upscalers, and serves a small gallery over its
//! generated images.

pub mod config;
#[cfg(feature = "gallery")]
pub mod gallery;
pub mod models;
pub mod output;
pub mod storage;
