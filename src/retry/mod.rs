// src/retry/mod.rs
mod runner;

pub use runner::{StartupError, StartupRunner};
