// src/startup/mod.rs
mod gate;

pub use gate::StartupGate;
