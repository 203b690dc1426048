//! API request handlers

mod health;
mod workloads;

pub use health::*;
pub use workloads::*;
