//! Pairs group-chat questions with voice answers and republishes them.

pub mod channels;
pub mod compose;
pub mod config;
pub mod error;
pub mod questions;
pub mod relay;
