//! API route handlers

pub mod admin;
pub mod config;
pub mod detect;
pub mod stats;
pub mod stream;
