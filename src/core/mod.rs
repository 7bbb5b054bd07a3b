//! Core translation engine module

pub mod batch;
pub mod client;
pub mod config;
pub mod credential;
pub mod errors;
pub mod models;
pub mod worker;
