pub mod adapters;
pub mod auth;
pub mod config;
mod listing;
pub mod ports;
pub mod server;
pub mod stats;
pub mod sync;
pub mod types;

pub use server::{app, serve};
