//! Invory library
//!
//! Exposes the cache subsystem, API router and configuration for use in
//! integration tests.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
