//! # Musication Common Library
//!
//! Shared code for the Musication crates:
//! - Analysis Service data model (jobs, similarity results, library stats)
//! - Job lifecycle phases and failure reasons
//! - Event types (MusicationEvent enum) and EventBus
//! - Configuration loading
//! - Human-readable formatting helpers

pub mod config;
pub mod error;
pub mod events;
pub mod human_time;
pub mod models;

pub use error::{Error, Result};
