//! Store Insights - AI-augmented analytics for a point-of-sale store.
//!
//! Structured analytics (restock forecasts, alerts, basket pairs) are always
//! computed from the sales data. Narratives on top of them come from a
//! [`gateway::Gateway`] that prefers a local Ollama model and falls back to
//! the Anthropic API.

pub mod analytics;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod models;
pub mod registry;
pub mod report;
pub mod store;
