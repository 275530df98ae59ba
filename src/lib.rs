#![deny(missing_docs)]

//! Core library for the Rusty Companion server.

/// HTTP routing and REST handlers.
pub mod api;
/// Prompt assembly, response parsing, and chat completion adapters.
pub mod chat;
/// Environment-driven configuration management.
pub mod config;
/// Document ingestion: text extraction, the shared store, and context composition.
pub mod documents;
/// Structured logging and tracing setup.
pub mod logging;
/// Activity counters.
pub mod metrics;
/// Orchestration of uploads, chat turns, and speech synthesis.
pub mod pipeline;
/// Speech synthesis adapters.
pub mod speech;
/// Shared HTTP plumbing for upstream services.
pub mod upstream;
