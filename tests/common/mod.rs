//! Shared fixtures for integration tests.

pub mod pdf;

pub use pdf::pdf_with_pages;
