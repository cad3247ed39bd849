//! YCD reconciliation library - shared modules for all binaries.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod playlist;
pub mod progress;
pub mod safety;
pub mod scoring;
pub mod search;
pub mod spotify;

#[cfg(test)]
mod test_support;
