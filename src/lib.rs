//! Listening-history track resolution - shared modules for all binaries.

pub mod models;
pub mod normalize;
pub mod progress;
pub mod resolver;
pub mod safety;
pub mod scoring;
pub mod sources;
pub mod summary;
