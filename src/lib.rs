//! Prepares per-strain sequencing run tables from ENA `read_run` metadata.
//!
//! The pipeline downloads one report per accession ([`fetch`]), concatenates
//! them ([`merge`]), filters and rewrites the runs ([`normalize`]) and writes
//! one CSV per strain ([`partition`]). [`app::App`] drives the four stages.

pub mod app;
pub mod config;
pub mod domain;
pub mod ena;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod normalize;
pub mod output;
pub mod partition;
pub mod store;
pub mod table;
