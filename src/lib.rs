//! Morning Briefing - a news headline aggregator
//!
//! This crate fetches headlines from a configured list of RSS feeds, keeps
//! every fetch in a local SQLite table and serves the stored headlines by
//! date or by source over a small JSON API.

pub mod article;
pub mod config;
pub mod fetcher;
pub mod parser;
pub mod routes;
pub mod store;
