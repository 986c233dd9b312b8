pub mod aggregate;
pub mod app;
pub mod batch;
pub mod cache;
pub mod config;
pub mod cursor;
pub mod domain;
pub mod error;
pub mod fetcher;
pub mod footprint;
pub mod output;
