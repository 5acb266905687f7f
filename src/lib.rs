pub mod cache;
pub mod config;
pub mod dataset;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod models;
pub mod normalize;
pub mod report;
pub mod writer;
