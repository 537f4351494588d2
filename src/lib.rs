//! Idempotent import of quiz app JSON data files into DuckDB tables.

pub mod db;
pub mod migrate;
pub mod models;
pub mod utils;
