// src/lib.rs
pub mod admin;
pub mod api;
pub mod assistant;
pub mod auth;
pub mod chance;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod market;
pub mod models;
pub mod seed;
pub mod trading;

#[cfg(test)]
mod test_log;
