pub mod api;
pub mod clients;
pub mod config;
pub mod jobs;
pub mod models;
pub mod scheduler;
pub mod utils;
