pub mod broker;
pub mod consumer;
pub mod database;
pub mod publisher;
pub mod topology;
