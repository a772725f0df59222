pub mod broker;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod health;
pub mod job;
pub mod notification;
pub mod retry;
