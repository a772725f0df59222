use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;

use crate::models::{
    broker::{BrokerSettings, ExchangeType},
    job::JobDescriptor,
    retry::{RestartPolicy, RetryConfig},
};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    pub rabbitmq_url: String,
    pub database_url: String,

    #[serde(default = "default_exchange")]
    pub notification_exchange: String,
    #[serde(default)]
    pub notification_exchange_type: ExchangeType,
    #[serde(default = "default_queue")]
    pub notification_queue: String,
    #[serde(default)]
    pub binding_key: String,
    #[serde(default = "default_prefetch_count")]
    pub prefetch_count: u16,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    #[serde(default = "default_true")]
    pub order_update_job_enabled: bool,
    #[serde(default = "default_order_interval")]
    pub order_update_job_interval_seconds: u64,
    #[serde(default = "default_order_grace")]
    pub order_update_job_misfire_grace_seconds: u64,

    #[serde(default = "default_true")]
    pub promotion_job_enabled: bool,
    #[serde(default = "default_promotion_interval")]
    pub promotion_job_interval_seconds: u64,
    #[serde(default = "default_promotion_grace")]
    pub promotion_job_misfire_grace_seconds: u64,

    #[serde(default)]
    pub recommendation_job_enabled: bool,
    #[serde(default = "default_recommendation_interval")]
    pub recommendation_job_interval_seconds: u64,
    #[serde(default = "default_promotion_grace")]
    pub recommendation_job_misfire_grace_seconds: u64,

    #[serde(default = "default_max_retry_attempts")]
    pub max_retry_attempts: u32,
    #[serde(default = "default_initial_retry_delay")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,

    #[serde(default = "default_restart_initial_delay")]
    pub consumer_restart_initial_delay_ms: u64,
    #[serde(default = "default_restart_max_delay")]
    pub consumer_restart_max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub consumer_restart_multiplier: u64,

    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_seconds: u64,
    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        Ok(config)
    }

    pub fn broker_settings(&self) -> BrokerSettings {
        BrokerSettings {
            url: self.rabbitmq_url.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_seconds),
            exchange: self.notification_exchange.clone(),
            exchange_type: self.notification_exchange_type,
            queue: self.notification_queue.clone(),
            binding_key: self.binding_key.clone(),
            prefetch_count: self.prefetch_count,
        }
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_retry_attempts,
            initial_delay_ms: self.initial_retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
            backoff_multiplier: self.retry_backoff_multiplier,
        }
    }

    pub fn restart_policy(&self) -> RestartPolicy {
        RestartPolicy {
            initial_delay_ms: self.consumer_restart_initial_delay_ms,
            max_delay_ms: self.consumer_restart_max_delay_ms,
            backoff_multiplier: self.consumer_restart_multiplier,
        }
    }

    pub fn order_update_job(&self) -> JobDescriptor {
        JobDescriptor::new(
            "order_update_job",
            Duration::from_secs(self.order_update_job_interval_seconds),
        )
        .with_misfire_grace(Duration::from_secs(
            self.order_update_job_misfire_grace_seconds,
        ))
    }

    pub fn promotion_job(&self) -> JobDescriptor {
        JobDescriptor::new(
            "promotion_job",
            Duration::from_secs(self.promotion_job_interval_seconds),
        )
        .with_misfire_grace(Duration::from_secs(
            self.promotion_job_misfire_grace_seconds,
        ))
    }

    pub fn recommendation_job(&self) -> JobDescriptor {
        JobDescriptor::new(
            "recommendation_job",
            Duration::from_secs(self.recommendation_job_interval_seconds),
        )
        .with_misfire_grace(Duration::from_secs(
            self.recommendation_job_misfire_grace_seconds,
        ))
    }
}

fn default_exchange() -> String {
    "notification_events".to_string()
}

fn default_queue() -> String {
    "notification_service_queue".to_string()
}

fn default_prefetch_count() -> u16 {
    10
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

fn default_order_interval() -> u64 {
    60
}

fn default_order_grace() -> u64 {
    30
}

fn default_promotion_interval() -> u64 {
    180
}

fn default_promotion_grace() -> u64 {
    60
}

fn default_recommendation_interval() -> u64 {
    300
}

fn default_max_retry_attempts() -> u32 {
    5
}

fn default_initial_retry_delay() -> u64 {
    1000
}

fn default_max_retry_delay() -> u64 {
    30000
}

fn default_backoff_multiplier() -> u64 {
    2
}

fn default_restart_initial_delay() -> u64 {
    1000
}

fn default_restart_max_delay() -> u64 {
    60000
}

fn default_shutdown_timeout() -> u64 {
    15
}

fn default_server_port() -> u16 {
    8080
}
