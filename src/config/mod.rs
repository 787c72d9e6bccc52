use serde::Deserialize;
use std::env;
use std::time::Duration;

// Top-level configuration container, populated from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub locks: LockConfig,
    pub recommender: RecommenderConfig,
    pub circuit_breaker: CircuitBreakerConfig,
}

// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
}

// Database settings
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

// Seat lock table settings
#[derive(Debug, Clone, Deserialize)]
pub struct LockConfig {
    pub ttl_seconds: u64,
    pub sweep_interval_seconds: u64,
}

impl LockConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }
}

// Recommendation service (external embedding/recommendation API)
#[derive(Debug, Clone, Deserialize)]
pub struct RecommenderConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
}

// Circuit breaker settings for outbound HTTP calls
#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "eventopedia=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            locks: LockConfig {
                ttl_seconds: env::var("SEAT_LOCK_TTL_SECONDS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .expect("SEAT_LOCK_TTL_SECONDS must be a valid number"),
                sweep_interval_seconds: env::var("SEAT_LOCK_SWEEP_INTERVAL_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("SEAT_LOCK_SWEEP_INTERVAL_SECONDS must be a valid number"),
            },
            recommender: RecommenderConfig {
                base_url: env::var("RECOMMENDER_URL")
                    .unwrap_or_else(|_| "http://localhost:5001".to_string()),
                timeout_seconds: env::var("RECOMMENDER_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .expect("RECOMMENDER_TIMEOUT_SECONDS must be a valid number"),
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: env::var("CIRCUIT_BREAKER_FAILURE_THRESHOLD")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .expect("CIRCUIT_BREAKER_FAILURE_THRESHOLD must be a valid number"),
                timeout_seconds: env::var("CIRCUIT_BREAKER_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("CIRCUIT_BREAKER_TIMEOUT_SECONDS must be a valid number"),
            },
        }
    }

    /// Configuration with local defaults and no database URL requirement.
    /// Used by tests that run against the in-memory store.
    pub fn local_defaults() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                environment: "test".to_string(),
                rust_log: "eventopedia=debug".to_string(),
            },
            database: DatabaseConfig {
                url: String::new(),
                pool_size: 1,
            },
            locks: LockConfig {
                ttl_seconds: 300,
                sweep_interval_seconds: 60,
            },
            recommender: RecommenderConfig {
                base_url: "http://localhost:5001".to_string(),
                timeout_seconds: 10,
            },
            circuit_breaker: CircuitBreakerConfig {
                failure_threshold: 5,
                timeout_seconds: 60,
            },
        }
    }
}
