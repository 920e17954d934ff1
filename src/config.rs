// src/config.rs
use log::warn;
use std::env;
use std::net::SocketAddr;
use warp::http::uri::Authority;

/// Key handed to the model client when `OPENAI_API_KEY` is unset.
pub const PLACEHOLDER_OPENAI_KEY: &str = "sk-dummy-key-replace-with-real-key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Scylla,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_name: String,
    pub store_backend: StoreBackend,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub cors_origins: String,
    pub bind_addr: SocketAddr,
    pub assistant: AssistantConfig,
}

/// Trigger phrases and odds for the assistant's post-processing.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub portfolio_keywords: Vec<String>,
    pub dump_all_keywords: Vec<String>,
    pub case_insensitive: bool,
    pub leak_probability: f64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        AssistantConfig {
            portfolio_keywords: vec!["portfolio".to_string()],
            dump_all_keywords: vec!["show all".to_string(), "admin".to_string()],
            case_insensitive: true,
            leak_probability: 0.1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_url: "127.0.0.1:9042".to_string(),
            db_name: "brokercorp".to_string(),
            store_backend: StoreBackend::Scylla,
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o".to_string(),
            cors_origins: "*".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8001)),
            assistant: AssistantConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();

        let store_backend = match env::var("STORE_BACKEND").ok().as_deref() {
            Some("memory") => StoreBackend::Memory,
            Some("scylla") | None => StoreBackend::Scylla,
            Some(other) => {
                warn!("Unknown STORE_BACKEND {:?}, using scylla", other);
                StoreBackend::Scylla
            }
        };

        let bind_addr = match env::var("BIND_ADDR") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Invalid BIND_ADDR {:?} ({}), using {}", raw, e, defaults.bind_addr);
                defaults.bind_addr
            }),
            Err(_) => defaults.bind_addr,
        };

        let mut assistant = AssistantConfig::default();
        if let Ok(raw) = env::var("CHAT_LEAK_PROBABILITY") {
            match raw.parse::<f64>() {
                Ok(p) => assistant.leak_probability = p,
                Err(e) => warn!("Invalid CHAT_LEAK_PROBABILITY {:?}: {}", raw, e),
            }
        }

        Config {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            db_name: env::var("DB_NAME").unwrap_or(defaults.db_name),
            store_backend,
            openai_api_key: env::var("OPENAI_API_KEY").ok(),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            openai_model: env::var("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            cors_origins: env::var("CORS_ORIGINS").unwrap_or(defaults.cors_origins),
            bind_addr,
            assistant,
        }
    }

    /// Key value as reported by diagnostics and error logs.
    pub fn reported_openai_key(&self) -> String {
        self.openai_api_key
            .clone()
            .unwrap_or_else(|| "not_set".to_string())
    }

    /// Key value actually sent to the model service.
    pub fn effective_openai_key(&self) -> String {
        self.openai_api_key
            .clone()
            .unwrap_or_else(|| PLACEHOLDER_OPENAI_KEY.to_string())
    }

    fn origin_entries(&self) -> impl Iterator<Item = &str> {
        self.cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }

    /// Listed origins that are well-formed `scheme://host[:port]`. Others are skipped.
    pub fn allowed_origins(&self) -> Vec<String> {
        self.origin_entries()
            .filter(|o| *o != "*")
            .filter(|o| {
                let valid = is_origin(o);
                if !valid {
                    warn!("Ignoring CORS origin {:?}: expected scheme://host[:port]", o);
                }
                valid
            })
            .map(str::to_string)
            .collect()
    }

    pub fn allows_any_origin(&self) -> bool {
        self.origin_entries().any(|o| o == "*")
    }
}

fn is_origin(raw: &str) -> bool {
    match raw.split_once("://") {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && !rest.is_empty()
                && !rest.contains('@')
                && rest.parse::<Authority>().is_ok()
        }
        None => false,
    }
}
