use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[serde(alias = "prod")]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Anything that is not `production`/`prod` falls back to development.
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }

    pub fn from_env() -> Self {
        let value = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Self::parse(&value)
    }
}
