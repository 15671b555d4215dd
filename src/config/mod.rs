use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub http: HttpConfig,
    pub fingerprint: FingerprintConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the NCBI eutils endpoint used for operon lookups.
    pub eutils_base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintConfig {
    /// Minimum Tanimoto similarity for a ligand search hit.
    pub similarity_threshold: f64,
    pub max_results: usize,
    /// Object-store key of the fingerprint artifact (the gzip variant gets a
    /// `.gz` suffix).
    pub artifact_key: String,
    /// Object-store key of the ligify artifact, which is gzip-only.
    pub ligify_artifact_key: String,
}

const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const USER_AGENT: &str = concat!("groovdb-api/", env!("CARGO_PKG_VERSION"));

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("GROOV_EUTILS_BASE_URL") {
            self.http.eutils_base_url = v;
        }
        if let Ok(v) = env::var("GROOV_USER_AGENT") {
            self.http.user_agent = v;
        }
        if let Ok(v) = env::var("GROOV_HTTP_TIMEOUT_SECS") {
            self.http.timeout_secs = v.parse().unwrap_or(self.http.timeout_secs);
        }
        if let Ok(v) = env::var("GROOV_FINGERPRINT_THRESHOLD") {
            self.fingerprint.similarity_threshold =
                v.parse().unwrap_or(self.fingerprint.similarity_threshold);
        }
        if let Ok(v) = env::var("GROOV_FINGERPRINT_MAX_RESULTS") {
            self.fingerprint.max_results = v.parse().unwrap_or(self.fingerprint.max_results);
        }
        if let Ok(v) = env::var("GROOV_FINGERPRINT_KEY") {
            self.fingerprint.artifact_key = v;
        }
        if let Ok(v) = env::var("GROOV_LIGIFY_FINGERPRINT_KEY") {
            self.fingerprint.ligify_artifact_key = v;
        }
        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            http: HttpConfig {
                eutils_base_url: EUTILS_BASE_URL.to_string(),
                user_agent: USER_AGENT.to_string(),
                timeout_secs: 30,
            },
            fingerprint: FingerprintConfig {
                similarity_threshold: 0.7,
                max_results: 50,
                artifact_key: "fingerprints.json".to_string(),
                ligify_artifact_key: "ligify-fingerprints.json.gz".to_string(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            ..Self::development()
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            http: HttpConfig {
                timeout_secs: 10,
                ..Self::development().http
            },
            ..Self::development()
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.fingerprint.similarity_threshold, 0.7);
        assert_eq!(config.fingerprint.max_results, 50);
        assert!(config.http.eutils_base_url.starts_with("https://eutils"));
    }

    #[test]
    fn test_production_tightens_timeouts() {
        let config = AppConfig::production();
        assert_eq!(config.http.timeout_secs, 10);
        assert_eq!(config.fingerprint.artifact_key, "fingerprints.json");
        assert_eq!(
            config.fingerprint.ligify_artifact_key,
            "ligify-fingerprints.json.gz"
        );
    }
}
