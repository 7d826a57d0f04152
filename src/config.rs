use secrecy::SecretString;
use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub mongo_conn_string: String,
    pub mongo_db_name: String,
    pub web_server_host: String,
    pub web_server_port: u16,

    pub openai_api_key: SecretString,
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub completion_timeout_secs: u64,
    pub completion_max_retries: u32,
    pub prompt_cache_entries: usize,

    pub fetch_timeout_secs: u64,
    pub min_source_chars: usize,
    pub max_source_chars: usize,
    pub max_prompt_chars: usize,

    pub parse_accept_threshold: f32,
    pub pass_threshold: f32,
    pub progress_save_retries: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            mongo_conn_string: env::var("MONGO_CONN_STRING")
                .unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db_name: env::var("MONGO_DB_NAME")
                .unwrap_or_else(|_| "smart-quiz-local".to_string()),
            web_server_host: env::var("WEB_SERVER_HOST")
                .unwrap_or_else(|_| "localhost".to_string()),
            web_server_port: env::var("WEB_SERVER_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            openai_api_key: SecretString::from(
                env::var("OPENAI_API_KEY").unwrap_or_else(|_| "dev_key_unset".to_string()),
            ),
            model_id: env::var("OPENAI_MODEL_ID").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            temperature: env_parsed("OPENAI_TEMPERATURE", 0.7),
            max_tokens: env_parsed("OPENAI_MAX_TOKENS", 1500),
            completion_timeout_secs: env_parsed("COMPLETION_TIMEOUT_SECS", 60),
            completion_max_retries: env_parsed("COMPLETION_MAX_RETRIES", 3),
            prompt_cache_entries: env_parsed("PROMPT_CACHE_ENTRIES", 0),
            fetch_timeout_secs: env_parsed("FETCH_TIMEOUT_SECS", 10),
            min_source_chars: env_parsed("MIN_SOURCE_CHARS", 200),
            max_source_chars: env_parsed("MAX_SOURCE_CHARS", 6000),
            max_prompt_chars: env_parsed("MAX_PROMPT_CHARS", 2000),
            parse_accept_threshold: env_parsed("PARSE_ACCEPT_THRESHOLD", 0.5),
            pass_threshold: env_parsed("PASS_THRESHOLD", 0.7),
            progress_save_retries: env_parsed("PROGRESS_SAVE_RETRIES", 5),
        }
    }

    /// Validate that production-critical configuration is set.
    /// Panics if required secrets are using default values.
    pub fn validate_for_production(&self) {
        use secrecy::ExposeSecret;

        if self.openai_api_key.expose_secret() == "dev_key_unset" {
            panic!("FATAL: OPENAI_API_KEY is not set! Generation requests cannot succeed.");
        }

        if !(0.0..=1.0).contains(&self.parse_accept_threshold) {
            panic!(
                "FATAL: PARSE_ACCEPT_THRESHOLD must be within [0, 1], got {}",
                self.parse_accept_threshold
            );
        }

        if !(0.0..=1.0).contains(&self.pass_threshold) {
            panic!(
                "FATAL: PASS_THRESHOLD must be within [0, 1], got {}",
                self.pass_threshold
            );
        }
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            mongo_conn_string: "mongodb://localhost:27017".to_string(),
            mongo_db_name: "smart-quiz-test".to_string(),
            web_server_host: "127.0.0.1".to_string(),
            web_server_port: 8080,
            openai_api_key: SecretString::from("test_key".to_string()),
            model_id: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            max_tokens: 700,
            completion_timeout_secs: 5,
            completion_max_retries: 2,
            prompt_cache_entries: 0,
            fetch_timeout_secs: 2,
            min_source_chars: 20,
            max_source_chars: 2000,
            max_prompt_chars: 500,
            parse_accept_threshold: 0.5,
            pass_threshold: 0.7,
            progress_save_retries: 3,
        }
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env_with_defaults() {
        let config = Config::from_env();

        // Should use env vars if set, or fall back to defaults
        assert!(!config.mongo_conn_string.is_empty());
        assert!(!config.model_id.is_empty());
        assert!(config.completion_max_retries >= 1);
        assert!(config.max_source_chars > config.min_source_chars);
    }

    #[test]
    fn test_test_config() {
        let config = Config::test_config();

        assert_eq!(config.mongo_db_name, "smart-quiz-test");
        assert_eq!(config.parse_accept_threshold, 0.5);
        assert_eq!(config.pass_threshold, 0.7);
    }
}
