use std::env;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use crate::logging::LogConfig;

#[derive(Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub recommend: RecommendEnvConfig,
}

/// 推荐引擎的进程级覆盖项，其余参数取 RecommenderConfig 默认值
#[derive(Debug, Clone)]
pub struct RecommendEnvConfig {
    pub history_window: usize,
    pub default_count: usize,
    pub max_count: usize,
    pub metrics_enabled: bool,
}

impl Default for RecommendEnvConfig {
    fn default() -> Self {
        Self {
            history_window: 20,
            default_count: 10,
            max_count: 100,
            metrics_enabled: true,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("enable_file_logs", &self.enable_file_logs)
            .field("log_dir", &self.log_dir)
            .field("sled_path", &self.sled_path)
            .field("cors_origin", &self.cors_origin)
            .field("recommend", &self.recommend)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = RecommendEnvConfig::default();
        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/recommender.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            recommend: RecommendEnvConfig {
                history_window: env_or_parse("RECOMMEND_HISTORY_WINDOW", defaults.history_window),
                default_count: env_or_parse("RECOMMEND_DEFAULT_COUNT", defaults.default_count),
                max_count: env_or_parse("RECOMMEND_MAX_COUNT", defaults.max_count),
                metrics_enabled: env_or_bool("RECOMMEND_METRICS_ENABLED", defaults.metrics_enabled),
            },
        }
    }

    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            log_level: self.log_level.clone(),
            enable_file_logs: self.enable_file_logs,
            log_dir: self.log_dir.clone(),
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Mutex, OnceLock};

    use super::*;

    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    fn managed_keys() -> &'static [&'static str] {
        &[
            "HOST",
            "PORT",
            "RUST_LOG",
            "SLED_PATH",
            "RECOMMEND_HISTORY_WINDOW",
            "RECOMMEND_DEFAULT_COUNT",
            "RECOMMEND_MAX_COUNT",
            "RECOMMEND_METRICS_ENABLED",
        ]
    }

    fn clear_keys(keys: &[&str]) {
        for key in keys {
            env::remove_var(key);
        }
    }

    #[test]
    fn loads_defaults_when_missing() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.recommend.history_window, 20);
        assert_eq!(cfg.recommend.max_count, 100);
        assert!(cfg.recommend.metrics_enabled);
    }

    #[test]
    fn parses_numeric_values() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "4000");
        env::set_var("RECOMMEND_HISTORY_WINDOW", "5");
        env::set_var("RECOMMEND_MAX_COUNT", "42");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 4000);
        assert_eq!(cfg.recommend.history_window, 5);
        assert_eq!(cfg.recommend.max_count, 42);
    }

    #[test]
    fn invalid_values_fall_back() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("PORT", "bad");
        env::set_var("RECOMMEND_DEFAULT_COUNT", "-3");
        env::set_var("RECOMMEND_METRICS_ENABLED", "maybe");

        let cfg = Config::from_env();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.recommend.default_count, 10);
        assert!(cfg.recommend.metrics_enabled);
    }

    #[test]
    fn metrics_flag_can_be_disabled() {
        let _guard = env_lock().lock().expect("env lock");
        clear_keys(managed_keys());

        env::set_var("RECOMMEND_METRICS_ENABLED", "off");
        let cfg = Config::from_env();
        assert!(!cfg.recommend.metrics_enabled);
        assert!(!crate::recommend::config::RecommenderConfig::from_env(&cfg.recommend).metrics_enabled);
    }
}
