use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;

use learning_recommender::config::{Config, RecommendEnvConfig};
use learning_recommender::recommend::config::RecommenderConfig;
use learning_recommender::recommend::engine::RecommendationEngine;
use learning_recommender::routes::build_router;
use learning_recommender::state::AppState;
use learning_recommender::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<Store>,
    pub config: Config,
    _temp_dir: TempDir,
}

pub fn test_config(sled_path: String) -> Config {
    // 直接构造 Config，避免 set_var 在并行测试中互相干扰
    Config {
        host: std::net::IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
        port: 3000,
        log_level: "info".to_string(),
        enable_file_logs: false,
        log_dir: "./logs".to_string(),
        sled_path,
        cors_origin: "http://localhost:5173".to_string(),
        recommend: RecommendEnvConfig::default(),
    }
}

pub fn open_store() -> (Arc<Store>, TempDir) {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let path = temp_dir.path().join("recommender-test.sled");
    let store = Store::open(path.to_str().expect("utf8 path")).expect("open store");
    store.run_migrations().expect("run migrations");
    (Arc::new(store), temp_dir)
}

pub async fn spawn_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("recommender-test.sled");
    let config = test_config(sled_path.to_string_lossy().to_string());

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let engine = Arc::new(RecommendationEngine::new(
        RecommenderConfig::from_env(&config.recommend),
        store.clone(),
    ));
    let state = AppState::new(store.clone(), engine, &config);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        store,
        config,
        _temp_dir: temp_dir,
    }
}
