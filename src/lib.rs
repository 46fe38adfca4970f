pub mod config;
pub mod extractors;
pub mod logging;
pub mod middleware;
pub mod recommend;
pub mod response;
pub mod routes;
pub mod state;
pub mod store;
pub mod validation;
