pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod scanner;
pub mod schema;
pub mod state;
pub mod storage;
pub mod store;
