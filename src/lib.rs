pub mod config;
pub mod database;
pub mod errors;
pub mod ingestor;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;
pub mod web;
pub mod xmltv;
