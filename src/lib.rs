pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod services;
