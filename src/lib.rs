pub mod app;
pub mod calc;
pub mod config;
pub mod db;
pub mod error;
pub mod snapshots;
pub mod state;
