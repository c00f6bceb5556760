pub mod config;
pub mod db;
pub mod models;
pub mod money;
pub mod repos;
pub mod services;
pub mod validation;

pub use services::balance_service::BalanceResult;
