pub mod black;
pub mod health;
pub mod metrics;
