pub mod balance;
pub mod config;
pub mod error;
pub mod fuel;
pub mod ship;
