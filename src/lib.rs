pub mod cli;
pub mod config;
pub mod error;
pub mod marksdata;
pub mod regression;
