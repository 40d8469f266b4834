pub mod analyzer;
pub mod cli;
pub mod config;
pub mod error;
pub mod photo;
pub mod remote;
pub mod view;
