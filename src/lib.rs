pub mod api;
pub mod blob;
pub mod cli;
pub mod config;
pub mod entities;
pub mod error;
pub mod service;
pub mod storage;
pub mod utils;
