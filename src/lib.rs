pub mod adapters;
pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod interpreter;
pub mod ports;
