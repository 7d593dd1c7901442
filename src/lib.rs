pub mod analytics;
pub mod api;
pub mod chat;
pub mod cli;
pub mod config;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod notify;
pub mod refresh;
pub mod render;
pub mod ui;
pub mod upload;
pub mod web;
