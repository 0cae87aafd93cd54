pub mod app_state;
pub mod auth;
pub mod config;
pub mod entities;
pub mod health;
pub mod items;
pub mod repositories;
pub mod resolver;
pub mod router;
