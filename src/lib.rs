// ABOUTME: Library crate for ctf-console exposing the exec bridge and UI glue

pub mod api;
pub mod app;
pub mod components;
pub mod config;
pub mod models;
pub mod terminal;
