pub mod api;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod repository;
pub mod service;
pub mod web;
