//! # Tenant Notes Library
//!
//! This library provides the core functionality for the multi-tenant notes service,
//! including the record store, authentication, handlers and server configuration.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod payments;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod store;
pub mod telemetry;
