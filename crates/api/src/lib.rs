//! HTTP API: routing, bearer authentication, request/response mapping.

pub mod app;
pub mod authz;
pub mod config;
pub mod idp;
pub mod middleware;
