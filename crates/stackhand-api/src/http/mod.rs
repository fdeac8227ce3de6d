//! HTTP interface module.
//!
//! Provides REST API endpoints for:
//! - Tag-based deployments
//! - Cron job listing, reload and manual triggers
//! - Health checks

pub mod routes;

pub(crate) mod cron;
pub(crate) mod deploy;
pub(crate) mod monitoring;
