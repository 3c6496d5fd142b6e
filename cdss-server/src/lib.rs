//! HTTP, CDS Hooks and command-line surface for the heart failure guideline
//! CDSS.
//!
//! - [`server`]: axum router with `/bot`, `/cds-services`, thread inspection
//!   and health
//! - [`cds`] / [`fhir`]: CDS Hooks discovery and cards, FHIR prefetch
//!   rendering
//! - [`config`] / [`pipeline`]: clap settings and wiring of the graph
//! - [`chat`]: terminal client for `/bot`

pub mod cds;
pub mod chat;
pub mod config;
pub mod fhir;
pub mod pipeline;
pub mod server;

pub use config::{Cli, Command, DEFAULT_THREAD_ID, Settings};
pub use server::{AppState, ServerConfig, app_router, run_server};
