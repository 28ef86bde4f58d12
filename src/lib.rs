//! # Hostpulse
//!
//! Live host monitoring dashboard - samples system metrics on a fixed
//! interval and streams every snapshot to all connected browsers over
//! WebSocket.
//!
//! ## Features
//!
//! - **Fan-out hub**: every viewer gets every update through its own bounded
//!   queue; a slow viewer never stalls the publisher or other viewers
//! - **Bounded delivery**: each write to a viewer has a deadline
//! - **Resilient sampling**: a failing metric source blanks its section for
//!   one cycle and nothing else
//! - **HTMX-ready payloads**: updates are `hx-swap-oob` HTML fragments
//!
//! ## Modules
//!
//! - [`websocket`]: Broadcast hub and connection handler
//! - [`publisher`]: Periodic sampling loop
//! - [`sampler`]: Metric sources and HTML rendering
//! - [`api`]: HTTP server with Axum
//! - [`config`]: TOML and environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hostpulse::publisher::{Publisher, PublisherConfig};
//! use hostpulse::sampler::{LoadSampler, Sampler};
//! use hostpulse::websocket::{Hub, HubConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hub = Arc::new(Hub::new(HubConfig::default()));
//!     let mut viewer = hub.subscribe();
//!
//!     let samplers: Vec<Box<dyn Sampler>> = vec![Box::new(LoadSampler)];
//!     let publisher = Publisher::new(Arc::clone(&hub), samplers, PublisherConfig::default());
//!     let _task = publisher.spawn(CancellationToken::new());
//!
//!     if let Some(update) = viewer.recv().await {
//!         println!("{} bytes", update.len());
//!     }
//! }
//! ```

pub mod api;
pub mod config;
pub mod publisher;
pub mod sampler;
pub mod websocket;

pub use publisher::{Publisher, PublisherConfig};
pub use websocket::{Hub, HubConfig, Update};
