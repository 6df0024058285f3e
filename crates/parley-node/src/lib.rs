//! # Parley Node
//!
//! HTTP and WebSocket boundary for Parley support messaging.
//!
//! The node owns no messaging logic of its own. Every handler validates its
//! payload, forwards to the [`Messenger`](parley_messaging::Messenger) and
//! maps the outcome to a status code.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       Parley Node                        │
//! ├──────────────────────────────────────────────────────────┤
//! │  HTTP API                                                │
//! │  • Support messages and conversations                    │
//! │  • Direct chat rooms and guest bootstrap                 │
//! │  • Realtime authorization, stats and /metrics            │
//! │                          │                               │
//! │  WebSocket (/ws?token=)  │                               │
//! │                          ▼                               │
//! │  Messenger ──► SupportStore (persist)                    │
//! │      └───────► EventHub (publish after persist)          │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cargo run --bin parley-node -- --api-addr 127.0.0.1:8080 --config parley.yaml
//! ```
//!
//! ## Modules
//!
//! - [`api`] - Router, shared state, error mapping and health
//! - [`messaging_api`] - Support messaging endpoints
//! - [`chat_api`] - Direct chat room endpoints
//! - [`realtime_api`] - WebSocket endpoint and realtime stats
//! - [`config`] - Node configuration
//! - [`observability`] - Logging, request ids and Prometheus metrics
//! - [`validation`] - Input validation helpers

pub mod api;
pub mod chat_api;
pub mod config;
pub mod messaging_api;
pub mod observability;
pub mod realtime_api;
pub mod validation;
