//! # Core Application Logic
//!
//! This module holds Muse's dispatcher and its configuration.
//! It knows nothing about any specific front-end.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │         CORE            │
//!                    │  (this module)          │
//!                    │                         │
//!                    │  • ProviderClient       │
//!                    │  • config resolution    │
//!                    └───────────┬─────────────┘
//!                                │
//!            ┌───────────────────┼───────────────────┐
//!            ▼                   ▼                   ▼
//!     ┌────────────┐      ┌────────────┐      ┌────────────┐
//!     │    CLI     │      │   OpenAI   │      │   Gemini   │
//!     │  (main.rs) │      │  handler   │      │  handler   │
//!     └────────────┘      └────────────┘      └────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`client`]: `ProviderClient`, which holds credentials and routes requests
//! - [`config`]: layered settings (defaults, file, env, CLI)

pub mod client;
pub mod config;

pub use client::{ClientSettings, ProviderClient};
