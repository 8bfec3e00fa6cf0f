//! Live rating leaderboard service.
//!
//! See `SPEC_FULL.md` for the component breakdown: an in-memory
//! [`rank_index`], a [`durable_store`], a bounded [`queue`], a
//! [`flusher`] and a [`coordinator`] tying them together behind an
//! [`api`].

pub mod api;
pub mod config;
pub mod coordinator;
pub mod durable_store;
pub mod error;
pub mod flusher;
pub mod models;
pub mod queue;
pub mod rank_index;
pub mod telemetry;
