//! Shortpush - a URL shortener with asynchronous result delivery
//!
//! This library provides the core functionality for the Shortpush service:
//! shortening URLs over HTTP and delivering the generated short code back
//! to the originating client over a persistent WebSocket channel, with
//! at-least-once redelivery until the client acknowledges receipt.
//!
//! # Architecture
//! - `storage`: code/URL index with write-through JSON snapshot persistence
//! - `delivery`: per-code redelivery scheduler with a bounded retry protocol
//! - `ws`: client session registry and WebSocket push channel
//! - `ratelimit`: fixed-window admission guard for the shorten endpoint
//! - `services`: HTTP handlers (shorten, resolve, health)
//! - `config`: environment-driven configuration
//! - `system`: logging initialization

pub mod config;
pub mod delivery;
pub mod errors;
pub mod ratelimit;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
pub mod ws;
