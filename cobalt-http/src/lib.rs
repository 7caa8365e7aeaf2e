//! Cobalt HTTP - Discord REST API client
#![deny(unsafe_code)]
//!
//! One [`HttpClient`] per bot: a pooled HTTPS client plus the rate-limit
//! governor. Every request is admitted per route bucket (FIFO within a
//! bucket, parallel across buckets), honors the process-wide global
//! lockout, and is transparently retried on 429 and 5xx.

mod channel;
mod client;
pub mod error;
mod guild;
mod ratelimit;
mod routes;
mod user;
mod webhook;

pub use channel::{CreateMessage, EditChannel};
pub use client::{FileUpload, HttpClient};
pub use error::HttpError;
pub use guild::{EditGuild, EditRole};
pub use routes::{bucket_key, GatewayBot, SessionStartLimit};
pub use webhook::ExecuteWebhook;
