//! # medibook-client
//!
//! HTTP access to the medibook booking API.
//!
//! - [`client`] - [`ApiClient`], implementing the core's directory and
//!   proximity traits plus the auth and booking endpoints
//! - [`auth`] - [`AuthService`], one-time code sign-in and session lifecycle

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;

pub use auth::{AuthService, Verification};
pub use client::{ApiClient, OtpResponse, Registration};
