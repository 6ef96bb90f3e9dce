//! Library for lag containing its core code:
//! the request pipeline, its simulation routes and the server lifecycle.
//!
//! The `lag` binary is a thin cli around it.

#![cfg_attr(
    not(test),
    warn(clippy::print_stdout, clippy::dbg_macro),
    deny(clippy::unwrap_used, clippy::expect_used)
)]

pub mod config;
pub mod http;
pub mod latency;
pub mod server;
pub mod size;
pub mod utils;
