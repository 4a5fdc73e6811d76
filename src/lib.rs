// src/lib.rs

//! roomwatch: hotel room availability monitor.
//!
//! Polls reservation backends, diffs the available rooms against the last
//! snapshot and notifies every configured channel when something changed.

pub mod error;
pub mod models;
pub mod notify;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
