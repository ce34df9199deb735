//! Provides helpers for expanding user supplied targets

pub mod ips;
