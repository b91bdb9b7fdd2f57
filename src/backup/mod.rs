//! Content digests and integrity-verified backup copies.

pub mod hasher;
pub mod manager;
