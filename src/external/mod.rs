//! External service plumbing.

pub mod client;
