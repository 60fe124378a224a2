//! Host content tree mirror
//!
//! An arena-backed page tree the scanner operates on. The embedding host
//! (content script) mirrors the DOM into this arena and drains the mutation
//! journal to drive rescans.

pub mod tree;

pub use tree::*;
