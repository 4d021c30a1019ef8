// Public library interface for bigfiles-rs
// The CLI and the debug-scan tool both drive the scanner through this crate.

pub mod config;
pub mod export;
pub mod scanner;
pub mod tree;
