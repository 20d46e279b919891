//! Utility functions for the application

pub mod crypto;
pub mod encryption;
pub mod file;
pub mod retry;
pub mod string;
