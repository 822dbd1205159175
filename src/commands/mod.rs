//! Command implementations for denotify

pub mod convert;
