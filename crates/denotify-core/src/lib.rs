//! Denotify Core Library
//!
//! Conversion engine that turns an Obsidian vault into a Denote note
//! collection.

pub mod assets;
pub mod config;
pub mod convert;
pub mod error;
pub mod filename;
pub mod identity;
pub mod logging;
pub mod mapper;
pub mod note;
pub mod org;
pub mod paths;
pub mod render;
pub mod report;
pub mod rewrite;
pub mod text;
pub mod vault;

pub use config::{AssetPolicy, ConfigOverlay, ConvertConfig, OutputFormat};
pub use convert::Converter;
pub use error::{DenotifyError, ExitCode, Result};
pub use report::{ConversionReport, Warning};
