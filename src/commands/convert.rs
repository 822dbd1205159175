//! The convert command: resolve configuration, run the conversion

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use denotify_core::config::ConvertConfig;
use denotify_core::error::Result;
use denotify_core::report::ConversionReport;
use denotify_core::Converter;

use crate::cli::Cli;

/// Execute a conversion run described by `cli`
pub fn execute(cli: &Cli, cancel: Arc<AtomicBool>) -> Result<ConversionReport> {
    let config = ConvertConfig::resolve(&cli.input, cli.config.as_deref(), cli.overlay())?;

    tracing::debug!(
        format = %config.format,
        assets = %config.assets,
        preserve_structure = config.preserve_structure,
        dry_run = cli.dry_run,
        "resolved configuration"
    );

    Converter::new(config)
        .dry_run(cli.dry_run)
        .with_cancel_flag(cancel)
        .convert(&cli.input, &cli.output)
}
