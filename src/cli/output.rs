//! Report output: human-readable text on stderr, or JSON on stdout

use serde::Serialize;

use denotify_core::report::{ConversionReport, ReportSummary};

use super::Cli;

#[derive(Serialize)]
struct JsonOutput<'a> {
    summary: ReportSummary,
    #[serde(flatten)]
    report: &'a ConversionReport,
}

/// Print a finished conversion report according to the output flags
pub fn print_report(cli: &Cli, report: &ConversionReport) {
    if cli.json {
        let output = JsonOutput {
            summary: report.summary(),
            report,
        };
        match serde_json::to_string_pretty(&output) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("error: failed to serialize report: {}", e),
        }
        return;
    }

    if report.dry_run {
        for note in &report.notes {
            println!("{} -> {}", note.source, note.output);
        }
        for asset in &report.assets {
            println!("{} -> {}", asset.source, asset.destination);
        }
    }

    if cli.quiet {
        return;
    }

    for warning in &report.warnings {
        eprintln!("warning: {}", warning);
    }
    for failure in &report.failures {
        eprintln!(
            "error: failed to {} {}: {}",
            failure.operation, failure.path, failure.reason
        );
    }
    if report.cancelled {
        eprintln!("interrupted: conversion stopped early");
    }

    let verb = if report.dry_run { "Would convert" } else { "Converted" };
    eprintln!("{} {}", verb, report.summary());
}
