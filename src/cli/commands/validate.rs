//! `validate`: offline checks for engine configs and cue packs.
//!
//! A file with a top-level `cues` key is a cue pack; anything else is an
//! engine config. Every file is checked before the command fails.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::config::loader::{ConfigLoader, LoaderOptions};
use crate::cue::CuePack;
use crate::cue::validation::PackValidator;
use crate::error::{ConfigError, CueCallerError, Severity, ValidationIssue};

/// What kind of document a file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Engine configuration
    Config,
    /// Cue pack
    Pack,
}

/// Validation outcome for one file.
#[derive(Debug, Serialize)]
pub struct FileReport {
    /// File as given on the command line
    pub path: String,
    /// Detected document kind
    pub kind: FileKind,
    /// Whether the file passed
    pub valid: bool,
    /// Errors, then warnings
    pub issues: Vec<Issue>,
}

/// Serializable form of a [`ValidationIssue`].
#[derive(Debug, Serialize)]
pub struct Issue {
    /// `error` or `warning`
    pub severity: &'static str,
    /// Field path
    pub path: String,
    /// Message
    pub message: String,
}

impl From<&ValidationIssue> for Issue {
    fn from(issue: &ValidationIssue) -> Self {
        Self {
            severity: match issue.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            },
            path: issue.path.clone(),
            message: issue.message.clone(),
        }
    }
}

/// Validates every file and prints a report.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` naming the first failing file
/// once all files have been reported.
pub fn run(args: &ValidateArgs) -> Result<(), CueCallerError> {
    let reports: Vec<(FileReport, Vec<ValidationIssue>)> = args
        .files
        .iter()
        .map(|path| check_file(path, args.strict))
        .collect();

    match args.format {
        OutputFormat::Human => {
            for (report, _) in &reports {
                print_human(report);
            }
        }
        OutputFormat::Json => {
            let all: Vec<&FileReport> = reports.iter().map(|(r, _)| r).collect();
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
    }

    if let Some((report, errors)) = reports.into_iter().find(|(r, _)| !r.valid) {
        return Err(ConfigError::ValidationError {
            path: report.path,
            errors,
        }
        .into());
    }
    Ok(())
}

/// Checks one file. Returns the report and the issues that failed it.
#[must_use]
pub fn check_file(path: &Path, strict: bool) -> (FileReport, Vec<ValidationIssue>) {
    let shown = path.display().to_string();
    tracing::info!(file = %shown, "validating");

    let (kind, mut errors, mut warnings) = match std::fs::read_to_string(path) {
        Ok(content) => {
            if is_pack(&content) {
                let (errors, warnings) = check_pack(&content);
                (FileKind::Pack, errors, warnings)
            } else {
                let (errors, warnings) = check_config(&content, path);
                (FileKind::Config, errors, warnings)
            }
        }
        Err(e) => (
            FileKind::Config,
            vec![issue("", &format!("cannot read file: {e}"), Severity::Error)],
            Vec::new(),
        ),
    };

    if strict {
        for mut w in warnings.drain(..) {
            w.severity = Severity::Error;
            errors.push(w);
        }
    }

    let issues = errors.iter().chain(&warnings).map(Issue::from).collect();
    let report = FileReport {
        path: shown,
        kind,
        valid: errors.is_empty(),
        issues,
    };
    (report, errors)
}

fn is_pack(content: &str) -> bool {
    serde_yaml::from_str::<serde_yaml::Value>(content)
        .ok()
        .and_then(|v| v.as_mapping().map(|m| m.contains_key("cues")))
        .unwrap_or(false)
}

fn check_pack(content: &str) -> (Vec<ValidationIssue>, Vec<ValidationIssue>) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    match serde_yaml::from_str::<CuePack>(content) {
        Ok(pack) => {
            let result = PackValidator::new().validate(&pack, &[]);
            (result.errors, result.warnings)
        }
        Err(e) => (vec![issue("", &e.to_string(), Severity::Error)], Vec::new()),
    }
}

fn check_config(content: &str, path: &Path) -> (Vec<ValidationIssue>, Vec<ValidationIssue>) {
    // Validate the file as written, not as the environment would amend it
    let loader = ConfigLoader::new(LoaderOptions {
        env_overrides: false,
        ..LoaderOptions::default()
    });
    match loader.load_str(content, path) {
        Ok(loaded) => {
            let warnings = loaded
                .warnings
                .into_iter()
                .map(|w| issue(w.location.as_deref().unwrap_or(""), &w.message, Severity::Warning))
                .collect();
            (Vec::new(), warnings)
        }
        Err(ConfigError::ValidationError { errors, .. }) => (errors, Vec::new()),
        Err(e) => (vec![issue("", &e.to_string(), Severity::Error)], Vec::new()),
    }
}

fn issue(path: &str, message: &str, severity: Severity) -> ValidationIssue {
    ValidationIssue {
        path: path.to_string(),
        message: message.to_string(),
        severity,
    }
}

fn print_human(report: &FileReport) {
    let status = if report.valid { "ok" } else { "FAILED" };
    let kind = match report.kind {
        FileKind::Config => "config",
        FileKind::Pack => "pack",
    };
    println!("{} ({kind}): {status}", report.path);
    for issue in &report.issues {
        if issue.path.is_empty() {
            println!("  {}: {}", issue.severity, issue.message);
        } else {
            println!("  {}: {} at {}", issue.severity, issue.message, issue.path);
        }
    }
}
