//! Initialize codesmith files in a project directory.
//!
//! This module separates pure logic from IO by accepting closures for
//! filesystem operations, making the core logic easily testable.

use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::templates;

// -----------------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------------

/// Runs the init command, creating the default `codesmith.toml`.
pub(crate) fn run(force: bool) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    info!("Initializing codesmith in {}", cwd.display());

    let path = cwd.join("codesmith.toml");

    let result = init_config(
        force,
        |path| path.exists(),
        |path, content| {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))
        },
        &path,
    )?;

    print!("{}", format_result(&result));

    Ok(())
}

// -----------------------------------------------------------------------------
// Internal types
// -----------------------------------------------------------------------------

/// Result of attempting to write the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
enum WriteResult {
    /// File was created.
    Created,
    /// File was overwritten.
    Overwritten,
    /// File was skipped (already exists).
    Skipped,
}

// -----------------------------------------------------------------------------
// Helper functions
// -----------------------------------------------------------------------------

/// Core init logic: decides whether to write and writes.
///
/// Takes closures for IO operations to enable testing:
/// - `exists`: checks if a path exists
/// - `write_file`: writes content to a path
fn init_config<E, W>(force: bool, exists: E, mut write_file: W, path: &Path) -> Result<WriteResult>
where
    E: Fn(&Path) -> bool,
    W: FnMut(&Path, &str) -> Result<()>,
{
    if exists(path) && !force {
        return Ok(WriteResult::Skipped);
    }

    let existed = exists(path);
    write_file(path, templates::CODESMITH_TOML)?;

    Ok(if existed {
        WriteResult::Overwritten
    } else {
        WriteResult::Created
    })
}

/// Formats the init result for display with colored output.
fn format_result(result: &WriteResult) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    match result {
        WriteResult::Created => {
            writeln!(
                &mut out,
                "\n{} codesmith initialized successfully!\n",
                "✓".green().bold()
            )
            .unwrap();
            writeln!(
                &mut out,
                "  {} - Project configuration",
                "codesmith.toml".cyan()
            )
            .unwrap();
        }
        WriteResult::Overwritten => {
            writeln!(&mut out, "\n{} codesmith.toml (overwritten)", "↻".blue()).unwrap();
        }
        WriteResult::Skipped => {
            writeln!(
                &mut out,
                "\n{} codesmith.toml (already exists, use --force to overwrite)",
                "⊘".yellow()
            )
            .unwrap();
        }
    }

    writeln!(&mut out, "\n{}", "Next steps:".yellow().bold()).unwrap();
    writeln!(
        &mut out,
        "  1. Edit {} to point at your model endpoint",
        "codesmith.toml".cyan()
    )
    .unwrap();
    writeln!(
        &mut out,
        "  2. Run {} and describe what to build",
        "codesmith run".green()
    )
    .unwrap();

    out
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::PathBuf;

    #[test]
    fn test_init_creates_when_missing() {
        let written = RefCell::new(Vec::new());
        let path = PathBuf::from("codesmith.toml");

        let result = init_config(
            false,
            |_| false,
            |path, content| {
                written.borrow_mut().push((path.to_path_buf(), content.to_string()));
                Ok(())
            },
            &path,
        )
        .unwrap();

        assert_eq!(result, WriteResult::Created);
        let written = written.borrow();
        assert_eq!(written.len(), 1);
        assert!(written[0].1.contains("[model]"));
    }

    #[test]
    fn test_init_skips_existing_without_force() {
        let path = PathBuf::from("codesmith.toml");

        let result = init_config(
            false,
            |_| true,
            |_, _| panic!("must not write"),
            &path,
        )
        .unwrap();

        assert_eq!(result, WriteResult::Skipped);
    }

    #[test]
    fn test_init_overwrites_with_force() {
        let wrote = RefCell::new(false);
        let path = PathBuf::from("codesmith.toml");

        let result = init_config(
            true,
            |_| true,
            |_, _| {
                *wrote.borrow_mut() = true;
                Ok(())
            },
            &path,
        )
        .unwrap();

        assert_eq!(result, WriteResult::Overwritten);
        assert!(*wrote.borrow());
    }

    #[test]
    fn test_template_is_valid_toml() {
        let parsed: Result<crate::config::Config, _> = toml::from_str(templates::CODESMITH_TOML);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_template_defaults_match_config_defaults() {
        let parsed: crate::config::Config = toml::from_str(templates::CODESMITH_TOML).unwrap();
        let defaults = crate::config::Config::default();
        assert_eq!(parsed.model.endpoint, defaults.model.endpoint);
        assert_eq!(parsed.generation.max_attempts, defaults.generation.max_attempts);
        assert_eq!(parsed.execution.timeout_secs, defaults.execution.timeout_secs);
    }

    #[test]
    fn test_format_result_mentions_force_on_skip() {
        let out = format_result(&WriteResult::Skipped);
        assert!(out.contains("--force"));
    }
}
