//! Interactive code generation command.
//!
//! Serves one request per iteration: prompt for a query, pick the target
//! languages, plan, run the generate-test loop, refine on feedback, document,
//! optimize, save, and execute. A failed request is reported and the next
//! iteration proceeds; nothing here exits the process.

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Write as _;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::artifact::{save_code, SaveOutcome};
use crate::config::Config;
use crate::language::{detect_language, Language, LanguageSelection};
use crate::model::{HttpModelClient, ModelClient};
use crate::pipeline::{GenerationLoop, Plan, Verification};
use crate::runner::{execute_artifact, ProcessRunner};
use crate::search::ReferenceFetcher;
use crate::stages::{ModelRoles, Stages};

/// CLI options for the run command.
#[derive(Debug, Clone, Default)]
pub(crate) struct RunOptions {
    /// Override for `[generation] iterations`.
    pub iterations: Option<u32>,
    /// Override for `[generation] max_attempts`.
    pub max_attempts: Option<u32>,
    /// Skip executing the final artifact.
    pub no_execute: bool,
}

/// Everything a single request needs, borrowed from the command scope.
struct RequestContext<'a> {
    stages: &'a Stages<'a>,
    runner: &'a ProcessRunner,
    fetcher: Option<&'a ReferenceFetcher>,
    max_attempts: u32,
    execute: bool,
    execution_timeout: Duration,
}

// -----------------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------------

/// Runs the interactive request loop.
pub(crate) async fn run(options: RunOptions) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to get current directory")?;
    let config = Config::load(&cwd).context("Failed to load codesmith.toml")?;

    let iterations = options
        .iterations
        .unwrap_or(config.generation.iterations)
        .max(1);
    let max_attempts = options.max_attempts.unwrap_or(config.generation.max_attempts);
    let execute = config.execution.enabled && !options.no_execute;

    let model = HttpModelClient::new(&config.model).context("Failed to build model client")?;
    info!(
        "Using {} model client against {}",
        model.name(),
        config.model.endpoint
    );
    let stages = Stages::new(&model, ModelRoles::from_config(&config.model));

    let scratch_root = std::env::temp_dir().join(format!("codesmith-{}", Uuid::new_v4()));
    let runner = ProcessRunner::new(scratch_root.clone(), &config.execution);

    let fetcher = if config.search.enabled {
        Some(ReferenceFetcher::new(&config.search)?)
    } else {
        None
    };

    let ctx = RequestContext {
        stages: &stages,
        runner: &runner,
        fetcher: fetcher.as_ref(),
        max_attempts,
        execute,
        execution_timeout: Duration::from_secs(config.execution.timeout_secs),
    };

    for iteration in 1..=iterations {
        if iterations > 1 {
            println!("\n{}", format!("[request {iteration}/{iterations}]").bold());
        }

        let Some(query) = prompt_line("Enter your coding query: ")? else {
            info!("End of input; stopping");
            break;
        };
        if query.is_empty() {
            warn!("Empty query; skipping");
            continue;
        }

        let Some(languages) = select_languages(&query)? else {
            continue;
        };

        // A failed request is reported, never thrown: the next iteration
        // still runs.
        if let Err(e) = serve_request(&ctx, &query, &languages).await {
            error!("Request abandoned: {e:#}");
            println!("{}", format!("Request abandoned: {e:#}").red());
        }
    }

    if let Err(e) = std::fs::remove_dir_all(&scratch_root) {
        tracing::debug!(
            "Failed to remove scratch root {}: {e}",
            scratch_root.display()
        );
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// Request flow
// -----------------------------------------------------------------------------

/// Serves one request end to end.
async fn serve_request(
    ctx: &RequestContext<'_>,
    query: &str,
    languages: &LanguageSelection,
) -> Result<()> {
    let primary = languages.primary();

    let plan_text = ctx
        .stages
        .plan(query, languages)
        .await
        .context("Failed to generate plan")?;
    let mut plan = Plan::new(plan_text);

    let generation_loop = GenerationLoop::new(ctx.stages, ctx.runner, ctx.max_attempts);
    let outcome = generation_loop.run(&mut plan, languages).await?;

    match outcome.verification {
        Verification::Verified => {
            info!("Tests passed after {} attempt(s)", outcome.attempts);
        }
        Verification::SkippedMarkup => {
            info!("Markup target; tests skipped by design");
        }
        Verification::Unverified => {
            println!(
                "{}",
                "Note: tests were generated but not executed for this language.".yellow()
            );
        }
    }

    let mut code = outcome.code;
    let mut tests = outcome.tests;

    println!("\n{}", "Generated Code:".bold());
    println!("{}", code.green());
    println!("\n{}", "Generated Tests:".bold());
    println!("{}", tests.green());

    if let Some(feedback) =
        prompt_line("\nProvide feedback on the generated code and tests (or press Enter to accept): ")?
    {
        if !feedback.is_empty() {
            match ctx.stages.refine(&code, &feedback, languages).await {
                Ok(refined) => {
                    code = refined;
                    match ctx.stages.tests(&plan.render(), &code, languages).await {
                        Ok(updated) => tests = updated,
                        Err(e) => warn!("Could not regenerate tests after refinement: {e}"),
                    }
                    println!("\n{}", "Refined Code:".bold());
                    println!("{}", code.green());
                    println!("\n{}", "Updated Tests:".bold());
                    println!("{}", tests.green());
                }
                Err(e) => warn!("Refinement failed; keeping original code: {e}"),
            }
        }
    }

    let documented = ctx
        .stages
        .document(&code, languages)
        .await
        .context("Failed to generate documentation")?;
    let optimized = ctx
        .stages
        .optimize(&documented, languages)
        .await
        .context("Failed to optimize code")?;

    let filename =
        prompt_line("Enter the filename (without extension) for the final code: ")?
            .unwrap_or_default();
    let path = artifact_path(&filename, primary);

    match save_code(&optimized, &path)? {
        SaveOutcome::Saved => {
            println!("{}", format!("Code saved to {}", path.display()).green());
        }
        SaveOutcome::SavedWithBackup(backup) => {
            println!(
                "{}",
                format!("Existing file backed up to {}", backup.display()).yellow()
            );
            println!("{}", format!("Code saved to {}", path.display()).green());
        }
        SaveOutcome::SkippedEmpty => warn!("Nothing to save"),
    }

    if ctx.execute {
        match execute_artifact(&path, primary, ctx.execution_timeout).await {
            Ok(0) => {}
            Ok(status) => warn!("Artifact exited with status {status}"),
            Err(e) => warn!("Artifact execution failed: {e}"),
        }
    }

    if let Some(fetcher) = ctx.fetcher {
        if let Some(reference) = fetcher.fetch_reference(&query_to_search_url(query)).await {
            println!("\n{}", "Reference:".bold());
            let preview = reference.lines().take(25).collect::<Vec<_>>().join("\n");
            println!("{preview}");
        }
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// Helper functions
// -----------------------------------------------------------------------------

/// Detects the language from the query, asking the user when it is absent.
///
/// Returns `None` (skip this request) on end of input or an unparsable list.
fn select_languages(query: &str) -> Result<Option<LanguageSelection>> {
    if let Some(language) = detect_language(query) {
        info!("Detected language from query: {language}");
        return Ok(Some(LanguageSelection::single(language)));
    }

    let Some(input) = prompt_line(
        "Enter the programming languages (comma-separated, e.g. python,javascript,html): ",
    )?
    else {
        return Ok(None);
    };

    match LanguageSelection::parse(&input) {
        Ok(selection) => Ok(Some(selection)),
        Err(e) => {
            warn!("Skipping request: {e}");
            println!("{}", e.to_string().red());
            Ok(None)
        }
    }
}

/// Prints a prompt and reads one trimmed line; `None` on end of input.
fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Output path for the final artifact; empty names fall back to "generated".
fn artifact_path(filename: &str, language: Language) -> PathBuf {
    let stem = filename.trim();
    let stem = if stem.is_empty() { "generated" } else { stem };
    PathBuf::from(format!("{stem}.{}", language.extension()))
}

/// Search URL used for the reference lookup.
fn query_to_search_url(query: &str) -> String {
    format!("https://www.google.com/search?q={}", query.replace(' ', "+"))
}

// -----------------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_path_uses_primary_extension() {
        assert_eq!(
            artifact_path("reverse", Language::Python),
            PathBuf::from("reverse.py")
        );
        assert_eq!(
            artifact_path("page", Language::Html),
            PathBuf::from("page.html")
        );
    }

    #[test]
    fn test_artifact_path_empty_name_falls_back() {
        assert_eq!(
            artifact_path("  ", Language::JavaScript),
            PathBuf::from("generated.js")
        );
    }

    #[test]
    fn test_query_to_search_url_escapes_spaces() {
        assert_eq!(
            query_to_search_url("reverse a string python"),
            "https://www.google.com/search?q=reverse+a+string+python"
        );
    }

    #[test]
    fn test_run_options_default() {
        let options = RunOptions::default();
        assert_eq!(options.iterations, None);
        assert_eq!(options.max_attempts, None);
        assert!(!options.no_execute);
    }
}
