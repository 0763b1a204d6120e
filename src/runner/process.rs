//! Subprocess-backed test runner and artifact execution.
//!
//! Generated code and tests are written to a per-attempt scratch directory
//! and the language's interpreter is spawned with a bounded timeout. Python
//! and JavaScript carry built-in harnesses; other languages need a custom
//! command from `[execution.test_commands]` or are reported as unsupported.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RunnerError, TestOutcome, TestRunner};
use crate::config::ExecutionConfig;
use crate::language::Language;

const CODE_STEM: &str = "generated_code";
const TEST_STEM: &str = "generated_code_test";

/// Test runner that executes code with local interpreters.
pub(crate) struct ProcessRunner {
    scratch_root: PathBuf,
    timeout: Duration,
    install_dependencies: bool,
    test_commands: HashMap<String, String>,
}

impl ProcessRunner {
    /// Creates a runner rooted at `scratch_root`.
    pub fn new(scratch_root: PathBuf, config: &ExecutionConfig) -> Self {
        Self {
            scratch_root,
            timeout: Duration::from_secs(config.timeout_secs),
            install_dependencies: config.install_dependencies,
            test_commands: config.test_commands.clone(),
        }
    }

    /// Fresh scratch directory for one attempt.
    fn create_scratch_dir(&self) -> Result<PathBuf, RunnerError> {
        let dir = self.scratch_root.join(format!("attempt-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    async fn run_python(&self, code: &str, tests: &str) -> Result<TestOutcome, RunnerError> {
        let dir = self.create_scratch_dir()?;

        let (clean_code, packages) = strip_install_lines(code);
        if !packages.is_empty() {
            if self.install_dependencies {
                self.install_packages(&packages, &dir).await;
            } else {
                warn!(
                    "Generated code requested packages (not installed): {}",
                    packages.join(", ")
                );
            }
        }

        std::fs::write(dir.join(format!("{CODE_STEM}.py")), clean_code)?;
        std::fs::write(
            dir.join(format!("{TEST_STEM}.py")),
            python_harness(tests),
        )?;

        let status = run_with_timeout(
            "python3",
            &[format!("{TEST_STEM}.py")],
            &dir,
            self.timeout,
        )
        .await?;

        cleanup_scratch(&dir);
        Ok(outcome_from_status(status))
    }

    async fn run_javascript(&self, code: &str, tests: &str) -> Result<TestOutcome, RunnerError> {
        let dir = self.create_scratch_dir()?;

        std::fs::write(dir.join(format!("{CODE_STEM}.js")), code)?;
        std::fs::write(
            dir.join(format!("{TEST_STEM}.js")),
            javascript_harness(tests),
        )?;

        let status = run_with_timeout(
            "node",
            &[format!("{TEST_STEM}.js")],
            &dir,
            self.timeout,
        )
        .await?;

        cleanup_scratch(&dir);
        Ok(outcome_from_status(status))
    }

    /// Runs a user-configured test command with `{code}`/`{tests}` expanded
    /// to the scratch file names.
    async fn run_custom(
        &self,
        template: &str,
        code: &str,
        tests: &str,
        language: Language,
    ) -> Result<TestOutcome, RunnerError> {
        let dir = self.create_scratch_dir()?;

        let extension = language.extension();
        let code_file = format!("{CODE_STEM}.{extension}");
        let test_file = format!("{TEST_STEM}.{extension}");
        std::fs::write(dir.join(&code_file), code)?;
        std::fs::write(dir.join(&test_file), tests)?;

        let command = template
            .replace("{code}", &code_file)
            .replace("{tests}", &test_file);

        let parts = shell_words::split(&command).map_err(|e| RunnerError::InvalidCommand {
            command: command.clone(),
            message: e.to_string(),
        })?;
        let (program, args) = parts.split_first().ok_or_else(|| RunnerError::InvalidCommand {
            command: command.clone(),
            message: "command is empty".to_string(),
        })?;

        let status = run_with_timeout(program, args, &dir, self.timeout).await?;

        cleanup_scratch(&dir);
        Ok(outcome_from_status(status))
    }

    /// Best-effort `pip install` for each requested package.
    async fn install_packages(&self, packages: &[String], cwd: &Path) {
        for package in packages {
            info!("Installing requested package: {package}");
            match run_with_timeout("pip", &["install".to_string(), package.clone()], cwd, self.timeout)
                .await
            {
                Ok(0) => {}
                Ok(status) => warn!("pip install {package} exited with status {status}"),
                Err(e) => warn!("pip install {package} failed: {e}"),
            }
        }
    }
}

#[async_trait]
impl TestRunner for ProcessRunner {
    async fn run(
        &self,
        code: &str,
        tests: &str,
        language: Language,
    ) -> Result<TestOutcome, RunnerError> {
        // Markup has no executable test concept: report success without
        // touching disk or spawning anything.
        if language.is_markup() {
            info!("Skipping tests for markup language: {language}");
            return Ok(TestOutcome::SkippedMarkup);
        }

        if let Some(template) = self.test_commands.get(&language.to_string()) {
            let template = template.clone();
            return self.run_custom(&template, code, tests, language).await;
        }

        match language {
            Language::Python => self.run_python(code, tests).await,
            Language::JavaScript => self.run_javascript(code, tests).await,
            _ => {
                info!("No test execution mapping for {language}; skipping execution");
                Ok(TestOutcome::Unsupported)
            }
        }
    }
}

/// Runs the final saved artifact for its primary language.
///
/// Returns the process exit status; markup and unmapped languages report 0
/// without executing anything. Compiled languages build into a sibling
/// binary first.
pub(crate) async fn execute_artifact(
    path: &Path,
    language: Language,
    timeout: Duration,
) -> Result<i32, RunnerError> {
    if language.is_markup() {
        info!(
            "{} saved to {}. Open it in a web browser to view.",
            language,
            path.display()
        );
        return Ok(0);
    }

    let cwd = path.parent().filter(|p| !p.as_os_str().is_empty());
    let cwd = cwd.map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let file = path.to_string_lossy().into_owned();

    match language {
        Language::Python => run_with_timeout("python3", &[file], &cwd, timeout).await,
        Language::JavaScript => run_with_timeout("node", &[file], &cwd, timeout).await,
        Language::Ruby => run_with_timeout("ruby", &[file], &cwd, timeout).await,
        Language::Php => run_with_timeout("php", &[file], &cwd, timeout).await,
        Language::Go => {
            run_with_timeout("go", &["run".to_string(), file], &cwd, timeout).await
        }
        // Java 11+ runs single source files directly.
        Language::Java => run_with_timeout("java", &[file], &cwd, timeout).await,
        Language::C => compile_and_run("gcc", path, &cwd, timeout).await,
        Language::Cpp => compile_and_run("g++", path, &cwd, timeout).await,
        Language::CSharp | Language::Html | Language::Css => {
            info!("No execution mapping for {language}; skipping execution");
            Ok(0)
        }
    }
}

/// Compiles `path` into a sibling binary and runs it.
async fn compile_and_run(
    compiler: &str,
    path: &Path,
    cwd: &Path,
    timeout: Duration,
) -> Result<i32, RunnerError> {
    let binary = path.with_extension("bin");
    let status = run_with_timeout(
        compiler,
        &[
            path.to_string_lossy().into_owned(),
            "-o".to_string(),
            binary.to_string_lossy().into_owned(),
        ],
        cwd,
        timeout,
    )
    .await?;
    if status != 0 {
        warn!("Compilation failed with status {status}");
        return Ok(status);
    }
    run_with_timeout(&binary.to_string_lossy(), &[], cwd, timeout).await
}

/// Spawns a process and waits for it under a timeout.
///
/// The child is killed if the timeout fires. Returns the exit status code
/// (-1 when killed by a signal).
async fn run_with_timeout(
    program: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
) -> Result<i32, RunnerError> {
    debug!("Running: {program} {}", args.join(" "));

    let output_future = tokio::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(timeout, output_future)
        .await
        .map_err(|_| RunnerError::Timeout {
            timeout_secs: timeout.as_secs(),
        })?
        .map_err(|e| RunnerError::Spawn {
            program: program.to_string(),
            message: e.to_string(),
        })?;

    let status = output.status.code().unwrap_or(-1);
    if status != 0 {
        debug!(
            "{program} exited with status {status}; stderr:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(status)
}

fn outcome_from_status(status: i32) -> TestOutcome {
    if status == 0 {
        TestOutcome::Passed
    } else {
        TestOutcome::Failed { status }
    }
}

/// Removes the scratch directory for one attempt; failures are harmless.
fn cleanup_scratch(dir: &Path) {
    if let Err(e) = std::fs::remove_dir_all(dir) {
        debug!("Failed to remove scratch dir {}: {e}", dir.display());
    }
}

/// Drops pip-install lines from generated Python and collects the package
/// names they mentioned.
fn strip_install_lines(code: &str) -> (String, Vec<String>) {
    let mut packages = Vec::new();
    let kept: Vec<&str> = code
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with("pip install") {
                packages.extend(
                    trimmed
                        .split_whitespace()
                        .skip(2)
                        .map(str::to_string),
                );
                false
            } else {
                true
            }
        })
        .collect();
    (kept.join("\n"), packages)
}

/// Wraps generated tests in a unittest harness importing the code module.
fn python_harness(tests: &str) -> String {
    format!(
        "import unittest\nfrom {CODE_STEM} import *\n\n{tests}\n\nif __name__ == \"__main__\":\n    unittest.main()\n"
    )
}

/// Wraps generated tests in a node harness loading the code module.
fn javascript_harness(tests: &str) -> String {
    format!("require(\"./{CODE_STEM}.js\");\n\n{tests}\n")
}
