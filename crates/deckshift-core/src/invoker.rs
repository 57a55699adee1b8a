//! Converter Invoker.
//!
//! The external converter is a black box: it reads an input path, writes an
//! output path and exits 0 on success. [`Converter`] is the seam; the real
//! implementation is [`ProcessConverter`], tests substitute their own.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::LaunchFailure;

/// Default wall-clock bound for one converter run.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Per-request switches forwarded to the converter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Ask the converter to use LLM-assisted layout analysis.
    pub use_llm: bool,
}

/// Exit status and trimmed stderr of a converter that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessResult {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub diagnostic: String,
}

impl ProcessResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert `input` into `output`.
    ///
    /// Returns the exit status regardless of its value; only a process that
    /// could not be started or finished is a [`LaunchFailure`]. A zero exit
    /// does not guarantee that `output` was written.
    async fn run(
        &self,
        input: &Path,
        output: &Path,
        options: ConversionOptions,
    ) -> Result<ProcessResult, LaunchFailure>;
}

/// How to launch the external converter.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    /// Executable to spawn.
    pub program: PathBuf,
    /// Arguments placed before the input path (e.g. `-m src.main`).
    pub leading_args: Vec<OsString>,
    /// Working directory of the child.
    pub working_dir: PathBuf,
    /// Variables added to the inherited environment.
    pub env: Vec<(OsString, OsString)>,
    /// Hard wall-clock bound; the child is killed when it expires.
    pub timeout: Duration,
}

impl ConverterConfig {
    /// Run `module` with `python -m` from `project_root`, with `PYTHONPATH`
    /// pointing at the project root.
    pub fn python(
        python: impl Into<PathBuf>,
        module: &str,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let project_root = project_root.into();
        Self {
            program: python.into(),
            leading_args: vec!["-m".into(), module.into()],
            env: vec![("PYTHONPATH".into(), project_root.clone().into_os_string())],
            working_dir: project_root,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The project's virtualenv interpreter if present, `python3` otherwise.
    pub fn discover_python(project_root: &Path) -> PathBuf {
        let venv = project_root.join(".venv").join("bin").join("python");
        if venv.exists() {
            venv
        } else {
            PathBuf::from("python3")
        }
    }
}

/// Runs the converter as a child process.
#[derive(Debug, Clone)]
pub struct ProcessConverter {
    config: ConverterConfig,
}

impl ProcessConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    fn command(&self, input: &Path, output: &Path, options: ConversionOptions) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.leading_args)
            .arg(input)
            .arg("-o")
            .arg(output)
            .arg("--no-save-images");
        if options.use_llm {
            cmd.arg("--use-llm");
        }
        cmd.current_dir(&self.config.working_dir)
            .envs(self.config.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Converter for ProcessConverter {
    async fn run(
        &self,
        input: &Path,
        output: &Path,
        options: ConversionOptions,
    ) -> Result<ProcessResult, LaunchFailure> {
        let program = self.config.program.display().to_string();
        let child = self
            .command(input, output, options)
            .spawn()
            .map_err(|source| LaunchFailure::Spawn {
                program: program.clone(),
                source,
            })?;
        debug!(program = %program, pid = ?child.id(), "converter spawned");

        let started = Instant::now();
        // Dropping the future on timeout drops the child, and kill_on_drop kills it.
        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Ok(result) => result.map_err(LaunchFailure::Wait)?,
            Err(_) => {
                warn!(
                    program = %program,
                    timeout_secs = self.config.timeout.as_secs(),
                    "converter timed out; killed"
                );
                return Err(LaunchFailure::TimedOut(self.config.timeout));
            }
        };

        let exit_code = output.status.code();
        let diagnostic = String::from_utf8_lossy(&output.stderr).trim().to_owned();
        info!(
            exit_code = ?exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            stderr_len = diagnostic.len(),
            "converter exited"
        );
        if !output.stdout.is_empty() {
            debug!(stdout = %String::from_utf8_lossy(&output.stdout), "converter stdout");
        }

        Ok(ProcessResult {
            exit_code,
            diagnostic,
        })
    }
}

#[cfg(all(test, unix))]
mod test {
    use super::*;

    /// A converter that runs `script` through `sh -c`, receiving
    /// `<input> -o <output> --no-save-images [--use-llm]` as `$1..`.
    fn shell(script: &str, working_dir: &Path) -> ProcessConverter {
        ProcessConverter::new(ConverterConfig {
            program: "sh".into(),
            leading_args: vec!["-c".into(), script.into(), "converter".into()],
            working_dir: working_dir.to_owned(),
            env: vec![("PYTHONPATH".into(), working_dir.as_os_str().to_owned())],
            timeout: Duration::from_secs(10),
        })
    }

    #[tokio::test]
    async fn zero_exit_reports_success_and_writes_output() {
        let tmp = tempfile::tempdir().unwrap();
        let (input, output) = (tmp.path().join("in.pdf"), tmp.path().join("out.pptx"));
        let conv = shell(r#"[ "$2" = "-o" ] && [ "$4" = "--no-save-images" ] && printf pptx > "$3""#, tmp.path());

        let result = conv.run(&input, &output, ConversionOptions::default()).await.unwrap();
        assert!(result.success());
        assert_eq!(std::fs::read(&output).unwrap(), b"pptx");
    }

    #[tokio::test]
    async fn environment_points_at_project_root() {
        let tmp = tempfile::tempdir().unwrap();
        let output = tmp.path().join("out.pptx");
        let conv = shell(r#"printf '%s' "$PYTHONPATH" > "$3""#, tmp.path());

        conv.run(Path::new("in.pdf"), &output, ConversionOptions::default())
            .await
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            tmp.path().display().to_string()
        );
    }

    #[tokio::test]
    async fn use_llm_is_forwarded() {
        let tmp = tempfile::tempdir().unwrap();
        let conv = shell(r#"[ "$5" = "--use-llm" ]"#, tmp.path());

        let on = conv
            .run(Path::new("a.pdf"), Path::new("a.pptx"), ConversionOptions { use_llm: true })
            .await
            .unwrap();
        let off = conv
            .run(Path::new("a.pdf"), Path::new("a.pptx"), ConversionOptions::default())
            .await
            .unwrap();
        assert!(on.success());
        assert!(!off.success());
    }

    #[tokio::test]
    async fn nonzero_exit_returns_trimmed_stderr() {
        let tmp = tempfile::tempdir().unwrap();
        let conv = shell("echo '  ModuleNotFoundError: x  ' >&2; exit 3", tmp.path());

        let result = conv
            .run(Path::new("a.pdf"), Path::new("a.pptx"), ConversionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(result.diagnostic, "ModuleNotFoundError: x");
    }

    #[tokio::test]
    async fn missing_binary_is_a_launch_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let conv = ProcessConverter::new(ConverterConfig::python(
            "/nonexistent/deckshift/python",
            "src.main",
            tmp.path(),
        ));

        let err = conv
            .run(Path::new("a.pdf"), Path::new("a.pptx"), ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchFailure::Spawn { .. }));
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_the_child() {
        let tmp = tempfile::tempdir().unwrap();
        let mut conv = shell("sleep 5", tmp.path());
        conv.config.timeout = Duration::from_millis(200);

        let started = Instant::now();
        let err = conv
            .run(Path::new("a.pdf"), Path::new("a.pptx"), ConversionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, LaunchFailure::TimedOut(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[test]
    fn discover_python_falls_back_to_python3() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(ConverterConfig::discover_python(tmp.path()), PathBuf::from("python3"));

        let venv = tmp.path().join(".venv").join("bin");
        std::fs::create_dir_all(&venv).unwrap();
        std::fs::write(venv.join("python"), b"").unwrap();
        assert_eq!(ConverterConfig::discover_python(tmp.path()), venv.join("python"));
    }
}
