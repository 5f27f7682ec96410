// Copyright 2025 Cornell University
// released under MIT License

use log::debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonaError {
    #[error("failed to start `{binary}`: {source}")]
    CompilerUnavailable {
        binary: String,
        source: std::io::Error,
    },
    #[error("failed to execute command: `{0}`\n{1}")]
    CompilerFailed(String, String),
    #[error("compiler did not finish within {0:?}")]
    CompilerTimeout(Duration),
    #[error("failed to perform i/o: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, MonaError>;

/// Poll interval while waiting for the compiler to exit.
const POLL: Duration = Duration::from_millis(10);

pub struct MonaEnv {
    binary: PathBuf,
    timeout: Duration,
}

impl MonaEnv {
    pub fn new(binary: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn with_timeout_seconds(binary: impl Into<PathBuf>, seconds: u64) -> Self {
        Self::new(binary, Duration::from_secs(seconds))
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut bytes = vec![];
        let _ = pipe.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn collect(reader: Option<JoinHandle<String>>) -> String {
    reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

fn kill(child: &mut Child) -> Result<()> {
    child.kill()?;
    child.wait()?;
    Ok(())
}

/// Runs `<binary> -i <formula>` and returns the trace the compiler printed on stdout.
pub fn run_mona(env: &MonaEnv, formula: &Path) -> Result<String> {
    let mut cmd = Command::new(&env.binary);
    cmd.arg("-i")
        .arg(formula)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    debug!("running {cmd:?}");

    let mut child = cmd.spawn().map_err(|source| MonaError::CompilerUnavailable {
        binary: env.binary.to_string_lossy().to_string(),
        source,
    })?;
    // both pipes are drained concurrently so a chatty child cannot block on a full pipe
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + env.timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            kill(&mut child)?;
            return Err(MonaError::CompilerTimeout(env.timeout));
        }
        std::thread::sleep(POLL);
    };

    let out = collect(stdout);
    if status.success() {
        Ok(out)
    } else {
        Err(MonaError::CompilerFailed(format!("{cmd:?}"), collect(stderr)))
    }
}
