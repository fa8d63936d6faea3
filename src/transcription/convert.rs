//! Audio format conversion
//!
//! The pipeline only talks to [`AudioConverter`]; [`FfmpegConverter`] is the
//! production implementation and shells out to an `ffmpeg` binary.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Sample rate every converted file is resampled to
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Channel count every converted file is downmixed to
pub const CHANNELS: u32 = 1;

/// Converts audio between the formats the pipeline needs
#[async_trait]
pub trait AudioConverter: Send + Sync {
    /// Convert `input` to 16 kHz mono WAV, returning the new file
    async fn to_wav(&self, input: &Path) -> Result<PathBuf>;

    /// Convert `input` to 16 kHz mono FLAC, returning the new file
    async fn to_flac(&self, input: &Path) -> Result<PathBuf>;

    /// Copy `len_secs` seconds starting at `start_secs` into `output`
    async fn extract_segment(
        &self,
        input: &Path,
        start_secs: u64,
        len_secs: u64,
        output: &Path,
    ) -> Result<()>;
}

/// Output path for a whole-file conversion: the input name with `ext` appended
pub fn converted_path(input: &Path, ext: &str) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// [`AudioConverter`] backed by the `ffmpeg` command line tool
#[derive(Debug, Clone)]
pub struct FfmpegConverter {
    program: String,
}

impl FfmpegConverter {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    async fn convert(&self, input: &Path, ext: &str) -> Result<PathBuf> {
        let output = converted_path(input, ext);
        let args: Vec<OsString> = vec![
            "-i".into(),
            input.into(),
            "-ar".into(),
            SAMPLE_RATE_HZ.to_string().into(),
            "-ac".into(),
            CHANNELS.to_string().into(),
            output.clone().into(),
        ];
        self.run(input, args).await?;
        Ok(output)
    }

    async fn run(&self, input: &Path, args: Vec<OsString>) -> Result<()> {
        trace!(program = %self.program, ?args, "Running converter");

        let result = Command::new(&self.program)
            .args(["-y", "-nostdin", "-hide_banner", "-loglevel", "error"])
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ConverterMissing {
                program: self.program.clone(),
                source: e,
            })?;

        if !result.status.success() {
            return Err(Error::ConversionFailed {
                input: input.to_path_buf(),
                message: failure_message(&result.status, &result.stderr),
            });
        }

        debug!(input = %input.display(), "Conversion finished");
        Ok(())
    }
}

#[async_trait]
impl AudioConverter for FfmpegConverter {
    async fn to_wav(&self, input: &Path) -> Result<PathBuf> {
        self.convert(input, "wav").await
    }

    async fn to_flac(&self, input: &Path) -> Result<PathBuf> {
        self.convert(input, "flac").await
    }

    async fn extract_segment(
        &self,
        input: &Path,
        start_secs: u64,
        len_secs: u64,
        output: &Path,
    ) -> Result<()> {
        let args: Vec<OsString> = vec![
            "-i".into(),
            input.into(),
            "-ss".into(),
            start_secs.to_string().into(),
            "-t".into(),
            len_secs.to_string().into(),
            output.into(),
        ];
        self.run(input, args).await
    }
}

/// Exit status plus the last line ffmpeg wrote to stderr
fn failure_message(status: &std::process::ExitStatus, stderr: &[u8]) -> String {
    let stderr = String::from_utf8_lossy(stderr);
    match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
        Some(line) => format!("{}: {}", status, line.trim()),
        None => status.to_string(),
    }
}
