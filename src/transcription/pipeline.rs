//! Transcription job: download, convert, split, notify

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use super::convert::{AudioConverter, FfmpegConverter};
use super::download::{download_file, file_name_from_url};
use super::notify::{Notice, Notifier, SmtpNotifier};
use super::split::split_audio;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::executor::{TaskExecutor, TaskId};

/// A submitted transcription request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionJob {
    #[serde(rename = "audioURL")]
    pub audio_url: String,

    #[serde(rename = "emailAddresses")]
    pub email_addresses: Vec<String>,
}

impl TranscriptionJob {
    pub fn new(audio_url: impl Into<String>, email_addresses: Vec<String>) -> Self {
        Self {
            audio_url: audio_url.into(),
            email_addresses,
        }
    }

    /// Build a job from a comma-separated address list, dropping blanks
    pub fn from_address_list(audio_url: impl Into<String>, addresses: &str) -> Self {
        let email_addresses = addresses
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(audio_url.into().trim().to_string(), email_addresses)
    }

    /// Reject jobs that could never succeed before they are queued
    pub fn validate(&self) -> Result<()> {
        file_name_from_url(&self.audio_url)
            .map_err(|e| Error::InvalidRequest(e.to_string()))?;

        if self.email_addresses.is_empty() {
            return Err(Error::InvalidRequest(
                "at least one e-mail address is required".to_string(),
            ));
        }

        if let Some(bad) = self
            .email_addresses
            .iter()
            .find(|a| !looks_like_email(a))
        {
            return Err(Error::InvalidRequest(format!(
                "'{}' is not an e-mail address",
                bad
            )));
        }

        Ok(())
    }
}

fn looks_like_email(address: &str) -> bool {
    match address.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    }
}

/// Shared resources every job runs with
#[derive(Clone)]
pub struct PipelineContext {
    client: reqwest::Client,
    converter: Arc<dyn AudioConverter>,
    notifier: Option<Arc<dyn Notifier>>,
    work_dir: PathBuf,
}

impl PipelineContext {
    pub fn new(
        client: reqwest::Client,
        converter: Arc<dyn AudioConverter>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            client,
            converter,
            notifier: None,
            work_dir: work_dir.into(),
        }
    }

    /// Send a notice to the job's recipients once it reaches a terminal state
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Production context: ffmpeg converter, an HTTP client with the
    /// configured download timeout and, when an account is set, SMTP
    /// notifications
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.transcription.download_timeout_secs))
            .user_agent(concat!("transcribe4all/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let ctx = Self::new(
            client,
            Arc::new(FfmpegConverter::new(&config.transcription.ffmpeg_path)),
            config.work_dir(),
        );

        if !config.email.is_configured() {
            info!("No e-mail account configured, job notifications disabled");
            return Ok(ctx);
        }
        let notifier = SmtpNotifier::from_settings(&config.email)?;
        info!(
            host = %config.email.smtp_host,
            port = config.email.smtp_port,
            "Job notifications enabled"
        );
        Ok(ctx.with_notifier(Arc::new(notifier)))
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("work_dir", &self.work_dir)
            .field("notifications", &self.notifier.is_some())
            .finish_non_exhaustive()
    }
}

/// Work function for one job, ready for [`TaskExecutor::queue_async`]
pub fn make_task(
    job: TranscriptionJob,
    ctx: PipelineContext,
) -> impl Future<Output = Result<()>> + Send + 'static {
    let job_id = Uuid::new_v4();
    let span = info_span!("job", id = %job_id.simple());
    async move {
        let job_dir = ctx.work_dir.join(job_id.simple().to_string());
        let outcome = match run_pipeline(&job_dir, &job, &ctx).await {
            Ok(chunks) => {
                info!(
                    chunks = chunks.len(),
                    recipients = job.email_addresses.len(),
                    "Audio ready for transcription"
                );
                let notice = Notice::job_ready(&job.audio_url, &job.email_addresses, &chunks);
                notify(&ctx, &notice).await
            }
            Err(e) => {
                let notice = Notice::job_failed(&job.audio_url, &job.email_addresses, &e);
                if let Err(notify_err) = notify(&ctx, &notice).await {
                    warn!(error = %notify_err, "Could not send failure notice");
                }
                Err(e)
            }
        };

        remove_job_dir(&job_dir).await;
        outcome
    }
    .instrument(span)
}

async fn notify(ctx: &PipelineContext, notice: &Notice) -> Result<()> {
    match &ctx.notifier {
        Some(notifier) => notifier.notify(notice).await,
        None => Ok(()),
    }
}

/// Drop everything a finished job wrote; a leftover directory is only logged
async fn remove_job_dir(job_dir: &Path) {
    match tokio::fs::remove_dir_all(job_dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(dir = %job_dir.display(), error = %e, "Could not remove job directory"),
    }
}

async fn run_pipeline(
    job_dir: &Path,
    job: &TranscriptionJob,
    ctx: &PipelineContext,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(job_dir)
        .await
        .map_err(|e| Error::IoWrite {
            path: job_dir.to_path_buf(),
            source: e,
        })?;

    let audio = download_file(&ctx.client, &job.audio_url, job_dir).await?;
    let wav = ctx.converter.to_wav(&audio).await?;
    split_audio(ctx.converter.as_ref(), &wav).await
}

/// Validate `job` and queue it, returning the task id to poll
pub fn submit_job(
    executor: &TaskExecutor,
    job: TranscriptionJob,
    ctx: PipelineContext,
) -> Result<TaskId> {
    job.validate()?;
    let id = executor.queue_async(make_task(job, ctx));
    Ok(id)
}
