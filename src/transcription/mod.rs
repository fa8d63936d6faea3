//! Transcription pipeline
//!
//! A job downloads the source audio, converts it to 16 kHz mono WAV and
//! splits it into overlapping FLAC chunks sized for a speech-to-text
//! service, then e-mails the requesters. Jobs run as executor tasks.

pub mod convert;
pub mod download;
pub mod notify;
pub mod pipeline;
pub mod split;

pub use convert::{AudioConverter, FfmpegConverter};
pub use download::{download_file, file_name_from_url};
pub use notify::{Notice, Notifier, SmtpNotifier};
pub use pipeline::{make_task, submit_job, PipelineContext, TranscriptionJob};
pub use split::{chunk_count, chunk_plan, split_audio, Chunk};
