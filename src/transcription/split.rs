//! Chunk planning for long recordings
//!
//! Converted WAV is 16 kHz mono 16-bit, i.e. 32 000 bytes per second, so a
//! 95 MB slice holds a little over 2968 seconds. Consecutive chunks overlap
//! so words cut at a boundary appear whole in one of them.

use std::path::{Path, PathBuf};

use tracing::info;

use super::convert::AudioConverter;
use crate::error::{Error, Result};

/// WAV bytes covered by one chunk
pub const SPLIT_SIZE_BYTES: u64 = 95_000_000;

/// Length of every chunk in seconds
pub const CHUNK_LENGTH_SECS: u64 = 2968;

/// Seconds each chunk re-covers from the end of the previous one
pub const CHUNK_OVERLAP_SECS: u64 = 5;

/// One slice of a recording
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub index: usize,
    pub start_secs: u64,
    pub len_secs: u64,
}

impl Chunk {
    pub fn end_secs(&self) -> u64 {
        self.start_secs + self.len_secs
    }
}

/// Number of chunks a WAV file of `file_size` bytes is split into
pub fn chunk_count(file_size: u64) -> usize {
    (file_size / SPLIT_SIZE_BYTES) as usize + 1
}

/// Chunk boundaries for a WAV file of `file_size` bytes.
///
/// The first chunk starts at zero; every later chunk starts
/// `CHUNK_OVERLAP_SECS` before the previous one ends. The last chunk may
/// run past the end of the audio.
pub fn chunk_plan(file_size: u64) -> Vec<Chunk> {
    let stride = CHUNK_LENGTH_SECS - CHUNK_OVERLAP_SECS;
    (0..chunk_count(file_size))
        .map(|index| Chunk {
            index,
            start_secs: index as u64 * stride,
            len_secs: CHUNK_LENGTH_SECS,
        })
        .collect()
}

/// Path a chunk of `wav` is extracted to, next to the source file
pub fn segment_path(wav: &Path, index: usize) -> PathBuf {
    let stem = wav
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    wav.with_file_name(format!("{}.part{}.wav", stem, index))
}

/// Split a WAV file into overlapping FLAC chunks, in order
pub async fn split_audio(converter: &dyn AudioConverter, wav: &Path) -> Result<Vec<PathBuf>> {
    let size = tokio::fs::metadata(wav)
        .await
        .map_err(|e| Error::IoRead {
            path: wav.to_path_buf(),
            source: e,
        })?
        .len();

    let plan = chunk_plan(size);
    info!(wav = %wav.display(), bytes = size, chunks = plan.len(), "Splitting audio");

    let mut outputs = Vec::with_capacity(plan.len());
    for chunk in plan {
        let segment = segment_path(wav, chunk.index);
        converter
            .extract_segment(wav, chunk.start_secs, chunk.len_secs, &segment)
            .await?;
        outputs.push(converter.to_flac(&segment).await?);
    }

    Ok(outputs)
}
