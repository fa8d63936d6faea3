//! Source audio download

use std::path::{Path, PathBuf};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};

/// File name the downloaded audio is stored under: the last non-empty
/// path segment of an http(s) URL.
pub fn file_name_from_url(audio_url: &str) -> Result<String> {
    let parsed = Url::parse(audio_url).map_err(|e| Error::invalid_url(audio_url, e.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::invalid_url(
            audio_url,
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .filter(|name| *name != "." && *name != "..")
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_url(audio_url, "URL path has no file name"))
}

/// Stream the body at `audio_url` into `dest_dir`, returning the written path
pub async fn download_file(
    client: &reqwest::Client,
    audio_url: &str,
    dest_dir: &Path,
) -> Result<PathBuf> {
    let dest = dest_dir.join(file_name_from_url(audio_url)?);
    info!(url = %audio_url, dest = %dest.display(), "Downloading audio");

    let response = client
        .get(audio_url)
        .send()
        .await
        .map_err(|e| Error::download_failed(audio_url, e.to_string()))?;

    if !response.status().is_success() {
        return Err(Error::DownloadStatus {
            url: audio_url.to_string(),
            status: response.status().as_u16(),
        });
    }

    let write_err = |e: std::io::Error| Error::IoWrite {
        path: dest.clone(),
        source: e,
    };

    let mut file = tokio::fs::File::create(&dest).await.map_err(write_err)?;
    let mut body = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| Error::download_failed(audio_url, e.to_string()))?;
        file.write_all(&chunk).await.map_err(write_err)?;
        written += chunk.len() as u64;
    }
    file.flush().await.map_err(write_err)?;

    debug!(dest = %dest.display(), bytes = written, "Download complete");
    Ok(dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use axum::{http::StatusCode, routing::get, Router};
    use tempfile::TempDir;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(
            file_name_from_url("https://example.org/podcasts/ep1.mp3").unwrap(),
            "ep1.mp3"
        );
        assert_eq!(
            file_name_from_url("http://example.org/audio/talk.ogg?dl=1").unwrap(),
            "talk.ogg"
        );
        assert_eq!(
            file_name_from_url("http://example.org/audio/talk.ogg/").unwrap(),
            "talk.ogg"
        );
    }

    #[test]
    fn test_file_name_rejects_bad_urls() {
        for bad in ["not a url", "ftp://example.org/a.mp3", "https://example.org/", "https://example.org"] {
            let err = file_name_from_url(bad).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidUrl, "{bad}");
        }
    }

    #[tokio::test]
    async fn test_download_writes_body() {
        let base = serve(Router::new().route("/clips/hello.wav", get(|| async { "RIFF-fake-audio" }))).await;
        let dir = TempDir::new().unwrap();

        let path = download_file(&reqwest::Client::new(), &format!("{}/clips/hello.wav", base), dir.path())
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("hello.wav"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "RIFF-fake-audio");
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let base = serve(Router::new().route("/missing.mp3", get(|| async { StatusCode::NOT_FOUND }))).await;
        let dir = TempDir::new().unwrap();

        let err = download_file(&reqwest::Client::new(), &format!("{}/missing.mp3", base), dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DownloadStatus { status: 404, .. }));
        assert!(!dir.path().join("missing.mp3").exists());
    }
}
