//! Streams the dump to a scratch file.

use futures::StreamExt;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use crate::error::IngestError;

/// Download `url` into a new temporary file, returning the file and the
/// number of bytes written. The file is removed when dropped.
pub async fn download_dump(
    client: &reqwest::Client,
    url: &str,
) -> Result<(NamedTempFile, u64), IngestError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| IngestError::Http(format!("dump request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(IngestError::Status(status.as_u16()));
    }

    let scratch = NamedTempFile::new()?;
    let mut file = tokio::fs::File::from_std(scratch.reopen()?);
    let mut bytes = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| IngestError::Http(format!("dump read failed: {e}")))?;
        file.write_all(&chunk).await?;
        written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
    }
    file.flush().await?;

    tracing::debug!(path = %scratch.path().display(), bytes = written, "Dump written");
    Ok((scratch, written))
}
