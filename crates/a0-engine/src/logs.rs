use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

/// Copy followed container output to `out`, one `[prefix]: line` per line.
///
/// Returns the number of lines written once the channel closes.
pub async fn pump_logs<W: AsyncWrite + Unpin>(
    mut rx: mpsc::Receiver<String>,
    prefix: &str,
    mut out: W,
) -> std::io::Result<usize> {
    let mut written = 0;
    while let Some(line) = rx.recv().await {
        out.write_all(format!("[{prefix}]: {line}\n").as_bytes())
            .await?;
        out.flush().await?;
        written += 1;
    }
    Ok(written)
}
