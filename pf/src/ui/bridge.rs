//! JSON-lines bridge
//!
//! Reads one [`UiRequest`] per line and writes every resulting [`UiEvent`]
//! as a line of JSON. Lines that don't parse are logged and skipped.

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{Session, UiEvent, UiRequest};
use crate::surface::HostSurface;

const EVENT_BUFFER: usize = 16;

/// Serve requests from `reader` until EOF
pub async fn serve<R, W, S>(session: &mut Session, surface: &mut S, reader: R, mut writer: W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: HostSurface,
{
    debug!("serve: called");
    let mut lines = reader.lines();
    let mut handled = 0usize;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let request: UiRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Skipping malformed request");
                continue;
            }
        };
        debug!(kind = request_kind(&request), "serve: request received");

        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let session = &mut *session;
        let surface = &mut *surface;
        let work = async move {
            session.handle(request, surface, &tx).await;
        };
        let write = async {
            while let Some(event) = rx.recv().await {
                write_event(&mut writer, &event).await?;
            }
            Ok::<(), io::Error>(())
        };
        let ((), written) = tokio::join!(work, write);
        written?;
        handled += 1;
    }

    info!(handled, "Bridge input closed");
    Ok(())
}

/// Request type for logging; request bodies may hold secrets
fn request_kind(request: &UiRequest) -> &'static str {
    match request {
        UiRequest::VerifyApiKey { .. } => "verify-api-key",
        UiRequest::StartGeneration { .. } => "start-generation",
    }
}

async fn write_event<W: AsyncWrite + Unpin>(writer: &mut W, event: &UiEvent) -> io::Result<()> {
    let mut line = serde_json::to_string(event).map_err(io::Error::other)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
