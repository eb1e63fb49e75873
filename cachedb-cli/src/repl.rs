use anyhow::Result;
use cachedb_core::{Dispatcher, SnapshotSink};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Line that ends the session
pub const EXIT_COMMAND: &str = "EXIT";

/// Printed in response to [`EXIT_COMMAND`]
pub const FAREWELL: &str = "Adios!";

/// Feeds `reader` line by line to the dispatcher and writes one response line per input line.
///
/// Stops after answering `EXIT`, or silently at end of input. Lines that are not valid
/// UTF-8 are decoded lossily and answered like any other line.
pub async fn run<S, R, W>(dispatcher: &Dispatcher<S>, mut reader: R, mut writer: W) -> Result<()>
where
    S: SnapshotSink,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim_end_matches(['\n', '\r']);

        if line.trim() == EXIT_COMMAND {
            writer.write_all(FAREWELL.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            break;
        }

        let response = dispatcher.process(line);
        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    writer.flush().await?;
    Ok(())
}
