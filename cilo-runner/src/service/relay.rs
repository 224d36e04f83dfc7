//! Container output relay
//!
//! Copies a container stream to a host stream line by line, flushing after
//! every line so job output shows up as it is produced.

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

/// Relays `reader` to `writer` until end of input
///
/// Line endings are normalized to `\n`, and a final line without a
/// terminator still gets one. Bytes are passed through as-is.
/// Returns the number of lines relayed.
pub async fn relay_lines<R, W>(reader: R, writer: &mut W) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    let mut count = 0;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            break;
        }

        if line.last() == Some(&b'\n') {
            line.pop();
        }
        if line.last() == Some(&b'\r') {
            line.pop();
        }

        writer.write_all(&line).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        count += 1;
    }

    Ok(count)
}
