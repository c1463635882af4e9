//! JSONL framing for the control socket.
//!
//! One JSON document per line in both directions. EOF is a clean close,
//! not an error.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::errors::DaemonError;

/// Read the next JSONL message, or `None` on EOF.
pub async fn read_message<R, T>(reader: &mut R) -> Result<Option<T>, DaemonError>
where
    R: AsyncBufRead + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        if line.trim().is_empty() {
            continue;
        }
        let msg = serde_json::from_str(line.trim()).map_err(|e| DaemonError::Protocol {
            message: format!("invalid message: {}", e),
        })?;
        return Ok(Some(msg));
    }
}

/// Serialize a message and write it as one line.
pub async fn write_message<W, T>(writer: &mut W, msg: &T) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let mut json = serde_json::to_string(msg).map_err(|e| DaemonError::Protocol {
        message: format!("failed to serialize message: {}", e),
    })?;
    json.push('\n');
    writer.write_all(json.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{ClientMessage, DaemonMessage};
    use tokio::io::BufReader;

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let mut buf = Vec::new();
        let msg = ClientMessage::Ping {
            id: "req-1".to_string(),
        };
        write_message(&mut buf, &msg).await.unwrap();
        assert!(buf.ends_with(b"\n"));

        let mut reader = BufReader::new(buf.as_slice());
        let parsed: ClientMessage = read_message(&mut reader).await.unwrap().unwrap();
        assert_eq!(parsed.id(), "req-1");
    }

    #[tokio::test]
    async fn test_read_skips_blank_lines() {
        let data = b"\n\n{\"type\":\"ack\",\"id\":\"req-2\"}\n";
        let mut reader = BufReader::new(data.as_slice());
        let parsed: DaemonMessage = read_message(&mut reader).await.unwrap().unwrap();
        if let DaemonMessage::Ack { id } = parsed {
            assert_eq!(id, "req-2");
        } else {
            panic!("wrong variant");
        }
    }

    #[tokio::test]
    async fn test_read_eof_returns_none() {
        let mut reader = BufReader::new(&b""[..]);
        let parsed: Option<DaemonMessage> = read_message(&mut reader).await.unwrap();
        assert!(parsed.is_none());
    }

    #[tokio::test]
    async fn test_read_invalid_json_is_protocol_error() {
        let data = b"{nope\n";
        let mut reader = BufReader::new(data.as_slice());
        let result: Result<Option<ClientMessage>, _> = read_message(&mut reader).await;
        assert!(matches!(result, Err(DaemonError::Protocol { .. })));
    }
}
