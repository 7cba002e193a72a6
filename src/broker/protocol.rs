// src/broker/protocol.rs
//
// Client wire format: every message is a frame of
//   [body length: u32 BE][bincode body]
use crate::storage::Record;
use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Send {
        topic: String,
        queue: u32,
        payload: Vec<u8>,
    },
    Pull {
        topic: String,
        queue: u32,
        offset: u64,
        max_messages: u32,
    },
    LastOffset {
        topic: String,
        queue: u32,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Sent { offset: u64 },
    Messages { records: Vec<Record> },
    LastOffset { offset: u64 },
    Error { message: String },
}

/// Reads one frame. Returns `Ok(None)` if the peer closed the connection
/// cleanly before sending a new frame.
pub async fn read_frame<R, T>(reader: &mut R) -> Result<Option<T>>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let mut len_bytes = [0u8; 4];
    match reader.read_exact(&mut len_bytes).await {
        Ok(_) => {}
        Err(ref e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(Error::Io(e)),
    }
    let len = u32::from_be_bytes(len_bytes) as usize;
    if len > MAX_FRAME_LEN {
        return Err(Error::FrameTooLarge { len });
    }

    let mut body = vec![0u8; len];
    reader.read_exact(&mut body).await?;
    Ok(Some(bincode::deserialize(&body)?))
}

pub async fn write_frame<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let body = bincode::serialize(message)?;
    if body.len() > MAX_FRAME_LEN {
        return Err(Error::FrameTooLarge { len: body.len() });
    }
    writer.write_all(&(body.len() as u32).to_be_bytes()).await?;
    writer.write_all(&body).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_frames_over_a_pipe() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        let request = Request::Pull {
            topic: "orders".to_string(),
            queue: 1,
            offset: 42,
            max_messages: 10,
        };
        write_frame(&mut client, &request).await.unwrap();
        write_frame(&mut client, &Request::LastOffset {
            topic: "orders".to_string(),
            queue: 1,
        })
        .await
        .unwrap();
        drop(client);

        let first: Option<Request> = read_frame(&mut server).await.unwrap();
        assert_eq!(first, Some(request));
        let second: Option<Request> = read_frame(&mut server).await.unwrap();
        assert_matches!(second, Some(Request::LastOffset { queue: 1, .. }));
        let eof: Option<Request> = read_frame(&mut server).await.unwrap();
        assert_eq!(eof, None);
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client
            .write_all(&((MAX_FRAME_LEN as u32) + 1).to_be_bytes())
            .await
            .unwrap();
        let result: Result<Option<Response>> = read_frame(&mut server).await;
        assert_matches!(result, Err(Error::FrameTooLarge { .. }));
    }

    #[tokio::test]
    async fn test_truncated_body_is_an_error() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(&10u32.to_be_bytes()).await.unwrap();
        client.write_all(&[1, 2, 3]).await.unwrap();
        drop(client);
        let result: Result<Option<Response>> = read_frame(&mut server).await;
        assert_matches!(result, Err(Error::Io(_)));
    }
}
