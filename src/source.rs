//! Stroke sources
//!
//! A source yields decoded [`StrokeBatch`]es one at a time. The websocket
//! source never ends on its own; it reconnects after every drop. The file
//! source replays a JSON-lines capture and ends at end of file.

use crate::stroke::StrokeBatch;
use anyhow::Context;
use async_trait::async_trait;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Anything that produces stroke batches
#[async_trait]
pub trait StrokeSource: Send {
    /// Wait for the next batch
    ///
    /// `Ok(None)` means the source is exhausted. An `Err` covers a single
    /// message that could not be decoded; the source stays usable.
    async fn next_batch(&mut self) -> anyhow::Result<Option<StrokeBatch>>;

    /// Human readable origin, for logs
    fn describe(&self) -> String;
}

/// Client of the drawing surface's websocket relay
pub struct WebSocketSource {
    url: String,
    receive_timeout: Duration,
    reconnect_delay: Duration,
    stream: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WebSocketSource {
    pub fn new(url: impl Into<String>, receive_timeout: Duration, reconnect_delay: Duration) -> Self {
        Self {
            url: url.into(),
            receive_timeout,
            reconnect_delay,
            stream: None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Connect, retrying until the relay accepts
    async fn connect(&self) -> WebSocketStream<MaybeTlsStream<TcpStream>> {
        loop {
            match connect_async(self.url.as_str()).await {
                Ok((stream, _)) => {
                    tracing::info!("Connected to stroke relay {}", self.url);
                    return stream;
                }
                Err(e) => {
                    tracing::warn!(
                        "Connection to {} failed: {}; retrying in {:?}",
                        self.url,
                        e,
                        self.reconnect_delay
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }
}

#[async_trait]
impl StrokeSource for WebSocketSource {
    async fn next_batch(&mut self) -> anyhow::Result<Option<StrokeBatch>> {
        loop {
            let mut stream = match self.stream.take() {
                Some(stream) => stream,
                None => self.connect().await,
            };

            let message = match tokio::time::timeout(self.receive_timeout, stream.next()).await {
                // idle relay
                Err(_) => {
                    self.stream = Some(stream);
                    continue;
                }
                Ok(message) => message,
            };

            match message {
                Some(Ok(Message::Text(text))) => {
                    self.stream = Some(stream);
                    tracing::info!("Received stroke message");
                    return StrokeBatch::from_wire(text.as_str())
                        .map(Some)
                        .context("Undecodable stroke message");
                }
                Some(Ok(Message::Binary(data))) => {
                    self.stream = Some(stream);
                    let text = std::str::from_utf8(&data).context("Binary message is not UTF-8")?;
                    return StrokeBatch::from_wire(text)
                        .map(Some)
                        .context("Undecodable stroke message");
                }
                Some(Ok(Message::Close(_))) | None => {
                    tracing::warn!("WebSocket connection closed");
                    tokio::time::sleep(self.reconnect_delay).await;
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket connection lost: {}", e);
                    tokio::time::sleep(self.reconnect_delay).await;
                }
                Some(Ok(_)) => self.stream = Some(stream),
            }
        }
    }

    fn describe(&self) -> String {
        format!("websocket {}", self.url)
    }
}

/// Replay of a JSON-lines capture, one batch per line
pub struct FileSource {
    path: PathBuf,
    lines: Lines<BufReader<tokio::fs::File>>,
    line_number: usize,
}

impl FileSource {
    pub async fn open(path: &Path) -> anyhow::Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open replay file {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            lines: BufReader::new(file).lines(),
            line_number: 0,
        })
    }
}

#[async_trait]
impl StrokeSource for FileSource {
    async fn next_batch(&mut self) -> anyhow::Result<Option<StrokeBatch>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_number += 1;
            if line.trim().is_empty() {
                continue;
            }
            return StrokeBatch::from_wire(&line).map(Some).with_context(|| {
                format!("{}:{}", self.path.display(), self.line_number)
            });
        }
        Ok(None)
    }

    fn describe(&self) -> String {
        format!("replay {}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio_tungstenite::accept_async;

    #[tokio::test]
    async fn test_file_source_replays_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("strokes.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"color": "1 0xff000000", "size": "3 10", "data": ["0 0 0 100"]}"#,
                "\n\n",
                r#"{"color": "2 0xff000000", "size": "1 2", "data": ["5 5 0 100"]}"#,
                "\n",
                "garbage\n",
            ),
        )
        .unwrap();

        let mut source = FileSource::open(&path).await.unwrap();
        let first = source.next_batch().await.unwrap().unwrap();
        let second = source.next_batch().await.unwrap().unwrap();
        assert_eq!(first.color, "1 0xff000000");
        assert_eq!(second.data, vec!["5 5 0 100"]);

        let err = source.next_batch().await.unwrap_err();
        assert!(err.to_string().contains(":4"));
        assert!(source.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_replay_file() {
        assert!(FileSource::open(Path::new("/nonexistent/strokes.jsonl"))
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_websocket_source_receives_and_reconnects() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            // first client gets one batch, then the relay hangs up
            for color in ["1 0xff000000", "2 0xff000000"] {
                let (tcp, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(tcp).await.unwrap();
                let batch = serde_json::json!({"color": color, "size": "2 6", "data": ["1 1 0 50"]});
                let envelope = serde_json::json!({"data": batch.to_string()});
                ws.send(Message::Text(envelope.to_string().into())).await.unwrap();
                ws.close(None).await.ok();
            }
        });

        let mut source = WebSocketSource::new(
            format!("ws://{}", addr),
            Duration::from_millis(200),
            Duration::from_millis(10),
        );
        let first = source.next_batch().await.unwrap().unwrap();
        assert_eq!(first.color, "1 0xff000000");
        let second = source.next_batch().await.unwrap().unwrap();
        assert_eq!(second.color, "2 0xff000000");
        assert!(source.describe().starts_with("websocket ws://127.0.0.1"));
    }
}
