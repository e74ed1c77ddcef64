//! Standard I/O transport: newline-delimited JSON over stdin/stdout, or over
//! a spawned child process's piped stdio.
//!
//! Grounded in `turbomcp-stdio::transport::StdioTransport`, trimmed of its
//! `TransportCapabilities`/`TransportConfig`/`AtomicMetrics`/event-emitter
//! machinery (this workspace's `Transport` trait carries none of that) down
//! to the hybrid-mutex I/O core: a `parking_lot::Mutex` for the connection
//! state (never held across an `.await`), and `tokio::sync::Mutex` guarding
//! the reader/writer/receive-channel handles that do cross `.await` points.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use mcp_transport::{Transport, TransportError, TransportMessage, TransportResult, TransportState, TransportType};
use parking_lot::Mutex as SyncMutex;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::process::Child;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec};

type BoxedRead = Pin<Box<dyn AsyncRead + Send + Sync + 'static>>;
type BoxedWrite = Pin<Box<dyn AsyncWrite + Send + Sync + 'static>>;
type StdinReader = FramedRead<BufReader<BoxedRead>, LinesCodec>;
type StdoutWriter = FramedWrite<BoxedWrite, LinesCodec>;

/// Where this transport's bytes actually come from: the current process's
/// own stdio, or a pair of raw streams (typically a child process's piped
/// stdin/stdout).
enum StreamSource {
    ProcessStdio,
    Raw { reader: Option<BoxedRead>, writer: Option<BoxedWrite> },
}

/// Newline-delimited JSON stdio transport. One instance wraps one pair of
/// streams; `connect` spawns the background reader task, `send` writes
/// directly to the writer half, `receive` drains the channel the reader
/// task feeds.
pub struct StdioTransport {
    state: SyncMutex<TransportState>,
    stream_source: AsyncMutex<StreamSource>,
    writer: AsyncMutex<Option<StdoutWriter>>,
    receiver: AsyncMutex<Option<mpsc::Receiver<TransportMessage>>>,
    reader_task: AsyncMutex<Option<tokio::task::JoinHandle<()>>>,
}

impl std::fmt::Debug for StdioTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StdioTransport")
            .field("state", &*self.state.lock())
            .finish()
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioTransport {
    /// Use the current process's stdin/stdout.
    pub fn new() -> Self {
        Self {
            state: SyncMutex::new(TransportState::Disconnected),
            stream_source: AsyncMutex::new(StreamSource::ProcessStdio),
            writer: AsyncMutex::new(None),
            receiver: AsyncMutex::new(None),
            reader_task: AsyncMutex::new(None),
        }
    }

    /// Communicate over a spawned child process's piped stdin/stdout.
    ///
    /// The child must have been spawned with both `stdin(Stdio::piped())`
    /// and `stdout(Stdio::piped())`.
    pub fn from_child(child: &mut Child) -> TransportResult<Self> {
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed("child stdin was not piped".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::ConnectionFailed("child stdout was not piped".to_string()))?;
        Self::from_raw(stdout, stdin)
    }

    /// Communicate over arbitrary raw async streams: `reader` is read from,
    /// `writer` is written to. For a child process, `reader` is its stdout
    /// and `writer` is its stdin.
    pub fn from_raw<R, W>(reader: R, writer: W) -> TransportResult<Self>
    where
        R: AsyncRead + Send + Sync + 'static,
        W: AsyncWrite + Send + Sync + 'static,
    {
        Ok(Self {
            state: SyncMutex::new(TransportState::Disconnected),
            stream_source: AsyncMutex::new(StreamSource::Raw {
                reader: Some(Box::pin(reader)),
                writer: Some(Box::pin(writer)),
            }),
            writer: AsyncMutex::new(None),
            receiver: AsyncMutex::new(None),
            reader_task: AsyncMutex::new(None),
        })
    }

    fn set_state(&self, new_state: TransportState) {
        *self.state.lock() = new_state;
    }

    async fn setup_streams(&self) -> TransportResult<()> {
        let mut source = self.stream_source.lock().await;

        let stdin_reader: StdinReader = match &mut *source {
            StreamSource::ProcessStdio => {
                let stdin: BoxedRead = Box::pin(tokio::io::stdin());
                let stdout: BoxedWrite = Box::pin(tokio::io::stdout());
                *self.writer.lock().await = Some(FramedWrite::new(stdout, LinesCodec::new()));
                FramedRead::new(BufReader::new(stdin), LinesCodec::new())
            }
            StreamSource::Raw { reader, writer } => {
                let reader = reader
                    .take()
                    .ok_or_else(|| TransportError::ConnectionFailed("raw reader already consumed".to_string()))?;
                let writer = writer
                    .take()
                    .ok_or_else(|| TransportError::ConnectionFailed("raw writer already consumed".to_string()))?;
                *self.writer.lock().await = Some(FramedWrite::new(writer, LinesCodec::new()));
                FramedRead::new(BufReader::new(reader), LinesCodec::new())
            }
        };
        drop(source);

        let (tx, rx) = mpsc::channel(1024);
        *self.receiver.lock().await = Some(rx);

        let mut stdin_reader = stdin_reader;
        let task = tokio::spawn(async move {
            while let Some(line) = stdin_reader.next().await {
                match line {
                    Ok(line) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        if serde_json::from_str::<serde_json::Value>(line).is_err() {
                            tracing::warn!("dropping non-JSON line on stdio transport");
                            continue;
                        }
                        let message = TransportMessage::new(line.as_bytes().to_vec());
                        if tx.send(message).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "stdin read failed");
                        break;
                    }
                }
            }
            tracing::debug!("stdio reader task finished");
        });

        *self.reader_task.lock().await = Some(task);
        Ok(())
    }
}

#[async_trait]
impl Transport for StdioTransport {
    fn transport_type(&self) -> TransportType {
        TransportType::Stdio
    }

    async fn state(&self) -> TransportState {
        self.state.lock().clone()
    }

    async fn connect(&self) -> TransportResult<()> {
        if matches!(*self.state.lock(), TransportState::Connected) {
            return Ok(());
        }
        self.set_state(TransportState::Connecting);
        self.setup_streams().await?;
        self.set_state(TransportState::Connected);
        Ok(())
    }

    async fn disconnect(&self) -> TransportResult<()> {
        if let Some(task) = self.reader_task.lock().await.take() {
            task.abort();
        }
        self.writer.lock().await.take();
        self.receiver.lock().await.take();
        self.set_state(TransportState::Disconnected);
        Ok(())
    }

    async fn send(&self, message: TransportMessage) -> TransportResult<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::Closed)?;

        let line = std::str::from_utf8(&message.payload).map_err(|e| TransportError::SendFailed(e.to_string()))?;
        if line.contains('\n') || line.contains('\r') {
            return Err(TransportError::SendFailed("message must not contain embedded newlines".to_string()));
        }

        futures::SinkExt::send(&mut *writer, line.to_string())
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))?;
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Option<TransportMessage>> {
        let mut guard = self.receiver.lock().await;
        let receiver = guard.as_mut().ok_or(TransportError::Closed)?;
        Ok(receiver.recv().await)
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        if let Ok(mut task) = self.reader_task.try_lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn from_raw_round_trips_a_line() {
        let (client_writer, server_reader) = tokio::io::duplex(4096);
        let (server_writer, client_reader) = tokio::io::duplex(4096);

        let server = Arc::new(StdioTransport::from_raw(server_reader, server_writer).unwrap());
        server.connect().await.unwrap();

        let mut client_writer = client_writer;
        tokio::io::AsyncWriteExt::write_all(&mut client_writer, b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}\n")
            .await
            .unwrap();

        let received = server.receive().await.unwrap().unwrap();
        assert_eq!(received.payload.as_ref(), b"{\"jsonrpc\":\"2.0\",\"method\":\"ping\"}");

        drop(client_reader);
    }

    #[tokio::test]
    async fn send_rejects_embedded_newlines() {
        let (_client_writer, server_reader) = tokio::io::duplex(4096);
        let (server_writer, _client_reader) = tokio::io::duplex(4096);
        let server = StdioTransport::from_raw(server_reader, server_writer).unwrap();
        server.connect().await.unwrap();

        let result = server.send(TransportMessage::new(b"line one\nline two".to_vec())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn disconnect_then_receive_fails() {
        let (_client_writer, server_reader) = tokio::io::duplex(4096);
        let (server_writer, _client_reader) = tokio::io::duplex(4096);
        let server = StdioTransport::from_raw(server_reader, server_writer).unwrap();
        server.connect().await.unwrap();
        server.disconnect().await.unwrap();
        assert!(server.receive().await.is_err());
    }
}
