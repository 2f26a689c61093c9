//! IPC transport layer
//!
//! Moves [`Frame`]s between the two processes. Senders and receivers are
//! separate halves so one thread can wait for a frame while another sends.
//! Socket I/O runs on a one-worker tokio runtime and blocking callers wait on
//! individual reads and writes.

use crate::codec;
use crate::config::IpcConfig;
use crate::error::{IpcError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::runtime::Runtime;
use tracing::debug;

#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};

#[cfg(windows)]
use tokio::net::windows::named_pipe::{ClientOptions, ServerOptions};

/// Upper bound on the bytes a request, one-way or reply frame adds to its payload.
pub const FRAME_OVERHEAD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameKind {
    /// Expects exactly one `Reply` or `Fault` carrying the same id.
    Request { id: u64, selector: u32 },
    OneWay { selector: u32 },
    Reply { id: u64 },
    /// The receiver's dispatcher failed the request.
    Fault { id: u64, message: String },
    /// Orderly end of the session.
    Goodbye,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn request(id: u64, selector: u32, payload: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Request { id, selector },
            payload,
        }
    }

    pub fn one_way(selector: u32, payload: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::OneWay { selector },
            payload,
        }
    }

    pub fn reply(id: u64, payload: Vec<u8>) -> Self {
        Self {
            kind: FrameKind::Reply { id },
            payload,
        }
    }

    pub fn fault(id: u64, message: impl Into<String>) -> Self {
        Self {
            kind: FrameKind::Fault {
                id,
                message: message.into(),
            },
            payload: Vec::new(),
        }
    }

    pub fn goodbye() -> Self {
        Self {
            kind: FrameKind::Goodbye,
            payload: Vec::new(),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        codec::encode(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        codec::decode(bytes)
    }
}

pub trait FrameSender: Send {
    /// Fails with `FrameTooLarge` before writing anything if the encoded
    /// frame exceeds [`FrameSender::max_frame_size`].
    fn send(&mut self, frame: &Frame) -> Result<()>;

    fn max_frame_size(&self) -> usize;
}

pub trait FrameReceiver: Send {
    /// Block until the next frame arrives.
    fn recv(&mut self) -> Result<Frame>;
}

impl<S: FrameSender + ?Sized> FrameSender for Box<S> {
    fn send(&mut self, frame: &Frame) -> Result<()> {
        (**self).send(frame)
    }

    fn max_frame_size(&self) -> usize {
        (**self).max_frame_size()
    }
}

fn check_frame_size(data: &[u8], limit: usize) -> Result<()> {
    if data.len() > limit {
        return Err(IpcError::FrameTooLarge {
            size: data.len(),
            limit,
        });
    }
    Ok(())
}

impl<R: FrameReceiver + ?Sized> FrameReceiver for Box<R> {
    fn recv(&mut self) -> Result<Frame> {
        (**self).recv()
    }
}

// ============================================================================
// In-process channel
// ============================================================================

pub struct MemorySender {
    tx: crossbeam_channel::Sender<Vec<u8>>,
    max_frame_size: usize,
}

pub struct MemoryReceiver {
    rx: crossbeam_channel::Receiver<Vec<u8>>,
}

impl FrameSender for MemorySender {
    fn send(&mut self, frame: &Frame) -> Result<()> {
        let bytes = frame.encode()?;
        check_frame_size(&bytes, self.max_frame_size)?;
        self.tx.send(bytes).map_err(|_| IpcError::Disconnected)
    }

    fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl FrameReceiver for MemoryReceiver {
    fn recv(&mut self) -> Result<Frame> {
        let bytes = self.rx.recv().map_err(|_| IpcError::Disconnected)?;
        Frame::decode(&bytes)
    }
}

/// One end of an in-process channel pair.
pub struct MemoryChannel {
    pub sender: MemorySender,
    pub receiver: MemoryReceiver,
}

impl MemoryChannel {
    pub fn split(self) -> (MemorySender, MemoryReceiver) {
        (self.sender, self.receiver)
    }
}

/// Two connected in-process endpoints. Frames are encoded on the way through,
/// the same as on a socket, and held to the default frame size limit.
pub fn memory_pair() -> (MemoryChannel, MemoryChannel) {
    memory_pair_with_limit(IpcConfig::default().max_frame_size)
}

pub fn memory_pair_with_limit(max_frame_size: usize) -> (MemoryChannel, MemoryChannel) {
    let (a_tx, b_rx) = crossbeam_channel::unbounded();
    let (b_tx, a_rx) = crossbeam_channel::unbounded();
    (
        MemoryChannel {
            sender: MemorySender { tx: a_tx, max_frame_size },
            receiver: MemoryReceiver { rx: a_rx },
        },
        MemoryChannel {
            sender: MemorySender { tx: b_tx, max_frame_size },
            receiver: MemoryReceiver { rx: b_rx },
        },
    )
}

// ============================================================================
// Socket transport
// ============================================================================

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

fn io_runtime() -> Result<Arc<Runtime>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("ara-ipc-io")
        .enable_io()
        .enable_time()
        .build()?;
    Ok(Arc::new(runtime))
}

fn eof_as_disconnect(err: std::io::Error) -> IpcError {
    match err.kind() {
        std::io::ErrorKind::UnexpectedEof
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::ConnectionReset => IpcError::Disconnected,
        _ => IpcError::Io(err),
    }
}

async fn write_frame(writer: &mut BoxedWriter, data: &[u8]) -> std::io::Result<()> {
    writer.write_u32(data.len() as u32).await?;
    writer.write_all(data).await?;
    writer.flush().await
}

async fn read_frame(reader: &mut BoxedReader, max_frame_size: usize) -> Result<Frame> {
    let len = reader.read_u32().await.map_err(eof_as_disconnect)? as usize;
    if len > max_frame_size {
        return Err(IpcError::FrameTooLarge {
            size: len,
            limit: max_frame_size,
        });
    }
    let mut data = vec![0u8; len];
    reader.read_exact(&mut data).await.map_err(eof_as_disconnect)?;
    Frame::decode(&data)
}

/// Connected Unix socket (or named pipe on Windows).
pub struct SocketTransport {
    runtime: Arc<Runtime>,
    reader: BoxedReader,
    writer: BoxedWriter,
    max_frame_size: usize,
}

impl SocketTransport {
    fn from_stream<S>(runtime: Arc<Runtime>, stream: S, max_frame_size: usize) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            runtime,
            reader: Box::new(reader),
            writer: Box::new(writer),
            max_frame_size,
        }
    }

    /// Connect to `config.socket_path`, retrying until the connect timeout.
    pub fn connect(config: &IpcConfig) -> Result<Self> {
        let runtime = io_runtime()?;
        let deadline = Instant::now() + config.connect_timeout();
        let path = config.socket_path.as_path();

        loop {
            match runtime.block_on(connect_stream(path)) {
                Ok(transport) => {
                    debug!(path = %path.display(), "connected");
                    return Ok(match transport {
                        #[cfg(unix)]
                        Connected::Unix(stream) => Self::from_stream(runtime.clone(), stream, config.max_frame_size),
                        #[cfg(windows)]
                        Connected::Pipe(pipe) => Self::from_stream(runtime.clone(), pipe, config.max_frame_size),
                    });
                }
                Err(e) if Instant::now() < deadline => {
                    debug!(path = %path.display(), error = %e, "connect failed, retrying");
                    std::thread::sleep(config.connect_retry_interval());
                }
                Err(e) => {
                    return Err(IpcError::ConnectionFailed(format!(
                        "{}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }
    }

    pub fn split(self) -> (SocketSender, SocketReceiver) {
        (
            SocketSender {
                runtime: self.runtime.clone(),
                writer: self.writer,
                max_frame_size: self.max_frame_size,
            },
            SocketReceiver {
                runtime: self.runtime,
                reader: self.reader,
                max_frame_size: self.max_frame_size,
            },
        )
    }
}

enum Connected {
    #[cfg(unix)]
    Unix(UnixStream),
    #[cfg(windows)]
    Pipe(tokio::net::windows::named_pipe::NamedPipeClient),
}

#[cfg(unix)]
async fn connect_stream(path: &Path) -> std::io::Result<Connected> {
    UnixStream::connect(path).await.map(Connected::Unix)
}

#[cfg(windows)]
async fn connect_stream(path: &Path) -> std::io::Result<Connected> {
    ClientOptions::new().open(path).map(Connected::Pipe)
}

pub struct SocketSender {
    runtime: Arc<Runtime>,
    writer: BoxedWriter,
    max_frame_size: usize,
}

impl FrameSender for SocketSender {
    fn send(&mut self, frame: &Frame) -> Result<()> {
        let data = frame.encode()?;
        check_frame_size(&data, self.max_frame_size)?;
        let writer = &mut self.writer;
        self.runtime
            .block_on(write_frame(writer, &data))
            .map_err(eof_as_disconnect)
    }

    fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

pub struct SocketReceiver {
    runtime: Arc<Runtime>,
    reader: BoxedReader,
    max_frame_size: usize,
}

impl FrameReceiver for SocketReceiver {
    fn recv(&mut self) -> Result<Frame> {
        let reader = &mut self.reader;
        self.runtime.block_on(read_frame(reader, self.max_frame_size))
    }
}

/// Server-side transport listener
pub struct TransportListener {
    runtime: Arc<Runtime>,
    max_frame_size: usize,
    #[cfg(unix)]
    listener: UnixListener,
    #[cfg(windows)]
    pipe_name: PathBuf,
    path: PathBuf,
}

impl TransportListener {
    /// Bind to socket path (Unix) or prepare named pipe (Windows)
    pub fn bind(config: &IpcConfig) -> Result<Self> {
        let runtime = io_runtime()?;
        let path = config.socket_path.clone();

        #[cfg(unix)]
        {
            // Remove a stale socket left by an earlier session
            let _ = std::fs::remove_file(&path);
            let listener = {
                let _guard = runtime.enter();
                UnixListener::bind(&path)?
            };
            debug!(path = %path.display(), "listening");
            Ok(Self {
                runtime,
                max_frame_size: config.max_frame_size,
                listener,
                path,
            })
        }

        #[cfg(windows)]
        {
            Ok(Self {
                runtime,
                max_frame_size: config.max_frame_size,
                pipe_name: path.clone(),
                path,
            })
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Wait for one peer to connect.
    #[cfg(unix)]
    pub fn accept(&self) -> Result<SocketTransport> {
        let (stream, _) = self.runtime.block_on(self.listener.accept())?;
        debug!(path = %self.path.display(), "accepted connection");
        Ok(SocketTransport::from_stream(
            self.runtime.clone(),
            stream,
            self.max_frame_size,
        ))
    }

    /// Wait for one peer to connect (Windows) - creates the server pipe first
    #[cfg(windows)]
    pub fn accept(&self) -> Result<SocketTransport> {
        let server = self.runtime.block_on(async {
            let server = ServerOptions::new()
                .first_pipe_instance(true)
                .create(&self.pipe_name)?;
            server.connect().await?;
            Ok::<_, std::io::Error>(server)
        })?;
        Ok(SocketTransport::from_stream(
            self.runtime.clone(),
            server,
            self.max_frame_size,
        ))
    }
}

#[cfg(unix)]
impl Drop for TransportListener {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
