//! One management session.
//!
//! A session opens with a `<hello>` exchange: the server speaks first, then
//! waits (bounded by the hello timeout) for the client's hello. Only after
//! both sides have advertised the base capability are RPCs accepted. Framing
//! and handshake failures end the session; malformed or unsupported requests
//! are answered with an rpc-error and the session carries on.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::timeout;

use super::dispatcher::Dispatcher;
use super::framing::{FrameReader, FrameWriter, FramingError, DEFAULT_MAX_FRAME_BYTES};
use super::rpc::{self, Message, Operation, RpcError, RpcReply, BASE_CAPABILITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingHandshake,
    Active,
    Closed,
}

/// Per-session limits
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub hello_timeout: Duration,
    pub max_frame_bytes: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            hello_timeout: Duration::from_secs(60),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

/// Reasons a session ends abnormally
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("no hello received within {0:?}")]
    HelloTimeout(Duration),
}

pub struct Session<R, W> {
    id: u32,
    state: SessionState,
    reader: FrameReader<R>,
    writer: FrameWriter<W>,
    dispatcher: Arc<Dispatcher>,
    settings: SessionSettings,
}

impl<R, W> Session<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(id: u32, reader: R, writer: W, dispatcher: Arc<Dispatcher>, settings: SessionSettings) -> Self {
        Self {
            id,
            state: SessionState::AwaitingHandshake,
            reader: FrameReader::with_limit(reader, settings.max_frame_bytes),
            writer: FrameWriter::new(writer),
            dispatcher,
            settings,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion, consuming it
    pub async fn run(mut self) -> Result<(), SessionError> {
        self.process().await
    }

    /// Drive the session to completion. The state is `Closed` and the writer
    /// is shut down on every exit path.
    pub async fn process(&mut self) -> Result<(), SessionError> {
        let result = self.serve().await;
        self.state = SessionState::Closed;

        if let Err(e) = self.writer.shutdown().await {
            debug!("Session {}: shutdown after close failed: {}", self.id, e);
        }
        result
    }

    async fn serve(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::AwaitingHandshake {
            self.handshake().await?;
        }
        info!("Session {} established", self.id);

        loop {
            let Some(frame) = self.reader.read_frame().await? else {
                info!("Session {} closed by peer", self.id);
                return Ok(());
            };

            if self.handle_frame(&frame).await? {
                info!("Session {} closed on request", self.id);
                return Ok(());
            }
        }
    }

    /// Send the server hello and wait for the client's. Moves the session to
    /// `Active` on success.
    pub async fn handshake(&mut self) -> Result<(), SessionError> {
        self.writer.write_frame(&rpc::server_hello(self.id)).await?;

        let frame = timeout(self.settings.hello_timeout, self.reader.read_frame())
            .await
            .map_err(|_| SessionError::HelloTimeout(self.settings.hello_timeout))??
            .ok_or_else(|| SessionError::Handshake("peer closed before sending hello".to_string()))?;

        match rpc::parse_message(&frame) {
            Ok(Message::Hello(hello)) => {
                if hello.session_id.is_some() {
                    return Err(SessionError::Handshake(
                        "client hello must not carry a session-id".to_string(),
                    ));
                }
                if !hello.supports(BASE_CAPABILITY) {
                    return Err(SessionError::Handshake(format!(
                        "peer does not advertise {}",
                        BASE_CAPABILITY
                    )));
                }
                debug!("Session {}: peer capabilities {:?}", self.id, hello.capabilities);
                self.state = SessionState::Active;
                Ok(())
            }
            Ok(Message::Rpc(request)) => Err(SessionError::Handshake(format!(
                "expected hello, received rpc '{}'",
                request.operation.name()
            ))),
            Err(rejected) => Err(SessionError::Handshake(format!(
                "expected hello: {}",
                rejected.error.message
            ))),
        }
    }

    /// Answer one frame; returns true when the session should close
    async fn handle_frame(&mut self, frame: &str) -> Result<bool, SessionError> {
        let (reply, close) = match rpc::parse_message(frame) {
            Ok(Message::Rpc(request)) => {
                let close = request.operation == Operation::CloseSession;
                (self.dispatcher.dispatch(&request), close)
            }
            Ok(Message::Hello(_)) => (
                RpcReply::error(
                    None,
                    RpcError::operation_not_supported("hello is only valid during session setup"),
                ),
                false,
            ),
            Err(rejected) => {
                warn!("Session {}: rejected frame: {}", self.id, rejected.error);
                (RpcReply::error(rejected.message_id, rejected.error), false)
            }
        };

        if let rpc::ReplyBody::Error(error) = &reply.body {
            debug!("Session {}: replying with error {}", self.id, error);
        }

        self.writer.write_frame(&reply.render()).await?;
        Ok(close)
    }
}
