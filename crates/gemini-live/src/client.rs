use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use crate::config::Config;
use crate::tools::{ToolDeclarations, ToolDefinition};
use crate::types;

pub type ClientTx = tokio::sync::mpsc::Sender<types::ClientMessage>;
type ServerTx = tokio::sync::broadcast::Sender<DialogueEvent>;
pub type ServerRx = tokio::sync::broadcast::Receiver<DialogueEvent>;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("already connected")]
    AlreadyConnected,
    #[error("not connected yet")]
    NotConnected,
    #[error("tools must be registered before connecting")]
    RegisterAfterConnect,
    #[error("no tool registered under {0:?}")]
    UnknownTool(String),
    #[error("missing required argument {arg:?} for tool {tool:?}")]
    MissingArgument { tool: String, arg: String },
    #[error("websocket error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("event channel closed")]
    ChannelClosed,
}

/// Typed events the client broadcasts to its subscribers.
#[derive(Debug, Clone)]
pub enum DialogueEvent {
    /// The server acknowledged the setup frame; the session is live.
    Opened,
    /// One base64 PCM16 audio fragment of agent speech.
    AudioChunk(String),
    TurnComplete,
    /// The model requests a registered tool by name.
    ToolCall {
        id: Option<String>,
        name: String,
        args: serde_json::Value,
    },
    Closed(Option<String>),
    Error(String),
}

pub struct Connection {
    pub(crate) send_handle: tokio::task::JoinHandle<()>,
    pub(crate) recv_handle: tokio::task::JoinHandle<()>,
}

/// Bidirectional streaming client for the Gemini Live API.
///
/// Instructions and tools are staged on the client and sent in the setup
/// frame when `connect` is called; registering a tool after connecting is an
/// error. Inbound traffic is fanned out through a broadcast channel.
pub struct Client {
    capacity: usize,
    config: Config,
    instructions: Option<String>,
    tools: Vec<ToolDefinition>,
    c_tx: Option<ClientTx>,
    s_tx: Option<ServerTx>,
    connection: Option<Connection>,
}

impl Client {
    pub fn new(capacity: usize, config: Config) -> Self {
        Self {
            capacity,
            config,
            instructions: None,
            tools: vec![],
            c_tx: None,
            s_tx: None,
            connection: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(1024, Config::new())
    }

    pub fn is_connected(&self) -> bool {
        self.c_tx.is_some()
    }

    /// Stages the system instruction text sent with the next `connect`.
    pub fn set_instructions(&mut self, text: impl Into<String>) {
        self.instructions = Some(text.into());
    }

    pub fn register_tool(&mut self, definition: ToolDefinition) -> Result<(), ClientError> {
        if self.is_connected() {
            return Err(ClientError::RegisterAfterConnect);
        }
        self.tools.push(definition);
        Ok(())
    }

    /// Opens the connection and returns a subscriber created before any
    /// inbound traffic is pumped, so even an immediate server frame cannot
    /// be fanned out to zero receivers.
    pub async fn connect(&mut self) -> Result<ServerRx, ClientError> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }

        let request = self.config.request()?;
        let (ws_stream, _) = tokio_tungstenite::connect_async(request).await?;
        let (mut write, mut read) = ws_stream.split();

        let (c_tx, mut c_rx) = tokio::sync::mpsc::channel::<types::ClientMessage>(self.capacity);
        let (s_tx, server_rx) = tokio::sync::broadcast::channel(self.capacity);

        let send_handle = tokio::spawn(async move {
            while let Some(message) = c_rx.recv().await {
                match serde_json::to_string(&message) {
                    Ok(text) => {
                        if let Err(e) = write.send(Message::Text(text)).await {
                            tracing::error!("failed to send message: {}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!("failed to serialize message: {}", e);
                    }
                }
            }
            // Sender side dropped: announce the close to the server.
            if let Err(e) = write.send(Message::Close(None)).await {
                tracing::debug!("failed to send close frame: {}", e);
            }
        });

        let events = s_tx.clone();
        let recv_handle = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Err(e) => {
                        tracing::error!("failed to read message: {}", e);
                        let _ = events.send(DialogueEvent::Error(e.to_string()));
                        break;
                    }
                    Ok(message) => message,
                };
                match message {
                    Message::Text(text) => Self::fan_out(&events, text.as_bytes()),
                    // This endpoint delivers JSON frames as binary messages too.
                    Message::Binary(bin) => Self::fan_out(&events, &bin),
                    Message::Close(frame) => {
                        let reason = frame.map(|f| f.reason.to_string());
                        tracing::info!("connection closed: {:?}", reason);
                        let _ = events.send(DialogueEvent::Closed(reason));
                        break;
                    }
                    _ => {}
                }
            }
        });

        // The setup frame must be the first message on the wire.
        let setup = types::ClientMessage::Setup(types::Setup {
            model: self.config.model().to_string(),
            system_instruction: self.instructions.clone().map(types::Content::from_text),
            tools: if self.tools.is_empty() {
                vec![]
            } else {
                vec![ToolDeclarations::from_definitions(&self.tools)]
            },
            generation_config: Some(types::GenerationConfig::audio()),
        });
        c_tx.send(setup)
            .await
            .map_err(|_| ClientError::ChannelClosed)?;

        self.c_tx = Some(c_tx);
        self.s_tx = Some(s_tx);
        self.connection = Some(Connection {
            send_handle,
            recv_handle,
        });
        Ok(server_rx)
    }

    fn fan_out(events: &ServerTx, raw: &[u8]) {
        let message = match serde_json::from_slice::<types::ServerMessage>(raw) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!(
                    "failed to deserialize server message: {}, raw=> {:?}",
                    e,
                    String::from_utf8_lossy(raw)
                );
                return;
            }
        };

        if message.setup_complete.is_some() {
            let _ = events.send(DialogueEvent::Opened);
        }
        if let Some(content) = message.server_content {
            if let Some(turn) = content.model_turn {
                for part in turn.parts {
                    if let Some(blob) = part.inline_data {
                        let _ = events.send(DialogueEvent::AudioChunk(blob.data));
                    }
                }
            }
            if content.turn_complete {
                let _ = events.send(DialogueEvent::TurnComplete);
            }
        }
        if let Some(tool_call) = message.tool_call {
            for call in tool_call.function_calls {
                let _ = events.send(DialogueEvent::ToolCall {
                    id: call.id,
                    name: call.name,
                    args: call.args,
                });
            }
        }
    }

    /// Closes the connection and stops both pump tasks. Idempotent.
    pub async fn disconnect(&mut self) {
        // Dropping the command sender lets the send task flush queued frames
        // and emit the close frame before it exits.
        self.c_tx = None;
        if let Some(connection) = self.connection.take() {
            if let Err(e) = connection.send_handle.await {
                tracing::debug!("send task ended abnormally: {}", e);
            }
            connection.recv_handle.abort();
        }
        self.s_tx = None;
    }

    pub fn subscribe(&self) -> Result<ServerRx, ClientError> {
        match self.s_tx {
            Some(ref tx) => Ok(tx.subscribe()),
            None => Err(ClientError::NotConnected),
        }
    }

    async fn send_message(&self, message: types::ClientMessage) -> Result<(), ClientError> {
        match self.c_tx {
            Some(ref tx) => tx
                .send(message)
                .await
                .map_err(|_| ClientError::ChannelClosed),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Streams one base64 PCM16 microphone chunk upstream.
    pub async fn send_audio_chunk(&self, data: String) -> Result<(), ClientError> {
        let message = types::ClientMessage::RealtimeInput(types::RealtimeInput {
            media_chunks: vec![types::Blob {
                mime_type: crate::consts::INPUT_AUDIO_MIME_TYPE.to_string(),
                data,
            }],
        });
        self.send_message(message).await
    }

    /// Runs the handler bound to `name` and replies with a tool response.
    pub async fn call_tool(
        &self,
        id: Option<String>,
        name: &str,
        args: serde_json::Value,
    ) -> Result<(), ClientError> {
        let response = self.dispatch_tool(id, name, args)?;
        self.send_message(types::ClientMessage::ToolResponse(response))
            .await
    }

    /// Validates arguments against the tool's required list, invokes the
    /// handler, and builds the wire response. Pure relative to the socket.
    fn dispatch_tool(
        &self,
        id: Option<String>,
        name: &str,
        args: serde_json::Value,
    ) -> Result<types::ToolResponse, ClientError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ClientError::UnknownTool(name.to_string()))?;

        for arg in tool.required_args() {
            if args.get(arg).is_none() {
                return Err(ClientError::MissingArgument {
                    tool: name.to_string(),
                    arg: arg.clone(),
                });
            }
        }

        tool.invoke(args);

        Ok(types::ToolResponse {
            function_responses: vec![types::FunctionResponse {
                id,
                name: name.to_string(),
                response: serde_json::json!({"result": "ok"}),
            }],
        })
    }
}
