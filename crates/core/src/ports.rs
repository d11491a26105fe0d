//! Trait seams between the session controller and the live resources it
//! drives. The runtime provides real implementations (websocket client, cpal
//! streams); tests substitute mocks.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

/// Failures that can occur while bringing a session up. All are handled the
/// same way: abort the startup sequence, roll back, return to idle.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("microphone unavailable: {0}")]
    CaptureUnavailable(String),
    #[error("dialogue connection error: {0}")]
    Connection(String),
    #[error("audio playback init failed: {0}")]
    PlaybackInit(String),
}

/// Provider-agnostic events the dialogue side feeds into the controller.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    Opened,
    /// Agent speech, already decoded to f32 samples for the playback queue.
    Audio(Vec<f32>),
    TurnComplete,
    ToolCall {
        id: Option<String>,
        name: String,
        args: serde_json::Value,
    },
    Closed(Option<String>),
    Error(String),
}

/// The remote conversational agent connection.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Dialogue: Send {
    /// Stages the instruction text delivered when the connection opens.
    fn set_instructions(&mut self, text: String);

    async fn connect(&mut self) -> Result<(), SessionError>;

    /// Tears the connection down. Idempotent.
    async fn disconnect(&mut self);

    /// Streams one chunk of microphone audio (f32, provider rate) upstream.
    async fn send_audio(&mut self, samples: Vec<f32>) -> Result<(), SessionError>;

    /// Invokes the registered handler for an agent-requested tool call and
    /// acknowledges it to the remote side.
    async fn call_tool(
        &mut self,
        id: Option<String>,
        name: String,
        args: serde_json::Value,
    ) -> Result<(), SessionError>;
}

/// The microphone capture pipeline.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Capture: Send {
    /// `activate(true)` acquires the device and starts the analysis loop;
    /// `activate(false)` releases both. On failure no resources remain held.
    async fn activate(&mut self, active: bool) -> Result<(), SessionError>;

    fn is_active(&self) -> bool;
}

/// The agent-speech playback queue.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Playback: Send {
    async fn init(&mut self) -> Result<(), SessionError>;

    /// Enqueues decoded samples for sequential playback.
    fn play(&mut self, samples: Vec<f32>);

    /// Halts playback immediately and discards everything queued.
    fn interrupt(&mut self);
}
