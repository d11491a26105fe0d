//! Bridges the Gemini Live client into the controller's dialogue port.
//!
//! The client broadcasts wire-level events; a forwarding task decodes them
//! into controller events so everything downstream of the socket runs on the
//! controller's single loop. Upstream, microphone samples are base64 encoded
//! right before hitting the client.

use async_trait::async_trait;
use gemini_live::{Client, DialogueEvent};
use immergo_core::controller::ControllerEvent;
use immergo_core::ports::{AgentEvent, Dialogue, SessionError};
use immergo_native_utils::audio;
use tokio::sync::mpsc;

pub struct GeminiDialogue {
    client: Client,
    events_tx: mpsc::Sender<ControllerEvent>,
    forward: Option<tokio::task::JoinHandle<()>>,
}

impl GeminiDialogue {
    pub fn new(client: Client, events_tx: mpsc::Sender<ControllerEvent>) -> Self {
        Self {
            client,
            events_tx,
            forward: None,
        }
    }
}

fn map_event(event: DialogueEvent) -> AgentEvent {
    match event {
        DialogueEvent::Opened => AgentEvent::Opened,
        DialogueEvent::AudioChunk(data) => AgentEvent::Audio(audio::decode(&data)),
        DialogueEvent::TurnComplete => AgentEvent::TurnComplete,
        DialogueEvent::ToolCall { id, name, args } => AgentEvent::ToolCall { id, name, args },
        DialogueEvent::Closed(reason) => AgentEvent::Closed(reason),
        DialogueEvent::Error(message) => AgentEvent::Error(message),
    }
}

#[async_trait]
impl Dialogue for GeminiDialogue {
    fn set_instructions(&mut self, text: String) {
        self.client.set_instructions(text);
    }

    async fn connect(&mut self) -> Result<(), SessionError> {
        let mut server_events = self
            .client
            .connect()
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))?;

        let events_tx = self.events_tx.clone();
        self.forward = Some(tokio::spawn(async move {
            loop {
                let event = match server_events.recv().await {
                    Ok(event) => event,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("dialogue event stream lagged; skipped {}", skipped);
                        continue;
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                };
                let closing = matches!(event, DialogueEvent::Closed(_));
                if events_tx
                    .send(ControllerEvent::Agent(map_event(event)))
                    .await
                    .is_err()
                {
                    break;
                }
                if closing {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.client.disconnect().await;
        if let Some(handle) = self.forward.take() {
            handle.abort();
        }
    }

    async fn send_audio(&mut self, samples: Vec<f32>) -> Result<(), SessionError> {
        self.client
            .send_audio_chunk(audio::encode(&samples))
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))
    }

    async fn call_tool(
        &mut self,
        id: Option<String>,
        name: String,
        args: serde_json::Value,
    ) -> Result<(), SessionError> {
        self.client
            .call_tool(id, &name, args)
            .await
            .map_err(|e| SessionError::Connection(e.to_string()))
    }
}
