//! The live-session state machine.
//!
//! One controller instance drives one screenful of session life: startup of
//! the four live resources in order, the active session, user- and
//! agent-initiated endings, and failure rollback. All state mutation happens
//! on the single task that owns the controller; concurrent inputs (keyboard,
//! agent events, the completion grace timer) arrive serialized through the
//! controller's event channel.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::instructions;
use crate::mission::MissionContext;
use crate::ports::{AgentEvent, Capture, Dialogue, Playback};
use crate::result::SessionResult;

/// Delay between the mission-complete tool call and teardown, so the agent's
/// final spoken remark can finish playing.
pub const COMPLETION_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Starting,
    Active,
    Ending,
    Ended,
}

/// Outbound navigation requests, consumed by the enclosing surface.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationEvent {
    Summary(SessionResult),
    /// Back to the mission list. The controller only ever emits `Summary`;
    /// this is raised by the surface that owns the summary screen.
    Missions,
}

/// Everything that can happen to a running controller.
#[derive(Debug)]
pub enum ControllerEvent {
    /// The start/pause toggle was pressed.
    TogglePressed,
    /// The user confirmed the end-session dialog.
    EndConfirmed,
    /// The `complete_mission` tool handler fired.
    MissionComplete { score: i64, notes: Vec<String> },
    /// The completion grace period elapsed.
    GraceElapsed,
    /// One chunk of microphone audio from the capture pipeline.
    MicAudio(Vec<f32>),
    Agent(AgentEvent),
}

impl ControllerEvent {
    /// Builds a `MissionComplete` from raw tool-call arguments.
    pub fn mission_complete_from_args(args: &serde_json::Value) -> Self {
        let score = args.get("score").and_then(|v| v.as_i64()).unwrap_or(2);
        let notes = args
            .get("feedback_pointers")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|v| v.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        ControllerEvent::MissionComplete { score, notes }
    }
}

pub struct SessionController<D, C, P> {
    dialogue: D,
    capture: C,
    playback: P,
    mission: Option<MissionContext>,
    instruction_template: String,
    state: SessionState,
    /// Feeds the controller's own loop; used by the grace timer.
    events_tx: mpsc::Sender<ControllerEvent>,
    /// Taken on emission, which makes a second result structurally impossible.
    navigation: Option<mpsc::Sender<NavigationEvent>>,
    grace_timer: Option<tokio::task::JoinHandle<()>>,
    grace_period: Duration,
    pending_result: Option<SessionResult>,
    result: Option<SessionResult>,
}

impl<D, C, P> SessionController<D, C, P>
where
    D: Dialogue,
    C: Capture,
    P: Playback,
{
    pub fn new(
        dialogue: D,
        capture: C,
        playback: P,
        events_tx: mpsc::Sender<ControllerEvent>,
        navigation: mpsc::Sender<NavigationEvent>,
    ) -> Self {
        Self {
            dialogue,
            capture,
            playback,
            mission: None,
            instruction_template: String::new(),
            state: SessionState::Idle,
            events_tx,
            navigation: Some(navigation),
            grace_timer: None,
            grace_period: COMPLETION_GRACE,
            pending_result: None,
            result: None,
        }
    }

    /// Establishes the immutable mission context and instruction template.
    /// Must be called before the first toggle; later calls are ignored.
    pub fn configure(&mut self, mission: MissionContext, instruction_template: String) {
        if self.mission.is_some() {
            tracing::warn!("mission context already configured; ignoring");
            return;
        }
        self.mission = Some(mission);
        self.instruction_template = instruction_template;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub async fn handle_event(&mut self, event: ControllerEvent) {
        match event {
            ControllerEvent::TogglePressed => match self.state {
                SessionState::Idle => self.start_session().await,
                SessionState::Active => self.pause_session().await,
                _ => tracing::debug!("toggle ignored in state {:?}", self.state),
            },
            ControllerEvent::EndConfirmed => self.end_by_user().await,
            ControllerEvent::MissionComplete { score, notes } => {
                self.on_mission_complete(score, notes);
            }
            ControllerEvent::GraceElapsed => self.end_by_agent().await,
            ControllerEvent::MicAudio(samples) => {
                if self.state == SessionState::Active {
                    if let Err(e) = self.dialogue.send_audio(samples).await {
                        tracing::error!("failed to send audio upstream: {}", e);
                    }
                }
            }
            ControllerEvent::Agent(agent_event) => self.on_agent_event(agent_event).await,
        }
    }

    /// The four startup steps, strictly sequential. A failure at any step
    /// rolls back everything acquired so far and returns to idle; the error
    /// is logged, never surfaced as a blocking dialog.
    async fn start_session(&mut self) {
        let Some(mission) = self.mission.clone() else {
            tracing::error!("cannot start: no mission configured");
            return;
        };
        self.state = SessionState::Starting;
        tracing::info!("starting session for mission {:?}", mission.title);

        let text = instructions::render(&self.instruction_template, &mission);
        self.dialogue.set_instructions(text);

        if let Err(e) = self.dialogue.connect().await {
            tracing::error!("failed to start session: {}", e);
            self.state = SessionState::Idle;
            return;
        }

        if let Err(e) = self.capture.activate(true).await {
            tracing::error!("failed to start session: {}", e);
            self.dialogue.disconnect().await;
            self.state = SessionState::Idle;
            return;
        }

        if let Err(e) = self.playback.init().await {
            tracing::error!("failed to start session: {}", e);
            if let Err(e) = self.capture.activate(false).await {
                tracing::error!("rollback: capture deactivation failed: {}", e);
            }
            self.dialogue.disconnect().await;
            self.state = SessionState::Idle;
            return;
        }

        self.state = SessionState::Active;
        tracing::info!("session active");
    }

    /// Second toggle while active: release the live resources and return to
    /// the pre-session state. Not a completion, so no result is produced.
    async fn pause_session(&mut self) {
        tracing::info!("pausing session");
        self.cancel_grace();
        // The timer's message may already be in flight; without a pending
        // result a stale GraceElapsed after a restart has nothing to emit.
        self.pending_result = None;
        if let Err(e) = self.capture.activate(false).await {
            tracing::error!("capture deactivation failed: {}", e);
        }
        self.dialogue.disconnect().await;
        self.state = SessionState::Idle;
    }

    async fn end_by_user(&mut self) {
        if self.state != SessionState::Active {
            tracing::debug!("end request ignored in state {:?}", self.state);
            return;
        }
        tracing::info!("session ended by user");
        self.cancel_grace();
        self.pending_result = None;
        self.teardown().await;
        self.emit(SessionResult::incomplete());
        self.state = SessionState::Ended;
    }

    /// Agent reported mission completion: remember the result and give the
    /// final spoken remark a grace period before tearing down.
    fn on_mission_complete(&mut self, score: i64, notes: Vec<String>) {
        if self.state != SessionState::Active || self.grace_timer.is_some() {
            tracing::warn!(
                "mission completion ignored (state {:?}, pending timer: {})",
                self.state,
                self.grace_timer.is_some()
            );
            return;
        }
        tracing::info!("mission complete: score {}", score);
        self.pending_result = Some(SessionResult::completed(score, notes));

        let events = self.events_tx.clone();
        let grace = self.grace_period;
        self.grace_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            if events.send(ControllerEvent::GraceElapsed).await.is_err() {
                tracing::debug!("controller gone before grace period elapsed");
            }
        }));
    }

    async fn end_by_agent(&mut self) {
        // A user-confirmed end may have won the race; the timer was aborted
        // but its message can already be in flight.
        if self.state != SessionState::Active {
            tracing::debug!("grace elapsed ignored in state {:?}", self.state);
            return;
        }
        let Some(result) = self.pending_result.take() else {
            tracing::warn!("grace elapsed without a pending result");
            return;
        };
        self.grace_timer = None;
        self.teardown().await;
        self.emit(result);
        self.state = SessionState::Ended;
    }

    async fn on_agent_event(&mut self, event: AgentEvent) {
        match event {
            AgentEvent::Opened => tracing::info!("dialogue connection opened"),
            AgentEvent::Audio(samples) => {
                if self.state == SessionState::Active {
                    self.playback.play(samples);
                }
            }
            AgentEvent::TurnComplete => tracing::debug!("agent turn complete"),
            AgentEvent::ToolCall { id, name, args } => {
                tracing::info!("tool call received: {}", name);
                if let Err(e) = self.dialogue.call_tool(id, name, args).await {
                    tracing::error!("tool call failed: {}", e);
                }
            }
            AgentEvent::Closed(reason) => {
                if self.state == SessionState::Active {
                    tracing::warn!("connection closed mid-session: {:?}", reason);
                } else {
                    tracing::info!("connection closed: {:?}", reason);
                }
            }
            AgentEvent::Error(message) => tracing::error!("dialogue error: {}", message),
        }
    }

    /// Forced teardown when the enclosing surface goes away. Releases
    /// whatever is held; no result is emitted.
    pub async fn dispose(&mut self) {
        self.cancel_grace();
        if self.capture.is_active() {
            if let Err(e) = self.capture.activate(false).await {
                tracing::error!("capture deactivation failed: {}", e);
            }
        }
        self.dialogue.disconnect().await;
    }

    async fn teardown(&mut self) {
        self.state = SessionState::Ending;
        if let Err(e) = self.capture.activate(false).await {
            tracing::error!("capture deactivation failed: {}", e);
        }
        self.dialogue.disconnect().await;
        self.playback.interrupt();
    }

    fn cancel_grace(&mut self) {
        if let Some(timer) = self.grace_timer.take() {
            timer.abort();
        }
    }

    fn emit(&mut self, result: SessionResult) {
        match self.navigation.take() {
            Some(tx) => {
                self.result = Some(result.clone());
                if tx.try_send(NavigationEvent::Summary(result)).is_err() {
                    tracing::error!("navigation channel closed; session result dropped");
                }
            }
            None => tracing::warn!("session result already emitted; dropping"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{MockCapture, MockDialogue, MockPlayback, SessionError};

    type TestController = SessionController<MockDialogue, MockCapture, MockPlayback>;

    struct Harness {
        controller: TestController,
        events_rx: mpsc::Receiver<ControllerEvent>,
        navigation_rx: mpsc::Receiver<NavigationEvent>,
    }

    fn harness(dialogue: MockDialogue, capture: MockCapture, playback: MockPlayback) -> Harness {
        let (events_tx, events_rx) = mpsc::channel(16);
        let (navigation_tx, navigation_rx) = mpsc::channel(4);
        let mut controller =
            SessionController::new(dialogue, capture, playback, events_tx, navigation_tx);
        controller.configure(
            MissionContext::default(),
            "Play {target_role} speaking {language}.".to_string(),
        );
        controller.grace_period = Duration::from_millis(10);
        Harness {
            controller,
            events_rx,
            navigation_rx,
        }
    }

    fn happy_startup_mocks() -> (MockDialogue, MockCapture, MockPlayback) {
        let mut dialogue = MockDialogue::new();
        dialogue
            .expect_set_instructions()
            .withf(|text| text.contains("a local native speaker") && text.contains("French"))
            .times(1)
            .return_const(());
        dialogue.expect_connect().times(1).returning(|| Ok(()));

        let mut capture = MockCapture::new();
        capture
            .expect_activate()
            .withf(|&active| active)
            .times(1)
            .returning(|_| Ok(()));

        let mut playback = MockPlayback::new();
        playback.expect_init().times(1).returning(|| Ok(()));

        (dialogue, capture, playback)
    }

    fn expect_teardown(
        dialogue: &mut MockDialogue,
        capture: &mut MockCapture,
        playback: &mut MockPlayback,
    ) {
        capture
            .expect_activate()
            .withf(|&active| !active)
            .times(1)
            .returning(|_| Ok(()));
        dialogue.expect_disconnect().times(1).return_const(());
        playback.expect_interrupt().times(1).return_const(());
    }

    #[tokio::test]
    async fn startup_success_reaches_active() {
        let (dialogue, capture, playback) = happy_startup_mocks();
        let mut h = harness(dialogue, capture, playback);

        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;

        assert_eq!(h.controller.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn failed_connect_rolls_back_to_idle_without_touching_capture() {
        let mut dialogue = MockDialogue::new();
        dialogue.expect_set_instructions().times(1).return_const(());
        dialogue
            .expect_connect()
            .times(1)
            .returning(|| Err(SessionError::Connection("refused".into())));
        // No expectations on capture or playback: any call would panic,
        // which is exactly the zero-residual-handles property.
        let capture = MockCapture::new();
        let playback = MockPlayback::new();
        let mut h = harness(dialogue, capture, playback);

        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;

        assert_eq!(h.controller.state(), SessionState::Idle);
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_capture_disconnects_and_returns_to_idle() {
        let mut dialogue = MockDialogue::new();
        dialogue.expect_set_instructions().times(1).return_const(());
        dialogue.expect_connect().times(1).returning(|| Ok(()));
        dialogue.expect_disconnect().times(1).return_const(());

        let mut capture = MockCapture::new();
        capture
            .expect_activate()
            .withf(|&active| active)
            .times(1)
            .returning(|_| Err(SessionError::CaptureUnavailable("denied".into())));

        let playback = MockPlayback::new();
        let mut h = harness(dialogue, capture, playback);

        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;

        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn failed_playback_init_releases_capture_and_connection() {
        let mut dialogue = MockDialogue::new();
        dialogue.expect_set_instructions().times(1).return_const(());
        dialogue.expect_connect().times(1).returning(|| Ok(()));
        dialogue.expect_disconnect().times(1).return_const(());

        let mut capture = MockCapture::new();
        let mut seq = mockall::Sequence::new();
        capture
            .expect_activate()
            .withf(|&active| active)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        capture
            .expect_activate()
            .withf(|&active| !active)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));

        let mut playback = MockPlayback::new();
        playback
            .expect_init()
            .times(1)
            .returning(|| Err(SessionError::PlaybackInit("no output device".into())));

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;

        assert_eq!(h.controller.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn second_toggle_pauses_without_emitting_a_result() {
        let (mut dialogue, mut capture, playback) = happy_startup_mocks();
        capture
            .expect_activate()
            .withf(|&active| !active)
            .times(1)
            .returning(|_| Ok(()));
        dialogue.expect_disconnect().times(1).return_const(());

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;

        assert_eq!(h.controller.state(), SessionState::Idle);
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn user_confirmed_end_emits_incomplete_result() {
        let (mut dialogue, mut capture, mut playback) = happy_startup_mocks();
        expect_teardown(&mut dialogue, &mut capture, &mut playback);

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller.handle_event(ControllerEvent::EndConfirmed).await;

        assert_eq!(h.controller.state(), SessionState::Ended);
        assert_eq!(
            h.navigation_rx.try_recv().unwrap(),
            NavigationEvent::Summary(SessionResult::incomplete())
        );
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn mission_complete_tears_down_after_the_grace_period() {
        let (mut dialogue, mut capture, mut playback) = happy_startup_mocks();
        expect_teardown(&mut dialogue, &mut capture, &mut playback);

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::MissionComplete {
                score: 3,
                notes: vec!["a".into(), "b".into(), "c".into()],
            })
            .await;

        // Still active while the agent's final remark plays out.
        assert_eq!(h.controller.state(), SessionState::Active);

        let elapsed = h.events_rx.recv().await.expect("grace timer event");
        assert!(matches!(elapsed, ControllerEvent::GraceElapsed));
        h.controller.handle_event(elapsed).await;

        assert_eq!(h.controller.state(), SessionState::Ended);
        match h.navigation_rx.try_recv().unwrap() {
            NavigationEvent::Summary(SessionResult::Completed {
                score,
                level,
                notes,
            }) => {
                assert_eq!(score, "3");
                assert_eq!(level, crate::result::Level::Peritus);
                assert_eq!(notes, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected navigation event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn user_end_wins_the_race_against_the_grace_timer() {
        let (mut dialogue, mut capture, mut playback) = happy_startup_mocks();
        expect_teardown(&mut dialogue, &mut capture, &mut playback);

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::MissionComplete {
                score: 2,
                notes: vec![],
            })
            .await;
        h.controller.handle_event(ControllerEvent::EndConfirmed).await;

        assert_eq!(h.controller.state(), SessionState::Ended);
        assert_eq!(
            h.navigation_rx.try_recv().unwrap(),
            NavigationEvent::Summary(SessionResult::incomplete())
        );

        // Even if the timer's message was already in flight, a late
        // GraceElapsed must not fire a second teardown or result.
        h.controller.handle_event(ControllerEvent::GraceElapsed).await;
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn duplicate_mission_complete_is_ignored() {
        let (mut dialogue, mut capture, mut playback) = happy_startup_mocks();
        expect_teardown(&mut dialogue, &mut capture, &mut playback);

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::MissionComplete {
                score: 1,
                notes: vec!["first".into()],
            })
            .await;
        h.controller
            .handle_event(ControllerEvent::MissionComplete {
                score: 3,
                notes: vec!["second".into()],
            })
            .await;

        let elapsed = h.events_rx.recv().await.expect("grace timer event");
        h.controller.handle_event(elapsed).await;

        // First wins; the duplicate neither reschedules nor overwrites.
        match h.navigation_rx.try_recv().unwrap() {
            NavigationEvent::Summary(SessionResult::Completed { score, .. }) => {
                assert_eq!(score, "1");
            }
            other => panic!("unexpected navigation event: {other:?}"),
        }
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn pause_discards_a_pending_completion() {
        let mut dialogue = MockDialogue::new();
        dialogue.expect_set_instructions().times(2).return_const(());
        dialogue.expect_connect().times(2).returning(|| Ok(()));
        dialogue.expect_disconnect().times(1).return_const(());

        let mut capture = MockCapture::new();
        capture
            .expect_activate()
            .withf(|&active| active)
            .times(2)
            .returning(|_| Ok(()));
        capture
            .expect_activate()
            .withf(|&active| !active)
            .times(1)
            .returning(|_| Ok(()));

        let mut playback = MockPlayback::new();
        playback.expect_init().times(2).returning(|| Ok(()));

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::MissionComplete {
                score: 3,
                notes: vec!["stale".into()],
            })
            .await;
        // Pause aborts the timer, but its message may already be queued.
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller.handle_event(ControllerEvent::GraceElapsed).await;

        // The stale completion from before the pause must not end the new
        // session or surface its result.
        assert_eq!(h.controller.state(), SessionState::Active);
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn end_request_outside_active_is_ignored() {
        let dialogue = MockDialogue::new();
        let capture = MockCapture::new();
        let playback = MockPlayback::new();
        let mut h = harness(dialogue, capture, playback);

        h.controller.handle_event(ControllerEvent::EndConfirmed).await;

        assert_eq!(h.controller.state(), SessionState::Idle);
        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn agent_audio_is_forwarded_only_while_active() {
        let (mut dialogue, mut capture, mut playback) = happy_startup_mocks();
        playback.expect_play().times(1).return_const(());
        // Disposal path below.
        capture.expect_is_active().return_const(false);
        dialogue.expect_disconnect().times(1).return_const(());

        let mut h = harness(dialogue, capture, playback);
        // Not active yet: dropped.
        h.controller
            .handle_event(ControllerEvent::Agent(AgentEvent::Audio(vec![0.1])))
            .await;
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::Agent(AgentEvent::Audio(vec![0.2])))
            .await;
        h.controller.dispose().await;
    }

    #[tokio::test]
    async fn mic_audio_is_sent_upstream_only_while_active() {
        let (mut dialogue, capture, playback) = happy_startup_mocks();
        dialogue
            .expect_send_audio()
            .withf(|samples| samples == &[0.2])
            .times(1)
            .returning(|_| Ok(()));

        let mut h = harness(dialogue, capture, playback);
        // Not active yet: dropped.
        h.controller
            .handle_event(ControllerEvent::MicAudio(vec![0.1]))
            .await;
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::MicAudio(vec![0.2]))
            .await;
    }

    #[tokio::test]
    async fn tool_call_event_is_dispatched_to_the_dialogue() {
        let (mut dialogue, capture, playback) = happy_startup_mocks();
        dialogue
            .expect_call_tool()
            .withf(|_id, name, args| name == "complete_mission" && args["score"] == 3)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller
            .handle_event(ControllerEvent::Agent(AgentEvent::ToolCall {
                id: None,
                name: "complete_mission".to_string(),
                args: serde_json::json!({"score": 3}),
            }))
            .await;
    }

    #[tokio::test]
    async fn dispose_releases_resources_without_emitting() {
        let (mut dialogue, mut capture, playback) = happy_startup_mocks();
        capture.expect_is_active().return_const(true);
        capture
            .expect_activate()
            .withf(|&active| !active)
            .times(1)
            .returning(|_| Ok(()));
        dialogue.expect_disconnect().times(1).return_const(());

        let mut h = harness(dialogue, capture, playback);
        h.controller
            .handle_event(ControllerEvent::TogglePressed)
            .await;
        h.controller.dispose().await;

        assert!(h.navigation_rx.try_recv().is_err());
    }

    #[test]
    fn mission_complete_args_are_parsed() {
        let event = ControllerEvent::mission_complete_from_args(&serde_json::json!({
            "score": 3,
            "feedback_pointers": ["a", "b", "c"]
        }));
        match event {
            ControllerEvent::MissionComplete { score, notes } => {
                assert_eq!(score, 3);
                assert_eq!(notes, vec!["a", "b", "c"]);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn malformed_mission_complete_args_fall_back() {
        let event = ControllerEvent::mission_complete_from_args(&serde_json::json!({
            "score": "loud", "feedback_pointers": "not a list"
        }));
        match event {
            ControllerEvent::MissionComplete { score, notes } => {
                assert_eq!(score, 2);
                assert!(notes.is_empty());
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
