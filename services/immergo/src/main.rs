mod capture;
mod config;
mod dialogue;
mod playback;
mod prompt_loader;
mod visualizer;

use std::io::stdout;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::{cursor, execute, terminal};
use gemini_live::tools::{ParameterField, ParameterSchema, ToolDefinition};
use immergo_core::controller::{ControllerEvent, NavigationEvent, SessionController, SessionState};
use immergo_core::mission::{InteractionMode, MissionContext};
use immergo_core::result::render_summary;
use tracing_subscriber::fmt::time::ChronoLocal;

use crate::capture::CapturePipeline;
use crate::config::{Config, RENDER_TICK_MS};
use crate::dialogue::GeminiDialogue;
use crate::playback::PlaybackQueue;
use crate::visualizer::{TerminalSurface, Visualizer};

#[derive(Parser)]
#[command(name = "immergo", about = "Spoken-language practice over the Gemini Live API")]
struct Cli {
    /// Mission title
    #[arg(long, default_value = "General Conversation")]
    title: String,
    /// What the learner is trying to accomplish
    #[arg(long, default_value = "")]
    desc: String,
    /// The character the agent plays
    #[arg(long, default_value = "a local native speaker")]
    target_role: String,
    /// Language being practiced
    #[arg(long, default_value = "French")]
    language: String,
    /// The learner's native language
    #[arg(long, default_value = "English")]
    from_language: String,
    /// Interaction mode: "immersive" or "teacher"
    #[arg(long, default_value = "immersive")]
    mode: String,
}

impl Cli {
    fn into_mission(self) -> MissionContext {
        MissionContext {
            title: self.title,
            desc: self.desc,
            target_role: self.target_role,
            language: self.language,
            from_language: self.from_language,
            mode: InteractionMode::parse(&self.mode),
        }
    }
}

#[derive(Debug)]
enum UiEvent {
    Toggle,
    EndRequested,
    Confirm,
    Cancel,
    Quit,
    Resize,
}

/// Blocking crossterm read loop on its own thread; ends when the receiver
/// side goes away.
fn spawn_key_reader(ui_tx: tokio::sync::mpsc::Sender<UiEvent>) {
    std::thread::spawn(move || {
        loop {
            let event = match crossterm::event::read() {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!("terminal input error: {}", e);
                    break;
                }
            };
            let ui_event = match event {
                Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                    KeyCode::Char(' ') => UiEvent::Toggle,
                    KeyCode::Char('e') => UiEvent::EndRequested,
                    KeyCode::Char('y') => UiEvent::Confirm,
                    KeyCode::Char('n') => UiEvent::Cancel,
                    KeyCode::Char('q') => UiEvent::Quit,
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        UiEvent::Quit
                    }
                    _ => continue,
                },
                Event::Resize(_, _) => UiEvent::Resize,
                _ => continue,
            };
            if ui_tx.blocking_send(ui_event).is_err() {
                break;
            }
        }
    });
}

fn complete_mission_tool(events_tx: tokio::sync::mpsc::Sender<ControllerEvent>) -> ToolDefinition {
    ToolDefinition::new(
        "complete_mission",
        "Call this tool when the user has successfully completed the mission objective. Provide a score and feedback.",
        ParameterSchema::object()
            .with_field(
                "score",
                ParameterField::integer(
                    "Rating from 1 to 3 based on performance: 1 (Tiro) = Struggled, used frequent English, or needed many hints. 2 (Proficiens) = Good, intelligible but with errors or hesitation. 3 (Peritus) = Excellent, fluent, native-like, no help needed.",
                ),
            )
            .with_field(
                "feedback_pointers",
                ParameterField::array_of(
                    ParameterField::string(""),
                    "List of 3 constructive feedback points or compliments in English.",
                ),
            )
            .with_required(&["score", "feedback_pointers"]),
        vec!["score".to_string(), "feedback_pointers".to_string()],
        Box::new(move |args| {
            tracing::info!("mission complete tool triggered: {}", args);
            if events_tx
                .try_send(ControllerEvent::mission_complete_from_args(&args))
                .is_err()
            {
                tracing::error!("controller event channel full; completion dropped");
            }
        }),
    )
}

fn status_line(state: SessionState, confirming: bool) -> &'static str {
    if confirming {
        return "End session? [y/n]";
    }
    match state {
        SessionState::Idle => "[space] start mission   [q] quit",
        SessionState::Starting => "starting...",
        SessionState::Active => "[space] pause   [e] end session",
        SessionState::Ending | SessionState::Ended => "",
    }
}

fn setup_terminal() -> Result<()> {
    terminal::enable_raw_mode()?;
    execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;
    Ok(())
}

fn restore_terminal() {
    let _ = execute!(stdout(), cursor::Show, terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env().context("Failed to load application configuration")?;

    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let mission = Cli::parse().into_mission();

    let templates = prompt_loader::load_templates(Path::new("prompts"))
        .context("Failed to load instruction templates")?;
    let template = prompt_loader::template_for_mode(&templates, &mission.mode)?.clone();
    tracing::info!(
        "Loaded {} templates; mission {:?} in {:?} mode",
        templates.len(),
        mission.title,
        mission.mode
    );

    let (events_tx, mut events_rx) = tokio::sync::mpsc::channel::<ControllerEvent>(1024);
    let (navigation_tx, mut navigation_rx) = tokio::sync::mpsc::channel::<NavigationEvent>(4);
    let (ui_tx, mut ui_rx) = tokio::sync::mpsc::channel::<UiEvent>(64);

    let gemini_config = gemini_live::config::Config::builder()
        .with_api_key(&config.gemini_api_key)
        .build();
    let mut client = gemini_live::Client::new(1024, gemini_config);
    client
        .register_tool(complete_mission_tool(events_tx.clone()))
        .context("Failed to register the completion tool")?;

    let capture = CapturePipeline::new(events_tx.clone());
    let mut energy = capture.energy();
    let dialogue = GeminiDialogue::new(client, events_tx.clone());
    let playback = PlaybackQueue::new();

    let mut controller =
        SessionController::new(dialogue, capture, playback, events_tx, navigation_tx);
    controller.configure(mission, template);

    setup_terminal()?;
    spawn_key_reader(ui_tx);

    let mut visualizer = Visualizer::new(TerminalSurface::new()?);
    let mut render_tick = tokio::time::interval(Duration::from_millis(RENDER_TICK_MS));
    let started = Instant::now();
    let mut confirming = false;
    let mut summary: Option<String> = None;

    let outcome: Result<()> = loop {
        tokio::select! {
            Some(ui_event) = ui_rx.recv() => {
                match ui_event {
                    UiEvent::Toggle if !confirming => {
                        controller.handle_event(ControllerEvent::TogglePressed).await;
                    }
                    UiEvent::EndRequested if controller.state() == SessionState::Active => {
                        confirming = true;
                    }
                    UiEvent::Confirm if confirming => {
                        confirming = false;
                        controller.handle_event(ControllerEvent::EndConfirmed).await;
                    }
                    UiEvent::Cancel => confirming = false,
                    UiEvent::Quit => {
                        controller.dispose().await;
                        break Ok(());
                    }
                    UiEvent::Resize => {
                        let t_ms = started.elapsed().as_millis() as f64;
                        let status = status_line(controller.state(), confirming);
                        if let Err(e) = visualizer.on_resize(t_ms, status) {
                            break Err(e);
                        }
                    }
                    _ => {}
                }
            }
            Some(event) = events_rx.recv() => {
                controller.handle_event(event).await;
            }
            Some(navigation) = navigation_rx.recv() => {
                match navigation {
                    NavigationEvent::Summary(result) => {
                        summary = Some(render_summary(&result));
                        break Ok(());
                    }
                    NavigationEvent::Missions => break Ok(()),
                }
            }
            _ = render_tick.tick() => {
                visualizer.set_active(controller.state() == SessionState::Active);
                let t_ms = started.elapsed().as_millis() as f64;
                let status = status_line(controller.state(), confirming);
                let level = *energy.borrow_and_update();
                if let Err(e) = visualizer.draw(t_ms, level, status) {
                    break Err(e);
                }
            }
        }
    };

    restore_terminal();
    outcome?;
    if let Some(summary) = summary {
        println!("{summary}");
    }
    tracing::info!("Shutting down...");
    Ok(())
}
