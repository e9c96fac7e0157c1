//! The main interaction loop.
//!
//! One logical thread of control multiplexes four sources: terminal
//! events, stream messages, background task results, and timers. All
//! state mutation happens here, synchronously between awaits, so no two
//! mutations interleave at a finer grain than one handled event.
//!
//! Connection-health and usage polling run on their own timers and are
//! allowed to overlap an in-flight generation; their results only touch
//! the connection flag and the usage meter.

use std::error::Error;
use std::io;
use std::time::Duration;

use ratatui::backend::CrosstermBackend;
use ratatui::crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use ratatui::crossterm::execute;
use ratatui::crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::Terminal;
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, sleep_until, Instant, Interval, MissedTickBehavior};
use tracing::debug;

use crate::api::{ApiError, ChatRequest, GatewayClient, ModelEntry, UsageResponse};
use crate::core::app::{App, ConnectionStatus, Mode, SettingsPanel, ToastKind};
use crate::core::chat_stream::{StreamDispatcher, StreamMessage, StreamParams};
use crate::core::config::Settings;
use crate::ui::renderer;
use crate::utils::clipboard::copy_to_clipboard;

/// Health probes run hot until the gateway answers, then settle into a
/// slower periodic check.
const HEALTH_RETRY_PERIOD: Duration = Duration::from_secs(5);
const HEALTH_POLL_PERIOD: Duration = Duration::from_secs(30);
const USAGE_POLL_PERIOD: Duration = Duration::from_secs(60);
const TICK_PERIOD: Duration = Duration::from_millis(250);

pub fn health_poll_period(connected: bool) -> Duration {
    if connected {
        HEALTH_POLL_PERIOD
    } else {
        HEALTH_RETRY_PERIOD
    }
}

/// Results of the background tasks the loop spawns.
enum BgEvent {
    Health(bool),
    Models(Result<Vec<ModelEntry>, ApiError>),
    Usage(Result<UsageResponse, ApiError>),
}

pub async fn run(app: App) -> Result<(), Box<dyn Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app).await;

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    result
}

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut app: App,
) -> Result<(), Box<dyn Error>> {
    let (stream_tx, mut stream_rx) = mpsc::unbounded_channel();
    let dispatcher = StreamDispatcher::new(stream_tx.clone());
    let (bg_tx, mut bg_rx) = mpsc::unbounded_channel();
    let (input_tx, mut input_rx) = mpsc::unbounded_channel();
    spawn_input_reader(input_tx);

    // Probe the gateway and load the catalog right away; the timers only
    // cover the steady state.
    spawn_health_check(&app.session.client, &bg_tx);
    spawn_model_load(&app.session.client, &bg_tx);
    app.ui.show_toast(ToastKind::Success, "Welcome to Parley");

    // Health checks are scheduled as one-shot deadlines rather than a
    // fixed interval so the cadence can flip between the retry and
    // steady-state periods the moment the connection state changes.
    let mut next_health_check = Instant::now() + health_poll_period(false);
    let mut usage_timer = new_timer(USAGE_POLL_PERIOD);
    let mut tick_timer = interval(TICK_PERIOD);
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        terminal.draw(|f| renderer::draw(f, &mut app))?;
        if app.ui.exit_requested {
            break;
        }

        tokio::select! {
            Some(event) = input_rx.recv() => {
                handle_terminal_event(&mut app, event, &dispatcher, &stream_tx);
            }
            Some((message, stream_id)) = stream_rx.recv() => {
                handle_stream_message(&mut app, message, stream_id, &bg_tx);
            }
            Some(event) = bg_rx.recv() => {
                handle_bg_event(&mut app, event, &mut next_health_check, &bg_tx);
            }
            _ = sleep_until(next_health_check) => {
                spawn_health_check(&app.session.client, &bg_tx);
                next_health_check = Instant::now()
                    + health_poll_period(app.session.connection.is_connected());
            }
            _ = usage_timer.tick() => {
                if app.session.connection.is_connected() {
                    spawn_usage_fetch(&app.session.client, &bg_tx);
                }
            }
            _ = tick_timer.tick() => {
                app.ui.expire_toast();
            }
        }
    }
    Ok(())
}

fn new_timer(period: Duration) -> Interval {
    let mut timer = interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

/// Terminal events are read on a plain thread; `event::read` has no async
/// form. The thread exits when the loop drops its receiver.
fn spawn_input_reader(tx: mpsc::UnboundedSender<Event>) {
    std::thread::spawn(move || loop {
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                if let Ok(ev) = event::read() {
                    if tx.send(ev).is_err() {
                        break;
                    }
                }
            }
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn spawn_health_check(client: &GatewayClient, tx: &mpsc::UnboundedSender<BgEvent>) {
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let _ = tx.send(BgEvent::Health(client.check_health().await));
    });
}

fn spawn_model_load(client: &GatewayClient, tx: &mpsc::UnboundedSender<BgEvent>) {
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let _ = tx.send(BgEvent::Models(client.list_models().await));
    });
}

fn spawn_usage_fetch(client: &GatewayClient, tx: &mpsc::UnboundedSender<BgEvent>) {
    let client = client.clone();
    let tx = tx.clone();
    tokio::spawn(async move {
        let _ = tx.send(BgEvent::Usage(client.fetch_usage().await));
    });
}

fn handle_bg_event(
    app: &mut App,
    event: BgEvent,
    next_health_check: &mut Instant,
    bg_tx: &mpsc::UnboundedSender<BgEvent>,
) {
    match event {
        BgEvent::Health(ok) => {
            let was_connected = app.session.connection.is_connected();
            if ok {
                app.session.connection = ConnectionStatus::Connected;
                if !was_connected {
                    *next_health_check = Instant::now() + health_poll_period(true);
                    spawn_usage_fetch(&app.session.client, bg_tx);
                    if app.catalog.is_empty() {
                        spawn_model_load(&app.session.client, bg_tx);
                    }
                }
            } else {
                if was_connected {
                    *next_health_check = Instant::now() + health_poll_period(false);
                }
                app.session.connection = ConnectionStatus::Disconnected;
            }
        }
        BgEvent::Models(Ok(entries)) => {
            app.catalog.set_models(entries);
            if app.catalog.selected_id().is_none() {
                app.catalog.select_first();
            }
        }
        BgEvent::Models(Err(error)) => {
            debug!(%error, "model list fetch failed");
            app.ui.show_toast(ToastKind::Error, "Failed to load models");
        }
        BgEvent::Usage(Ok(usage)) => {
            app.ui.usage = Some(usage.into());
        }
        BgEvent::Usage(Err(error)) => {
            debug!(%error, "usage fetch failed");
        }
    }
}

fn handle_stream_message(
    app: &mut App,
    message: StreamMessage,
    stream_id: u64,
    bg_tx: &mpsc::UnboundedSender<BgEvent>,
) {
    // A superseded stream (new chat mid-generation) may still drain.
    if !app.session.is_current_stream(stream_id) {
        return;
    }
    match message {
        StreamMessage::Chunk(chunk) => app.conversation().apply_chunk(&chunk),
        StreamMessage::Completed { usage, warning } => {
            app.conversation().apply_completion(usage, warning)
        }
        StreamMessage::Error(error) => app.conversation().apply_error(&error),
        StreamMessage::End => {
            app.conversation().finalize_reply();
            // Usage is re-fetched after every generation, success or not.
            if app.session.connection.is_connected() {
                spawn_usage_fetch(&app.session.client, bg_tx);
            }
        }
    }
}

fn handle_terminal_event(
    app: &mut App,
    event: Event,
    dispatcher: &StreamDispatcher,
    stream_tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
) {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            handle_key(app, key, dispatcher, stream_tx)
        }
        Event::Mouse(mouse) => match mouse.kind {
            MouseEventKind::ScrollUp => app.ui.scroll_up(3),
            MouseEventKind::ScrollDown => app.ui.scroll_down(3),
            _ => {}
        },
        _ => {}
    }
}

fn handle_key(
    app: &mut App,
    key: KeyEvent,
    dispatcher: &StreamDispatcher,
    stream_tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.ui.exit_requested = true;
        return;
    }

    match app.ui.mode {
        Mode::Chat => handle_chat_key(app, key, dispatcher, stream_tx),
        Mode::ModelPicker => handle_picker_key(app, key),
        Mode::Settings => handle_settings_key(app, key),
        Mode::ConfirmNewChat => handle_confirm_key(app, key),
    }
}

fn handle_chat_key(
    app: &mut App,
    key: KeyEvent,
    dispatcher: &StreamDispatcher,
    stream_tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.ui.textarea.insert_newline();
        }
        KeyCode::Enter => try_send(app, dispatcher, stream_tx),
        KeyCode::Char('p') if ctrl => {
            app.ui.picker.open(&mut app.catalog);
            app.ui.mode = Mode::ModelPicker;
        }
        KeyCode::Char('s') if ctrl => {
            app.ui.settings_panel = Some(SettingsPanel::open(app.settings));
            app.ui.mode = Mode::Settings;
        }
        KeyCode::Char('n') if ctrl => {
            // An empty transcript has nothing to confirm away.
            if !app.transcript.is_empty() {
                app.ui.mode = Mode::ConfirmNewChat;
            }
        }
        KeyCode::Char('r') if ctrl => regenerate_last(app, dispatcher, stream_tx),
        KeyCode::Char('y') if ctrl => copy_last_reply(app),
        KeyCode::PageUp => {
            let page = app.ui.transcript_view_height.max(1);
            app.ui.scroll_up(page);
        }
        KeyCode::PageDown => {
            let page = app.ui.transcript_view_height.max(1);
            app.ui.scroll_down(page);
        }
        KeyCode::Up => app.ui.scroll_up(1),
        KeyCode::Down => app.ui.scroll_down(1),
        _ => {
            app.ui.textarea.input(tui_textarea::Input::from(key));
        }
    }
}

fn try_send(
    app: &mut App,
    dispatcher: &StreamDispatcher,
    stream_tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
) {
    if !app.can_send() {
        return;
    }
    let content = app.ui.input_text().trim().to_string();
    app.ui.clear_input();
    if let Some((request, reply_index)) = app.conversation().begin_user_turn(content) {
        launch_generation(app, dispatcher, stream_tx, request, reply_index);
    }
}

fn regenerate_last(
    app: &mut App,
    dispatcher: &StreamDispatcher,
    stream_tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
) {
    if app.session.is_generating || !app.session.connection.is_connected() {
        return;
    }
    let Some(index) = app.transcript.last_assistant() else {
        return;
    };
    if let Some((request, reply_index)) = app.conversation().begin_regeneration(index) {
        launch_generation(app, dispatcher, stream_tx, request, reply_index);
    }
}

fn launch_generation(
    app: &mut App,
    dispatcher: &StreamDispatcher,
    stream_tx: &mpsc::UnboundedSender<(StreamMessage, u64)>,
    request: ChatRequest,
    reply_index: usize,
) {
    let (cancel_token, stream_id) = app.session.begin_generation(reply_index);
    if app.settings.streaming {
        dispatcher.spawn(StreamParams {
            client: app.session.client.clone(),
            request: request.streaming(),
            cancel_token,
            stream_id,
        });
    } else {
        spawn_chat_request(
            app.session.client.clone(),
            request,
            stream_tx.clone(),
            stream_id,
        );
    }
}

/// The non-streaming path reuses the stream message pipeline: one chunk
/// carrying the whole reply, then completion, then end. Finalization and
/// the generation flag behave identically on both paths.
fn spawn_chat_request(
    client: GatewayClient,
    request: ChatRequest,
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    tokio::spawn(async move {
        match client.chat(&request).await {
            Ok(reply) => {
                if !reply.content.is_empty() {
                    let _ = tx.send((StreamMessage::Chunk(reply.content), stream_id));
                }
                let _ = tx.send((
                    StreamMessage::Completed {
                        usage: reply.usage.map(Into::into),
                        warning: reply.warning,
                    },
                    stream_id,
                ));
                let _ = tx.send((StreamMessage::End, stream_id));
            }
            Err(error) => {
                let _ = tx.send((StreamMessage::Error(error.to_string()), stream_id));
                let _ = tx.send((StreamMessage::End, stream_id));
            }
        }
    });
}

fn copy_last_reply(app: &mut App) {
    let Some(index) = app.transcript.last_assistant() else {
        return;
    };
    let Some(message) = app.transcript.get(index) else {
        return;
    };
    match copy_to_clipboard(&message.content) {
        Ok(()) => app.ui.show_toast(ToastKind::Success, "Copied to clipboard"),
        Err(error) => app.ui.show_toast(ToastKind::Error, error),
    }
}

fn handle_picker_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.ui.mode = Mode::Chat,
        KeyCode::Enter => {
            if let Some(id) = app
                .ui
                .picker
                .selected_id(&app.catalog)
                .map(str::to_string)
            {
                app.catalog.select(&id);
            }
            app.ui.mode = Mode::Chat;
        }
        KeyCode::Up => {
            let len = app.catalog.filtered().len();
            app.ui.picker.move_up(len);
        }
        KeyCode::Down => {
            let len = app.catalog.filtered().len();
            app.ui.picker.move_down(len);
        }
        KeyCode::Tab => app.ui.picker.cycle_category(&mut app.catalog),
        KeyCode::Backspace => app.ui.picker.pop_char(&mut app.catalog),
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.ui.picker.push_char(c, &mut app.catalog);
        }
        _ => {}
    }
}

fn handle_settings_key(app: &mut App, key: KeyEvent) {
    if app.ui.settings_panel.is_none() {
        app.ui.mode = Mode::Chat;
        return;
    }
    match key.code {
        KeyCode::Esc => {
            app.ui.settings_panel = None;
            app.ui.mode = Mode::Chat;
        }
        KeyCode::Up => {
            if let Some(panel) = app.ui.settings_panel.as_mut() {
                panel.move_up();
            }
        }
        KeyCode::Down => {
            if let Some(panel) = app.ui.settings_panel.as_mut() {
                panel.move_down();
            }
        }
        KeyCode::Left => {
            if let Some(panel) = app.ui.settings_panel.as_mut() {
                panel.adjust(false);
            }
        }
        KeyCode::Right => {
            if let Some(panel) = app.ui.settings_panel.as_mut() {
                panel.adjust(true);
            }
        }
        KeyCode::Enter => {
            let draft = app.ui.settings_panel.take().map(|panel| panel.draft);
            app.ui.mode = Mode::Chat;
            if let Some(draft) = draft {
                match app.apply_settings(draft) {
                    Ok(()) => app.ui.show_toast(ToastKind::Success, "Settings saved"),
                    Err(error) => app.ui.show_toast(ToastKind::Error, error.to_string()),
                }
            }
        }
        KeyCode::Char('r') => match app.store.reset() {
            Ok(()) => {
                if let Some(panel) = app.ui.settings_panel.as_mut() {
                    panel.draft = Settings::default();
                }
                app.ui.show_toast(ToastKind::Success, "Settings reset");
            }
            Err(error) => app.ui.show_toast(ToastKind::Error, error.to_string()),
        },
        _ => {}
    }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('y') | KeyCode::Enter => {
            app.conversation().clear();
            app.ui.mode = Mode::Chat;
            app.ui.show_toast(ToastKind::Success, "New chat started");
        }
        KeyCode::Char('n') | KeyCode::Esc => app.ui.mode = Mode::Chat,
        _ => {}
    }
}
