use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::buffer::Buffer;
use ratatui::prelude::*;
use ratatui::widgets::{Paragraph, Widget};
use std::io::{self, stdout, IsTerminal};
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::pump::{FpsCounter, FramePump};
use crate::audio::{Playback, Player, SpectrumSource};
use crate::config::Config;
use crate::control::{self, ControlCommand, ControlMessage, ControlState, GAIN_STEP};
use crate::ipc;
use crate::renderer::{Canvas, Feature, Renderer};

pub async fn run(config: Config) -> Result<()> {
    // Probe before raw mode; afterwards stdout always looks like a terminal.
    let stdout_is_tty = io::stdout().is_terminal();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = run_app(&mut terminal, config, stdout_is_tty).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Control state at startup. Fullscreen needs a real terminal on stdout.
fn initial_state(config: &Config, stdout_is_tty: bool) -> ControlState {
    let mut state = ControlState::new(config.draw, config.audio.gain, config.tracks.clone());
    state.fullscreen_available = stdout_is_tty;
    state
}

async fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    config: Config,
    stdout_is_tty: bool,
) -> Result<()> {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<ControlMessage>(64);

    spawn_keyboard_reader(cmd_tx.clone());

    let ipc_tx = cmd_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = ipc::start_server(ipc_tx).await {
            warn!("IPC server stopped: {:#}", e);
        }
    });
    drop(cmd_tx);

    let mut player = Player::new(&config.audio).context("Failed to set up audio")?;
    let mut state = initial_state(&config, stdout_is_tty);
    if state.fullscreen_available {
        info!("Fullscreen enabled");
    } else {
        warn!("stdout is not a terminal, fullscreen disabled");
    }

    if let Some(track) = state.current_track().cloned() {
        if let Err(e) = player.load_track(&track) {
            warn!("Could not load {}: {}", track.display(), e);
        }
    }

    let mut renderer = Renderer::new(
        config.canvas.width,
        config.canvas.height,
        player.bin_count(),
        &config.canvas.gradient,
        config.canvas.noise_probability,
    )?;

    let mut pump = FramePump::new(config.canvas.fps);
    let mut fps = FpsCounter::new();

    info!(
        "Rendering {}x{} canvas at {} fps ({:?} per frame), {} bins",
        config.canvas.width,
        config.canvas.height,
        config.canvas.fps,
        pump.period(),
        player.bin_count()
    );

    loop {
        pump.tick().await;

        // Apply everything the control surfaces sent since the last frame.
        while let Ok(message) = cmd_rx.try_recv() {
            let reply = control::process_command(message.command, &mut state, &mut player);
            debug!("control: {}", reply);
            if let Some(tx) = message.reply {
                let _ = tx.send(reply);
            }
        }
        if state.quit {
            break;
        }

        renderer.paint(&mut player, &state.params);
        let current_fps = fps.frame();

        terminal.draw(|frame| {
            let area = frame.area();
            if state.fullscreen {
                frame.render_widget(CanvasView::new(renderer.canvas()), area);
                return;
            }

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(1), Constraint::Length(1)])
                .split(area);
            frame.render_widget(CanvasView::new(renderer.canvas()), chunks[0]);
            frame.render_widget(status_bar(&state, &player, current_fps), chunks[1]);
        })?;
    }

    info!("Shutting down after {} frames", pump.frames());
    Ok(())
}

/// Read terminal key events on a dedicated thread and forward them as
/// control messages. Exits once the render loop drops its receiver.
fn spawn_keyboard_reader(tx: mpsc::Sender<ControlMessage>) {
    thread::spawn(move || loop {
        if tx.is_closed() {
            break;
        }
        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                warn!("Terminal event error: {}", e);
                break;
            }
        }
        let Ok(Event::Key(key)) = event::read() else {
            continue;
        };
        if let Some(command) = key_command(key) {
            if tx.blocking_send(ControlMessage::new(command)).is_err() {
                break;
            }
        }
    });
}

/// Keyboard layout of the control surface.
pub fn key_command(key: KeyEvent) -> Option<ControlCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }
    let command = match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => ControlCommand::Quit,
        KeyCode::Char('q') | KeyCode::Esc => ControlCommand::Quit,
        KeyCode::Char(' ') => ControlCommand::PlayPause,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => ControlCommand::GainStep(GAIN_STEP),
        KeyCode::Char('-') | KeyCode::Down => ControlCommand::GainStep(-GAIN_STEP),
        KeyCode::Char('n') | KeyCode::Right => ControlCommand::NextTrack,
        KeyCode::Char('p') | KeyCode::Left => ControlCommand::PrevTrack,
        KeyCode::Char('f') => ControlCommand::Fullscreen,
        KeyCode::Char(c @ '1'..='6') => {
            let index = c as usize - '1' as usize;
            ControlCommand::Toggle(Feature::all()[index])
        }
        _ => return None,
    };
    Some(command)
}

fn status_bar(state: &ControlState, player: &Player, fps: f32) -> Paragraph<'static> {
    let mut spans = Vec::new();
    for (i, feature) in Feature::all().iter().enumerate() {
        let style = if state.params.get(*feature) {
            Style::default().fg(Color::Black).bg(Color::Gray)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {}:{} ", i + 1, feature), style));
    }

    let transport = if !player.has_output() {
        "no audio".to_string()
    } else if state.playing && !player.is_playing() {
        "[space] ended".to_string()
    } else if state.playing {
        "[space] pause".to_string()
    } else {
        "[space] play".to_string()
    };
    let track = state
        .current_track()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    spans.push(Span::styled(
        format!(
            " | {} | vol {}% | [n/p] {} | [f]ull [q]uit | {:.0} fps",
            transport,
            state.volume_label(),
            track,
            fps
        ),
        Style::default().fg(Color::DarkGray),
    ));

    Paragraph::new(Line::from(spans))
}

/// Draws a canvas into terminal cells, two pixel rows per cell using the
/// upper half block, scaled to the area by nearest-neighbour sampling.
pub struct CanvasView<'a> {
    canvas: &'a Canvas,
}

impl<'a> CanvasView<'a> {
    pub fn new(canvas: &'a Canvas) -> Self {
        Self { canvas }
    }

    /// Canvas pixel composited over black.
    fn sample(&self, x: usize, y: usize) -> Color {
        let (r, g, b, a) = self.canvas.get_pixel(x, y);
        let over_black = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
        Color::Rgb(over_black(r), over_black(g), over_black(b))
    }
}

impl Widget for CanvasView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 || self.canvas.width == 0 || self.canvas.height == 0 {
            return;
        }

        let cols = area.width as usize;
        let rows = area.height as usize * 2;

        for cell_y in 0..area.height {
            let top_row = cell_y as usize * 2;
            let y_top = top_row * self.canvas.height / rows;
            let y_bottom = (top_row + 1) * self.canvas.height / rows;

            for cell_x in 0..area.width {
                let x = cell_x as usize * self.canvas.width / cols;
                if let Some(cell) = buf.cell_mut((area.x + cell_x, area.y + cell_y)) {
                    cell.set_char('▀')
                        .set_fg(self.sample(x, y_top))
                        .set_bg(self.sample(x, y_bottom));
                }
            }
        }
    }
}
