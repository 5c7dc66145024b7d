mod click;
mod config;
mod error;
mod flash;
mod metronome;
mod midi_tap;
mod scheduler;
mod screen;
mod tap_tempo;
mod tempo;
mod timer;

use std::{
    fs::File,
    path::PathBuf,
    sync::mpsc::{self, Receiver},
    time::{Duration, Instant},
};

use clap::Parser;
use ratatui::{
    crossterm::event::{self, Event},
    DefaultTerminal,
};

use click::ClickPlayer;
use config::Config;
use error::AppError;
use metronome::Metronome;
use midi_tap::MidiTap;
use screen::Action;
use timer::{ThreadTimers, TimerId, Timers};

const INPUT_POLL: Duration = Duration::from_millis(2);
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// Messages delivered to the main loop from other threads.
#[derive(Debug, Clone, Copy)]
pub enum ControlMessage {
    Tick { timer: TimerId },
    Tap { timestamp: Instant },
}

#[derive(Parser)]
#[command(name = "bpm-flash")]
#[command(about = "Terminal metronome that flashes a colour and clicks on every beat")]
struct Cli {
    /// YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Starting tempo in beats per minute
    #[arg(long)]
    bpm: Option<u32>,

    /// Flash colour, e.g. "#FF0000"
    #[arg(long)]
    color: Option<String>,

    /// Click sound file (WAV, FLAC, Vorbis or MP3)
    #[arg(long)]
    click: Option<PathBuf>,

    /// Tap from a MIDI input whose name contains this text ("" = first port)
    #[arg(long)]
    midi_port: Option<String>,

    /// Log destination; the terminal itself belongs to the screen
    #[arg(long, default_value = "bpm-flash.log")]
    log_file: PathBuf,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(bpm) = self.bpm {
            config.bpm = bpm;
        }
        if let Some(color) = &self.color {
            config.color = color.clone();
        }
        if let Some(click) = &self.click {
            config.click_sound = Some(click.clone());
        }
        if let Some(port) = &self.midi_port {
            config.midi_port = Some(port.clone());
        }
    }
}

fn main() -> Result<(), AppError> {
    let cli = Cli::parse();

    let log_file = File::create(&cli.log_file).map_err(AppError::Log)?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    let settings = config.settings()?;

    log::info!(
        "bpm-flash v{} @ {} BPM, colour {}",
        env!("CARGO_PKG_VERSION"),
        settings.bpm,
        settings.color
    );

    let (tx, rx) = mpsc::channel::<ControlMessage>();

    let _midi = config
        .midi_port
        .as_deref()
        .and_then(|hint| match MidiTap::connect(hint, tx.clone()) {
            Ok(midi) => {
                log::info!("tapping from MIDI input \"{}\"", midi.port_name());
                Some(midi)
            }
            Err(err) => {
                log::warn!("{err}");
                None
            }
        });

    let click = click::load_click(config.click_sound.as_deref());
    let mut metronome = Metronome::new(settings, ThreadTimers::new(tx), click);

    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut metronome, &rx);
    ratatui::restore();

    metronome.unmount();
    log::info!("shutdown after {} pulses", metronome.pulses());
    result
}

fn run<T: Timers, C: ClickPlayer>(
    terminal: &mut DefaultTerminal,
    metronome: &mut Metronome<T, C>,
    rx: &Receiver<ControlMessage>,
) -> Result<(), AppError> {
    let mut dirty = true;
    let mut was_flashing = false;
    let mut last_frame: Option<Instant> = None;

    loop {
        if event::poll(INPUT_POLL)? {
            match event::read()? {
                Event::Key(key) => {
                    if let Some(action) = screen::map_key(key) {
                        if !handle_action(action, metronome, Instant::now()) {
                            return Ok(());
                        }
                        dirty = true;
                    }
                }
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        }

        drain_messages(metronome, rx);

        let now = Instant::now();
        let flashing = metronome.is_flashing(now);
        let frame_due = last_frame.map_or(true, |at| now.duration_since(at) >= FRAME_INTERVAL);

        if frame_due && (dirty || flashing || was_flashing) {
            let view: &Metronome<T, C> = metronome;
            terminal.draw(|frame| screen::render(frame, view, now))?;
            last_frame = Some(now);
            was_flashing = flashing;
            dirty = false;
        }
    }
}

/// Apply everything the timer and MIDI threads queued since the last pass.
/// Ticks that piled up while the loop was stalled count as a single beat.
fn drain_messages<T: Timers, C: ClickPlayer>(
    metronome: &mut Metronome<T, C>,
    rx: &Receiver<ControlMessage>,
) {
    let mut tick = None;
    let mut ticks = 0usize;
    while let Ok(message) = rx.try_recv() {
        match message {
            ControlMessage::Tick { timer } => {
                tick = Some(timer);
                ticks += 1;
            }
            ControlMessage::Tap { timestamp } => metronome.tap(timestamp),
        }
    }

    if let Some(timer) = tick {
        if ticks > 1 {
            log::debug!("{} late ticks skipped", ticks - 1);
        }
        metronome.on_tick(timer, Instant::now());
    }
}

/// Apply one user action. Returns `false` when the user asked to quit.
fn handle_action<T: Timers, C: ClickPlayer>(
    action: Action,
    metronome: &mut Metronome<T, C>,
    now: Instant,
) -> bool {
    match action {
        Action::Quit => return false,
        Action::CycleFocus => metronome.cycle_focus(),
        Action::Insert(c) => metronome.edit_focused(|text| text.push(c), now),
        Action::Backspace => metronome.edit_focused(
            |text| {
                text.pop();
            },
            now,
        ),
        Action::TogglePlaying => metronome.toggle_playing(now),
        Action::Tap => metronome.tap(now),
    }
    true
}
