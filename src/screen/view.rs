use std::{str::FromStr, time::Instant};

use ratatui::{
    layout::{Alignment, Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use crate::{
    click::ClickPlayer,
    metronome::{Field, Metronome},
    timer::Timers,
};

const PANEL_WIDTH: u16 = 40;
const PANEL_HEIGHT: u16 = 17;
const FIELD_WIDTH: u16 = 16;

const START_COLOR: Color = Color::Rgb(0x1E, 0x90, 0xFF);
const STOP_COLOR: Color = Color::Rgb(0x44, 0x44, 0x44);
const TAP_COLOR: Color = Color::Rgb(0x32, 0xCD, 0x32);
const FIELD_BG: Color = Color::Rgb(0x22, 0x22, 0x22);
const LABEL_FG: Color = Color::Rgb(0xCC, 0xCC, 0xCC);

const HELP: &str = "Tab · Enter play · Space tap · Esc quit";

/// Background for the whole screen: the flash colour scaled by `opacity`
/// over black. Strings the terminal cannot show as a colour give no flash.
pub fn background(color: &str, opacity: f32) -> Color {
    let opacity = opacity.clamp(0.0, 1.0);
    match Color::from_str(color.trim()) {
        Ok(Color::Rgb(r, g, b)) => {
            let scale = |channel: u8| (channel as f32 * opacity).round() as u8;
            Color::Rgb(scale(r), scale(g), scale(b))
        }
        // Palette colours cannot be faded, so they switch at half opacity.
        Ok(other) if opacity >= 0.5 => other,
        _ => Color::Black,
    }
}

pub fn render<T: Timers, C: ClickPlayer>(
    frame: &mut Frame,
    metronome: &Metronome<T, C>,
    now: Instant,
) {
    let area = frame.area();
    let bg = background(metronome.color(), metronome.opacity(now));
    frame.render_widget(Block::default().style(Style::default().bg(bg)), area);

    let [panel] = Layout::horizontal([Constraint::Length(PANEL_WIDTH)])
        .flex(Flex::Center)
        .areas(area);
    let [panel] = Layout::vertical([Constraint::Length(PANEL_HEIGHT)])
        .flex(Flex::Center)
        .areas(panel);

    let [title, bpm_label, bpm_field, bpm_error, color_label, color_field, _, buttons, taps, help] =
        Layout::vertical([
            Constraint::Length(2),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(panel);

    let white = Style::default().fg(Color::White);
    frame.render_widget(
        Paragraph::new("♪ BPM Flash")
            .style(white.add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center),
        title,
    );

    render_label(frame, "BPM:", bpm_label);
    render_field(
        frame,
        metronome.bpm_input(),
        metronome.focus() == Field::Bpm,
        bpm_field,
    );
    if let Some(err) = metronome.tempo_error() {
        frame.render_widget(
            Paragraph::new(format!("invalid tempo: {err}"))
                .style(Style::default().fg(Color::LightRed))
                .alignment(Alignment::Center),
            bpm_error,
        );
    }

    render_label(frame, "Color (hex):", color_label);
    render_field(
        frame,
        metronome.color(),
        metronome.focus() == Field::Color,
        color_field,
    );

    let [start, _, tap] = Layout::horizontal([
        Constraint::Length(14),
        Constraint::Length(2),
        Constraint::Length(16),
    ])
    .flex(Flex::Center)
    .areas(buttons);
    let (label, color) = if metronome.is_playing() {
        ("Stop", STOP_COLOR)
    } else {
        ("Start", START_COLOR)
    };
    render_button(frame, label, color, start);
    render_button(frame, "Tap Tempo", TAP_COLOR, tap);

    let tapper = metronome.tapper();
    let tempo = match metronome.scheduler().bpm() {
        Some(bpm) => format!("♪ {bpm} BPM"),
        None => format!("{} BPM", metronome.bpm()),
    };
    frame.render_widget(
        Paragraph::new(format!(
            "{tempo} · taps {}/{}",
            tapper.taps(),
            tapper.window()
        ))
        .style(Style::default().fg(LABEL_FG))
        .alignment(Alignment::Center),
        taps,
    );
    frame.render_widget(
        Paragraph::new(HELP)
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center),
        help,
    );
}

fn render_label(frame: &mut Frame, text: &str, area: Rect) {
    frame.render_widget(
        Paragraph::new(text)
            .style(Style::default().fg(LABEL_FG))
            .alignment(Alignment::Center),
        area,
    );
}

fn render_field(frame: &mut Frame, text: &str, focused: bool, area: Rect) {
    let [area] = Layout::horizontal([Constraint::Length(FIELD_WIDTH)])
        .flex(Flex::Center)
        .areas(area);
    let border = if focused {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let content = if focused {
        Line::from(format!("{text}▏"))
    } else {
        Line::from(text.to_string())
    };
    frame.render_widget(
        Paragraph::new(content)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White).bg(FIELD_BG))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Rounded)
                    .border_style(border),
            ),
        area,
    );
}

fn render_button(frame: &mut Frame, label: &str, color: Color, area: Rect) {
    frame.render_widget(
        Paragraph::new(label)
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::White).bg(color))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_type(BorderType::Thick)
                    .border_style(Style::default().fg(color)),
            ),
        area,
    );
}
