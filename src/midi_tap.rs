use std::fmt;

#[cfg(feature = "midi")]
const CLIENT_NAME: &str = "bpm-flash";
#[cfg(any(test, feature = "midi"))]
const NOTE_ON: u8 = 0x90;

/// True for a note-on with non-zero velocity on any channel.
#[cfg(any(test, feature = "midi"))]
pub fn is_tap(message: &[u8]) -> bool {
    matches!(message, [status, _, velocity, ..] if status & 0xF0 == NOTE_ON && *velocity > 0)
}

#[cfg(feature = "midi")]
pub use self::input::MidiTap;

#[cfg(feature = "midi")]
mod input {
    use std::{sync::mpsc::Sender, time::Instant};

    use midir::{Ignore, MidiInput, MidiInputConnection};

    use super::{is_tap, MidiTapError, CLIENT_NAME};
    use crate::ControlMessage;

    /// Open MIDI input that turns every note-on into a tap.
    pub struct MidiTap {
        _connection: MidiInputConnection<()>,
        port_name: String,
    }

    impl MidiTap {
        /// Connect to the first input port whose name contains `port_hint`
        /// (case-insensitive). An empty hint picks the first port.
        pub fn connect(port_hint: &str, tx: Sender<ControlMessage>) -> Result<Self, MidiTapError> {
            let mut midi_in = MidiInput::new(CLIENT_NAME)
                .map_err(|err| MidiTapError::MidiInit(err.to_string()))?;
            midi_in.ignore(Ignore::All);
            let ports = midi_in.ports();

            if ports.is_empty() {
                return Err(MidiTapError::PortNotFound(port_hint.to_string()));
            }

            let target_port = if port_hint.trim().is_empty() {
                ports[0].clone()
            } else {
                let hint = port_hint.to_lowercase();
                ports
                    .iter()
                    .find(|port| {
                        midi_in
                            .port_name(port)
                            .map(|name| name.to_lowercase().contains(&hint))
                            .unwrap_or(false)
                    })
                    .cloned()
                    .ok_or_else(|| MidiTapError::PortNotFound(port_hint.to_string()))?
            };

            let port_name = midi_in
                .port_name(&target_port)
                .unwrap_or_else(|_| "<unknown>".into());

            let connection = midi_in
                .connect(
                    &target_port,
                    "bpm-flash-tap-in",
                    move |_, message, _| {
                        if is_tap(message) {
                            let _ = tx.send(ControlMessage::Tap {
                                timestamp: Instant::now(),
                            });
                        }
                    },
                    (),
                )
                .map_err(|err| MidiTapError::Connection(err.to_string()))?;

            Ok(Self {
                _connection: connection,
                port_name,
            })
        }

        pub fn port_name(&self) -> &str {
            &self.port_name
        }
    }
}

/// Stand-in when MIDI support is compiled out.
#[cfg(not(feature = "midi"))]
pub struct MidiTap;

#[cfg(not(feature = "midi"))]
impl MidiTap {
    pub fn connect(
        _port_hint: &str,
        _tx: std::sync::mpsc::Sender<crate::ControlMessage>,
    ) -> Result<Self, MidiTapError> {
        Err(MidiTapError::MidiInit(
            "built without MIDI support".to_string(),
        ))
    }

    pub fn port_name(&self) -> &str {
        ""
    }
}

#[derive(Debug)]
#[cfg_attr(not(feature = "midi"), allow(dead_code))]
pub enum MidiTapError {
    MidiInit(String),
    PortNotFound(String),
    Connection(String),
}

impl fmt::Display for MidiTapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiTapError::MidiInit(err) => write!(f, "failed to initialise MIDI input: {err}"),
            MidiTapError::PortNotFound(port) => {
                write!(f, "no MIDI input port matching \"{port}\" was found")
            }
            MidiTapError::Connection(err) => write!(f, "failed to open MIDI connection: {err}"),
        }
    }
}

impl std::error::Error for MidiTapError {}
