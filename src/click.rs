use std::{fmt, path::Path};

/// Something that can sound the metronome click.
pub trait ClickPlayer {
    /// Start the click now, cutting off any click still sounding.
    fn play(&mut self) -> Result<(), AudioError>;

    /// Release the audio device. Safe to call more than once.
    fn unload(&mut self);
}

/// Player used when audio is compiled out or the device is unavailable.
#[derive(Debug, Default)]
pub struct SilentClick;

impl ClickPlayer for SilentClick {
    fn play(&mut self) -> Result<(), AudioError> {
        Ok(())
    }

    fn unload(&mut self) {}
}

#[derive(Debug)]
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
pub enum AudioError {
    Stream(String),
    Decode(String),
    Io(std::io::Error),
    Play(String),
    Unloaded,
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioError::Stream(err) => write!(f, "failed to open audio output: {err}"),
            AudioError::Decode(err) => write!(f, "failed to decode click sound: {err}"),
            AudioError::Io(err) => write!(f, "failed to read click sound: {err}"),
            AudioError::Play(err) => write!(f, "failed to play click: {err}"),
            AudioError::Unloaded => write!(f, "click sound has been unloaded"),
        }
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::Io(err)
    }
}

#[cfg(any(test, feature = "audio"))]
const CLICK_SAMPLE_RATE: u32 = 44_100;
#[cfg(any(test, feature = "audio"))]
const CLICK_FREQUENCY: f32 = 1_000.0;
#[cfg(any(test, feature = "audio"))]
const CLICK_LENGTH_MS: u32 = 30;
#[cfg(any(test, feature = "audio"))]
const CLICK_DECAY: f32 = 150.0;

/// A short decaying sine burst, used when no click sound file is configured.
#[cfg(any(test, feature = "audio"))]
pub fn synth_click() -> Vec<f32> {
    let len = CLICK_SAMPLE_RATE * CLICK_LENGTH_MS / 1000;
    (0..len)
        .map(|i| {
            let t = i as f32 / CLICK_SAMPLE_RATE as f32;
            let envelope = (-t * CLICK_DECAY).exp();
            (2.0 * std::f32::consts::PI * CLICK_FREQUENCY * t).sin() * envelope * 0.8
        })
        .collect()
}

#[cfg(feature = "audio")]
pub use self::rodio_click::RodioClick;

#[cfg(feature = "audio")]
mod rodio_click {
    use std::{fs::File, io::BufReader, path::Path};

    use rodio::{buffer::SamplesBuffer, Decoder, OutputStream, OutputStreamHandle, Sink, Source};

    use super::{synth_click, AudioError, ClickPlayer, CLICK_SAMPLE_RATE};

    struct Output {
        // Must outlive the handle and sink.
        _stream: OutputStream,
        handle: OutputStreamHandle,
        sink: Option<Sink>,
    }

    /// Click decoded once into memory and replayed through rodio.
    pub struct RodioClick {
        output: Option<Output>,
        channels: u16,
        sample_rate: u32,
        samples: Vec<f32>,
    }

    impl RodioClick {
        /// Open the default output device and load `asset`, or the built-in
        /// click when no asset is given.
        pub fn load(asset: Option<&Path>) -> Result<Self, AudioError> {
            let (channels, sample_rate, samples) = match asset {
                Some(path) => {
                    let file = BufReader::new(File::open(path)?);
                    let decoder =
                        Decoder::new(file).map_err(|err| AudioError::Decode(err.to_string()))?;
                    let channels = decoder.channels();
                    let sample_rate = decoder.sample_rate();
                    let samples: Vec<f32> = decoder.convert_samples().collect();
                    (channels, sample_rate, samples)
                }
                None => (1, CLICK_SAMPLE_RATE, synth_click()),
            };

            let (stream, handle) =
                OutputStream::try_default().map_err(|err| AudioError::Stream(err.to_string()))?;

            log::debug!(
                "click loaded: {} samples, {} ch @ {} Hz",
                samples.len(),
                channels,
                sample_rate
            );

            Ok(Self {
                output: Some(Output {
                    _stream: stream,
                    handle,
                    sink: None,
                }),
                channels,
                sample_rate,
                samples,
            })
        }
    }

    impl ClickPlayer for RodioClick {
        fn play(&mut self) -> Result<(), AudioError> {
            let output = self.output.as_mut().ok_or(AudioError::Unloaded)?;
            let sink =
                Sink::try_new(&output.handle).map_err(|err| AudioError::Play(err.to_string()))?;
            sink.append(SamplesBuffer::new(
                self.channels,
                self.sample_rate,
                self.samples.clone(),
            ));
            // Dropping the previous sink stops a click that is still ringing.
            output.sink = Some(sink);
            Ok(())
        }

        fn unload(&mut self) {
            if self.output.take().is_some() {
                log::debug!("click unloaded");
            }
        }
    }
}

/// Load the configured click, falling back to silence when audio is
/// unavailable. Failure here never stops the metronome.
pub fn load_click(asset: Option<&Path>) -> Box<dyn ClickPlayer> {
    #[cfg(feature = "audio")]
    {
        match RodioClick::load(asset) {
            Ok(click) => return Box::new(click),
            Err(err) => log::warn!("audio disabled: {err}"),
        }
    }
    #[cfg(not(feature = "audio"))]
    {
        if let Some(path) = asset {
            log::warn!(
                "built without audio support, ignoring click sound {}",
                path.display()
            );
        }
    }
    Box::new(SilentClick)
}

impl<C: ClickPlayer + ?Sized> ClickPlayer for Box<C> {
    fn play(&mut self) -> Result<(), AudioError> {
        (**self).play()
    }

    fn unload(&mut self) {
        (**self).unload()
    }
}
