//! Sound effects: game events and the sinks that play them.

/// Sound cues raised by the game logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Fall,
    Move,
    Rotate,
    RotateFail,
    Touchdown,
    Lockdown,
    HardDrop,
    LineClear,
    LevelUp,
    GameOver,
}

/// Something that can play sound cues. The game only queues them; the app drains the queue here.
pub trait SoundSink {
    fn play(&mut self, sound: Sound);
}

/// Drops every cue.
#[derive(Debug, Default)]
pub struct SilentSink;

impl SoundSink for SilentSink {
    fn play(&mut self, _sound: Sound) {}
}

/// Pick the sink for this run: audio output when built with it and not muted, silence otherwise.
pub fn open_sink(mute: bool) -> Box<dyn SoundSink> {
    if mute {
        log::info!("sound muted");
        return Box::new(SilentSink);
    }
    #[cfg(feature = "audio")]
    {
        match audio::RodioSink::new() {
            Ok(sink) => return Box::new(sink),
            Err(e) => log::warn!("no audio output, continuing silently: {e}"),
        }
    }
    #[cfg(not(feature = "audio"))]
    log::info!("built without the `audio` feature; sound disabled");
    Box::new(SilentSink)
}

#[cfg(feature = "audio")]
mod audio {
    use super::{Sound, SoundSink};
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use thiserror::Error;

    const SAMPLE_RATE: u32 = 44_100;

    #[derive(Debug, Error)]
    pub enum SoundError {
        #[error("audio stream: {0}")]
        Stream(#[from] rodio::StreamError),
    }

    /// Short synthesized tones through the default output device.
    pub struct RodioSink {
        _stream: OutputStream,
        handle: OutputStreamHandle,
    }

    impl RodioSink {
        pub fn new() -> Result<Self, SoundError> {
            let (stream, handle) = OutputStream::try_default()?;
            Ok(Self {
                _stream: stream,
                handle,
            })
        }
    }

    impl SoundSink for RodioSink {
        fn play(&mut self, sound: Sound) {
            let samples = samples_for(sound);
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.append(SamplesBuffer::new(1, SAMPLE_RATE, samples));
                    sink.detach();
                }
                Err(e) => log::debug!("dropping {sound:?}: {e}"),
            }
        }
    }

    /// (frequency Hz, duration s, volume) notes played back to back.
    fn notes(sound: Sound) -> &'static [(f32, f32, f32)] {
        match sound {
            Sound::Fall => &[(180.0, 0.02, 0.03)],
            Sound::Move => &[(440.0, 0.03, 0.06)],
            Sound::Rotate => &[(660.0, 0.04, 0.06)],
            Sound::RotateFail => &[(150.0, 0.06, 0.08)],
            Sound::Touchdown => &[(220.0, 0.05, 0.08)],
            Sound::Lockdown => &[(110.0, 0.08, 0.10)],
            Sound::HardDrop => &[(330.0, 0.03, 0.10), (165.0, 0.06, 0.10)],
            Sound::LineClear => &[(523.0, 0.08, 0.10), (659.0, 0.08, 0.10), (784.0, 0.12, 0.10)],
            Sound::LevelUp => &[(784.0, 0.10, 0.10), (1047.0, 0.18, 0.10)],
            Sound::GameOver => &[(392.0, 0.2, 0.12), (311.0, 0.2, 0.12), (196.0, 0.4, 0.12)],
        }
    }

    fn samples_for(sound: Sound) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, duration, volume) in notes(sound) {
            let count = (SAMPLE_RATE as f32 * duration) as usize;
            for i in 0..count {
                let t = i as f32 / SAMPLE_RATE as f32;
                // Linear fade-out avoids clicks at the note boundary.
                let envelope = 1.0 - i as f32 / count as f32;
                samples.push((t * freq * std::f32::consts::TAU).sin() * volume * envelope);
            }
        }
        samples
    }
}
