//! `rodio` playback with a spectrum tap.
//!
//! The decoded song is wrapped in a [`Tap`] source that copies what the
//! output device consumes into a small shared ring. Each tick the player
//! transforms the most recent [`FFT_SIZE`] frames of that ring, so the
//! spectrum follows what is actually audible.

use std::collections::VecDeque;
use std::fs::File;
use std::io::BufReader;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use glam::Vec3;
use rodio::buffer::SamplesBuffer;
use rodio::source::ChannelVolume;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use super::analyzer::{SpectrumAnalyzer, FFT_SIZE};
use super::cue::{explosion_samples, CUE_SAMPLE_RATE};
use super::spatial::mix_cue;
use super::{AudioSink, Listener, SpectrumSource};
use crate::config::SoundSettings;
use crate::error::AudioError;
use crate::playlist::{back_action, Back, Playlist};

/// Samples batched by the tap before taking the lock.
const TAP_BATCH: usize = 512;

#[derive(Debug, Default)]
struct TapBuffer {
    recent: VecDeque<f32>,
    channels: u16,
    sample_rate: u32,
    samples_played: u64,
}

impl TapBuffer {
    fn position(&self) -> Duration {
        let per_second = u64::from(self.channels.max(1)) * u64::from(self.sample_rate.max(1));
        Duration::from_secs_f64(self.samples_played as f64 / per_second as f64)
    }
}

fn lock(tap: &Mutex<TapBuffer>) -> MutexGuard<'_, TapBuffer> {
    match tap.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Source adapter recording the samples it yields.
struct Tap<S> {
    inner: S,
    shared: Arc<Mutex<TapBuffer>>,
    pending: Vec<f32>,
}

impl<S> Tap<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, shared: Arc<Mutex<TapBuffer>>) -> Self {
        {
            let mut tap = lock(&shared);
            *tap = TapBuffer {
                recent: VecDeque::with_capacity(FFT_SIZE * inner.channels() as usize),
                channels: inner.channels(),
                sample_rate: inner.sample_rate(),
                samples_played: 0,
            };
        }
        Self {
            inner,
            shared,
            pending: Vec::with_capacity(TAP_BATCH),
        }
    }

    fn flush(&mut self) {
        let mut tap = lock(&self.shared);
        tap.channels = self.inner.channels();
        tap.sample_rate = self.inner.sample_rate();
        tap.samples_played += self.pending.len() as u64;
        let capacity = FFT_SIZE * tap.channels.max(1) as usize;
        tap.recent.extend(self.pending.drain(..));
        let excess = tap.recent.len().saturating_sub(capacity);
        tap.recent.drain(..excess);
    }
}

impl<S> Iterator for Tap<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        match self.inner.next() {
            Some(sample) => {
                self.pending.push(sample);
                if self.pending.len() >= TAP_BATCH {
                    self.flush();
                }
                Some(sample)
            }
            None => {
                self.flush();
                None
            }
        }
    }
}

impl<S> Source for Tap<S>
where
    S: Source<Item = f32>,
{
    fn current_frame_len(&self) -> Option<usize> {
        self.inner.current_frame_len()
    }

    fn channels(&self) -> u16 {
        self.inner.channels()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }
}

/// Song playback, spectrum analysis and spatial cues.
pub struct Player {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    sink: Option<Sink>,
    tap: Arc<Mutex<TapBuffer>>,
    analyzers: [SpectrumAnalyzer; 2],
    frames: [Vec<f32>; 2],
    playlist: Playlist,
    listener: Listener,
    sound: SoundSettings,
    cue: Vec<f32>,
    cues_played: u64,
}

impl Player {
    /// Open the default output device.
    pub fn new(playlist: Playlist, sound: SoundSettings) -> Result<Self, AudioError> {
        let (stream, handle) = OutputStream::try_default()?;
        Ok(Self {
            _stream: stream,
            handle,
            sink: None,
            tap: Arc::new(Mutex::new(TapBuffer::default())),
            analyzers: [SpectrumAnalyzer::new(), SpectrumAnalyzer::new()],
            frames: [Vec::with_capacity(FFT_SIZE), Vec::with_capacity(FFT_SIZE)],
            playlist,
            listener: Listener::default(),
            sound,
            cue: explosion_samples(0),
            cues_played: 0,
        })
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Title of the current song.
    pub fn title(&self) -> Option<String> {
        self.playlist.title()
    }

    /// Playback position of the current song.
    pub fn position(&self) -> Duration {
        if self.sink.is_none() {
            return Duration::ZERO;
        }
        lock(&self.tap).position()
    }

    /// Load the current song from the start and play it.
    pub fn play_song(&mut self) -> Result<(), AudioError> {
        let path = self.playlist.current().ok_or(AudioError::EmptyPlaylist)?.to_path_buf();
        // Drop the old sink first so the tap is not fed by two songs
        self.sink = None;

        let decoder = Decoder::new(BufReader::new(File::open(&path)?))?;
        let sink = Sink::try_new(&self.handle)?;
        sink.append(Tap::new(decoder.convert_samples::<f32>(), Arc::clone(&self.tap)));
        sink.play();
        self.sink = Some(sink);

        log::info!("Playing {}", path.display());
        Ok(())
    }

    /// Pause or resume; starts the current song if nothing is loaded.
    pub fn toggle_pause(&mut self) -> Result<(), AudioError> {
        match &self.sink {
            Some(sink) if sink.is_paused() => sink.play(),
            Some(sink) => sink.pause(),
            None => self.play_song()?,
        }
        Ok(())
    }

    /// Skip forward, continuing playback if a song was audible.
    pub fn next(&mut self) -> Result<(), AudioError> {
        let playing = self.is_playing();
        self.playlist.next();
        if playing {
            self.play_song()?;
        }
        Ok(())
    }

    /// Restart the song when well into it, otherwise go to the previous one.
    pub fn prev(&mut self) -> Result<(), AudioError> {
        let playing = self.is_playing();
        if playing && back_action(self.position().as_millis() as u64) == Back::Restart {
            return self.play_song();
        }
        self.playlist.advance(-1);
        if playing {
            self.play_song()?;
        }
        Ok(())
    }

    /// Advance past a finished song. Returns `true` when a new song started.
    pub fn poll(&mut self) -> Result<bool, AudioError> {
        let finished = matches!(&self.sink, Some(sink) if !sink.is_paused() && sink.empty());
        if !finished {
            return Ok(false);
        }
        self.playlist.next();
        self.play_song()?;
        Ok(true)
    }

    /// Explosion cues started so far.
    pub fn cues_played(&self) -> u64 {
        self.cues_played
    }
}

impl SpectrumSource for Player {
    fn is_playing(&self) -> bool {
        matches!(&self.sink, Some(sink) if !sink.is_paused() && !sink.empty())
    }

    fn read_spectrum(&mut self, left: &mut [f32], right: &mut [f32]) -> bool {
        let [frames_l, frames_r] = &mut self.frames;
        frames_l.clear();
        frames_r.clear();
        {
            let mut tap = lock(&self.tap);
            let channels = tap.channels.max(1) as usize;
            for frame in tap.recent.make_contiguous().chunks_exact(channels) {
                frames_l.push(frame[0]);
                frames_r.push(frame[channels.min(2) - 1]);
            }
        }
        if frames_l.is_empty() {
            return false;
        }
        let [analyzer_l, analyzer_r] = &mut self.analyzers;
        analyzer_l.magnitudes(frames_l, left);
        analyzer_r.magnitudes(frames_r, right);
        true
    }
}

impl AudioSink for Player {
    fn set_listener(&mut self, listener: &Listener) {
        self.listener = *listener;
    }

    fn play_cue(&mut self, position: Vec3) {
        let mix = mix_cue(&self.listener, position, &self.sound);
        let source = SamplesBuffer::new(1, CUE_SAMPLE_RATE, self.cue.clone())
            .amplify(self.sound.cue_volume * mix.gain)
            .speed(mix.pitch);
        let stereo = ChannelVolume::new(source, vec![mix.left, mix.right]);
        match self.handle.play_raw(stereo) {
            Ok(()) => self.cues_played += 1,
            Err(e) => log::warn!("Explosion cue dropped: {}", e),
        }
    }
}
