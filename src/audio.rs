use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};
use rodio::decoder::LoopedDecoder;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use crate::app::subsystems::AudioSystem;
use crate::config::{AudioConfig, PoemVerse};
use crate::time::duration_from_secs;

/// The process-wide output stream. The stream must outlive every sink created from
/// its handle, so subsystems share it through an `Rc`.
pub struct AudioDevice {
    _stream: OutputStream,
    handle: OutputStreamHandle,
}

impl AudioDevice {
    pub fn open() -> Result<Self> {
        let (stream, handle) = OutputStream::try_default().context("No default audio output device")?;
        Ok(Self { _stream: stream, handle })
    }

    pub fn handle(&self) -> &OutputStreamHandle {
        &self.handle
    }
}

pub fn open_looped(path: &Path) -> Result<LoopedDecoder<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open audio '{}'", path.display()))?;
    Decoder::new_looped(BufReader::new(file)).with_context(|| format!("Failed to decode '{}'", path.display()))
}

fn open_once(path: &Path) -> Result<Decoder<BufReader<File>>> {
    let file = File::open(path).with_context(|| format!("Failed to open audio '{}'", path.display()))?;
    Decoder::new(BufReader::new(file)).with_context(|| format!("Failed to decode '{}'", path.display()))
}

/// Decides when the next verse starts: each verse plays to its end, then the
/// installation stays quiet for `gap` before the following one. Wraps around.
#[derive(Debug, Clone)]
pub struct PoetryScheduler {
    verses: usize,
    next: usize,
    gap: Duration,
    resume_at: Option<Instant>,
    playing: bool,
}

impl PoetryScheduler {
    pub fn new(verses: usize, gap: Duration) -> Self {
        Self { verses, next: 0, gap, resume_at: None, playing: false }
    }

    /// `idle` reports whether the output has drained. Returns the verse to start now, if any.
    pub fn poll(&mut self, now: Instant, idle: bool) -> Option<usize> {
        if self.verses == 0 {
            return None;
        }
        if self.playing {
            if !idle {
                return None;
            }
            self.playing = false;
            self.resume_at = Some(now + self.gap);
        }
        if matches!(self.resume_at, Some(at) if now < at) {
            return None;
        }
        self.resume_at = None;
        self.playing = true;
        let verse = self.next;
        self.next = (verse + 1) % self.verses;
        Some(verse)
    }
}

/// Recited poetry over the whole garden, one verse at a time.
pub struct AudioPoetrySystem {
    dir: PathBuf,
    verses: Vec<PoemVerse>,
    scheduler: PoetryScheduler,
    sink: Option<Sink>,
    narration_volume: f32,
    master_volume: f32,
}

impl AudioPoetrySystem {
    pub fn new(config: &AudioConfig, device: Option<Rc<AudioDevice>>) -> Self {
        let sink = device.as_ref().and_then(|device| match Sink::try_new(device.handle()) {
            Ok(sink) => {
                sink.set_volume(config.volume.max(0.0));
                Some(sink)
            }
            Err(err) => {
                warn!("[poetry] narration disabled: {err}");
                None
            }
        });
        let gap = duration_from_secs(config.verse_gap_seconds);
        info!("[poetry] {} verses, {:.0}s apart", config.verses.len(), gap.as_secs_f32());
        Self {
            dir: config.poem_dir.clone(),
            verses: config.verses.clone(),
            scheduler: PoetryScheduler::new(config.verses.len(), gap),
            sink,
            narration_volume: config.volume.max(0.0),
            master_volume: 1.0,
        }
    }

    fn output_volume(&self) -> f32 {
        self.narration_volume * self.master_volume
    }
}

impl AudioSystem for AudioPoetrySystem {
    fn update(&mut self) {
        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        let Some(index) = self.scheduler.poll(Instant::now(), sink.empty()) else {
            return;
        };
        let verse = &self.verses[index];
        match open_once(&self.dir.join(&verse.file)) {
            Ok(source) => {
                info!("[poetry] reciting '{}'", verse.title);
                sink.append(source);
            }
            // the sink stays empty, so the scheduler moves on after one gap
            Err(err) => warn!("[poetry] skipping '{}': {err:#}", verse.title),
        }
    }

    fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.max(0.0);
        if let Some(sink) = self.sink.as_ref() {
            sink.set_volume(self.output_volume());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verses_alternate_with_silence() {
        let start = Instant::now();
        let gap = Duration::from_secs(10);
        let mut scheduler = PoetryScheduler::new(2, gap);
        assert_eq!(scheduler.poll(start, true), Some(0));
        assert_eq!(scheduler.poll(start + Duration::from_secs(5), false), None);
        // verse 0 drains at t=30, gap runs to t=40
        assert_eq!(scheduler.poll(start + Duration::from_secs(30), true), None);
        assert_eq!(scheduler.poll(start + Duration::from_secs(35), true), None);
        assert_eq!(scheduler.poll(start + Duration::from_secs(40), true), Some(1));
        assert_eq!(scheduler.poll(start + Duration::from_secs(50), true), None);
        assert_eq!(scheduler.poll(start + Duration::from_secs(60), true), Some(0));
    }

    #[test]
    fn empty_playlist_never_starts() {
        let mut scheduler = PoetryScheduler::new(0, Duration::ZERO);
        assert_eq!(scheduler.poll(Instant::now(), true), None);
    }

    #[test]
    fn silent_without_device() {
        let mut poetry = AudioPoetrySystem::new(&AudioConfig::default(), None);
        poetry.update();
        poetry.set_master_volume(0.5);
    }

    #[test]
    fn master_volume_scales_narration() {
        let config = AudioConfig { volume: 0.8, ..AudioConfig::default() };
        let mut poetry = AudioPoetrySystem::new(&config, None);
        assert!((poetry.output_volume() - 0.8).abs() < 1e-6);
        poetry.set_master_volume(0.5);
        assert!((poetry.output_volume() - 0.4).abs() < 1e-6);
        poetry.set_master_volume(-1.0);
        assert_eq!(poetry.output_volume(), 0.0);
    }
}
