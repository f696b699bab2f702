use std::time::Instant;

use crate::time::Time;

pub(crate) struct FrameClock {
    time: Time,
    frames: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTick {
    pub dt: f32,
    pub elapsed: f32,
    pub frame: u64,
}

impl FrameClock {
    pub(crate) fn new(time: Time) -> Self {
        Self { time, frames: 0 }
    }

    pub(crate) fn tick_at(&mut self, now: Instant) -> FrameTick {
        self.time.tick_at(now);
        self.frames += 1;
        FrameTick { dt: self.time.delta_seconds(), elapsed: self.time.elapsed_seconds(), frame: self.frames }
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }
}
