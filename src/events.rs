use log::debug;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};

/// Runtime setting kinds the settings panel can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingsKind {
    MouseSensitivity,
    MoveSpeed,
    AudioVolume,
}

impl SettingsKind {
    pub const ALL: [SettingsKind; 3] =
        [SettingsKind::MouseSensitivity, SettingsKind::MoveSpeed, SettingsKind::AudioVolume];

    pub fn wire_name(self) -> &'static str {
        match self {
            SettingsKind::MouseSensitivity => "mouse-sensitivity",
            SettingsKind::MoveSpeed => "move-speed",
            SettingsKind::AudioVolume => "audio-volume",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_name() == name)
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingsKind::MouseSensitivity => "Mouse sensitivity",
            SettingsKind::MoveSpeed => "Move speed",
            SettingsKind::AudioVolume => "Audio volume",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SettingsEvent {
    MouseSensitivity(f32),
    MoveSpeed(f32),
    AudioVolume(f32),
}

impl SettingsEvent {
    pub fn new(kind: SettingsKind, value: f32) -> Self {
        match kind {
            SettingsKind::MouseSensitivity => SettingsEvent::MouseSensitivity(value),
            SettingsKind::MoveSpeed => SettingsEvent::MoveSpeed(value),
            SettingsKind::AudioVolume => SettingsEvent::AudioVolume(value),
        }
    }

    /// Builds an event from its `{ type, value }` wire form. Unknown types yield `None`.
    pub fn from_wire(kind: &str, value: f32) -> Option<Self> {
        SettingsKind::from_wire(kind).map(|kind| Self::new(kind, value))
    }

    pub fn kind(&self) -> SettingsKind {
        match self {
            SettingsEvent::MouseSensitivity(_) => SettingsKind::MouseSensitivity,
            SettingsEvent::MoveSpeed(_) => SettingsKind::MoveSpeed,
            SettingsEvent::AudioVolume(_) => SettingsKind::AudioVolume,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            SettingsEvent::MouseSensitivity(v) | SettingsEvent::MoveSpeed(v) | SettingsEvent::AudioVolume(v) => v,
        }
    }
}

impl fmt::Display for SettingsEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={:.4}", self.kind().wire_name(), self.value())
    }
}

/// Process-wide settings channel. Any number of publishers, exactly one subscriber.
pub struct SettingsChannel;

impl SettingsChannel {
    pub fn open() -> (SettingsPublisher, SettingsSubscriber) {
        let (tx, rx) = mpsc::channel();
        (SettingsPublisher { tx }, SettingsSubscriber { rx })
    }
}

#[derive(Clone)]
pub struct SettingsPublisher {
    tx: Sender<SettingsEvent>,
}

impl SettingsPublisher {
    pub fn publish(&self, event: SettingsEvent) {
        if self.tx.send(event).is_err() {
            debug!("[settings] no subscriber, dropping {event}");
        }
    }

    pub fn publish_wire(&self, kind: &str, value: f32) {
        match SettingsEvent::from_wire(kind, value) {
            Some(event) => self.publish(event),
            None => debug!("[settings] ignoring unknown setting '{kind}'"),
        }
    }
}

pub struct SettingsSubscriber {
    rx: Receiver<SettingsEvent>,
}

impl SettingsSubscriber {
    pub fn drain(&self) -> Vec<SettingsEvent> {
        self.rx.try_iter().collect()
    }
}
