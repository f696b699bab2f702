use log::warn;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use winit::event::{DeviceEvent, ElementState, MouseButton, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Walking and look state accumulated from window and device events between frames.
pub struct Input {
    bindings: InputBindings,
    pub mouse_delta: (f32, f32),
    forward_held: bool,
    backward_held: bool,
    left_held: bool,
    right_held: bool,
    ascend_held: bool,
    descend_held: bool,
    boost_held: bool,
    look_held: bool,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(path: impl AsRef<Path>) -> Self {
        Self::with_bindings(InputBindings::load_or_default(path))
    }

    fn with_bindings(bindings: InputBindings) -> Self {
        Self {
            bindings,
            mouse_delta: (0.0, 0.0),
            forward_held: false,
            backward_held: false,
            left_held: false,
            right_held: false,
            ascend_held: false,
            descend_held: false,
            boost_held: false,
            look_held: false,
        }
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key { key, pressed } => self.apply_key_binding(&key, pressed),
            InputEvent::MouseMove { dx, dy } => {
                if self.look_held {
                    self.mouse_delta.0 += dx;
                    self.mouse_delta.1 += dy;
                }
            }
            InputEvent::MouseButton { button: MouseButton::Right, pressed } => {
                self.look_held = pressed;
                if !pressed {
                    self.mouse_delta = (0.0, 0.0);
                }
            }
            InputEvent::FocusLost => self.release_all(),
            InputEvent::MouseButton { .. } | InputEvent::Other => {}
        }
    }

    /// Returns and clears the look delta gathered since the last call.
    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.mouse_delta)
    }

    /// Local-space walk intent: x = strafe right, y = ascend, z = forward.
    pub fn walk_axes(&self) -> (f32, f32, f32) {
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        (
            axis(self.right_held, self.left_held),
            axis(self.ascend_held, self.descend_held),
            axis(self.forward_held, self.backward_held),
        )
    }

    pub fn boost_held(&self) -> bool {
        self.boost_held
    }

    fn release_all(&mut self) {
        self.forward_held = false;
        self.backward_held = false;
        self.left_held = false;
        self.right_held = false;
        self.ascend_held = false;
        self.descend_held = false;
        self.boost_held = false;
        self.look_held = false;
        self.mouse_delta = (0.0, 0.0);
    }

    fn apply_key_binding(&mut self, key: &Key, pressed: bool) {
        if let Some(binding_key) = InputKeyBinding::from_event_key(key) {
            let actions: Vec<_> = self.bindings.actions_for_key(&binding_key).collect();
            for action in actions {
                self.update_action_state(action, pressed);
            }
        }
    }

    fn update_action_state(&mut self, action: InputAction, pressed: bool) {
        match action {
            InputAction::WalkForward => self.forward_held = pressed,
            InputAction::WalkBackward => self.backward_held = pressed,
            InputAction::StrafeLeft => self.left_held = pressed,
            InputAction::StrafeRight => self.right_held = pressed,
            InputAction::Ascend => self.ascend_held = pressed,
            InputAction::Descend => self.descend_held = pressed,
            InputAction::Boost => self.boost_held = pressed,
        }
    }
}

impl Default for Input {
    fn default() -> Self {
        Self::with_bindings(InputBindings::default())
    }
}

#[derive(Debug, Clone)]
struct InputBindings {
    key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>>,
}

impl InputBindings {
    fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<InputConfigFile>(&contents) {
                Ok(config) => Self::from_config(config, &path.display().to_string()),
                Err(err) => {
                    warn!("[input] Failed to parse {}: {err}. Falling back to default bindings.", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                warn!("[input] Failed to read {}: {err}. Falling back to default bindings.", path.display());
                Self::default()
            }
        }
    }

    fn from_config(config: InputConfigFile, origin: &str) -> Self {
        let mut action_map = Self::default_action_map();
        for (action, keys) in config.into_overrides(origin) {
            action_map.insert(action, keys);
        }
        Self::from_action_map(action_map)
    }

    fn default_action_map() -> HashMap<InputAction, Vec<InputKeyBinding>> {
        use InputAction::*;
        let mut map = HashMap::new();
        map.insert(WalkForward, vec![InputKeyBinding::character("w"), InputKeyBinding::named(NamedKeyCode::ArrowUp)]);
        map.insert(
            WalkBackward,
            vec![InputKeyBinding::character("s"), InputKeyBinding::named(NamedKeyCode::ArrowDown)],
        );
        map.insert(StrafeLeft, vec![InputKeyBinding::character("a"), InputKeyBinding::named(NamedKeyCode::ArrowLeft)]);
        map.insert(
            StrafeRight,
            vec![InputKeyBinding::character("d"), InputKeyBinding::named(NamedKeyCode::ArrowRight)],
        );
        map.insert(Ascend, vec![InputKeyBinding::character("e")]);
        map.insert(Descend, vec![InputKeyBinding::character("q")]);
        map.insert(Boost, vec![InputKeyBinding::named(NamedKeyCode::Shift)]);
        map
    }

    fn from_action_map(action_map: HashMap<InputAction, Vec<InputKeyBinding>>) -> Self {
        let mut key_to_actions: HashMap<InputKeyBinding, Vec<InputAction>> = HashMap::new();
        for (action, keys) in action_map {
            for key in keys {
                key_to_actions.entry(key).or_default().push(action);
            }
        }
        Self { key_to_actions }
    }

    fn actions_for_key(&self, key: &InputKeyBinding) -> impl Iterator<Item = InputAction> + '_ {
        self.key_to_actions.get(key).into_iter().flatten().copied()
    }
}

impl Default for InputBindings {
    fn default() -> Self {
        Self::from_action_map(Self::default_action_map())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum InputKeyBinding {
    Character(String),
    Named(NamedKeyCode),
}

impl InputKeyBinding {
    fn character(ch: &str) -> Self {
        Self::Character(ch.to_lowercase())
    }

    fn named(named: NamedKeyCode) -> Self {
        Self::Named(named)
    }

    fn from_event_key(key: &Key) -> Option<Self> {
        match key {
            Key::Character(ch) => {
                let s = ch.to_string();
                if s.is_empty() {
                    None
                } else {
                    Some(Self::Character(s.to_lowercase()))
                }
            }
            Key::Named(named) => NamedKeyCode::from_named_key(named).map(Self::Named),
            _ => None,
        }
    }

    fn from_config_value(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        if normalized.is_empty() {
            return None;
        }
        if let Some(named) = NamedKeyCode::from_str(&normalized) {
            return Some(Self::Named(named));
        }
        if normalized.chars().count() == 1 {
            return Some(Self::Character(normalized));
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NamedKeyCode {
    Space,
    Shift,
    Control,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
}

impl NamedKeyCode {
    fn from_named_key(key: &NamedKey) -> Option<Self> {
        match key {
            NamedKey::Space => Some(Self::Space),
            NamedKey::Shift => Some(Self::Shift),
            NamedKey::Control => Some(Self::Control),
            NamedKey::ArrowUp => Some(Self::ArrowUp),
            NamedKey::ArrowDown => Some(Self::ArrowDown),
            NamedKey::ArrowLeft => Some(Self::ArrowLeft),
            NamedKey::ArrowRight => Some(Self::ArrowRight),
            _ => None,
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "space" => Some(Self::Space),
            "shift" | "left_shift" | "right_shift" => Some(Self::Shift),
            "ctrl" | "control" | "left_ctrl" | "right_ctrl" => Some(Self::Control),
            "up" | "arrow_up" => Some(Self::ArrowUp),
            "down" | "arrow_down" => Some(Self::ArrowDown),
            "left" | "arrow_left" => Some(Self::ArrowLeft),
            "right" | "arrow_right" => Some(Self::ArrowRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum InputAction {
    WalkForward,
    WalkBackward,
    StrafeLeft,
    StrafeRight,
    Ascend,
    Descend,
    Boost,
}

impl InputAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "walk_forward" => Some(Self::WalkForward),
            "walk_backward" => Some(Self::WalkBackward),
            "strafe_left" => Some(Self::StrafeLeft),
            "strafe_right" => Some(Self::StrafeRight),
            "ascend" => Some(Self::Ascend),
            "descend" => Some(Self::Descend),
            "boost" => Some(Self::Boost),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InputConfigFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl InputConfigFile {
    fn into_overrides(self, origin: &str) -> HashMap<InputAction, Vec<InputKeyBinding>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let Some(action) = InputAction::from_str(&action_name.trim().to_lowercase()) else {
                warn!("[input] {origin}: unknown action '{action_name}', ignoring.");
                continue;
            };
            let mut parsed = Vec::new();
            for key in keys {
                match InputKeyBinding::from_config_value(&key) {
                    Some(binding) => parsed.push(binding),
                    None => warn!("[input] {origin}: unknown key '{key}' for action '{action_name}', ignoring."),
                }
            }
            if parsed.is_empty() {
                warn!("[input] {origin}: action '{action_name}' has no valid keys, keeping defaults.");
                continue;
            }
            overrides.insert(action, parsed);
        }
        overrides
    }
}

pub enum InputEvent {
    Key { key: Key, pressed: bool },
    MouseMove { dx: f32, dy: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    FocusLost,
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::MouseInput { state, button, .. } => {
                InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed }
            }
            WindowEvent::KeyboardInput { event, .. } => InputEvent::Key {
                key: event.logical_key.clone(),
                pressed: event.state == ElementState::Pressed,
            },
            WindowEvent::Focused(false) => InputEvent::FocusLost,
            _ => InputEvent::Other,
        }
    }

    pub fn from_device_event(ev: &DeviceEvent) -> Self {
        match ev {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                InputEvent::MouseMove { dx: *dx as f32, dy: *dy as f32 }
            }
            _ => InputEvent::Other,
        }
    }
}
