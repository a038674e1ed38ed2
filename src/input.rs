//! Input handling for the visualizer.
//!
//! [`Input`] sits between raw winit window events and the scene. It keeps
//! the held/pressed state of keys and mouse buttons, accumulates wheel,
//! pinch and drag motion between ticks, and turns key presses into
//! [`Command`]s for the player.
//!
//! # Mapping
//!
//! | Event | Effect |
//! |-------|--------|
//! | horizontal wheel | azimuth += -0.001 · delta |
//! | vertical wheel | altitude += 0.001 · delta |
//! | pinch | distance /= 1 + magnification |
//! | left drag | rotate 0.005 rad per pixel |
//! | Space | [`Command::TogglePause`] |
//! | N, → | [`Command::Next`] |
//! | P, ← | [`Command::Prev`] |
//! | F | [`Command::ToggleFpsGraph`] |
//! | Escape | [`Command::Quit`] |
//!
//! Wheel deltas are in eighths of a degree, 120 per notch; line deltas
//! from winit are scaled to match and pixel deltas are used as is.

use std::collections::HashSet;

use glam::Vec2;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

use crate::camera::OrbitalCamera;

/// Wheel units per notch.
pub const WHEEL_NOTCH: f32 = 120.0;
/// Radians of azimuth per wheel unit (sign applied at use).
pub const WHEEL_AZIMUTH: f32 = 0.001;
/// Radians of altitude per wheel unit.
pub const WHEEL_ALTITUDE: f32 = 0.001;
/// Radians per pixel of left-button drag.
pub const DRAG_RADIANS: f32 = 0.005;

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other,
}

impl From<WinitMouseButton> for MouseButton {
    fn from(btn: WinitMouseButton) -> Self {
        match btn {
            WinitMouseButton::Left => MouseButton::Left,
            WinitMouseButton::Right => MouseButton::Right,
            WinitMouseButton::Middle => MouseButton::Middle,
            _ => MouseButton::Other,
        }
    }
}

/// Keys the visualizer reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    F,
    N,
    P,
    Left,
    Right,
    Space,
    Escape,
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::KeyF => KeyCode::F,
            WinitKeyCode::KeyN => KeyCode::N,
            WinitKeyCode::KeyP => KeyCode::P,
            WinitKeyCode::ArrowLeft => KeyCode::Left,
            WinitKeyCode::ArrowRight => KeyCode::Right,
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::Escape => KeyCode::Escape,
            _ => KeyCode::Other(key as u32),
        }
    }
}

/// Player and window actions bound to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TogglePause,
    Next,
    Prev,
    ToggleFpsGraph,
    Quit,
}

impl Command {
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::Space => Some(Command::TogglePause),
            KeyCode::N | KeyCode::Right => Some(Command::Next),
            KeyCode::P | KeyCode::Left => Some(Command::Prev),
            KeyCode::F => Some(Command::ToggleFpsGraph),
            KeyCode::Escape => Some(Command::Quit),
            KeyCode::Other(_) => None,
        }
    }
}

/// Input state tracking for keyboard, mouse and gestures.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    mouse_held: HashSet<MouseButton>,

    mouse_position: Option<Vec2>,
    /// Drag motion with the left button held, in pixels.
    drag: Vec2,

    /// Wheel motion in eighths of a degree.
    wheel: Vec2,
    /// Product of pinch scale factors.
    pinch: f32,

    commands: Vec<Command>,
}

impl Input {
    pub fn new() -> Self {
        Self {
            pinch: 1.0,
            ..Default::default()
        }
    }

    /// Check if a key was pressed since the last [`begin_frame`](Self::begin_frame).
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a key is currently held down.
    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Last cursor position in window pixels, if the cursor is inside.
    pub fn mouse_position(&self) -> Option<Vec2> {
        self.mouse_position
    }

    /// Accumulated wheel motion since the last frame.
    pub fn wheel(&self) -> Vec2 {
        self.wheel
    }

    /// Accumulated drag since the last frame.
    pub fn drag(&self) -> Vec2 {
        self.drag
    }

    /// Commands queued since the last call, oldest first.
    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Apply accumulated wheel, pinch and drag motion to the camera.
    pub fn apply(&mut self, camera: &mut OrbitalCamera) {
        let wheel = std::mem::take(&mut self.wheel);
        let drag = std::mem::take(&mut self.drag);
        let pinch = std::mem::replace(&mut self.pinch, 1.0);

        camera.rotate(
            -WHEEL_AZIMUTH * wheel.x + DRAG_RADIANS * drag.x,
            WHEEL_ALTITUDE * wheel.y - DRAG_RADIANS * drag.y,
        );
        if pinch != 1.0 {
            camera.set_distance(camera.distance() / pinch);
        }
    }

    /// Clear per-frame state.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
    }

    /// Process a winit window event.
    pub fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    self.key(KeyCode::from(keycode), event.state == ElementState::Pressed);
                }
            }

            WindowEvent::MouseInput { state, button, .. } => {
                self.mouse_button(MouseButton::from(*button), *state == ElementState::Pressed);
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_moved(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::CursorLeft { .. } => {
                self.mouse_position = None;
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Vec2::new(*x, *y) * WHEEL_NOTCH,
                    MouseScrollDelta::PixelDelta(pos) => Vec2::new(pos.x as f32, pos.y as f32),
                };
                self.scroll(delta);
            }

            WindowEvent::PinchGesture { delta, .. } => {
                self.pinch_by(*delta as f32);
            }

            WindowEvent::Focused(false) => {
                self.keys_held.clear();
                self.mouse_held.clear();
            }

            _ => {}
        }
    }

    fn key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            // No repeat while held
            if self.keys_held.insert(key) {
                self.keys_pressed.insert(key);
                if let Some(command) = Command::from_key(key) {
                    self.commands.push(command);
                }
            }
        } else {
            self.keys_held.remove(&key);
        }
    }

    fn mouse_button(&mut self, button: MouseButton, pressed: bool) {
        if pressed {
            self.mouse_held.insert(button);
        } else {
            self.mouse_held.remove(&button);
        }
    }

    fn cursor_moved(&mut self, position: Vec2) {
        if let Some(previous) = self.mouse_position {
            if self.mouse_held(MouseButton::Left) {
                self.drag += position - previous;
            }
        }
        self.mouse_position = Some(position);
    }

    fn scroll(&mut self, delta: Vec2) {
        if delta.is_finite() {
            self.wheel += delta;
        }
    }

    fn pinch_by(&mut self, magnification: f32) {
        let scale = 1.0 + magnification;
        if scale.is_finite() && scale > 0.0 {
            self.pinch *= scale;
        }
    }
}
