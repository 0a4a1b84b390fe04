//! Keyboard, mouse and gamepad state.
//!
//! [`Input`] is rebuilt from winit window events and polled gamepads and is
//! handed to [`crate::flow::Game::on_update`] every frame.

use std::collections::HashSet;

use winit::{
    event::{ElementState, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::gamepad::GamepadSource;

/// Gamepad buttons in W3C standard-layout order.
const STANDARD_BUTTONS: [gilrs::Button; 17] = [
    gilrs::Button::South,
    gilrs::Button::East,
    gilrs::Button::West,
    gilrs::Button::North,
    gilrs::Button::LeftTrigger,
    gilrs::Button::RightTrigger,
    gilrs::Button::LeftTrigger2,
    gilrs::Button::RightTrigger2,
    gilrs::Button::Select,
    gilrs::Button::Start,
    gilrs::Button::LeftThumb,
    gilrs::Button::RightThumb,
    gilrs::Button::DPadUp,
    gilrs::Button::DPadDown,
    gilrs::Button::DPadLeft,
    gilrs::Button::DPadRight,
    gilrs::Button::Mode,
];

/// Gamepad axes in W3C standard-layout order.
const STANDARD_AXES: [gilrs::Axis; 4] = [
    gilrs::Axis::LeftStickX,
    gilrs::Axis::LeftStickY,
    gilrs::Axis::RightStickX,
    gilrs::Axis::RightStickY,
];

/// Snapshot of one pad.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GamepadState {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
}

#[derive(Clone, Debug, Default)]
pub struct Input {
    keys: HashSet<KeyCode>,
    mouse_buttons: HashSet<MouseButton>,
    cursor: (i32, i32),
    gamepads: Vec<GamepadState>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons.contains(&button)
    }

    /// Cursor in logical screen pixels.
    pub fn cursor_position(&self) -> (i32, i32) {
        self.cursor
    }

    pub fn gamepad_count(&self) -> usize {
        self.gamepads.len()
    }

    pub fn gamepad_axis_num(&self, id: usize) -> usize {
        self.gamepads.get(id).map_or(0, |pad| pad.axes.len())
    }

    pub fn gamepad_axis(&self, id: usize, axis: usize) -> f32 {
        self.gamepads
            .get(id)
            .and_then(|pad| pad.axes.get(axis).copied())
            .unwrap_or(0.0)
    }

    pub fn gamepad_button_num(&self, id: usize) -> usize {
        self.gamepads.get(id).map_or(0, |pad| pad.buttons.len())
    }

    pub fn is_gamepad_button_pressed(&self, id: usize, button: usize) -> bool {
        self.gamepads
            .get(id)
            .and_then(|pad| pad.buttons.get(button).copied())
            .unwrap_or(false)
    }

    /// Apply a window event. `actual_scale` converts window pixels to screen pixels.
    pub fn handle_window_event(&mut self, event: &WindowEvent, actual_scale: f64) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    self.set_key(code, event.state);
                }
            }
            WindowEvent::MouseInput { state, button, .. } => match state {
                ElementState::Pressed => {
                    self.mouse_buttons.insert(*button);
                }
                ElementState::Released => {
                    self.mouse_buttons.remove(button);
                }
            },
            WindowEvent::CursorMoved { position, .. } => {
                let scale = if actual_scale > 0.0 { actual_scale } else { 1.0 };
                self.cursor = ((position.x / scale) as i32, (position.y / scale) as i32);
            }
            WindowEvent::Focused(false) => {
                // Releases are not delivered to unfocused windows.
                self.keys.clear();
                self.mouse_buttons.clear();
            }
            _ => {}
        }
    }

    fn set_key(&mut self, code: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.keys.insert(code);
            }
            ElementState::Released => {
                self.keys.remove(&code);
            }
        }
    }

    pub(crate) fn set_gamepads(&mut self, gamepads: Vec<GamepadState>) {
        self.gamepads = gamepads;
    }
}

impl GamepadSource for Input {
    fn gamepad_axis_num(&self, id: usize) -> usize {
        Input::gamepad_axis_num(self, id)
    }

    fn gamepad_axis(&self, id: usize, axis: usize) -> f32 {
        Input::gamepad_axis(self, id, axis)
    }

    fn gamepad_button_num(&self, id: usize) -> usize {
        Input::gamepad_button_num(self, id)
    }

    fn is_gamepad_button_pressed(&self, id: usize, button: usize) -> bool {
        Input::is_gamepad_button_pressed(self, id, button)
    }
}

/// Connected pads, read through gilrs.
///
/// If gilrs cannot start, the game runs without gamepads.
pub struct Gamepads {
    gilrs: Option<gilrs::Gilrs>,
}

impl std::fmt::Debug for Gamepads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepads")
            .field("available", &self.gilrs.is_some())
            .finish()
    }
}

impl Gamepads {
    pub fn new() -> Self {
        let gilrs = match gilrs::Gilrs::new() {
            Ok(gilrs) => Some(gilrs),
            Err(gilrs::Error::NotImplemented(dummy)) => {
                log::warn!("Gamepads are not supported on this platform");
                Some(dummy)
            }
            Err(e) => {
                log::warn!("Gamepads unavailable: {}", e);
                None
            }
        };
        Self { gilrs }
    }

    /// Drain pending gamepad events and copy the current state into `input`.
    pub fn poll(&mut self, input: &mut Input) {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return;
        };
        while let Some(event) = gilrs.next_event() {
            match event.event {
                gilrs::EventType::Connected => {
                    log::info!("Gamepad '{}' connected", gilrs.gamepad(event.id).name());
                }
                gilrs::EventType::Disconnected => log::info!("Gamepad disconnected"),
                _ => {}
            }
        }
        let pads = gilrs
            .gamepads()
            .filter(|(_, pad)| pad.is_connected())
            .map(|(_, pad)| snapshot(&pad))
            .collect();
        input.set_gamepads(pads);
    }
}

impl Default for Gamepads {
    fn default() -> Self {
        Self::new()
    }
}

fn snapshot(pad: &gilrs::Gamepad<'_>) -> GamepadState {
    GamepadState {
        axes: STANDARD_AXES.iter().map(|axis| standard_axis(*axis, pad.value(*axis))).collect(),
        buttons: STANDARD_BUTTONS.iter().map(|button| pad.is_pressed(*button)).collect(),
    }
}

/// gilrs reports stick Y up-positive; the standard layout is down-positive.
fn standard_axis(axis: gilrs::Axis, value: f32) -> f32 {
    match axis {
        gilrs::Axis::LeftStickY | gilrs::Axis::RightStickY => -value,
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::DeviceId;

    fn cursor_moved(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: unsafe { DeviceId::dummy() },
            position: PhysicalPosition::new(x, y),
        }
    }

    fn mouse(state: ElementState, button: MouseButton) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state,
            button,
        }
    }

    #[test]
    fn cursor_is_divided_by_the_actual_scale() {
        let mut input = Input::new();
        input.handle_window_event(&cursor_moved(101.0, 51.0), 2.0);
        assert_eq!(input.cursor_position(), (50, 25));
        input.handle_window_event(&cursor_moved(10.0, 10.0), 0.0);
        assert_eq!(input.cursor_position(), (10, 10));
    }

    #[test]
    fn mouse_buttons_track_press_and_release() {
        let mut input = Input::new();
        input.handle_window_event(&mouse(ElementState::Pressed, MouseButton::Left), 1.0);
        assert!(input.is_mouse_button_pressed(MouseButton::Left));
        assert!(!input.is_mouse_button_pressed(MouseButton::Right));
        input.handle_window_event(&mouse(ElementState::Released, MouseButton::Left), 1.0);
        assert!(!input.is_mouse_button_pressed(MouseButton::Left));
    }

    #[test]
    fn focus_loss_releases_everything() {
        let mut input = Input::new();
        input.set_key(KeyCode::Space, ElementState::Pressed);
        input.handle_window_event(&mouse(ElementState::Pressed, MouseButton::Left), 1.0);
        assert!(input.is_key_pressed(KeyCode::Space));

        input.handle_window_event(&WindowEvent::Focused(false), 1.0);
        assert!(!input.is_key_pressed(KeyCode::Space));
        assert!(!input.is_mouse_button_pressed(MouseButton::Left));
    }

    #[test]
    fn missing_pads_read_as_idle() {
        let mut input = Input::new();
        input.set_gamepads(vec![GamepadState {
            axes: vec![0.5, -1.0],
            buttons: vec![false, true],
        }]);
        assert_eq!(input.gamepad_count(), 1);
        assert_eq!(input.gamepad_axis_num(0), 2);
        assert_eq!(input.gamepad_axis(0, 1), -1.0);
        assert!(input.is_gamepad_button_pressed(0, 1));

        assert_eq!(input.gamepad_axis_num(3), 0);
        assert_eq!(input.gamepad_axis(0, 9), 0.0);
        assert!(!input.is_gamepad_button_pressed(1, 0));
    }

    #[test]
    fn stick_y_axes_are_flipped() {
        assert_eq!(standard_axis(gilrs::Axis::LeftStickY, 0.5), -0.5);
        assert_eq!(standard_axis(gilrs::Axis::RightStickX, 0.5), 0.5);
    }
}
