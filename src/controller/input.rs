/// Platform-agnostic input handling system

/// Platform-independent input events
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    // Pointer events, in CSS pixels
    PointerMove { x: f32, y: f32 },
    PointerButton { button: MouseButton, is_down: bool, x: f32, y: f32 },
    Wheel { delta_y: f32 },

    // Window events
    FocusLost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    pub fn from_web_button(button: i16) -> Self {
        match button {
            0 => MouseButton::Left,
            1 => MouseButton::Middle,
            2 => MouseButton::Right,
            _ => MouseButton::Left,
        }
    }
}

/// Pointer motion accumulated between frames
#[derive(Debug, Default)]
pub struct InputState {
    pub dragging: bool,
    pub last_pointer: Option<(f32, f32)>,
    pub rotate_delta: (f32, f32),
    pub wheel_steps: i32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::PointerMove { x, y } => {
                if self.dragging {
                    if let Some((lx, ly)) = self.last_pointer {
                        self.rotate_delta.0 += x - lx;
                        self.rotate_delta.1 += y - ly;
                    }
                }
                self.last_pointer = Some((*x, *y));
            }
            InputEvent::PointerButton { button: MouseButton::Left, is_down, x, y } => {
                self.dragging = *is_down;
                self.last_pointer = Some((*x, *y));
            }
            InputEvent::PointerButton { .. } => {}
            InputEvent::Wheel { delta_y } => {
                if *delta_y > 0.0 {
                    self.wheel_steps += 1;
                } else if *delta_y < 0.0 {
                    self.wheel_steps -= 1;
                }
            }
            InputEvent::FocusLost => {
                self.dragging = false;
                self.last_pointer = None;
            }
        }
    }

    /// Drag delta in pixels and wheel notches since the last call
    pub fn consume_orbit(&mut self) -> ((f32, f32), i32) {
        let result = (self.rotate_delta, self.wheel_steps);
        self.rotate_delta = (0.0, 0.0);
        self.wheel_steps = 0;
        result
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraAction {
    Forward,
    Backward,
    Left,
    Right,
    Hop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterStep {
    Up,
    Down,
    Left,
    Right,
}

/// Key mapping configuration for the camera moves
#[derive(Clone)]
pub struct KeyBindings {
    pub forward: String,
    pub backward: String,
    pub left: String,
    pub right: String,
    /// Matched on the legacy key code, not the key name.
    pub hop_key_code: u32,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            forward: "w".to_string(),
            backward: "s".to_string(),
            left: "a".to_string(),
            right: "d".to_string(),
            hop_key_code: 32,
        }
    }
}

/// Arrow-key names the orbit controls use; the character listener reads them
#[derive(Clone)]
pub struct OrbitKeys {
    pub left: String,
    pub up: String,
    pub right: String,
    pub bottom: String,
}

impl Default for OrbitKeys {
    fn default() -> Self {
        Self {
            left: "ArrowLeft".to_string(),
            up: "ArrowUp".to_string(),
            right: "ArrowRight".to_string(),
            bottom: "ArrowDown".to_string(),
        }
    }
}

/// High-level input processor
#[derive(Clone, Default)]
pub struct InputProcessor {
    bindings: KeyBindings,
    orbit_keys: OrbitKeys,
}

impl InputProcessor {
    pub fn new(bindings: KeyBindings, orbit_keys: OrbitKeys) -> Self {
        Self { bindings, orbit_keys }
    }

    /// Key names are case sensitive: `W` with shift held does nothing.
    pub fn camera_action(&self, key: &str, key_code: u32) -> Option<CameraAction> {
        if key == self.bindings.forward {
            Some(CameraAction::Forward)
        } else if key == self.bindings.backward {
            Some(CameraAction::Backward)
        } else if key == self.bindings.left {
            Some(CameraAction::Left)
        } else if key == self.bindings.right {
            Some(CameraAction::Right)
        } else if key_code == self.bindings.hop_key_code {
            Some(CameraAction::Hop)
        } else {
            None
        }
    }

    pub fn character_step(&self, key: &str) -> Option<CharacterStep> {
        if key == self.orbit_keys.bottom {
            Some(CharacterStep::Down)
        } else if key == self.orbit_keys.left {
            Some(CharacterStep::Left)
        } else if key == self.orbit_keys.right {
            Some(CharacterStep::Right)
        } else if key == self.orbit_keys.up {
            Some(CharacterStep::Up)
        } else {
            None
        }
    }

    /// Keys the browser would otherwise use to scroll the page
    pub fn is_navigation_key(&self, key: &str) -> bool {
        key == " " || self.character_step(key).is_some()
    }
}

#[cfg(target_arch = "wasm32")]
pub mod wasm {
    use super::*;
    use web_sys::{MouseEvent, WheelEvent};

    pub fn mouse_move_to_input(e: &MouseEvent) -> InputEvent {
        InputEvent::PointerMove { x: e.client_x() as f32, y: e.client_y() as f32 }
    }

    pub fn mouse_click_to_input(e: &MouseEvent, is_down: bool) -> InputEvent {
        InputEvent::PointerButton {
            button: MouseButton::from_web_button(e.button()),
            is_down,
            x: e.client_x() as f32,
            y: e.client_y() as f32,
        }
    }

    pub fn mouse_wheel_to_input(e: &WheelEvent) -> InputEvent {
        InputEvent::Wheel { delta_y: e.delta_y() as f32 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camera_keys_and_hop_code() {
        let p = InputProcessor::default();
        assert_eq!(p.camera_action("w", 87), Some(CameraAction::Forward));
        assert_eq!(p.camera_action("d", 68), Some(CameraAction::Right));
        assert_eq!(p.camera_action(" ", 32), Some(CameraAction::Hop));
        assert_eq!(p.camera_action("W", 87), None);
        assert_eq!(p.camera_action("ArrowUp", 38), None);
    }

    #[test]
    fn character_steps_follow_orbit_keys() {
        let p = InputProcessor::default();
        assert_eq!(p.character_step("ArrowDown"), Some(CharacterStep::Down));
        assert_eq!(p.character_step("ArrowLeft"), Some(CharacterStep::Left));
        assert_eq!(p.character_step("w"), None);

        let custom = InputProcessor::new(
            KeyBindings::default(),
            OrbitKeys { up: "i".into(), ..OrbitKeys::default() },
        );
        assert_eq!(custom.character_step("i"), Some(CharacterStep::Up));
        assert_eq!(custom.character_step("ArrowUp"), None);
    }

    #[test]
    fn drag_accumulates_until_consumed() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::PointerMove { x: 5.0, y: 5.0 });
        assert_eq!(input.rotate_delta, (0.0, 0.0));

        input.process_event(&InputEvent::PointerButton { button: MouseButton::Left, is_down: true, x: 10.0, y: 10.0 });
        input.process_event(&InputEvent::PointerMove { x: 14.0, y: 9.0 });
        input.process_event(&InputEvent::PointerMove { x: 20.0, y: 9.0 });
        input.process_event(&InputEvent::Wheel { delta_y: -100.0 });

        assert_eq!(input.consume_orbit(), ((10.0, -1.0), -1));
        assert_eq!(input.consume_orbit(), ((0.0, 0.0), 0));

        input.process_event(&InputEvent::PointerButton { button: MouseButton::Left, is_down: false, x: 20.0, y: 9.0 });
        input.process_event(&InputEvent::PointerMove { x: 40.0, y: 9.0 });
        assert_eq!(input.consume_orbit().0, (0.0, 0.0));
    }

    #[test]
    fn focus_loss_ends_the_drag() {
        let mut input = InputState::new();
        input.process_event(&InputEvent::PointerButton { button: MouseButton::Left, is_down: true, x: 0.0, y: 0.0 });
        input.process_event(&InputEvent::FocusLost);
        assert!(!input.dragging);
        // the next press starts from its own position, not the stale one
        input.process_event(&InputEvent::PointerMove { x: 50.0, y: 50.0 });
        assert_eq!(input.consume_orbit().0, (0.0, 0.0));
    }
}
