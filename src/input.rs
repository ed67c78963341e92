use glam::Vec2;
use winit::event::{ElementState, MouseButton, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Something the player asked for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Left button released at this window position, in physical pixels.
    Pick { x: u32, y: u32 },
    /// Deal a new board.
    NewGame,
    /// Close the window.
    Quit,
}

/// Turns raw window events into [`Command`]s.
///
/// Tracks the cursor so that a button release, which carries no position of
/// its own, can be resolved to the pixel under it.
#[derive(Debug, Default)]
pub struct Input {
    cursor: Option<Vec2>,
}

impl Input {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a window event, returning the command it triggers, if any.
    pub fn handle_event(&mut self, event: &WindowEvent) -> Option<Command> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(Vec2::new(position.x as f32, position.y as f32));
                None
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                None
            }
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => self.cursor.map(|cursor| Command::Pick {
                x: to_pixel(cursor.x),
                y: to_pixel(cursor.y),
            }),
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                match event.physical_key {
                    PhysicalKey::Code(key) => command_for_key(key),
                    PhysicalKey::Unidentified(_) => None,
                }
            }
            _ => None,
        }
    }

    /// Last known cursor position inside the window.
    pub fn cursor(&self) -> Option<Vec2> {
        self.cursor
    }
}

/// Key bindings.
pub fn command_for_key(key: KeyCode) -> Option<Command> {
    match key {
        KeyCode::KeyN | KeyCode::F2 => Some(Command::NewGame),
        KeyCode::Escape => Some(Command::Quit),
        _ => None,
    }
}

// Negative and NaN positions clamp to the first pixel.
fn to_pixel(coord: f32) -> u32 {
    coord.max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::dpi::PhysicalPosition;
    use winit::event::DeviceId;

    fn moved(x: f64, y: f64) -> WindowEvent {
        WindowEvent::CursorMoved {
            device_id: unsafe { DeviceId::dummy() },
            position: PhysicalPosition::new(x, y),
        }
    }

    fn left(state: ElementState) -> WindowEvent {
        WindowEvent::MouseInput {
            device_id: unsafe { DeviceId::dummy() },
            state,
            button: MouseButton::Left,
        }
    }

    #[test]
    fn release_picks_under_cursor() {
        let mut input = Input::new();
        assert_eq!(input.handle_event(&moved(120.7, 48.2)), None);
        assert_eq!(input.handle_event(&left(ElementState::Pressed)), None);
        assert_eq!(
            input.handle_event(&left(ElementState::Released)),
            Some(Command::Pick { x: 120, y: 48 })
        );
    }

    #[test]
    fn release_without_cursor_is_dropped() {
        let mut input = Input::new();
        assert_eq!(input.handle_event(&left(ElementState::Released)), None);

        input.handle_event(&moved(10.0, 10.0));
        input.handle_event(&WindowEvent::CursorLeft {
            device_id: unsafe { DeviceId::dummy() },
        });
        assert_eq!(input.cursor(), None);
        assert_eq!(input.handle_event(&left(ElementState::Released)), None);
    }

    #[test]
    fn key_bindings() {
        assert_eq!(command_for_key(KeyCode::KeyN), Some(Command::NewGame));
        assert_eq!(command_for_key(KeyCode::F2), Some(Command::NewGame));
        assert_eq!(command_for_key(KeyCode::Escape), Some(Command::Quit));
        assert_eq!(command_for_key(KeyCode::Space), None);
    }

    #[test]
    fn pixels_clamp_at_zero() {
        assert_eq!(to_pixel(-3.5), 0);
        assert_eq!(to_pixel(f32::NAN), 0);
        assert_eq!(to_pixel(7.99), 7);
    }
}
