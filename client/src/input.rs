//! Client input sampling through a key binding table

use macroquad::prelude::*;
use shared::{InputAction, MoveIntent};

/// A physical input that can trigger an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Key(KeyCode),
    Mouse(MouseButton),
}

/// Everything the game loop needs from one frame of input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameInput {
    pub intent: MoveIntent,
    pub look_delta: Vec2,
    /// Set on the frame the shoot binding goes down.
    pub shoot: bool,
    /// Set on the frame the switch binding goes down.
    pub switch_weapon: bool,
}

/// Maps bindings to actions and turns raw device state into [`FrameInput`]
pub struct InputManager {
    bindings: Vec<(Binding, InputAction)>,
    last_mouse: Option<Vec2>,

    // Previous frame state for edge detection
    prev_shoot: bool,
    prev_switch: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::with_bindings(vec![
            (Binding::Key(KeyCode::W), InputAction::MoveFront),
            (Binding::Key(KeyCode::Up), InputAction::MoveFront),
            (Binding::Key(KeyCode::S), InputAction::MoveBack),
            (Binding::Key(KeyCode::Down), InputAction::MoveBack),
            (Binding::Key(KeyCode::A), InputAction::MoveLeft),
            (Binding::Key(KeyCode::Left), InputAction::MoveLeft),
            (Binding::Key(KeyCode::D), InputAction::MoveRight),
            (Binding::Key(KeyCode::Right), InputAction::MoveRight),
            (Binding::Key(KeyCode::Space), InputAction::Jump),
            (Binding::Mouse(MouseButton::Left), InputAction::Shoot),
            (Binding::Key(KeyCode::Q), InputAction::SwitchWeapon),
        ])
    }

    pub fn with_bindings(bindings: Vec<(Binding, InputAction)>) -> Self {
        Self {
            bindings,
            last_mouse: None,
            prev_shoot: false,
            prev_switch: false,
        }
    }

    /// Rebinds an input, replacing whatever action it triggered before.
    pub fn bind(&mut self, binding: Binding, action: InputAction) {
        self.bindings.retain(|(b, _)| *b != binding);
        self.bindings.push((binding, action));
    }

    /// Samples the keyboard and mouse for this frame.
    pub fn update(&mut self) -> FrameInput {
        let (x, y) = mouse_position();
        self.resolve(
            |binding| match binding {
                Binding::Key(key) => is_key_down(key),
                Binding::Mouse(button) => is_mouse_button_down(button),
            },
            Vec2::new(x, y),
        )
    }

    fn resolve(&mut self, held: impl Fn(Binding) -> bool, mouse: Vec2) -> FrameInput {
        let mut frame = FrameInput::default();
        let mut shoot = false;
        let mut switch = false;

        for (binding, action) in &self.bindings {
            if !held(*binding) {
                continue;
            }
            match action {
                InputAction::MoveFront => frame.intent.forward = true,
                InputAction::MoveBack => frame.intent.back = true,
                InputAction::MoveLeft => frame.intent.left = true,
                InputAction::MoveRight => frame.intent.right = true,
                InputAction::Jump => frame.intent.jump = true,
                InputAction::Shoot => shoot = true,
                InputAction::SwitchWeapon => switch = true,
            }
        }

        frame.shoot = shoot && !self.prev_shoot;
        frame.switch_weapon = switch && !self.prev_switch;
        self.prev_shoot = shoot;
        self.prev_switch = switch;

        frame.look_delta = self.last_mouse.map_or(Vec2::ZERO, |last| mouse - last);
        self.last_mouse = Some(mouse);

        frame
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(keys: &'static [Binding]) -> impl Fn(Binding) -> bool {
        move |binding| keys.contains(&binding)
    }

    #[test]
    fn test_movement_is_level_triggered() {
        let mut input = InputManager::new();
        let held = holding(&[Binding::Key(KeyCode::W), Binding::Key(KeyCode::D)]);

        for _ in 0..3 {
            let frame = input.resolve(&held, Vec2::ZERO);
            assert!(frame.intent.forward);
            assert!(frame.intent.right);
            assert!(!frame.intent.back);
            assert!(!frame.intent.jump);
        }
    }

    #[test]
    fn test_alternate_bindings() {
        let mut input = InputManager::new();
        let frame = input.resolve(holding(&[Binding::Key(KeyCode::Left)]), Vec2::ZERO);
        assert!(frame.intent.left);
    }

    #[test]
    fn test_shoot_is_edge_triggered() {
        let mut input = InputManager::new();
        let click = holding(&[Binding::Mouse(MouseButton::Left)]);
        let idle = holding(&[]);

        assert!(input.resolve(&click, Vec2::ZERO).shoot);
        assert!(!input.resolve(&click, Vec2::ZERO).shoot);
        assert!(!input.resolve(&idle, Vec2::ZERO).shoot);
        assert!(input.resolve(&click, Vec2::ZERO).shoot);
    }

    #[test]
    fn test_switch_weapon_is_edge_triggered() {
        let mut input = InputManager::new();
        let held = holding(&[Binding::Key(KeyCode::Q)]);
        assert!(input.resolve(&held, Vec2::ZERO).switch_weapon);
        assert!(!input.resolve(&held, Vec2::ZERO).switch_weapon);
    }

    #[test]
    fn test_look_delta_from_mouse_motion() {
        let mut input = InputManager::new();
        let idle = holding(&[]);

        assert_eq!(input.resolve(&idle, Vec2::new(100.0, 50.0)).look_delta, Vec2::ZERO);
        assert_eq!(
            input.resolve(&idle, Vec2::new(110.0, 45.0)).look_delta,
            Vec2::new(10.0, -5.0)
        );
    }

    #[test]
    fn test_rebind_replaces_action() {
        let mut input = InputManager::new();
        input.bind(Binding::Key(KeyCode::Space), InputAction::Shoot);
        let frame = input.resolve(holding(&[Binding::Key(KeyCode::Space)]), Vec2::ZERO);
        assert!(frame.shoot);
        assert!(!frame.intent.jump);
    }
}
