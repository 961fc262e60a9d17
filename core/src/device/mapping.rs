//! Raw controller readings to logical buttons

use super::backend::PadSnapshot;
use crate::input::ControlState;

/// Map one controller reading to logical buttons.
///
/// An axis strictly beyond `deadzone` presses the direction on that side.
/// A non-zero hat component replaces the axis result for its axis. The
/// first four buttons are a, b, select and start.
pub fn control_state(pad: &PadSnapshot, deadzone: f32) -> ControlState {
    let axis = |i: usize| pad.axes.get(i).copied().unwrap_or(0.0);
    let button = |i: usize| pad.buttons.get(i).copied().unwrap_or(false);

    let (x, y) = (axis(0), axis(1));
    let mut state = ControlState {
        left: x < -deadzone,
        right: x > deadzone,
        up: y < -deadzone,
        down: y > deadzone,
        a: button(0),
        b: button(1),
        select: button(2),
        start: button(3),
    };

    if let Some(&(hat_x, hat_y)) = pad.hats.first() {
        match hat_x {
            -1 => (state.left, state.right) = (true, false),
            1 => (state.left, state.right) = (false, true),
            _ => {}
        }
        match hat_y {
            1 => (state.up, state.down) = (true, false),
            -1 => (state.up, state.down) = (false, true),
            _ => {}
        }
    }

    state
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pad(axes: &[f32], buttons: &[bool], hats: &[(i8, i8)]) -> PadSnapshot {
        PadSnapshot {
            id: "0".into(),
            name: "Test Pad".into(),
            axes: axes.to_vec(),
            buttons: buttons.to_vec(),
            hats: hats.to_vec(),
            ..PadSnapshot::default()
        }
    }

    #[test]
    fn test_deadzone_is_strict() {
        assert!(!control_state(&pad(&[0.29, 0.0], &[], &[]), 0.3).right);
        assert!(control_state(&pad(&[0.31, 0.0], &[], &[]), 0.3).right);
        assert!(control_state(&pad(&[-0.31, 0.0], &[], &[]), 0.3).left);
        assert!(!control_state(&pad(&[0.3, 0.0], &[], &[]), 0.3).right);
    }

    #[test]
    fn test_vertical_axis() {
        let up = control_state(&pad(&[0.0, -0.9], &[], &[]), 0.3);
        assert!(up.up && !up.down);
        let down = control_state(&pad(&[0.0, 0.9], &[], &[]), 0.3);
        assert!(down.down && !down.up);
    }

    #[test]
    fn test_hat_overrides_axis() {
        // Stick pushed right, hat says left
        let state = control_state(&pad(&[0.9, 0.9], &[], &[(-1, 1)]), 0.3);
        assert!(state.left && !state.right);
        assert!(state.up && !state.down);
    }

    #[test]
    fn test_centered_hat_keeps_axis() {
        let state = control_state(&pad(&[0.9, 0.0], &[], &[(0, 0)]), 0.3);
        assert!(state.right);
    }

    #[test]
    fn test_first_four_buttons() {
        let state = control_state(&pad(&[], &[true, false, true, true, true], &[]), 0.3);
        assert!(state.a && !state.b && state.select && state.start);

        let short = control_state(&pad(&[], &[false, true], &[]), 0.3);
        assert!(short.b && !short.a && !short.start);
    }
}
