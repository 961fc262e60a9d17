//! gilrs-backed controller pump
//!
//! `Gilrs` has to be driven from one thread, so the loop owns the pump and
//! calls [`GamepadPump::pump`] every frame. The pump publishes what it sees
//! into a [`PadTable`], which the device monitor enumerates from its own
//! thread.

use gilrs::{Axis, Button, EventType, Gamepad, GamepadId, Gilrs};
use tracing::{debug, warn};

use super::backend::{PadSnapshot, PadTable};

pub struct GamepadPump {
    gilrs: Gilrs,
    table: PadTable,
}

impl GamepadPump {
    /// Returns `None` (keyboard-only) when the OS backend cannot start.
    pub fn new(table: PadTable) -> Option<Self> {
        match Gilrs::new() {
            Ok(gilrs) => Some(Self { gilrs, table }),
            Err(e) => {
                warn!(
                    "Failed to initialize gamepad support: {}. Gamepads will not be available.",
                    e
                );
                None
            }
        }
    }

    /// Drain pending events and republish every connected pad.
    pub fn pump(&mut self) {
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected => debug!("gilrs: gamepad {} connected", event.id),
                EventType::Disconnected => debug!("gilrs: gamepad {} disconnected", event.id),
                _ => {}
            }
        }

        let pads = self
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, gamepad)| read_gamepad(id, &gamepad))
            .collect();
        self.table.replace(pads);
    }
}

fn read_gamepad(id: GamepadId, gamepad: &Gamepad<'_>) -> PadSnapshot {
    let btn = |button: Button| -> bool { gamepad.is_pressed(button) };
    let hat_x = btn(Button::DPadRight) as i8 - btn(Button::DPadLeft) as i8;
    let hat_y = btn(Button::DPadUp) as i8 - btn(Button::DPadDown) as i8;

    PadSnapshot {
        id: usize::from(id).to_string(),
        name: gamepad.name().to_string(),
        guid: hex::encode(gamepad.uuid()),
        // gilrs reports up as positive Y
        axes: vec![gamepad.value(Axis::LeftStickX), -gamepad.value(Axis::LeftStickY)],
        // Face buttons (South=A, East=B) then Select/Start
        buttons: vec![
            btn(Button::South),
            btn(Button::East),
            btn(Button::Select),
            btn(Button::Start),
        ],
        hats: vec![(hat_x, hat_y)],
    }
}
