//! # Board and Peripheral Classification
//!
//! Decides which end of a wire is the microcontroller board, which board
//! family it belongs to, and what the other end is.

use crate::extract::WireEdge;
use crate::graph::{Component, ComponentKind, PinInfo};
use serde::Serialize;

/// First analog input on AVR-style numbering (`A0` == 14)
const ANALOG_PIN_BASE: u32 = 14;

/// Execution path of a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BoardFamily {
    /// Compiled to hex and run on the instruction-level emulator
    Avr,
    /// Transpiled to an interpreter script
    Esp32,
}

/// Board family of a component, `None` for anything that is not a board
pub fn board_family(kind: &ComponentKind) -> Option<BoardFamily> {
    match kind {
        ComponentKind::ArduinoUno => Some(BoardFamily::Avr),
        ComponentKind::Esp32DevkitV1 | ComponentKind::HandySensePro | ComponentKind::CustomEsp32 => {
            Some(BoardFamily::Esp32)
        }
        _ => None,
    }
}

pub fn is_board(kind: &ComponentKind) -> bool {
    board_family(kind).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActuatorKind {
    MistingPump,
    WaterPump,
    Fan,
}

impl ActuatorKind {
    pub fn tag(self) -> &'static str {
        match self {
            ActuatorKind::MistingPump => "misting_pump",
            ActuatorKind::WaterPump => "water_pump",
            ActuatorKind::Fan => "fan",
        }
    }

    /// Prefix of the generated pin definition (`MISTING_PUMP_PIN`)
    pub fn define_prefix(self) -> String {
        self.tag().to_uppercase()
    }

    pub fn friendly_name(self) -> String {
        self.tag().replace('_', " ")
    }
}

/// What a peripheral contributes to the wiring model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralClass {
    Led,
    Button,
    Actuator(ActuatorKind),
    /// Tracked, but never drives code generation
    Generic,
}

pub fn classify_peripheral(kind: &ComponentKind) -> PeripheralClass {
    match kind {
        ComponentKind::Led => PeripheralClass::Led,
        ComponentKind::Pushbutton => PeripheralClass::Button,
        ComponentKind::MistingPump => PeripheralClass::Actuator(ActuatorKind::MistingPump),
        ComponentKind::WaterPump => PeripheralClass::Actuator(ActuatorKind::WaterPump),
        ComponentKind::Fan => PeripheralClass::Actuator(ActuatorKind::Fan),
        _ => PeripheralClass::Generic,
    }
}

/// Canonical pin number of a board port name, `None` when it does not name a
/// numbered pin (power, ground, bus pins).
pub fn resolve_pin(family: BoardFamily, port: &str) -> Option<u32> {
    match family {
        BoardFamily::Avr => parse_digits(port).or_else(|| analog_pin(port)),
        BoardFamily::Esp32 => port
            .strip_prefix("IO")
            .and_then(parse_digits)
            .or_else(|| port.strip_prefix('D').and_then(parse_digits))
            .or_else(|| parse_digits(port))
            .or_else(|| analog_pin(port)),
    }
}

fn analog_pin(port: &str) -> Option<u32> {
    port.strip_prefix('A')
        .and_then(parse_digits)
        .and_then(|n| ANALOG_PIN_BASE.checked_add(n))
}

fn parse_digits(text: &str) -> Option<u32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// A wire between a board and a peripheral, oriented board-first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardLink<'a> {
    pub family: BoardFamily,
    pub board: &'a Component,
    pub board_port: &'a str,
    pub peripheral: &'a Component,
    pub peripheral_port: &'a str,
}

impl BoardLink<'_> {
    /// Board pin number, `None` for ground pins and unnumbered ports
    pub fn pin_number(&self) -> Option<u32> {
        if self.board.pin(self.board_port).is_some_and(PinInfo::is_ground) {
            return None;
        }
        resolve_pin(self.family, self.board_port)
    }

    pub fn peripheral_class(&self) -> PeripheralClass {
        classify_peripheral(&self.peripheral.kind)
    }
}

/// Orient a wire board-first. Board-to-board and peripheral-to-peripheral
/// wires carry no firmware meaning and yield `None`.
pub fn classify_edge<'a>(edge: &WireEdge<'a>) -> Option<BoardLink<'a>> {
    let family_a = board_family(&edge.component_a.kind);
    let family_b = board_family(&edge.component_b.kind);

    match (family_a, family_b) {
        (Some(family), None) => Some(BoardLink {
            family,
            board: edge.component_a,
            board_port: edge.port_a,
            peripheral: edge.component_b,
            peripheral_port: edge.port_b,
        }),
        (None, Some(family)) => Some(BoardLink {
            family,
            board: edge.component_b,
            board_port: edge.port_b,
            peripheral: edge.component_a,
            peripheral_port: edge.port_a,
        }),
        _ => None,
    }
}
