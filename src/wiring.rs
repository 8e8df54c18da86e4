//! # Wiring Model
//!
//! Per-kind summary of which peripheral sits on which board pin. Rebuilt
//! from scratch on every circuit change; iteration follows connection
//! insertion order so generated pin numbering is reproducible.

use crate::board::{classify_edge, ActuatorKind, BoardFamily, BoardLink, PeripheralClass};
use crate::extract::extract_edges;
use crate::graph::Diagram;
use serde::Serialize;

const LED_ANODE_PORT: &str = "A";
const LED_CATHODE_PORT: &str = "C";
const ACTUATOR_SIGNAL_PORT: &str = "SIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedEntry {
    pub anode: Option<u32>,
    pub cathode: Option<u32>,
    /// Board pin driving the LED (its anode pin)
    pub pin: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonEntry {
    pub pin: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActuatorEntry {
    pub kind: ActuatorKind,
    pub pin: u32,
}

/// Peripheral that is wired to a numbered pin but has no code template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenericEntry {
    pub component_type: String,
    pub port: String,
    pub pin: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WiringModel {
    /// Family of the first board seen on a board-to-peripheral wire
    pub family: Option<BoardFamily>,
    pub leds: Vec<LedEntry>,
    pub buttons: Vec<ButtonEntry>,
    pub actuators: Vec<ActuatorEntry>,
    pub others: Vec<GenericEntry>,
}

/// LED being assembled from its anode and cathode wires, which may arrive
/// in either order
#[derive(Debug, Default)]
struct PartialLed {
    anode: Option<u32>,
    cathode: Option<u32>,
    pin: Option<u32>,
}

impl WiringModel {
    /// Summarise every board-to-peripheral wire of `diagram`
    pub fn build<D: Diagram + ?Sized>(diagram: &D) -> Self {
        let mut builder = WiringModelBuilder::default();

        for edge in extract_edges(diagram) {
            if let Some(link) = classify_edge(&edge) {
                builder.add_link(&link);
            }
        }

        builder.finish()
    }

    /// True when no peripheral drives code generation
    pub fn is_empty(&self) -> bool {
        self.leds.is_empty() && self.buttons.is_empty() && self.actuators.is_empty()
    }

    /// Number of actuators sharing `kind`
    pub fn actuator_count(&self, kind: ActuatorKind) -> usize {
        self.actuators.iter().filter(|a| a.kind == kind).count()
    }
}

#[derive(Debug, Default)]
struct WiringModelBuilder {
    family: Option<BoardFamily>,
    leds: Vec<PartialLed>,
    buttons: Vec<ButtonEntry>,
    actuators: Vec<ActuatorEntry>,
    others: Vec<GenericEntry>,
}

impl WiringModelBuilder {
    fn add_link(&mut self, link: &BoardLink<'_>) {
        self.family.get_or_insert(link.family);
        let pin = link.pin_number();

        match link.peripheral_class() {
            PeripheralClass::Led => self.add_led_port(link.peripheral_port, pin),
            PeripheralClass::Button => {
                if let Some(pin) = pin {
                    if !self.buttons.iter().any(|b| b.pin == pin) {
                        self.buttons.push(ButtonEntry { pin });
                    }
                }
            }
            PeripheralClass::Actuator(kind) => {
                if link.peripheral_port != ACTUATOR_SIGNAL_PORT {
                    return;
                }
                if let Some(pin) = pin {
                    if !self.actuators.iter().any(|a| a.kind == kind && a.pin == pin) {
                        self.actuators.push(ActuatorEntry { kind, pin });
                    }
                }
            }
            PeripheralClass::Generic => {
                if let Some(pin) = pin {
                    let entry = GenericEntry {
                        component_type: link.peripheral.kind.tag().to_string(),
                        port: link.peripheral_port.to_string(),
                        pin,
                    };
                    if !self.others.contains(&entry) {
                        self.others.push(entry);
                    }
                }
            }
        }
    }

    fn add_led_port(&mut self, port: &str, pin: Option<u32>) {
        // Entries are matched on either terminal, including an unresolved one,
        // so a grounded cathode joins whichever LED is still missing its cathode
        let index = match self
            .leds
            .iter()
            .position(|led| led.anode == pin || led.cathode == pin)
        {
            Some(index) => index,
            None => {
                self.leds.push(PartialLed::default());
                self.leds.len() - 1
            }
        };

        let led = &mut self.leds[index];
        match port {
            LED_ANODE_PORT => {
                led.anode = pin;
                led.pin = pin;
            }
            LED_CATHODE_PORT => led.cathode = pin,
            _ => {}
        }
    }

    fn finish(self) -> WiringModel {
        let leds: Vec<LedEntry> = self
            .leds
            .into_iter()
            .filter_map(|led| {
                led.pin.map(|pin| LedEntry { anode: led.anode, cathode: led.cathode, pin })
            })
            .collect();

        tracing::debug!(
            "[WIRING] {} LEDs, {} buttons, {} actuators, {} other bindings",
            leds.len(),
            self.buttons.len(),
            self.actuators.len(),
            self.others.len()
        );

        WiringModel {
            family: self.family,
            leds,
            buttons: self.buttons,
            actuators: self.actuators,
            others: self.others,
        }
    }
}
