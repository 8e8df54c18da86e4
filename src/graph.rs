//! # Wiring Graph
//!
//! In-memory description of a circuit as handed over by the diagram editor:
//! typed components with named pins, and point-to-point wires between pins.

use crate::catalog;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of component types understood by the compiler
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentKind {
    ArduinoUno,
    Esp32DevkitV1,
    HandySensePro,
    CustomEsp32,
    Led,
    Pushbutton,
    MistingPump,
    WaterPump,
    Fan,
    /// Any other part (sensors, displays, ...), kept by its tag
    Other(String),
}

impl ComponentKind {
    pub fn tag(&self) -> &str {
        match self {
            ComponentKind::ArduinoUno => "arduino_uno",
            ComponentKind::Esp32DevkitV1 => "esp32_devkit_v1",
            ComponentKind::HandySensePro => "handysense_pro",
            ComponentKind::CustomEsp32 => "custom_esp32",
            ComponentKind::Led => "led",
            ComponentKind::Pushbutton => "pushbutton",
            ComponentKind::MistingPump => "misting_pump",
            ComponentKind::WaterPump => "water_pump",
            ComponentKind::Fan => "fan",
            ComponentKind::Other(tag) => tag,
        }
    }
}

impl From<&str> for ComponentKind {
    fn from(tag: &str) -> Self {
        // Widget class names from the editor are accepted alongside the short tags
        match tag {
            "arduino_uno" | "ArduinoUnoElement" => ComponentKind::ArduinoUno,
            "esp32_devkit_v1" | "ESP32DevkitV1Element" => ComponentKind::Esp32DevkitV1,
            "handysense_pro" | "HandysenseProBoardElement" => ComponentKind::HandySensePro,
            "custom_esp32" | "CustomESP32BoardElement" => ComponentKind::CustomEsp32,
            "led" | "LEDElement" => ComponentKind::Led,
            "pushbutton" | "PushbuttonElement" => ComponentKind::Pushbutton,
            "misting_pump" | "MistingPumpElement" => ComponentKind::MistingPump,
            "water_pump" | "WaterPumpElement" => ComponentKind::WaterPump,
            "fan" | "FanElement" => ComponentKind::Fan,
            other => ComponentKind::Other(other.to_string()),
        }
    }
}

impl From<String> for ComponentKind {
    fn from(tag: String) -> Self {
        ComponentKind::from(tag.as_str())
    }
}

impl From<ComponentKind> for String {
    fn from(kind: ComponentKind) -> Self {
        kind.tag().to_string()
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Electrical role of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinRole {
    Power,
    Ground,
    Pwm,
    I2c,
    Spi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<PinRole>,
}

impl PinInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), role: None }
    }

    pub fn with_role(name: impl Into<String>, role: PinRole) -> Self {
        Self { name: name.into(), role: Some(role) }
    }

    pub fn is_ground(&self) -> bool {
        self.role == Some(PinRole::Ground) || self.name.starts_with("GND")
    }
}

impl From<&str> for PinInfo {
    fn from(name: &str) -> Self {
        PinInfo::new(name)
    }
}

/// A part placed on the canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ComponentKind,
    #[serde(default)]
    pub pins: Vec<PinInfo>,
}

impl Component {
    pub fn new(id: impl Into<String>, kind: ComponentKind, pins: Vec<PinInfo>) -> Self {
        Self { id: id.into(), kind, pins }
    }

    /// Component carrying the standard pin list of its kind
    pub fn catalogued(id: impl Into<String>, kind: ComponentKind) -> Self {
        let pins = catalog::default_pins(&kind);
        Self::new(id, kind, pins)
    }

    pub fn pin(&self, name: &str) -> Option<&PinInfo> {
        self.pins.iter().find(|pin| pin.name == name)
    }
}

/// One end of a wire
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub component: String,
    pub pin: String,
}

impl PinRef {
    pub fn new(component: impl Into<String>, pin: impl Into<String>) -> Self {
        Self { component: component.into(), pin: pin.into() }
    }
}

/// A wire between two pins; direction carries no meaning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub source: PinRef,
    pub target: PinRef,
}

/// What the compiler needs from the diagram editor
pub trait Diagram {
    /// Components in insertion order
    fn components(&self) -> &[Component];

    /// Wires in insertion order
    fn connections(&self) -> &[Connection];

    fn component(&self, id: &str) -> Option<&Component> {
        self.components().iter().find(|component| component.id == id)
    }
}

/// Plain owned circuit description
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringGraph {
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl WiringGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON circuit description. Components listed without pins
    /// receive the standard pin list of their kind.
    pub fn from_json(source: &str) -> Result<Self> {
        let mut graph: WiringGraph = serde_json::from_str(source)?;
        for component in &mut graph.components {
            if component.pins.is_empty() {
                component.pins = catalog::default_pins(&component.kind);
            }
        }
        tracing::debug!(
            "[CFGC] Parsed graph: {} components, {} connections",
            graph.components.len(),
            graph.connections.len()
        );
        Ok(graph)
    }

    pub fn add_component(&mut self, component: Component) -> &mut Self {
        self.components.push(component);
        self
    }

    pub fn connect(
        &mut self,
        component_a: &str,
        pin_a: &str,
        component_b: &str,
        pin_b: &str,
    ) -> &mut Self {
        self.connections.push(Connection {
            source: PinRef::new(component_a, pin_a),
            target: PinRef::new(component_b, pin_b),
        });
        self
    }
}

impl Diagram for WiringGraph {
    fn components(&self) -> &[Component] {
        &self.components
    }

    fn connections(&self) -> &[Connection] {
        &self.connections
    }
}
