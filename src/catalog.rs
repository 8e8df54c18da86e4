//! # Component Catalogue
//!
//! Standard pin lists for the parts the editor can place.

use crate::graph::{ComponentKind, PinInfo, PinRole};

type PinSpec = (&'static str, Option<PinRole>);

const POWER: Option<PinRole> = Some(PinRole::Power);
const GROUND: Option<PinRole> = Some(PinRole::Ground);
const PWM: Option<PinRole> = Some(PinRole::Pwm);
const I2C: Option<PinRole> = Some(PinRole::I2c);
const SPI: Option<PinRole> = Some(PinRole::Spi);

const ARDUINO_UNO_PINS: &[PinSpec] = &[
    ("0", None), ("1", None), ("2", None), ("3", PWM), ("4", None), ("5", PWM),
    ("6", PWM), ("7", None), ("8", None), ("9", PWM), ("10", PWM), ("11", PWM),
    ("12", None), ("13", None),
    ("A0", None), ("A1", None), ("A2", None), ("A3", None), ("A4", None), ("A5", None),
    ("GND.1", GROUND), ("GND.2", GROUND), ("GND.3", GROUND),
    ("5V", POWER), ("3.3V", POWER), ("VIN", POWER),
    ("AREF", None), ("IOREF", None), ("RESET", None),
];

const ESP32_DEVKIT_V1_PINS: &[PinSpec] = &[
    ("D2", PWM), ("D4", PWM), ("D5", PWM), ("D12", PWM), ("D13", PWM), ("D14", PWM),
    ("D15", PWM), ("D18", PWM), ("D19", PWM), ("D21", I2C), ("D22", I2C), ("D23", PWM),
    ("D25", PWM), ("D26", PWM), ("D27", PWM), ("D32", PWM), ("D33", PWM),
    ("D34", None), ("D35", None), ("VP", None), ("VN", None),
    ("TX0", None), ("RX0", None), ("TX2", None), ("RX2", None), ("EN", None),
    ("VIN", POWER), ("3V3", POWER), ("GND.1", GROUND), ("GND.2", GROUND),
];

const HANDYSENSE_PRO_PINS: &[PinSpec] = &[
    ("3V3_1", POWER), ("IO33", PWM), ("GND_1", GROUND), ("IO15", PWM),
    ("3V3_2", POWER), ("IO36", None), ("GND_2", GROUND),
    ("3V3_3", POWER), ("IO39", None), ("GND_3", GROUND),
    ("3V3_4", POWER), ("IO32", PWM), ("GND_4", GROUND),
    ("VIN_1", POWER), ("GND_5", GROUND), ("VIN_2", POWER), ("GND_6", GROUND),
    ("SCL_1", I2C), ("SDA_1", I2C), ("GND_R1", GROUND), ("3V3_R1", POWER),
    ("SCL_2", I2C), ("SDA_2", I2C), ("GND_R2", GROUND), ("3V3_R2", POWER),
    ("TX2", None), ("RX2", None), ("SCL_3", I2C), ("SDA_3", I2C),
    ("MOSI", SPI), ("MISO", SPI), ("CLK", SPI), ("CS", SPI),
    ("GND_R3", GROUND), ("3V3_R3", POWER),
];

const CUSTOM_ESP32_PINS: &[PinSpec] = &[
    ("IO33", PWM), ("GND", GROUND), ("IO15", PWM), ("GND2", GROUND),
    ("3V3", POWER), ("IO36", None), ("GND3", GROUND),
    ("3V3_2", POWER), ("IO39", None), ("GND4", GROUND),
    ("3V3_3", POWER), ("IO32", PWM), ("GND5", GROUND),
    ("VIN", POWER), ("GND6", GROUND), ("VIN2", POWER), ("GND7", GROUND),
    ("SCL", I2C), ("SDA", I2C), ("GND_R1", GROUND), ("3V3_R1", POWER),
    ("SCL_2", I2C), ("SDA_2", I2C), ("GND_R2", GROUND), ("3V3_R2", POWER),
    ("TX2", None), ("RX2", None), ("SCL_3", I2C), ("SDA_3", I2C),
    ("MOSI", SPI), ("MISO", SPI), ("CLK", SPI), ("CS", SPI),
    ("GND_R3", GROUND), ("3V3_R3", POWER),
];

const LED_PINS: &[PinSpec] = &[("A", None), ("C", None)];

const PUSHBUTTON_PINS: &[PinSpec] = &[("1.l", None), ("2.l", None), ("1.r", None), ("2.r", None)];

const ACTUATOR_PINS: &[PinSpec] = &[("VCC", POWER), ("GND", GROUND), ("SIG", None)];

/// Pins of a catalogued part. Unknown parts have no standard pins.
pub fn default_pins(kind: &ComponentKind) -> Vec<PinInfo> {
    let specs: &[PinSpec] = match kind {
        ComponentKind::ArduinoUno => ARDUINO_UNO_PINS,
        ComponentKind::Esp32DevkitV1 => ESP32_DEVKIT_V1_PINS,
        ComponentKind::HandySensePro => HANDYSENSE_PRO_PINS,
        ComponentKind::CustomEsp32 => CUSTOM_ESP32_PINS,
        ComponentKind::Led => LED_PINS,
        ComponentKind::Pushbutton => PUSHBUTTON_PINS,
        ComponentKind::MistingPump | ComponentKind::WaterPump | ComponentKind::Fan => ACTUATOR_PINS,
        ComponentKind::Other(_) => &[],
    };

    specs
        .iter()
        .map(|(name, role)| PinInfo { name: name.to_string(), role: *role })
        .collect()
}
