//! # Firmware Code Generator
//!
//! Renders a wiring model as C-like firmware: pin definitions, a `setup()`
//! body configuring every pin, and a `loop()` body with starter behaviour.

use crate::board::ActuatorKind;
use crate::config::GeneratorConfig;
use crate::wiring::WiringModel;
use std::collections::HashMap;

/// A `#define` emitted for one wired peripheral
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinDefinition {
    pub name: String,
    pub pin: u32,
}

/// Firmware generator for a single wiring model
pub struct FirmwareCodeGenerator<'a> {
    model: &'a WiringModel,
    config: &'a GeneratorConfig,
    led_names: Vec<PinDefinition>,
    button_names: Vec<PinDefinition>,
    actuator_names: Vec<(ActuatorKind, PinDefinition)>,
}

impl<'a> FirmwareCodeGenerator<'a> {
    pub fn new(model: &'a WiringModel, config: &'a GeneratorConfig) -> Self {
        let led_names = model
            .leds
            .iter()
            .enumerate()
            .map(|(index, led)| PinDefinition {
                name: format!("LED_PIN_{}", index + 1),
                pin: led.pin,
            })
            .collect();

        let button_names = model
            .buttons
            .iter()
            .enumerate()
            .map(|(index, button)| PinDefinition {
                name: format!("BUTTON_PIN_{}", index + 1),
                pin: button.pin,
            })
            .collect();

        // Kinds wired more than once get a per-kind index so defines never collide
        let mut seen: HashMap<ActuatorKind, usize> = HashMap::new();
        let actuator_names = model
            .actuators
            .iter()
            .map(|actuator| {
                let ordinal = seen.entry(actuator.kind).or_insert(0);
                *ordinal += 1;
                let prefix = actuator.kind.define_prefix();
                let name = if model.actuator_count(actuator.kind) > 1 {
                    format!("{}_PIN_{}", prefix, ordinal)
                } else {
                    format!("{}_PIN", prefix)
                };
                (actuator.kind, PinDefinition { name, pin: actuator.pin })
            })
            .collect();

        Self {
            model,
            config,
            led_names,
            button_names,
            actuator_names,
        }
    }

    /// All pin definitions in emission order
    pub fn pin_definitions(&self) -> Vec<PinDefinition> {
        self.led_names
            .iter()
            .chain(self.button_names.iter())
            .chain(self.actuator_names.iter().map(|(_, def)| def))
            .cloned()
            .collect()
    }

    /// Generate the complete firmware text
    pub fn generate_program(&self) -> String {
        let defines = self.generate_defines();
        let setup = self.generate_setup();
        let loop_body = self.generate_loop();

        let mut code = String::new();
        code.push_str("// Auto-generated code based on circuit design\n");
        code.push_str("// Modify as needed for your specific application\n\n");

        if !defines.is_empty() {
            code.push_str("// Pin definitions\n");
            code.push_str(&defines);
            code.push('\n');
        }

        code.push_str("void setup() {\n");
        code.push_str(&setup);
        code.push_str("}\n\n");

        code.push_str("void loop() {\n");
        code.push_str(&loop_body);
        code.push_str("}\n");

        tracing::debug!(
            "[CODEGEN] Rendered {} pin definitions for {:?}",
            self.pin_definitions().len(),
            self.model.family
        );
        code
    }

    fn generate_defines(&self) -> String {
        let mut code = String::new();
        for def in self.pin_definitions() {
            code.push_str(&format!("#define {} {}\n", def.name, def.pin));
        }
        code
    }

    fn generate_setup(&self) -> String {
        let mut code = String::from("  // Initialize serial communication\n");
        code.push_str(&format!("  Serial.begin({});\n\n", self.config.serial_baud));

        if !self.led_names.is_empty() {
            code.push_str("  // Setup LED pins as outputs\n");
            for def in &self.led_names {
                code.push_str(&format!("  pinMode({}, OUTPUT);\n", def.name));
            }
            code.push('\n');
        }

        if !self.button_names.is_empty() {
            code.push_str("  // Setup button pins as inputs with pullup\n");
            for def in &self.button_names {
                code.push_str(&format!("  pinMode({}, INPUT_PULLUP);\n", def.name));
            }
            code.push('\n');
        }

        if !self.actuator_names.is_empty() {
            code.push_str("  // Setup actuator pins as outputs\n");
            for (kind, def) in &self.actuator_names {
                code.push_str(&format!(
                    "  pinMode({}, OUTPUT);  // {}\n",
                    def.name,
                    kind.friendly_name()
                ));
            }
            code.push('\n');
        }

        code
    }

    fn generate_loop(&self) -> String {
        let mut code = String::new();

        if !self.led_names.is_empty() {
            code.push_str("  // Blink LED example\n");
            for def in &self.led_names {
                code.push_str(&format!("  digitalWrite({}, HIGH);\n", def.name));
            }
            code.push_str(&format!("  delay({});\n", self.config.blink_delay_ms));
            for def in &self.led_names {
                code.push_str(&format!("  digitalWrite({}, LOW);\n", def.name));
            }
            code.push_str(&format!("  delay({});\n\n", self.config.blink_delay_ms));
        }

        if !self.button_names.is_empty() {
            code.push_str("  // Read button states\n");
            for (index, def) in self.button_names.iter().enumerate() {
                let number = index + 1;
                code.push_str(&format!("  int button{}State = digitalRead({});\n", number, def.name));
                code.push_str(&format!("  if (button{}State == LOW) {{\n", number));
                code.push_str(&format!("    Serial.println(\"Button {} pressed!\");\n", number));
                code.push_str("  }\n");
            }
            code.push('\n');
        }

        if !self.actuator_names.is_empty() {
            code.push_str("  // Control actuators example (uncomment to use)\n");
            for (kind, def) in &self.actuator_names {
                let friendly = kind.friendly_name();
                code.push_str(&format!("  // digitalWrite({}, HIGH);  // Turn ON {}\n", def.name, friendly));
                code.push_str(&format!("  // digitalWrite({}, LOW);   // Turn OFF {}\n", def.name, friendly));
            }
            code.push('\n');
        }

        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BoardFamily;
    use crate::wiring::{ActuatorEntry, ButtonEntry, LedEntry};

    fn led(pin: u32) -> LedEntry {
        LedEntry { anode: Some(pin), cathode: None, pin }
    }

    #[test]
    fn empty_model_renders_only_boilerplate() {
        let model = WiringModel::default();
        let config = GeneratorConfig::default();
        let code = FirmwareCodeGenerator::new(&model, &config).generate_program();

        assert_eq!(
            code,
            "// Auto-generated code based on circuit design\n\
             // Modify as needed for your specific application\n\n\
             void setup() {\n  // Initialize serial communication\n  Serial.begin(9600);\n\n}\n\n\
             void loop() {\n}\n"
        );
    }

    #[test]
    fn single_led_blinks() {
        let model = WiringModel {
            family: Some(BoardFamily::Avr),
            leds: vec![led(13)],
            ..Default::default()
        };
        let config = GeneratorConfig::default();
        let code = FirmwareCodeGenerator::new(&model, &config).generate_program();

        assert!(code.contains("// Pin definitions\n#define LED_PIN_1 13\n\n"));
        assert!(code.contains("  // Setup LED pins as outputs\n  pinMode(LED_PIN_1, OUTPUT);\n"));
        assert!(code.contains(
            "  digitalWrite(LED_PIN_1, HIGH);\n  delay(1000);\n  digitalWrite(LED_PIN_1, LOW);\n  delay(1000);\n"
        ));
        assert!(!code.contains("BUTTON"));
    }

    #[test]
    fn buttons_read_and_report() {
        let model = WiringModel {
            buttons: vec![ButtonEntry { pin: 2 }, ButtonEntry { pin: 3 }],
            ..Default::default()
        };
        let config = GeneratorConfig { serial_baud: 115200, blink_delay_ms: 500 };
        let code = FirmwareCodeGenerator::new(&model, &config).generate_program();

        assert!(code.contains("#define BUTTON_PIN_1 2\n#define BUTTON_PIN_2 3\n"));
        assert!(code.contains("  Serial.begin(115200);\n"));
        assert!(code.contains("  pinMode(BUTTON_PIN_2, INPUT_PULLUP);\n"));
        assert!(code.contains(
            "  int button2State = digitalRead(BUTTON_PIN_2);\n  if (button2State == LOW) {\n    Serial.println(\"Button 2 pressed!\");\n  }\n"
        ));
        assert!(!code.contains("Blink"));
    }

    #[test]
    fn actuators_get_inert_templates() {
        let model = WiringModel {
            actuators: vec![
                ActuatorEntry { kind: ActuatorKind::MistingPump, pin: 25 },
                ActuatorEntry { kind: ActuatorKind::Fan, pin: 4 },
                ActuatorEntry { kind: ActuatorKind::Fan, pin: 12 },
            ],
            ..Default::default()
        };
        let config = GeneratorConfig::default();
        let generator = FirmwareCodeGenerator::new(&model, &config);
        let code = generator.generate_program();

        let names: Vec<_> = generator.pin_definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["MISTING_PUMP_PIN", "FAN_PIN_1", "FAN_PIN_2"]);
        assert!(code.contains("  pinMode(MISTING_PUMP_PIN, OUTPUT);  // misting pump\n"));
        assert!(code.contains("  // digitalWrite(FAN_PIN_2, HIGH);  // Turn ON fan\n"));
        assert!(code.contains("  // digitalWrite(FAN_PIN_2, LOW);   // Turn OFF fan\n"));
    }

    #[test]
    fn output_is_deterministic() {
        let model = WiringModel {
            leds: vec![led(13), led(12)],
            buttons: vec![ButtonEntry { pin: 2 }],
            actuators: vec![ActuatorEntry { kind: ActuatorKind::WaterPump, pin: 7 }],
            ..Default::default()
        };
        let config = GeneratorConfig::default();
        let first = FirmwareCodeGenerator::new(&model, &config).generate_program();
        let second = FirmwareCodeGenerator::new(&model, &config).generate_program();
        assert_eq!(first, second);
    }
}
