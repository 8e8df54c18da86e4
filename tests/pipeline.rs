//! End-to-end compilation from circuit descriptions to firmware and scripts.

use cfgc::wiring::{ActuatorEntry, ButtonEntry, GenericEntry};
use cfgc::board::ActuatorKind;
use cfgc::{
    build_wiring_model, compile_circuit, compile_circuit_to_script, detect_board_family, BoardFamily,
    CfgcConfig, Component, ComponentKind, GeneratorConfig, WiringGraph,
};

fn fixture(name: &str) -> WiringGraph {
    let path = format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name);
    let json = std::fs::read_to_string(path).unwrap();
    WiringGraph::from_json(&json).unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn uno_led_blinks_on_pin_13() {
    init_tracing();
    let graph = fixture("uno_blink.json");
    let firmware = compile_circuit(&graph);

    assert!(firmware.contains("// Pin definitions\n#define LED_PIN_1 13\n"));
    assert!(firmware.contains("  pinMode(LED_PIN_1, OUTPUT);\n"));
    assert!(firmware.contains(
        "void loop() {\n  // Blink LED example\n  digitalWrite(LED_PIN_1, HIGH);\n  delay(1000);\n  digitalWrite(LED_PIN_1, LOW);\n  delay(1000);\n\n}\n"
    ));
}

#[test]
fn circuits_without_board_wires_render_boilerplate_only() {
    let mut graph = WiringGraph::new();
    graph
        .add_component(Component::catalogued("uno", ComponentKind::ArduinoUno))
        .add_component(Component::catalogued("led", ComponentKind::Led))
        .add_component(Component::catalogued("btn", ComponentKind::Pushbutton));
    graph.connect("led", "C", "btn", "1.l");

    let firmware = compile_circuit(&graph);
    assert!(!firmware.contains("#define"));
    assert!(firmware.ends_with(
        "void setup() {\n  // Initialize serial communication\n  Serial.begin(9600);\n\n}\n\nvoid loop() {\n}\n"
    ));
}

#[test]
fn greenhouse_model() {
    let graph = fixture("greenhouse_esp32.json");
    assert_eq!(detect_board_family(&graph), Some(BoardFamily::Esp32));

    let model = build_wiring_model(&graph);
    assert_eq!(model.family, Some(BoardFamily::Esp32));
    assert_eq!(model.leds.len(), 1);
    assert_eq!(model.leds[0].pin, 2);
    assert_eq!(model.buttons, vec![ButtonEntry { pin: 4 }]);
    assert_eq!(
        model.actuators,
        vec![
            ActuatorEntry { kind: ActuatorKind::MistingPump, pin: 25 },
            ActuatorEntry { kind: ActuatorKind::Fan, pin: 26 },
        ]
    );
    assert_eq!(
        model.others,
        vec![GenericEntry { component_type: "ph_sensor".into(), port: "AO".into(), pin: 34 }]
    );
}

#[test]
fn greenhouse_script_binds_every_output() {
    let graph = fixture("greenhouse_esp32.json");
    let config = CfgcConfig::from_toml_str("[generator]\nblink_delay_ms = 250\n").unwrap();
    let script = compile_circuit_to_script(&graph, &config.generator);

    assert!(script.contains(
        "led1 = Pin(2, Pin.OUT)\nmisting_pump = Pin(25, Pin.OUT)\nfan = Pin(26, Pin.OUT)\nbutton1 = Pin(4, Pin.IN, Pin.PULL_UP)\n\nwhile True:\n"
    ));
    assert!(script.contains("    led1.value(1)\n    time.sleep_ms(250)\n    led1.value(0)\n"));
    assert!(!script.contains("FAN_PIN"));
}

#[test]
fn generated_firmware_is_stable_across_runs() {
    let graph = fixture("greenhouse_esp32.json");
    let config = GeneratorConfig::default();
    assert_eq!(
        cfgc::compile_circuit_with_config(&graph, &config),
        cfgc::compile_circuit_with_config(&graph, &config)
    );
}
