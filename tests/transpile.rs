//! Firmware → script conversion on realistic sketches.

use cfgc::transpile::{convert_to_script, transpile};

const SOIL_SKETCH: &str = r#"// Soil moisture controlled misting
#define MIST_PUMP_PIN 25
#define SOIL_PIN 34
const int DRY_LEVEL = 2500;

void setup() {
  Serial.begin(115200);
  pinMode(MIST_PUMP_PIN, OUTPUT);
}

void loop() {
  int moisture = analogRead(SOIL_PIN);
  Serial.print("moisture: ");
  Serial.println(moisture);
  if (moisture > DRY_LEVEL) {
    digitalWrite(MIST_PUMP_PIN, HIGH);
  } else {
    digitalWrite(MIST_PUMP_PIN, LOW);
  }
  delay(2000);
}
"#;

#[test]
fn soil_sketch() {
    assert_eq!(
        convert_to_script(SOIL_SKETCH),
        "from machine import Pin, ADC\n\
         import time\n\
         \n\
         DRY_LEVEL = 2500\n\
         \n\
         mist_pump = Pin(25, Pin.OUT)\n\
         adc_soil = ADC(Pin(34))\n\
         adc_soil.atten(ADC.ATTN_11DB)  # Full range 0-3.3V\n\
         \n\
         while True:\n\
         \x20   moisture = adc_soil.read()\n\
         \x20   print(\"moisture: \", end=\"\")\n\
         \x20   print(moisture)\n\
         \x20   if moisture > DRY_LEVEL:\n\
         \x20       mist_pump.value(1)\n\
         \x20   else:\n\
         \x20       mist_pump.value(0)\n\
         \x20   time.sleep_ms(2000)\n"
    );
}

#[test]
fn output_is_a_fixed_point() {
    let script = convert_to_script(SOIL_SKETCH);
    assert_eq!(convert_to_script(&script), script);
}

#[test]
fn single_line_if_else_keeps_else_at_if_depth() {
    let source = "void setup() {\n  pinMode(13, OUTPUT);\n}\nvoid loop() {\n  if (x > 5) { digitalWrite(13, HIGH); } else { digitalWrite(13, LOW); }\n}\n";
    let script = convert_to_script(source);
    assert!(script.ends_with(
        "while True:\n    if x > 5:\n        pin13.value(1)\n    else:\n        pin13.value(0)\n"
    ));
}

#[test]
fn nested_blocks_indent_by_depth() {
    let source = "void loop() {\n  while (digitalRead(4) == LOW) {\n    if (ready && !busy) {\n      delay(5);\n    } else if (busy) {\n      Serial.println();\n    }\n  }\n}\n";
    let script = convert_to_script(source);
    assert!(script.ends_with(
        "while True:\n    while pin4.value() == 0:\n        if ready and not busy:\n            time.sleep_ms(5)\n        elif busy:\n            print()\n"
    ));
}

#[test]
fn pin_suffix_collisions_are_reported() {
    let source = "#define PUMP_PIN 25\n#define VALVE_PIN 25\nvoid setup() {\n  pinMode(PUMP_PIN, OUTPUT);\n  pinMode(VALVE_PIN, OUTPUT);\n}\nvoid loop() {\n}\n";
    let result = transpile(source);
    assert!(result.converted);
    let collisions = result.context.role_collisions();
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].0, 25);
}

#[test]
fn plain_text_is_left_alone() {
    let text = "just some notes about the circuit\n";
    let result = transpile(text);
    assert!(!result.converted);
    assert_eq!(result.script, text);
}
