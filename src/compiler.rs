//! # Circuit Compiler
//!
//! Main entry points for compiling wiring graphs to firmware and scripts.

use crate::board::{board_family, BoardFamily};
use crate::codegen::FirmwareCodeGenerator;
use crate::config::GeneratorConfig;
use crate::graph::Diagram;
use crate::transpile;
use crate::wiring::WiringModel;

/// Compile a wiring graph to C-like firmware source
///
/// This is the main entry point for the compiler. Wires that cannot be
/// resolved or classified are skipped, so compilation always produces a
/// program; a circuit with nothing wired yields only the boilerplate.
///
/// # Examples
///
/// ```rust
/// use cfgc::{compile_circuit, Component, ComponentKind, WiringGraph};
///
/// let mut graph = WiringGraph::new();
/// graph
///     .add_component(Component::catalogued("uno", ComponentKind::ArduinoUno))
///     .add_component(Component::catalogued("led", ComponentKind::Led));
/// graph.connect("led", "A", "uno", "13").connect("led", "C", "uno", "GND.1");
///
/// let firmware = compile_circuit(&graph);
/// assert!(firmware.contains("#define LED_PIN_1 13"));
/// ```
pub fn compile_circuit<D: Diagram + ?Sized>(diagram: &D) -> String {
    compile_circuit_with_config(diagram, &GeneratorConfig::default())
}

/// Compile a wiring graph with explicit generator settings
///
/// # Arguments
///
/// * `diagram` - The wiring graph to compile
/// * `config` - Serial baud rate and blink delay baked into the firmware
pub fn compile_circuit_with_config<D: Diagram + ?Sized>(diagram: &D, config: &GeneratorConfig) -> String {
    tracing::info!("[CFGC] Starting circuit compilation");
    tracing::info!(
        "[CFGC] Circuit: {} components, {} connections",
        diagram.components().len(),
        diagram.connections().len()
    );

    // Phase 1-3: extraction, classification, model building
    let model = build_wiring_model(diagram);

    // Phase 4: Generate code
    tracing::info!("[CFGC] Phase 4: Generating firmware...");
    let code = FirmwareCodeGenerator::new(&model, config).generate_program();

    tracing::info!("[CFGC] Code generation complete ({} bytes)", code.len());
    tracing::info!("[CFGC] Compilation successful!");

    code
}

/// Compile a wiring graph straight to an interpreter script
///
/// Generates firmware, then transpiles it. This is the ESP32 path.
pub fn compile_circuit_to_script<D: Diagram + ?Sized>(diagram: &D, config: &GeneratorConfig) -> String {
    let firmware = compile_circuit_with_config(diagram, config);

    tracing::info!("[CFGC] Phase 5: Transpiling firmware to script...");
    transpile::convert_to_script(&firmware)
}

/// Summarise a wiring graph without generating code
pub fn build_wiring_model<D: Diagram + ?Sized>(diagram: &D) -> WiringModel {
    tracing::info!("[CFGC] Phase 1: Extracting wires...");
    tracing::info!("[CFGC] Phase 2: Classifying board links...");
    tracing::info!("[CFGC] Phase 3: Building wiring model...");
    let model = WiringModel::build(diagram);

    tracing::info!(
        "[CFGC]   - {} LEDs, {} buttons, {} actuators ({} untemplated bindings)",
        model.leds.len(),
        model.buttons.len(),
        model.actuators.len(),
        model.others.len()
    );
    model
}

/// Family of the first board in the diagram, in insertion order
pub fn detect_board_family<D: Diagram + ?Sized>(diagram: &D) -> Option<BoardFamily> {
    diagram.components().iter().find_map(|component| board_family(&component.kind))
}
