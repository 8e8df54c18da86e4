//! # Circuit Firmware Graph Compiler (CFGC)
//!
//! Compiler for turning breadboard-style wiring diagrams into runnable
//! microcontroller firmware, and firmware into interpreter scripts for
//! boards that run one.
//!
//! CFGC provides:
//! - Wiring extraction and board/peripheral classification
//! - C-like firmware generation with pin definitions, setup and loop
//! - A C-like → script transpiler bound to a virtual GPIO host
//! - A cooperative statement scheduler for never-ending script loops
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cfgc::{compile_circuit, WiringGraph};
//!
//! let json = std::fs::read_to_string("circuit.json")?;
//! let graph = WiringGraph::from_json(&json)?;
//! std::fs::write("sketch.ino", compile_circuit(&graph))?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! CFGC follows a multi-phase compilation pipeline:
//!
//! 1. **Extraction** - Resolve wires to component/port pairs
//! 2. **Classification** - Orient wires board-first, resolve pin numbers
//! 3. **Wiring Model** - Per-kind, deduplicated peripheral bindings
//! 4. **Code Generation** - Firmware text for the wiring model
//! 5. **Transpilation** - Firmware → script (ESP32 boards only)
//! 6. **Scheduling** - Statement-at-a-time execution of the script loop

pub mod board;
pub mod catalog;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod emulator;
pub mod error;
pub mod extract;
pub mod graph;
pub mod runtime;
pub mod transpile;
pub mod wiring;

// Re-export the main compilation API
pub use compiler::{
    build_wiring_model,
    compile_circuit,
    compile_circuit_to_script,
    compile_circuit_with_config,
    detect_board_family,
};

pub use board::{BoardFamily, PeripheralClass};
pub use config::{CfgcConfig, GeneratorConfig, SchedulerConfig};
pub use error::{CfgcError, Result};
pub use graph::{Component, ComponentKind, Connection, Diagram, PinInfo, PinRole, WiringGraph};
pub use transpile::{convert_to_script, transpile, Transpilation};
pub use wiring::WiringModel;
