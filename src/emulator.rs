//! # Emulator Manager
//!
//! Dispatches firmware to the execution path of the selected board family:
//! AVR boards compile to hex and run on an instruction-level emulator,
//! ESP32 boards are transpiled and run by the [`ScriptRunner`]. Pin changes
//! from either path reach a single observer as `(canonical pin, level)`.

use crate::board::{resolve_pin, BoardFamily};
use crate::error::{CfgcError, Result};
use crate::runtime::{ScriptRunner, ESP32_GPIO_PINS};
use crate::transpile;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};

/// Output of the external firmware compiler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileResult {
    pub hex: String,
    pub stdout: String,
    pub stderr: String,
}

/// Turns C-like firmware into Intel hex
pub trait FirmwareCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<CompileResult>;
}

/// I/O ports of the ATmega328P
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvrPort {
    B,
    C,
    D,
}

impl AvrPort {
    pub const ALL: [AvrPort; 3] = [AvrPort::B, AvrPort::C, AvrPort::D];

    /// Uno header name wired to `bit` of this port
    pub fn port_name(self, bit: u8) -> Option<String> {
        match (self, bit) {
            (AvrPort::B, 0..=5) => Some((8 + bit).to_string()),
            (AvrPort::C, 0..=5) => Some(format!("A{}", bit)),
            (AvrPort::D, 0..=7) => Some(bit.to_string()),
            _ => None,
        }
    }

    /// Canonical pin number behind `bit`
    pub fn pin_number(self, bit: u8) -> Option<u32> {
        resolve_pin(BoardFamily::Avr, &self.port_name(bit)?)
    }

    /// `(bit, canonical pin)` for every header-wired bit
    pub fn pin_map(self) -> Vec<(u8, u32)> {
        (0..8).filter_map(|bit| self.pin_number(bit).map(|pin| (bit, pin))).collect()
    }
}

/// Receives the full port register after every change
pub type PortListener = Box<dyn Fn(u8) + Send + Sync>;

/// Receives `(canonical pin, level)` for pin changes on either path
pub type PinObserver = Arc<dyn Fn(u32, bool) + Send + Sync>;

/// Instruction-level AVR emulator
pub trait AvrEmulator: Send {
    /// Load a program, replacing any previous one and its port listeners
    fn load(&mut self, hex: &str) -> Result<()>;
    fn is_loaded(&self) -> bool;
    fn execute(&mut self) -> Result<()>;
    fn set_paused(&mut self, paused: bool);
    fn is_paused(&self) -> bool;
    fn stop(&mut self);
    fn add_port_listener(&mut self, port: AvrPort, listener: PortListener);
}

pub struct EmulatorManager {
    family: BoardFamily,
    compiler: Box<dyn FirmwareCompiler>,
    avr: Box<dyn AvrEmulator>,
    runner: ScriptRunner,
    observer: Arc<Mutex<Option<PinObserver>>>,
}

impl EmulatorManager {
    pub fn new(
        compiler: impl FirmwareCompiler + 'static,
        avr: impl AvrEmulator + 'static,
        runner: ScriptRunner,
    ) -> Self {
        Self {
            family: BoardFamily::Avr,
            compiler: Box::new(compiler),
            avr: Box::new(avr),
            runner,
            observer: Arc::new(Mutex::new(None)),
        }
    }

    pub fn board_family(&self) -> BoardFamily {
        self.family
    }

    pub fn set_board_family(&mut self, family: BoardFamily) {
        tracing::info!("[EMULATOR] Board family set to {:?}", family);
        self.family = family;
    }

    pub fn set_pin_observer(&mut self, observer: impl Fn(u32, bool) + Send + Sync + 'static) {
        *self.observer.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(observer));
    }

    pub fn runner(&self) -> &ScriptRunner {
        &self.runner
    }

    pub fn compile_code(&self, source: &str) -> Result<CompileResult> {
        self.compiler.compile(source)
    }

    /// Compile and load firmware. ESP32 boards run interpreted, so they get an
    /// empty result and nothing is loaded.
    pub fn compile_and_load(&mut self, source: &str) -> Result<CompileResult> {
        if self.family == BoardFamily::Esp32 {
            tracing::info!("[EMULATOR] ESP32 board, nothing to compile");
            return Ok(CompileResult::default());
        }

        tracing::info!("[EMULATOR] Compiling firmware ({} bytes)", source.len());
        let result = self.compile_code(source)?;
        if result.hex.trim().is_empty() {
            return Err(CfgcError::Compilation(result.stderr));
        }
        self.load_hex(&result.hex)?;
        Ok(result)
    }

    /// Load a program and attach its port listeners. Loading drops the
    /// previous program's listeners, so each set is attached exactly once.
    pub fn load_hex(&mut self, hex: &str) -> Result<()> {
        self.avr.load(&hex.replace("\n\n", "\n"))?;
        self.attach_port_listeners();
        Ok(())
    }

    /// Start execution. ESP32 boards transpile and run `source`; AVR boards
    /// run the program loaded by [`compile_and_load`](Self::compile_and_load).
    pub async fn run(&mut self, source: Option<&str>) -> Result<()> {
        match self.family {
            BoardFamily::Esp32 => {
                let Some(source) = source else {
                    if !self.runner.is_initialized() {
                        self.runner.initialize()?;
                    }
                    return Ok(());
                };
                self.attach_gpio_observer();
                let script = transpile::convert_to_script(source);
                tracing::debug!("[EMULATOR] Converted script:\n{}", script);
                self.runner.run_code(&script).await?;
                tracing::info!("[EMULATOR] Script execution started");
                Ok(())
            }
            BoardFamily::Avr => {
                self.stop();
                if !self.avr.is_loaded() {
                    return Err(CfgcError::Emulator("no firmware loaded".into()));
                }
                self.avr.execute()?;
                tracing::info!("[EMULATOR] AVR execution started");
                Ok(())
            }
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        match self.family {
            BoardFamily::Esp32 => self.runner.set_paused(paused),
            BoardFamily::Avr => self.avr.set_paused(paused),
        }
    }

    /// True when nothing is running on the active path
    pub fn is_paused(&self) -> bool {
        match self.family {
            BoardFamily::Esp32 => self.runner.is_paused(),
            BoardFamily::Avr => !self.avr.is_loaded() || self.avr.is_paused(),
        }
    }

    pub fn stop(&mut self) {
        self.avr.stop();
        self.runner.stop();
    }

    fn current_observer(&self) -> Option<PinObserver> {
        self.observer.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Listeners forward to whichever observer is set when the port changes
    fn attach_port_listeners(&mut self) {
        for port in AvrPort::ALL {
            let pins = port.pin_map();
            let slot = self.observer.clone();
            self.avr.add_port_listener(
                port,
                Box::new(move |value| {
                    let observer = slot.lock().unwrap_or_else(PoisonError::into_inner).clone();
                    if let Some(observer) = observer {
                        for &(bit, pin) in &pins {
                            observer(pin, value & (1 << bit) != 0);
                        }
                    }
                }),
            );
        }
        tracing::debug!("[EMULATOR] Port listeners attached");
    }

    fn attach_gpio_observer(&self) {
        let Some(observer) = self.current_observer() else {
            return;
        };
        let host = self.runner.host();
        for &pin in ESP32_GPIO_PINS {
            let observer = observer.clone();
            host.set_pin_listener(pin, move |level| observer(pin, level));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerConfig;
    use crate::runtime::{PinHost, RuntimeLoader, ScriptRuntime, VirtualGpio};
    use std::collections::HashMap;

    struct StaticCompiler(CompileResult);

    impl FirmwareCompiler for StaticCompiler {
        fn compile(&self, _source: &str) -> Result<CompileResult> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct AvrState {
        hex: Option<String>,
        running: bool,
        paused: bool,
        listeners: HashMap<AvrPort, Vec<PortListener>>,
    }

    #[derive(Clone, Default)]
    struct FakeAvr(Arc<Mutex<AvrState>>);

    impl FakeAvr {
        fn write_port(&self, port: AvrPort, value: u8) {
            let state = self.0.lock().unwrap();
            for listener in state.listeners.get(&port).into_iter().flatten() {
                listener(value);
            }
        }
    }

    impl AvrEmulator for FakeAvr {
        fn load(&mut self, hex: &str) -> Result<()> {
            let mut state = self.0.lock().unwrap();
            state.hex = Some(hex.to_string());
            state.listeners.clear();
            Ok(())
        }
        fn is_loaded(&self) -> bool {
            self.0.lock().unwrap().hex.is_some()
        }
        fn execute(&mut self) -> Result<()> {
            self.0.lock().unwrap().running = true;
            Ok(())
        }
        fn set_paused(&mut self, paused: bool) {
            self.0.lock().unwrap().paused = paused;
        }
        fn is_paused(&self) -> bool {
            self.0.lock().unwrap().paused
        }
        fn stop(&mut self) {
            self.0.lock().unwrap().running = false;
        }
        fn add_port_listener(&mut self, port: AvrPort, listener: PortListener) {
            self.0.lock().unwrap().listeners.entry(port).or_default().push(listener);
        }
    }

    /// Applies `name.value(L)` writes for pins bound with `name = Pin(N, …)`
    struct PinScript {
        host: Arc<dyn PinHost>,
        names: HashMap<String, u32>,
    }

    impl ScriptRuntime for PinScript {
        fn run(&mut self, code: &str) -> Result<()> {
            for line in code.lines().map(str::trim) {
                if let Some((name, rest)) = line.split_once(" = Pin(") {
                    let pin = rest.split(',').next().and_then(|n| n.trim().parse().ok());
                    if let Some(pin) = pin {
                        self.names.insert(name.to_string(), pin);
                    }
                } else if let Some((name, level)) = line.split_once(".value(") {
                    if let Some(&pin) = self.names.get(name) {
                        self.host.set_pin_value(pin, level.starts_with('1'));
                    }
                }
            }
            Ok(())
        }
    }

    struct PinScriptLoader;

    impl RuntimeLoader for PinScriptLoader {
        fn load(&self, host: Arc<dyn PinHost>) -> Result<Box<dyn ScriptRuntime>> {
            Ok(Box::new(PinScript { host, names: HashMap::new() }))
        }
    }

    fn manager(hex: &str) -> (EmulatorManager, FakeAvr, Arc<Mutex<Vec<(u32, bool)>>>) {
        let avr = FakeAvr::default();
        let runner = ScriptRunner::new(PinScriptLoader, Arc::new(VirtualGpio::new()), SchedulerConfig::default());
        let compiled = CompileResult { hex: hex.to_string(), ..Default::default() };
        let mut manager = EmulatorManager::new(StaticCompiler(compiled), avr.clone(), runner);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        manager.set_pin_observer(move |pin, level| sink.lock().unwrap().push((pin, level)));
        (manager, avr, seen)
    }

    #[test]
    fn uno_port_map() {
        assert_eq!(AvrPort::B.pin_map(), vec![(0, 8), (1, 9), (2, 10), (3, 11), (4, 12), (5, 13)]);
        assert_eq!(AvrPort::C.pin_number(0), Some(14));
        assert_eq!(AvrPort::C.port_name(5).as_deref(), Some("A5"));
        assert_eq!(AvrPort::C.pin_number(6), None);
        assert_eq!(AvrPort::D.pin_map().len(), 8);
    }

    #[tokio::test]
    async fn avr_run_forwards_port_changes() {
        let (mut manager, avr, seen) = manager(":100000000C\n\n:00000001FF\n");
        assert!(manager.is_paused());

        let result = manager.compile_and_load("void setup() {}\nvoid loop() {}\n").unwrap();
        assert_eq!(result.hex, ":100000000C\n\n:00000001FF\n");
        assert_eq!(avr.0.lock().unwrap().hex.as_deref(), Some(":100000000C\n:00000001FF\n"));

        manager.run(None).await.unwrap();
        assert!(avr.0.lock().unwrap().running);
        assert!(!manager.is_paused());

        avr.write_port(AvrPort::B, 0b0010_0000);
        let seen = seen.lock().unwrap();
        assert!(seen.contains(&(13, true)));
        assert!(seen.contains(&(8, false)));
        assert_eq!(seen.len(), 6);
    }

    #[tokio::test]
    async fn repeated_runs_report_each_change_once() {
        let (mut manager, avr, seen) = manager(":00000001FF\n");
        manager.compile_and_load("void setup() {}\nvoid loop() {}\n").unwrap();
        manager.run(None).await.unwrap();
        manager.run(None).await.unwrap();

        avr.write_port(AvrPort::D, 0b0000_0100);
        {
            let seen = seen.lock().unwrap();
            assert_eq!(seen.len(), 8);
            assert_eq!(seen.iter().filter(|&&(pin, _)| pin == 2).count(), 1);
        }

        manager.compile_and_load("void setup() {}\nvoid loop() {}\n").unwrap();
        manager.run(None).await.unwrap();
        avr.write_port(AvrPort::D, 0);
        assert_eq!(seen.lock().unwrap().len(), 16);
    }

    #[tokio::test]
    async fn observer_can_be_set_after_loading() {
        let (mut manager, avr, first) = manager(":00000001FF\n");
        manager.compile_and_load("x").unwrap();

        let second = Arc::new(Mutex::new(Vec::new()));
        let sink = second.clone();
        manager.set_pin_observer(move |pin, level| sink.lock().unwrap().push((pin, level)));
        manager.run(None).await.unwrap();

        avr.write_port(AvrPort::C, 0b0000_0001);
        assert!(first.lock().unwrap().is_empty());
        assert!(second.lock().unwrap().contains(&(14, true)));
    }

    #[tokio::test]
    async fn avr_run_without_firmware_fails() {
        let (mut manager, _, _) = manager("");
        assert!(matches!(manager.compile_and_load("x"), Err(CfgcError::Compilation(_))));
        assert!(matches!(manager.run(None).await, Err(CfgcError::Emulator(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn esp32_run_transpiles_and_observes_gpio() {
        let (mut manager, avr, seen) = manager(":00000001FF\n");
        manager.set_board_family(BoardFamily::Esp32);

        assert_eq!(manager.compile_and_load("ignored").unwrap(), CompileResult::default());
        assert!(avr.0.lock().unwrap().hex.is_none());

        let firmware = "#define LED_PIN_1 2\nvoid setup() {\n  pinMode(LED_PIN_1, OUTPUT);\n}\nvoid loop() {\n  digitalWrite(LED_PIN_1, HIGH);\n  delay(100);\n}\n";
        manager.run(Some(firmware)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        assert!(!manager.is_paused());
        manager.set_paused(true);
        assert!(manager.is_paused());
        manager.stop();

        assert_eq!(seen.lock().unwrap().first(), Some(&(2, true)));
    }
}
