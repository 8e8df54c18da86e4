//! # Script Runtime
//!
//! Runs transpiled scripts against the virtual GPIO host. The interpreter
//! itself is a collaborator behind [`ScriptRuntime`]; this module owns the
//! host object, the `machine`/`time` prelude and the loop scheduler.

mod gpio;
mod scheduler;

pub use gpio::{
    Attenuation, PinHost, PinListener, PinMode, PinState, VirtualGpio, ADC_MAX, ESP32_GPIO_PINS,
};
pub use scheduler::{partition_statements, sleep_duration, LoopCursor, RunState, StatementScheduler};

use crate::config::SchedulerConfig;
use crate::error::{CfgcError, Result};
use std::sync::Arc;

/// A live interpreter instance
pub trait ScriptRuntime: Send {
    /// Execute `code` against the interpreter's persistent global state
    fn run(&mut self, code: &str) -> Result<()>;
}

/// Creates interpreter instances bound to a pin host. The host is exposed to
/// scripts as the `_host` module used by [`MACHINE_PRELUDE`].
pub trait RuntimeLoader: Send + Sync {
    fn load(&self, host: Arc<dyn PinHost>) -> Result<Box<dyn ScriptRuntime>>;
}

pub type SharedRuntime = Arc<tokio::sync::Mutex<Box<dyn ScriptRuntime>>>;

/// Installs `machine` (Pin, PWM, ADC) and `time` modules backed by `_host`,
/// plus an Arduino-style global `Serial`. Sleeps are no-ops because the
/// scheduler turns them into timer waits.
pub const MACHINE_PRELUDE: &str = r#"
import sys
import builtins
import _host

class Pin:
    IN = 0
    OUT = 1
    PULL_UP = 2

    def __init__(self, pin_num, mode=IN, pull=None):
        self.pin_num = pin_num
        self.mode = mode
        _host.configure_pin(pin_num, mode, -1 if pull is None else pull)

    def value(self, val=None):
        if val is None:
            return _host.pin_value(self.pin_num)
        _host.set_pin_value(self.pin_num, 1 if val else 0)

    def on(self):
        self.value(1)

    def off(self):
        self.value(0)

class PWM:
    def __init__(self, pin, freq=1000, duty=512):
        self.pin = pin if isinstance(pin, int) else pin.pin_num
        self._freq = freq
        self.duty(duty)

    def freq(self, val=None):
        if val is None:
            return self._freq
        self._freq = val

    def duty(self, val=None):
        if val is None:
            return self._duty
        self._duty = val
        _host.set_pwm_duty(self.pin, val)

    def deinit(self):
        pass

class ADC:
    ATTN_0DB = 0
    ATTN_2_5DB = 1
    ATTN_6DB = 2
    ATTN_11DB = 3

    def __init__(self, pin):
        self.pin = pin if isinstance(pin, int) else pin.pin_num

    def atten(self, atten):
        _host.configure_attenuation(self.pin, atten)

    def width(self, bits):
        pass

    def read(self):
        return _host.read_analog(self.pin)

    def read_u16(self):
        return int(self.read() * 16)

class MachineModule:
    Pin = Pin
    PWM = PWM
    ADC = ADC

class TimeModule:
    @staticmethod
    def sleep_ms(ms):
        pass

    @staticmethod
    def sleep(seconds):
        pass

class SerialClass:
    def begin(self, baud=9600):
        pass

    def print(self, *args):
        print(' '.join(str(a) for a in args), end='')

    def println(self, *args):
        print(' '.join(str(a) for a in args))

    def available(self):
        return 0

    def read(self):
        return -1

sys.modules['machine'] = MachineModule()
sys.modules['time'] = TimeModule()
builtins.Serial = SerialClass()
"#;

const LOOP_HEADER: &str = "while True:";

/// Split a script at its column-0 `while True:` into the setup text and the
/// indented loop body. `None` when the script has no such loop.
pub fn split_script(script: &str) -> Option<(&str, String)> {
    let mut offset = 0;
    for line in script.split_inclusive('\n') {
        if line.trim_end() == LOOP_HEADER {
            let setup = &script[..offset];
            let rest = &script[offset + line.len()..];
            let body: Vec<&str> = rest
                .lines()
                .take_while(|l| l.trim().is_empty() || l.starts_with(char::is_whitespace))
                .collect();
            return Some((setup, body.join("\n")));
        }
        offset += line.len();
    }
    None
}

/// Drives one interpreter: lazy loading, setup execution and the loop
/// scheduler
pub struct ScriptRunner {
    loader: Box<dyn RuntimeLoader>,
    host: Arc<VirtualGpio>,
    runtime: Option<SharedRuntime>,
    scheduler: StatementScheduler,
}

impl ScriptRunner {
    pub fn new(loader: impl RuntimeLoader + 'static, host: Arc<VirtualGpio>, config: SchedulerConfig) -> Self {
        Self {
            loader: Box::new(loader),
            host,
            runtime: None,
            scheduler: StatementScheduler::new(config),
        }
    }

    pub fn host(&self) -> &Arc<VirtualGpio> {
        &self.host
    }

    pub fn is_initialized(&self) -> bool {
        self.runtime.is_some()
    }

    /// Load the interpreter and install the prelude
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!("[RUNNER] Loading script runtime...");
        let host: Arc<dyn PinHost> = self.host.clone();
        let mut runtime = self
            .loader
            .load(host)
            .map_err(|e| CfgcError::RuntimeLoad(e.to_string()))?;

        runtime
            .run(MACHINE_PRELUDE)
            .map_err(|e| CfgcError::RuntimeLoad(format!("prelude failed: {}", e)))?;

        tracing::info!("[RUNNER] Runtime ready, machine and time modules installed");
        self.runtime = Some(Arc::new(tokio::sync::Mutex::new(runtime)));
        Ok(())
    }

    /// Run a script. A `while True:` loop runs its preceding text once, then
    /// hands the loop body to the scheduler; anything else runs once.
    pub async fn run_code(&mut self, script: &str) -> Result<()> {
        if self.runtime.is_none() {
            self.initialize()?;
        }
        let runtime = match &self.runtime {
            Some(runtime) => runtime.clone(),
            None => return Err(CfgcError::RuntimeLoad("runtime unavailable".into())),
        };

        self.scheduler.stop();

        let Some((setup, body)) = split_script(script) else {
            tracing::info!("[RUNNER] No loop detected, running once");
            return runtime
                .lock()
                .await
                .run(script)
                .map_err(|e| CfgcError::Execution(e.to_string()));
        };

        tracing::info!("[RUNNER] Running setup code");
        runtime
            .lock()
            .await
            .run(setup)
            .map_err(|e| CfgcError::Execution(format!("setup failed: {}", e)))?;

        let statements = partition_statements(&body);
        for (index, statement) in statements.iter().enumerate() {
            tracing::debug!("[RUNNER] Statement {}: {}", index, statement.replace('\n', "\\n"));
        }
        self.scheduler.start(statements, runtime);
        Ok(())
    }

    pub fn set_paused(&self, paused: bool) {
        if paused {
            self.scheduler.pause();
        } else {
            self.scheduler.resume();
        }
    }

    /// True unless a loop is actively running
    pub fn is_paused(&self) -> bool {
        self.scheduler.state() != RunState::Running
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn state(&self) -> RunState {
        self.scheduler.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct Shared {
        executed: Arc<Mutex<Vec<String>>>,
    }

    /// Interprets `pinN.value(L)` lines only; `fail` anywhere raises
    struct MiniRuntime {
        host: Arc<dyn PinHost>,
        shared: Shared,
    }

    impl ScriptRuntime for MiniRuntime {
        fn run(&mut self, code: &str) -> Result<()> {
            self.shared.executed.lock().unwrap().push(code.to_string());
            if code.contains("fail") {
                return Err(CfgcError::Execution("NameError".into()));
            }
            for line in code.lines() {
                let line = line.trim();
                if let Some(rest) = line.strip_prefix("pin") {
                    if let Some((pin, level)) = rest.split_once(".value(") {
                        let pin: u32 = pin.parse().unwrap();
                        self.host.set_pin_value(pin, level.starts_with('1'));
                    }
                }
            }
            Ok(())
        }
    }

    struct MiniLoader {
        shared: Shared,
        broken: bool,
    }

    impl RuntimeLoader for MiniLoader {
        fn load(&self, host: Arc<dyn PinHost>) -> Result<Box<dyn ScriptRuntime>> {
            if self.broken {
                return Err(CfgcError::RuntimeLoad("module not found".into()));
            }
            Ok(Box::new(MiniRuntime { host, shared: self.shared.clone() }))
        }
    }

    fn runner(broken: bool) -> (ScriptRunner, Shared) {
        let shared = Shared::default();
        let loader = MiniLoader { shared: shared.clone(), broken };
        let runner = ScriptRunner::new(loader, Arc::new(VirtualGpio::new()), SchedulerConfig::default());
        (runner, shared)
    }

    #[test]
    fn scripts_split_at_the_top_level_loop() {
        let script = "from machine import Pin\nled = Pin(2, Pin.OUT)\n\nwhile True:\n    led.value(1)\n    time.sleep_ms(100)\nprint('after')\n";
        let (setup, body) = split_script(script).unwrap();
        assert_eq!(setup, "from machine import Pin\nled = Pin(2, Pin.OUT)\n\n");
        assert_eq!(body, "    led.value(1)\n    time.sleep_ms(100)");
        assert!(split_script("    while True:\n        pass\n").is_none());
    }

    #[tokio::test]
    async fn load_failure_is_reported() {
        let (mut runner, _) = runner(true);
        let err = runner.run_code("x = 1").await.unwrap_err();
        assert!(matches!(err, CfgcError::RuntimeLoad(_)));
        assert!(!runner.is_initialized());
    }

    #[tokio::test]
    async fn setup_failure_is_an_execution_error() {
        let (mut runner, _) = runner(false);
        let err = runner.run_code("fail()\nwhile True:\n    pass\n").await.unwrap_err();
        assert!(matches!(err, CfgcError::Execution(_)));
        assert_eq!(runner.state(), RunState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_drives_the_host() {
        let (mut runner, shared) = runner(false);
        let levels = Arc::new(Mutex::new(Vec::new()));
        let sink = levels.clone();
        runner.host().set_pin_listener(2, move |level| sink.lock().unwrap().push(level));

        runner
            .run_code("pin2 = Pin(2, Pin.OUT)\n\nwhile True:\n    pin2.value(1)\n    time.sleep_ms(100)\n    pin2.value(0)\n    time.sleep_ms(100)\n")
            .await
            .unwrap();
        assert_eq!(runner.state(), RunState::Running);

        tokio::time::sleep(Duration::from_millis(250)).await;
        runner.set_paused(true);
        assert!(runner.is_paused());
        runner.stop();

        assert_eq!(*levels.lock().unwrap(), vec![true, false, true]);
        let executed = shared.executed.lock().unwrap();
        assert_eq!(executed[0], MACHINE_PRELUDE);
        assert_eq!(executed[1], "pin2 = Pin(2, Pin.OUT)\n\n");
    }

    #[tokio::test]
    async fn scripts_without_a_loop_run_once() {
        let (mut runner, shared) = runner(false);
        runner.run_code("pin4.value(1)\n").await.unwrap();
        assert_eq!(runner.state(), RunState::Idle);
        assert_eq!(shared.executed.lock().unwrap().len(), 2);
        assert!(runner.host().pin_value(4));
    }
}
