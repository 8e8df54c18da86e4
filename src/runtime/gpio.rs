//! Virtual GPIO host handed to the interpreter at construction.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// GPIO numbers exposed by the ESP32 boards
pub const ESP32_GPIO_PINS: &[u32] = &[
    2, 4, 5, 12, 13, 14, 15, 16, 17, 18, 19, 21, 22, 23, 25, 26, 27, 32, 33,
];

/// Largest 12-bit ADC reading
pub const ADC_MAX: u16 = 4095;

/// PWM duties above this drive the pin high
const PWM_HIGH_THRESHOLD: u32 = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Input,
    InputPullUp,
    Output,
}

impl PinMode {
    /// Decode the interpreter's `Pin.IN`/`Pin.OUT` mode and `Pin.PULL_UP` pull codes
    pub fn from_codes(mode: i64, pull: i64) -> Self {
        match (mode, pull) {
            (1, _) => PinMode::Output,
            (_, 2) => PinMode::InputPullUp,
            _ => PinMode::Input,
        }
    }
}

/// ADC input range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attenuation {
    /// 0 to 1.0 V
    Db0,
    /// 0 to 1.34 V
    Db2_5,
    /// 0 to 2.0 V
    Db6,
    /// 0 to 3.3 V
    Db11,
}

impl Attenuation {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Attenuation::Db0),
            1 => Some(Attenuation::Db2_5),
            2 => Some(Attenuation::Db6),
            3 => Some(Attenuation::Db11),
            _ => None,
        }
    }
}

/// Narrow pin-control surface the interpreter sees
pub trait PinHost: Send + Sync {
    fn configure_pin(&self, pin: u32, mode: PinMode);
    fn pin_value(&self, pin: u32) -> bool;
    fn set_pin_value(&self, pin: u32, level: bool);
    fn configure_attenuation(&self, pin: u32, attenuation: Attenuation);
    fn read_analog(&self, pin: u32) -> u16;
    fn set_pwm_duty(&self, pin: u32, duty: u32);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinState {
    pub mode: PinMode,
    pub level: bool,
}

impl Default for PinState {
    fn default() -> Self {
        Self { mode: PinMode::Input, level: false }
    }
}

pub type PinListener = Arc<dyn Fn(bool) + Send + Sync>;

/// Pin table shared between the interpreter and the outside world
/// (UI, simulated inputs)
#[derive(Default)]
pub struct VirtualGpio {
    pins: Mutex<BTreeMap<u32, PinState>>,
    analog: Mutex<HashMap<u32, u16>>,
    attenuation: Mutex<HashMap<u32, Attenuation>>,
    listeners: Mutex<HashMap<u32, PinListener>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl VirtualGpio {
    /// ESP32 pin set, every pin an input at low level
    pub fn new() -> Self {
        Self::with_pins(ESP32_GPIO_PINS)
    }

    pub fn with_pins(pins: &[u32]) -> Self {
        let gpio = Self::default();
        lock(&gpio.pins).extend(pins.iter().map(|&pin| (pin, PinState::default())));
        gpio
    }

    pub fn pin_numbers(&self) -> Vec<u32> {
        lock(&self.pins).keys().copied().collect()
    }

    pub fn pin_state(&self, pin: u32) -> Option<PinState> {
        lock(&self.pins).get(&pin).copied()
    }

    pub fn attenuation(&self, pin: u32) -> Option<Attenuation> {
        lock(&self.attenuation).get(&pin).copied()
    }

    /// Called on every output write to `pin`, replacing any previous listener
    pub fn set_pin_listener(&self, pin: u32, listener: impl Fn(bool) + Send + Sync + 'static) {
        lock(&self.listeners).insert(pin, Arc::new(listener));
    }

    pub fn clear_pin_listeners(&self) {
        lock(&self.listeners).clear();
    }

    /// Drive an input pin from outside. Ignored for outputs and unknown pins.
    pub fn set_input_pin(&self, pin: u32, level: bool) {
        if let Some(state) = lock(&self.pins).get_mut(&pin) {
            if state.mode != PinMode::Output {
                state.level = level;
            }
        }
    }

    /// Feed the value subsequent ADC reads of `pin` return
    pub fn set_analog_input(&self, pin: u32, value: u16) {
        lock(&self.analog).insert(pin, value.min(ADC_MAX));
    }

    /// Update a pin level and notify its listener outside the table lock
    fn drive(&self, pin: u32, level: bool) {
        {
            let mut pins = lock(&self.pins);
            let Some(state) = pins.get_mut(&pin) else {
                tracing::debug!("[GPIO] Write to unknown pin {} ignored", pin);
                return;
            };
            state.level = level;
        }

        let listener = lock(&self.listeners).get(&pin).cloned();
        if let Some(listener) = listener {
            listener(level);
        }
    }
}

impl PinHost for VirtualGpio {
    fn configure_pin(&self, pin: u32, mode: PinMode) {
        if let Some(state) = lock(&self.pins).get_mut(&pin) {
            state.mode = mode;
            tracing::debug!("[GPIO] Pin {} mode set to {:?}", pin, mode);
        }
    }

    fn pin_value(&self, pin: u32) -> bool {
        self.pin_state(pin).is_some_and(|state| state.level)
    }

    fn set_pin_value(&self, pin: u32, level: bool) {
        tracing::trace!("[GPIO] Pin {} set to {}", pin, if level { "HIGH" } else { "LOW" });
        self.drive(pin, level);
    }

    fn configure_attenuation(&self, pin: u32, attenuation: Attenuation) {
        lock(&self.attenuation).insert(pin, attenuation);
    }

    fn read_analog(&self, pin: u32) -> u16 {
        lock(&self.analog).get(&pin).copied().unwrap_or(0)
    }

    fn set_pwm_duty(&self, pin: u32, duty: u32) {
        self.drive(pin, duty > PWM_HIGH_THRESHOLD);
    }
}
