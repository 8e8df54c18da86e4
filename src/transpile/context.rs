//! Conversion context: constants and pin bindings harvested from a firmware
//! source, plus the identifier conventions shared by declaration and use.

use super::lexer::{
    is_identifier, matching_close, next_significant, parse_int_literal, parse_numeric_literal,
    prev_significant, split_args, tokenize, Token, TokenKind,
};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

const PIN_SUFFIX: &str = "_PIN";

const NUMERIC_TYPES: &[&str] = &[
    "int", "float", "double", "long", "short", "byte", "unsigned", "signed", "uint8_t",
    "uint16_t", "uint32_t", "int8_t", "int16_t", "int32_t",
];

/// Numeric constant value, printed the way the script expects (`25`, `2.5`)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstValue(pub f64);

impl ConstValue {
    /// Value usable as a pin number
    pub fn as_pin(self) -> Option<u32> {
        let value = self.0;
        (value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64).then_some(value as u32)
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 && self.0.abs() < 1e15 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// The three ways firmware refers to a pin
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PinRef {
    /// `13`
    Number(u32),
    /// `LED_PIN_2`: numbered peripheral naming convention
    Indexed { base: String, index: u32 },
    /// `MIST_PUMP_PIN`, `statusLed`
    Named(String),
}

impl PinRef {
    pub fn parse(text: &str) -> Option<PinRef> {
        if let Some(number) = parse_int_literal(text) {
            return Some(PinRef::Number(number));
        }
        if !is_identifier(text) {
            return None;
        }
        if let Some((base, index)) = split_indexed(text) {
            return Some(PinRef::Indexed { base: base.to_string(), index });
        }
        Some(PinRef::Named(text.to_string()))
    }

    /// Script identifier of the pin object for digital access
    pub fn identifier(&self) -> String {
        match self {
            PinRef::Number(number) => format!("pin{}", number),
            PinRef::Indexed { base, index } => format!("{}{}", base.to_lowercase(), index),
            PinRef::Named(name) => name.strip_suffix(PIN_SUFFIX).unwrap_or(name).to_lowercase(),
        }
    }
}

/// `LED_PIN_2` → (`LED`, 2)
fn split_indexed(name: &str) -> Option<(&str, u32)> {
    let (head, index) = name.rsplit_once('_')?;
    let index = parse_int_literal(index)?;
    let base = head.strip_suffix(PIN_SUFFIX)?;
    (!base.is_empty()).then_some((base, index))
}

/// True for constants following the pin naming convention
pub fn is_pin_constant(name: &str) -> bool {
    name.ends_with(PIN_SUFFIX) || split_indexed(name).is_some()
}

/// Identifier derived from a pin-named constant (`MIST_PUMP_PIN` → `mist_pump`)
pub fn pin_identifier(name: &str) -> String {
    match PinRef::parse(name) {
        Some(pin_ref) => pin_ref.identifier(),
        None => name.to_lowercase(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Output,
    Input { pull_up: bool },
    Analog,
}

/// A pin object the script constructs before its loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinBinding {
    pub identifier: String,
    pub pin: u32,
    pub kind: BindingKind,
    /// Reference text as written in the firmware (`LED_PIN_1`, `13`)
    pub source: String,
}

impl PinBinding {
    /// Pin construction statement(s) for this binding
    pub fn render(&self) -> String {
        match self.kind {
            BindingKind::Output => format!("{} = Pin({}, Pin.OUT)\n", self.identifier, self.pin),
            BindingKind::Input { pull_up: true } => {
                format!("{} = Pin({}, Pin.IN, Pin.PULL_UP)\n", self.identifier, self.pin)
            }
            BindingKind::Input { pull_up: false } => {
                format!("{} = Pin({}, Pin.IN)\n", self.identifier, self.pin)
            }
            BindingKind::Analog => format!(
                "{id} = ADC(Pin({pin}))\n{id}.atten(ADC.ATTN_11DB)  # Full range 0-3.3V\n",
                id = self.identifier,
                pin = self.pin
            ),
        }
    }
}

/// Everything the line converter needs to know about one firmware source.
/// Built fresh for every transpilation.
#[derive(Debug, Clone, Default)]
pub struct ConversionContext {
    /// Harvested numeric constants in declaration order
    pub constants: Vec<(String, ConstValue)>,
    pub output_pins: BTreeMap<u32, String>,
    pub input_pins: BTreeMap<u32, String>,
    pub analog_pins: BTreeMap<u32, String>,
    /// Pin-named constants and their pin numbers
    pub constant_names: HashMap<String, u32>,
    /// Bindings in emission order: outputs, inputs, then analog inputs
    pub bindings: Vec<PinBinding>,
}

impl ConversionContext {
    /// Harvest constants and pin bindings from comment-free firmware source
    pub fn harvest(source: &str) -> Self {
        let tokens = tokenize(source);
        let mut ctx = ConversionContext::default();

        ctx.harvest_constants(&tokens);
        ctx.harvest_pins(&tokens);

        for binding in &ctx.bindings {
            let table = match binding.kind {
                BindingKind::Output => &mut ctx.output_pins,
                BindingKind::Input { .. } => &mut ctx.input_pins,
                BindingKind::Analog => &mut ctx.analog_pins,
            };
            table.insert(binding.pin, binding.identifier.clone());
        }

        ctx.constant_names = ctx
            .constants
            .iter()
            .filter(|(name, _)| is_pin_constant(name))
            .filter_map(|(name, value)| value.as_pin().map(|pin| (name.clone(), pin)))
            .collect();

        ctx
    }

    pub fn constant(&self, name: &str) -> Option<ConstValue> {
        self.constants
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    /// Constants emitted as plain script assignments
    pub fn script_constants(&self) -> impl Iterator<Item = &(String, ConstValue)> {
        self.constants.iter().filter(|(name, _)| !is_pin_constant(name))
    }

    /// Pins referenced through more than one distinct name. Which binding
    /// wins for such a pin is not defined.
    pub fn role_collisions(&self) -> Vec<(u32, Vec<String>)> {
        let mut by_pin: BTreeMap<u32, Vec<String>> = BTreeMap::new();
        for binding in &self.bindings {
            let sources = by_pin.entry(binding.pin).or_default();
            if !sources.contains(&binding.source) {
                sources.push(binding.source.clone());
            }
        }
        by_pin.into_iter().filter(|(_, sources)| sources.len() > 1).collect()
    }

    fn set_constant(&mut self, name: &str, value: ConstValue) {
        match self.constants.iter_mut().find(|(existing, _)| existing == name) {
            Some(entry) => entry.1 = value,
            None => self.constants.push((name.to_string(), value)),
        }
    }

    /// `#define NAME 25` and `const int NAME = 25;`
    fn harvest_constants(&mut self, tokens: &[Token]) {
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].is_punct("#") {
                if let Some((name, value, end)) = parse_define(tokens, i) {
                    self.set_constant(&name, value);
                    i = end;
                    continue;
                }
            } else if tokens[i].is_ident("const") {
                if let Some((name, value, end)) = parse_const(tokens, i) {
                    self.set_constant(&name, value);
                    i = end;
                    continue;
                }
            }
            i += 1;
        }
    }

    fn harvest_pins(&mut self, tokens: &[Token]) {
        let mut outputs = Vec::new();
        let mut inputs = Vec::new();
        let mut analogs: Vec<PinBinding> = Vec::new();

        for args in call_arguments(tokens, "pinMode") {
            let [pin_ref, mode] = args.as_slice() else {
                continue;
            };
            let (target, kind) = match mode.as_str() {
                "OUTPUT" => (&mut outputs, BindingKind::Output),
                "INPUT_PULLUP" => (&mut inputs, BindingKind::Input { pull_up: true }),
                "INPUT" => (&mut inputs, BindingKind::Input { pull_up: false }),
                _ => continue,
            };
            if let Some((identifier, pin)) = self.resolve_digital(pin_ref) {
                target.push(PinBinding { identifier, pin, kind, source: pin_ref.clone() });
            }
        }

        for args in call_arguments(tokens, "analogRead") {
            let [pin_ref] = args.as_slice() else {
                continue;
            };
            // Deduplicated on the reference text, not the resolved number
            if analogs.iter().any(|binding| &binding.source == pin_ref) {
                continue;
            }
            if let Some((identifier, pin)) = self.resolve_analog(pin_ref) {
                analogs.push(PinBinding {
                    identifier,
                    pin,
                    kind: BindingKind::Analog,
                    source: pin_ref.clone(),
                });
            }
        }

        self.bindings = outputs.into_iter().chain(inputs).chain(analogs).collect();
    }

    fn resolve_digital(&self, pin_ref: &str) -> Option<(String, u32)> {
        match PinRef::parse(pin_ref)? {
            PinRef::Number(pin) => Some((format!("pin{}", pin), pin)),
            named => {
                let pin = self.constant(pin_ref)?.as_pin()?;
                Some((named.identifier(), pin))
            }
        }
    }

    fn resolve_analog(&self, pin_ref: &str) -> Option<(String, u32)> {
        match PinRef::parse(pin_ref)? {
            PinRef::Number(pin) => Some((format!("adc{}", pin), pin)),
            named => {
                let pin = self.constant(pin_ref)?.as_pin()?;
                Some((format!("adc_{}", named.identifier()), pin))
            }
        }
    }
}

fn parse_define(tokens: &[Token], hash: usize) -> Option<(String, ConstValue, usize)> {
    let keyword = next_significant(tokens, hash + 1)?;
    if !tokens[keyword].is_ident("define") {
        return None;
    }
    let name = next_significant(tokens, keyword + 1)?;
    if tokens[name].kind != TokenKind::Ident {
        return None;
    }
    let (value, end) = parse_signed_number(tokens, name + 1)?;
    Some((tokens[name].text.clone(), value, end))
}

fn parse_const(tokens: &[Token], keyword: usize) -> Option<(String, ConstValue, usize)> {
    let mut cursor = next_significant(tokens, keyword + 1)?;
    let mut saw_type = false;
    while tokens[cursor].kind == TokenKind::Ident && NUMERIC_TYPES.contains(&tokens[cursor].text.as_str()) {
        saw_type = true;
        cursor = next_significant(tokens, cursor + 1)?;
    }
    if !saw_type || tokens[cursor].kind != TokenKind::Ident {
        return None;
    }
    let name = cursor;
    let equals = next_significant(tokens, name + 1)?;
    if !tokens[equals].is_punct("=") {
        return None;
    }
    let (value, end) = parse_signed_number(tokens, equals + 1)?;
    Some((tokens[name].text.clone(), value, end))
}

fn parse_signed_number(tokens: &[Token], from: usize) -> Option<(ConstValue, usize)> {
    let mut cursor = next_significant(tokens, from)?;
    let negative = tokens[cursor].is_punct("-");
    if negative {
        cursor = next_significant(tokens, cursor + 1)?;
    }
    if tokens[cursor].kind != TokenKind::Number {
        return None;
    }
    let value = parse_numeric_literal(&tokens[cursor].text)?;
    Some((ConstValue(if negative { -value } else { value }), cursor + 1))
}

/// Argument lists of every call to the free function `name`
pub fn call_arguments(tokens: &[Token], name: &str) -> Vec<Vec<String>> {
    let mut calls = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !token.is_ident(name) {
            continue;
        }
        if prev_significant(tokens, i).is_some_and(|p| tokens[p].is_punct(".")) {
            continue;
        }
        let Some(open) = next_significant(tokens, i + 1) else {
            continue;
        };
        if !tokens[open].is_punct("(") {
            continue;
        }
        if let Some(close) = matching_close(tokens, open) {
            calls.push(split_args(&tokens[open + 1..close]));
        }
    }
    calls
}
