//! Per-line rewrite rules.
//!
//! Each rule maps a token stream to a token stream; [`convert_line`] runs
//! them in a fixed order. Rules only look at identifier and punctuation
//! tokens, so string literals pass through untouched.

use super::context::{ConversionContext, PinRef};
use super::lexer::{
    matching_close, next_significant, prev_significant, render, split_args, tokenize, Token,
    TokenKind,
};
use std::collections::BTreeMap;

type Rule = fn(Vec<Token>, &ConversionContext) -> Vec<Token>;

/// Applied in order; later rules see the output of earlier ones
const RULES: &[Rule] = &[
    strip_comment_tokens,
    strip_type_prefixes,
    rewrite_analog_read,
    rewrite_digital_write,
    rewrite_digital_read,
    rewrite_serial_print,
    rewrite_delay,
    normalize_literals,
    rewrite_headers,
];

const TYPE_KEYWORDS: &[&str] = &[
    "int", "float", "double", "bool", "boolean", "char", "String", "long", "unsigned", "short",
    "byte", "const", "static", "uint8_t", "uint16_t", "uint32_t", "int8_t", "int16_t", "int32_t",
];

/// Rewrite one logical line of loop-body firmware into a script statement.
/// Lines no rule recognizes come back as best-effort residue.
pub fn convert_line(line: &str, ctx: &ConversionContext) -> String {
    let mut tokens = tokenize(line);
    for rule in RULES {
        tokens = rule(tokens, ctx);
    }

    let text: String = tokens
        .iter()
        .filter(|t| !(t.kind == TokenKind::Punct && matches!(t.text.as_str(), ";" | "{" | "}")))
        .map(|t| t.text.as_str())
        .collect();
    text.trim().to_string()
}

/// Split a block body into logical lines: one statement, block opener or
/// block closer per line. `} else …` stays on one line.
pub fn split_logical_lines(body: &str) -> Vec<String> {
    let tokens = tokenize(body);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut paren_depth = 0usize;

    fn flush(lines: &mut Vec<String>, current: &mut String) {
        let line = current.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
        current.clear();
    }

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::Space if token.text.contains('\n') => flush(&mut lines, &mut current),
            TokenKind::Punct => match token.text.as_str() {
                "(" => {
                    paren_depth += 1;
                    current.push_str(&token.text);
                }
                ")" => {
                    paren_depth = paren_depth.saturating_sub(1);
                    current.push_str(&token.text);
                }
                "{" | ";" if paren_depth == 0 => {
                    current.push_str(&token.text);
                    flush(&mut lines, &mut current);
                }
                "}" => {
                    flush(&mut lines, &mut current);
                    current.push('}');
                    let continues_with_else = next_significant(&tokens, i + 1)
                        .is_some_and(|next| tokens[next].is_ident("else"));
                    if !continues_with_else {
                        flush(&mut lines, &mut current);
                    }
                }
                _ => current.push_str(&token.text),
            },
            _ => current.push_str(&token.text),
        }
    }
    flush(&mut lines, &mut current);
    lines
}

/// Net block depth change of a line: (closes, opens)
pub fn brace_counts(line: &str) -> (usize, usize) {
    tokenize(line).iter().fold((0, 0), |(closes, opens), t| {
        if t.is_punct("}") {
            (closes + 1, opens)
        } else if t.is_punct("{") {
            (closes, opens + 1)
        } else {
            (closes, opens)
        }
    })
}

fn strip_comment_tokens(tokens: Vec<Token>, _ctx: &ConversionContext) -> Vec<Token> {
    tokens.into_iter().filter(|t| t.kind != TokenKind::Comment).collect()
}

/// `unsigned long now = …` → `now = …`
fn strip_type_prefixes(tokens: Vec<Token>, _ctx: &ConversionContext) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut i = 0;
    while i < tokens.len() {
        if is_type_keyword(&tokens[i]) {
            let mut cursor = i;
            while let Some(next) = next_significant(&tokens, cursor + 1) {
                if !is_type_keyword(&tokens[next]) {
                    break;
                }
                cursor = next;
            }
            let assigned = next_significant(&tokens, cursor + 1).filter(|&n| {
                tokens[n].kind == TokenKind::Ident
                    && next_significant(&tokens, n + 1).is_some_and(|eq| tokens[eq].is_punct("="))
            });
            if let Some(name) = assigned {
                i = name;
                continue;
            }
        }
        out.push(tokens[i].clone());
        i += 1;
    }
    out
}

fn is_type_keyword(token: &Token) -> bool {
    token.kind == TokenKind::Ident && TYPE_KEYWORDS.contains(&token.text.as_str())
}

/// A matched call: its arguments and the raw text between the parentheses
struct Call {
    args: Vec<String>,
    inner: String,
}

/// Replace every call to `path` (`["delay"]`, `["Serial", ".", "println"]`)
/// for which `replace` yields text.
fn rewrite_calls(tokens: Vec<Token>, path: &[&str], replace: impl Fn(&Call) -> Option<String>) -> Vec<Token> {
    let mut tokens = tokens;
    let mut i = 0;
    while i < tokens.len() {
        let Some((open, close)) = match_call(&tokens, i, path) else {
            i += 1;
            continue;
        };
        let inner_tokens = &tokens[open + 1..close];
        let call = Call {
            args: split_args(inner_tokens),
            inner: render(inner_tokens).trim().to_string(),
        };
        if let Some(text) = replace(&call) {
            tokens.splice(i..=close, tokenize(&text));
        }
        i += 1;
    }
    tokens
}

/// Bracket indices of a call to `path` starting at token `start`
fn match_call(tokens: &[Token], start: usize, path: &[&str]) -> Option<(usize, usize)> {
    let first = path.first()?;
    if !tokens[start].is_ident(first) {
        return None;
    }
    if prev_significant(tokens, start).is_some_and(|p| tokens[p].is_punct(".")) {
        return None;
    }

    let mut cursor = start;
    for part in &path[1..] {
        cursor = next_significant(tokens, cursor + 1)?;
        if tokens[cursor].text != *part {
            return None;
        }
    }
    let open = next_significant(tokens, cursor + 1)?;
    if !tokens[open].is_punct("(") {
        return None;
    }
    Some((open, matching_close(tokens, open)?))
}

/// Identifier for a digital pin reference. A bare number reuses the pin
/// object already bound to that number, if any.
fn digital_identifier(pin: &str, bound: &[&BTreeMap<u32, String>]) -> Option<String> {
    match PinRef::parse(pin)? {
        PinRef::Number(number) => Some(
            bound
                .iter()
                .find_map(|table| table.get(&number).cloned())
                .unwrap_or_else(|| format!("pin{}", number)),
        ),
        named => Some(named.identifier()),
    }
}

fn rewrite_analog_read(tokens: Vec<Token>, ctx: &ConversionContext) -> Vec<Token> {
    rewrite_calls(tokens, &["analogRead"], |call| {
        let [pin] = call.args.as_slice() else {
            return None;
        };
        let identifier = match PinRef::parse(pin)? {
            PinRef::Number(number) => ctx
                .analog_pins
                .get(&number)
                .cloned()
                .unwrap_or_else(|| format!("adc{}", number)),
            // Only harvested pin constants drop their `_PIN` suffix
            named if ctx.constant_names.contains_key(pin.as_str()) => {
                format!("adc_{}", named.identifier())
            }
            _ => format!("adc_{}", pin.to_lowercase()),
        };
        Some(format!("{}.read()", identifier))
    })
}

fn rewrite_digital_write(tokens: Vec<Token>, ctx: &ConversionContext) -> Vec<Token> {
    rewrite_calls(tokens, &["digitalWrite"], |call| {
        let [pin, level] = call.args.as_slice() else {
            return None;
        };
        let level = match level.as_str() {
            "HIGH" | "1" | "true" => "1",
            "LOW" | "0" | "false" => "0",
            other => other,
        };
        let identifier = digital_identifier(pin, &[&ctx.output_pins, &ctx.input_pins])?;
        Some(format!("{}.value({})", identifier, level))
    })
}

fn rewrite_digital_read(tokens: Vec<Token>, ctx: &ConversionContext) -> Vec<Token> {
    rewrite_calls(tokens, &["digitalRead"], |call| {
        let [pin] = call.args.as_slice() else {
            return None;
        };
        let identifier = digital_identifier(pin, &[&ctx.input_pins, &ctx.output_pins])?;
        Some(format!("{}.value()", identifier))
    })
}

fn rewrite_serial_print(tokens: Vec<Token>, _ctx: &ConversionContext) -> Vec<Token> {
    let tokens = rewrite_calls(tokens, &["Serial", ".", "println"], |call| {
        Some(format!("print({})", call.inner))
    });
    rewrite_calls(tokens, &["Serial", ".", "print"], |call| {
        if call.inner.is_empty() {
            Some("print(end=\"\")".to_string())
        } else {
            Some(format!("print({}, end=\"\")", call.inner))
        }
    })
}

fn rewrite_delay(tokens: Vec<Token>, _ctx: &ConversionContext) -> Vec<Token> {
    rewrite_calls(tokens, &["delay"], |call| {
        (!call.inner.is_empty()).then(|| format!("time.sleep_ms({})", call.inner))
    })
}

fn normalize_literals(tokens: Vec<Token>, _ctx: &ConversionContext) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.iter().enumerate() {
        let replacement = match (token.kind, token.text.as_str()) {
            (TokenKind::Ident, "HIGH") => "1",
            (TokenKind::Ident, "LOW") => "0",
            (TokenKind::Ident, "true") => "True",
            (TokenKind::Ident, "false") => "False",
            (TokenKind::Punct, "&&") => "and",
            (TokenKind::Punct, "||") => "or",
            (TokenKind::Punct, "!") => "not",
            _ => {
                out.push(token.clone());
                continue;
            }
        };

        let word_operator = token.kind == TokenKind::Punct;
        let glued_before = out
            .last()
            .is_some_and(|prev| !prev.is_trivia() && !prev.is_punct("(") && !prev.is_punct("["));
        if word_operator && glued_before {
            out.push(space());
        }
        out.push(Token { kind: TokenKind::Ident, text: replacement.to_string(), start: token.start });
        if word_operator && tokens.get(i + 1).is_some_and(|next| !next.is_trivia()) {
            out.push(space());
        }
    }
    out
}

fn space() -> Token {
    Token { kind: TokenKind::Space, text: " ".to_string(), start: 0 }
}

/// `} else if (c) {` → `elif c:`, `} else {` → `else:`, `if (c) {` → `if c:`,
/// `while (c) {` → `while c:`. A statement trailing a brace-less header is
/// kept after the colon.
fn rewrite_headers(tokens: Vec<Token>, _ctx: &ConversionContext) -> Vec<Token> {
    let Some(mut cursor) = next_significant(&tokens, 0) else {
        return tokens;
    };
    if tokens[cursor].is_punct("}") {
        match next_significant(&tokens, cursor + 1) {
            Some(next) => cursor = next,
            None => return tokens,
        }
    }

    let (keyword, condition, after) = if tokens[cursor].is_ident("else") {
        match next_significant(&tokens, cursor + 1) {
            Some(next) if tokens[next].is_ident("if") => match condition_after(&tokens, next) {
                Some((condition, after)) => ("elif", Some(condition), after),
                None => return tokens,
            },
            _ => ("else", None, cursor + 1),
        }
    } else if tokens[cursor].is_ident("if") || tokens[cursor].is_ident("while") {
        let keyword = if tokens[cursor].is_ident("if") { "if" } else { "while" };
        match condition_after(&tokens, cursor) {
            Some((condition, after)) => (keyword, Some(condition), after),
            None => return tokens,
        }
    } else {
        return tokens;
    };

    let mut rest = after;
    if let Some(next) = next_significant(&tokens, rest) {
        if tokens[next].is_punct("{") {
            rest = next + 1;
        }
    }

    let mut header = match condition {
        Some(condition) => format!("{} {}:", keyword, condition),
        None => format!("{}:", keyword),
    };
    let trailing = render(&tokens[rest.min(tokens.len())..]);
    if !trailing.trim().is_empty() {
        header.push(' ');
        header.push_str(trailing.trim());
    }
    tokenize(&header)
}

/// Condition text of `keyword (…)` and the index just past the `)`
fn condition_after(tokens: &[Token], keyword: usize) -> Option<(String, usize)> {
    let open = next_significant(tokens, keyword + 1)?;
    if !tokens[open].is_punct("(") {
        return None;
    }
    let close = matching_close(tokens, open)?;
    Some((render(&tokens[open + 1..close]).trim().to_string(), close + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(line: &str) -> String {
        convert_line(line, &ConversionContext::default())
    }

    #[test]
    fn digital_io_calls() {
        assert_eq!(convert("digitalWrite(LED_PIN_1, HIGH);"), "led1.value(1)");
        assert_eq!(convert("digitalWrite(MIST_PUMP_PIN, LOW);"), "mist_pump.value(0)");
        assert_eq!(convert("digitalWrite(13, 1);"), "pin13.value(1)");
        assert_eq!(convert("digitalWrite(relay, state);"), "relay.value(state)");
        assert_eq!(
            convert("int button1State = digitalRead(BUTTON_PIN_1);"),
            "button1State = button1.value()"
        );
        assert_eq!(convert("digitalWrite(13, !digitalRead(13));"), "pin13.value(not pin13.value())");
    }

    #[test]
    fn numeric_pins_reuse_bound_names() {
        let ctx = ConversionContext::harvest(
            "#define LED_PIN 13\n#define SOIL_PIN 34\nvoid setup() { pinMode(LED_PIN, OUTPUT); }\nvoid loop() { analogRead(SOIL_PIN); }",
        );
        assert_eq!(convert_line("digitalWrite(13, HIGH);", &ctx), "led.value(1)");
        assert_eq!(convert_line("x = digitalRead(13);", &ctx), "x = led.value()");
        assert_eq!(convert_line("digitalWrite(12, HIGH);", &ctx), "pin12.value(1)");
        assert_eq!(convert_line("v = analogRead(34);", &ctx), "v = adc_soil.read()");
    }

    #[test]
    fn analog_reads_use_adc_identifiers() {
        let ctx = ConversionContext::harvest("#define SOIL_PIN 34\nvoid loop() { analogRead(SOIL_PIN); }");
        assert_eq!(convert_line("int soil = analogRead(SOIL_PIN);", &ctx), "soil = adc_soil.read()");
        assert_eq!(convert("float v = analogRead(34) * RATIO;"), "v = adc34.read() * RATIO");
    }

    #[test]
    fn undeclared_analog_names_keep_their_suffix() {
        assert_eq!(convert("int soil = analogRead(SOIL_PIN);"), "soil = adc_soil_pin.read()");
        assert_eq!(convert("v = analogRead(LIGHT);"), "v = adc_light.read()");
    }

    #[test]
    fn serial_and_delay() {
        assert_eq!(convert("Serial.println(\"Button 1 pressed!\");"), "print(\"Button 1 pressed!\")");
        assert_eq!(convert("Serial.print(value);"), "print(value, end=\"\")");
        assert_eq!(convert("Serial.println();"), "print()");
        assert_eq!(convert("delay(1000);"), "time.sleep_ms(1000)");
        assert_eq!(convert("delay(INTERVAL * 2);"), "time.sleep_ms(INTERVAL * 2)");
    }

    #[test]
    fn conditional_headers() {
        assert_eq!(convert("if (button1State == LOW) {"), "if button1State == 0:");
        assert_eq!(convert("} else if (x > 5 && ready) {"), "elif x > 5 and ready:");
        assert_eq!(convert("} else {"), "else:");
        assert_eq!(convert("while (digitalRead(2) == HIGH) {"), "while pin2.value() == 1:");
        assert_eq!(convert("if (x) digitalWrite(13, HIGH);"), "if x: pin13.value(1)");
        assert_eq!(convert("if (check(a, b)) {"), "if check(a, b):");
    }

    #[test]
    fn string_contents_are_untouched() {
        assert_eq!(
            convert("Serial.println(\"HIGH && delay(5); {x}\");"),
            "print(\"HIGH && delay(5); {x}\")"
        );
    }

    #[test]
    fn comments_and_braces_disappear() {
        assert_eq!(convert("}"), "");
        assert_eq!(convert("  // digitalWrite(FAN_PIN, HIGH);  // Turn ON fan"), "");
        assert_eq!(convert("x = 1; /* note */"), "x = 1");
    }

    #[test]
    fn logical_lines_keep_else_with_closing_brace() {
        let lines = split_logical_lines(
            "if (x > 5) { digitalWrite(13, HIGH); } else { digitalWrite(13, LOW); }",
        );
        assert_eq!(
            lines,
            vec!["if (x > 5) {", "digitalWrite(13, HIGH);", "} else {", "digitalWrite(13, LOW);", "}"]
        );
    }

    #[test]
    fn for_headers_are_not_split_at_semicolons() {
        let lines = split_logical_lines("for (int i = 0; i < 3; i++) {\n  blink();\n}");
        assert_eq!(lines, vec!["for (int i = 0; i < 3; i++) {", "blink();", "}"]);
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        assert_eq!(brace_counts("} else {"), (1, 1));
        assert_eq!(brace_counts("Serial.println(\"{{\");"), (0, 0));
    }
}
