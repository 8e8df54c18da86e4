//! # Firmware → Script Transpiler
//!
//! Converts C-like firmware (typically the generator's own output, possibly
//! hand-edited) into a script for the virtual-GPIO interpreter.
//!
//! ## Pipeline
//!
//! 1. Import-marker guard (already a script → unchanged)
//! 2. `setup()` / `loop()` block detection
//! 3. Constant and pin-role harvesting ([`ConversionContext`])
//! 4. Imports, constants and pin objects
//! 5. Line-by-line loop body conversion under `while True:`

mod context;
mod lexer;
mod rewrite;

pub use context::{
    is_pin_constant, pin_identifier, BindingKind, ConstValue, ConversionContext, PinBinding, PinRef,
};
pub use lexer::{strip_comments, tokenize, Token, TokenKind};
pub use rewrite::{convert_line, split_logical_lines};

use lexer::{matching_close, next_significant, prev_significant, render};

const IMPORT_MARKERS: &[&str] = &["from machine import", "import machine"];
const INDENT: &str = "    ";

/// Result of one transpilation
#[derive(Debug, Clone)]
pub struct Transpilation {
    pub script: String,
    /// False when the input was passed through unchanged
    pub converted: bool,
    pub context: ConversionContext,
}

/// Convert firmware to a script, or return it unchanged if it is already a
/// script or has neither a `setup` nor a `loop` block.
pub fn convert_to_script(source: &str) -> String {
    transpile(source).script
}

pub fn transpile(source: &str) -> Transpilation {
    let unchanged = || Transpilation {
        script: source.to_string(),
        converted: false,
        context: ConversionContext::default(),
    };

    if IMPORT_MARKERS.iter().any(|marker| source.contains(marker)) {
        tracing::debug!("[TRANSPILE] Source already imports the machine module, passing through");
        return unchanged();
    }

    let cleaned = strip_comments(source);
    let tokens = tokenize(&cleaned);
    let setup_body = function_body(&tokens, "setup");
    let loop_body = function_body(&tokens, "loop");

    if setup_body.is_none() && loop_body.is_none() {
        tracing::debug!("[TRANSPILE] No setup() or loop() block, passing through");
        return unchanged();
    }

    tracing::info!("[TRANSPILE] Phase 1: Harvesting constants and pins...");
    let ctx = ConversionContext::harvest(&cleaned);
    tracing::info!(
        "[TRANSPILE] {} constants, {} pin bindings",
        ctx.constants.len(),
        ctx.bindings.len()
    );
    for (pin, sources) in ctx.role_collisions() {
        tracing::warn!("[TRANSPILE] Pin {} is bound through several names: {}", pin, sources.join(", "));
    }

    tracing::info!("[TRANSPILE] Phase 2: Emitting declarations...");
    let uses_analog = tokens.iter().any(|t| t.is_ident("analogRead"));
    let mut script = String::new();
    script.push_str(if uses_analog {
        "from machine import Pin, ADC\nimport time\n\n"
    } else {
        "from machine import Pin\nimport time\n\n"
    });

    for (name, value) in ctx.script_constants() {
        script.push_str(&format!("{} = {}\n", name, value));
    }
    if !ctx.constants.is_empty() {
        script.push('\n');
    }

    for binding in &ctx.bindings {
        script.push_str(&binding.render());
    }
    if !ctx.bindings.is_empty() {
        script.push('\n');
    }

    if let Some(body) = loop_body {
        tracing::info!("[TRANSPILE] Phase 3: Converting loop body...");
        script.push_str("while True:\n");
        script.push_str(&convert_block(&body, &ctx));
    }

    tracing::info!("[TRANSPILE] Transpilation complete ({} bytes)", script.len());
    Transpilation { script, converted: true, context: ctx }
}

/// Convert a block body into indented script lines. Closing braces lower the
/// depth before a line is emitted, opening braces raise it afterwards. A block
/// that closes with nothing emitted inside it gets a `pass`.
fn convert_block(body: &str, ctx: &ConversionContext) -> String {
    let mut out = String::new();
    // One entry per open block: whether it has emitted a line yet
    let mut blocks: Vec<bool> = Vec::new();

    for line in split_logical_lines(body) {
        let (closes, opens) = rewrite::brace_counts(&line);
        for _ in 0..closes {
            let depth = blocks.len();
            match blocks.pop() {
                Some(false) => push_line(&mut out, depth, "pass"),
                Some(true) => {}
                None => break,
            }
        }

        let converted = convert_line(&line, ctx);
        if !converted.is_empty() {
            push_line(&mut out, blocks.len(), &converted);
            if let Some(filled) = blocks.last_mut() {
                *filled = true;
            }
        }

        blocks.extend(std::iter::repeat(false).take(opens));
    }

    while let Some(filled) = blocks.pop() {
        if !filled {
            push_line(&mut out, blocks.len() + 1, "pass");
        }
    }

    if out.is_empty() {
        push_line(&mut out, 0, "pass");
    }
    out
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    out.push_str(&INDENT.repeat(depth + 1));
    out.push_str(line);
    out.push('\n');
}

/// Body text of `void <name>() { … }`
fn function_body(tokens: &[Token], name: &str) -> Option<String> {
    tokens.iter().enumerate().find_map(|(i, token)| {
        if !token.is_ident(name) {
            return None;
        }
        let return_type = prev_significant(tokens, i)?;
        if !tokens[return_type].is_ident("void") {
            return None;
        }
        let open_paren = next_significant(tokens, i + 1)?;
        if !tokens[open_paren].is_punct("(") {
            return None;
        }
        let close_paren = matching_close(tokens, open_paren)?;
        let open_brace = next_significant(tokens, close_paren + 1)?;
        if !tokens[open_brace].is_punct("{") {
            return None;
        }
        let close_brace = matching_close(tokens, open_brace)?;
        Some(render(&tokens[open_brace + 1..close_brace]))
    })
}
