//! # Flag Translator
//!
//! Converts a validated [`ArgumentRecord`] into Salesforce CLI flags.
//!
//! Rules, applied per entry in record order:
//!
//! - `true` emits a bare `--<flag>`; `false` emits nothing.
//! - A list emits `--<flag> <comma-joined elements>`.
//! - Anything else emits `--<flag> <value>`.
//!
//! Flag names are the camelCase argument names in kebab-case
//! (`targetOrg` → `target-org`).
//!
//! [`to_flag_args`] is what the executor runs: one argv entry per token, so values
//! never pass through a shell. [`to_flags`] is the space-joined rendering of the same
//! tokens and is only meant for display.

use crate::registry::{ArgValue, ArgumentRecord};

/// camelCase → kebab-case: every ASCII uppercase letter becomes `-` plus its lowercase.
pub fn to_kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for c in key.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Renders a number the way the CLI expects: integral values without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Flag tokens for `record`, one argv entry per token.
pub fn to_flag_args(record: &ArgumentRecord) -> Vec<String> {
    let mut args = Vec::with_capacity(record.len() * 2);
    for (key, value) in record.iter() {
        let flag = format!("--{}", to_kebab_case(key));
        match value {
            ArgValue::Bool(true) => args.push(flag),
            ArgValue::Bool(false) => {}
            ArgValue::List(items) => {
                args.push(flag);
                args.push(items.join(","));
            }
            ArgValue::Str(s) => {
                args.push(flag);
                args.push(s.clone());
            }
            ArgValue::Number(n) => {
                args.push(flag);
                args.push(format_number(*n));
            }
        }
    }
    args
}

/// Space-joined flag string for `record`. Values are not escaped.
pub fn to_flags(record: &ArgumentRecord) -> String {
    to_flag_args(record).join(" ")
}
