//! Literal classification and normalization.
//!
//! Two spellings of the same constant value must compare equal once canonicalized: `4`, `4u`, `4i` and `0x4` all
//! denote the integer four when they appear as an `array` length or as an attribute argument. This module turns a
//! literal's source text into its scalar type and a normalized spelling.
//!
//! ## Notes
//! - Integers normalize to their decimal value (the suffix only contributes the type).
//! - Floats normalize through `f64`, so `1.0`, `1.` and `1e0` share a spelling.
//! - Hexadecimal floats keep their source spelling; they are rare enough that exact text comparison is acceptable.
//!
//! ## Examples
//! ```rust
//! use modsig_core::lang::types::ScalarTypeId;
//! use modsig_core::literals;
//!
//! let lit = literals::classify("0x10u").unwrap();
//! assert_eq!(lit.scalar, ScalarTypeId::U32);
//! assert_eq!(lit.normalized, "16");
//! assert_eq!(literals::normalize("1.50f"), "1.5");
//! ```

use crate::lang::types::ScalarTypeId;

/// A classified literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralInfo {
    pub scalar: ScalarTypeId,
    pub normalized: String,
}

/// Classify a literal's source text.
///
/// ## Returns
/// - `Some(LiteralInfo)` for boolean, integer and float literals (optionally preceded by `-`).
/// - `None` if `text` is not a literal.
pub fn classify(text: &str) -> Option<LiteralInfo> {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix('-') {
        let inner = classify(rest)?;
        if inner.scalar == ScalarTypeId::Bool {
            return None;
        }
        return Some(LiteralInfo {
            scalar: inner.scalar,
            normalized: format!("-{}", inner.normalized),
        });
    }
    match text {
        "true" | "false" => {
            return Some(LiteralInfo {
                scalar: ScalarTypeId::Bool,
                normalized: text.to_string(),
            });
        }
        "" => return None,
        _ => {}
    }

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return classify_hex(hex, text);
    }
    classify_decimal(text)
}

/// Normalize a literal's spelling, returning the trimmed input unchanged when it is not a literal.
pub fn normalize(text: &str) -> String {
    classify(text)
        .map(|lit| lit.normalized)
        .unwrap_or_else(|| text.trim().to_string())
}

fn classify_hex(hex: &str, original: &str) -> Option<LiteralInfo> {
    let is_float = hex.contains('.') || hex.contains('p') || hex.contains('P');
    if is_float {
        let (body, scalar) = split_float_suffix(hex);
        if body.is_empty() {
            return None;
        }
        return Some(LiteralInfo {
            scalar,
            normalized: original.to_ascii_lowercase(),
        });
    }

    let (digits, scalar) = split_int_suffix(hex);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let normalized = u64::from_str_radix(digits, 16)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| original.to_ascii_lowercase());
    Some(LiteralInfo { scalar, normalized })
}

fn classify_decimal(text: &str) -> Option<LiteralInfo> {
    let first = text.chars().next()?;
    if !(first.is_ascii_digit() || first == '.') {
        return None;
    }

    let looks_float = text.contains('.') || text.contains('e') || text.contains('E') || text.ends_with(['f', 'h']);
    if looks_float {
        let (body, scalar) = split_float_suffix(text);
        let value: f64 = body.parse().ok()?;
        return Some(LiteralInfo {
            scalar,
            normalized: format!("{:?}", value),
        });
    }

    let (digits, scalar) = split_int_suffix(text);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let normalized = digits
        .parse::<u64>()
        .map(|v| v.to_string())
        .unwrap_or_else(|_| digits.to_string());
    Some(LiteralInfo { scalar, normalized })
}

fn split_int_suffix(text: &str) -> (&str, ScalarTypeId) {
    if let Some(body) = text.strip_suffix('i') {
        (body, ScalarTypeId::I32)
    } else if let Some(body) = text.strip_suffix('u') {
        (body, ScalarTypeId::U32)
    } else {
        (text, ScalarTypeId::AbstractInt)
    }
}

fn split_float_suffix(text: &str) -> (&str, ScalarTypeId) {
    if let Some(body) = text.strip_suffix('f') {
        (body, ScalarTypeId::F32)
    } else if let Some(body) = text.strip_suffix('h') {
        (body, ScalarTypeId::F16)
    } else {
        (text, ScalarTypeId::AbstractFloat)
    }
}
