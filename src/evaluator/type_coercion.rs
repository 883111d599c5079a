use super::value::Value;

/// Arrays nested deeper than this render as an empty string.
const MAX_RENDER_DEPTH: usize = 32;

/// Format a number the way scripts observe it: integral values have no
/// fractional part, and `-0` prints as `0`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

/// Convert a value to a number (`Number(v)`).
pub fn to_f64(value: &Value) -> f64 {
    match value {
        Value::Undefined => f64::NAN,
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => *n,
        Value::String(s) => string_to_f64(s),
        Value::Array(items) => {
            let items = items.lock();
            match items.len() {
                0 => 0.0,
                1 => {
                    let only = items[0].clone();
                    drop(items);
                    to_f64(&Value::String(to_string(&only)))
                }
                _ => f64::NAN,
            }
        }
        Value::Object(_) | Value::Function(_) | Value::Error(_) => f64::NAN,
    }
}

fn string_to_f64(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(|n| n as f64)
            .unwrap_or(f64::NAN);
    }
    // Rust accepts "inf"/"nan" spellings that scripts must not.
    if trimmed
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')))
    {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Convert a value to its string form (`String(v)`).
pub fn to_string(value: &Value) -> String {
    render(value, 0)
}

fn render(value: &Value, depth: usize) -> String {
    match value {
        Value::Undefined => "undefined".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_to_string(*n),
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            if depth >= MAX_RENDER_DEPTH {
                return String::new();
            }
            let items = items.lock().clone();
            items
                .iter()
                .map(|item| match item {
                    Value::Undefined | Value::Null => String::new(),
                    other => render(other, depth + 1),
                })
                .collect::<Vec<_>>()
                .join(",")
        }
        Value::Object(_) => "[object Object]".to_string(),
        Value::Function(callable) => format!("function {}() {{ [native code] }}", callable.name()),
        Value::Error(err) => {
            if err.message.is_empty() {
                err.kind.name().to_string()
            } else {
                format!("{}: {}", err.kind.name(), err.message)
            }
        }
    }
}

/// Truthiness as used by `if`, `while`, `!`, `&&` and `||`.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Undefined | Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => !(n.is_nan() || *n == 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Error(_) => true,
    }
}

/// Result of the `typeof` operator.
pub fn type_of(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Function(_) => "function",
        Value::Array(_) | Value::Object(_) | Value::Error(_) => "object",
    }
}

/// Truncate towards zero, mapping NaN to 0 (used for indices and counts).
pub fn to_integer(value: &Value) -> f64 {
    let n = to_f64(value);
    if n.is_nan() {
        0.0
    } else {
        n.trunc()
    }
}

/// Interpret `value` as an array index if it is a non-negative integer.
pub fn to_index(value: &Value) -> Option<usize> {
    let n = match value {
        Value::Number(n) => *n,
        Value::String(s) => {
            let parsed = s.parse::<usize>().ok()?;
            if parsed.to_string() != *s {
                return None;
            }
            return Some(parsed);
        }
        _ => return None,
    };
    if n >= 0.0 && n.fract() == 0.0 && n < u32::MAX as f64 {
        Some(n as usize)
    } else {
        None
    }
}

/// Property key form of a value (`obj[key]`).
pub fn to_property_key(value: &Value) -> String {
    to_string(value)
}

/// Numeric comparison after coercing both sides; NaN compares false.
pub fn compare_numeric<F>(value: &Value, target: &Value, compare_fn: F) -> bool
where
    F: Fn(f64, f64) -> bool,
{
    let a = to_f64(value);
    let b = to_f64(target);
    if a.is_nan() || b.is_nan() {
        return false;
    }
    compare_fn(a, b)
}
