use super::type_coercion::{compare_numeric, to_f64, to_string};
use super::value::Value;
use crate::script::BinaryOp;

/// Apply a binary operator to two evaluated operands.
pub fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => add(left, right),
        BinaryOp::Sub => Value::Number(to_f64(left) - to_f64(right)),
        BinaryOp::Mul => Value::Number(to_f64(left) * to_f64(right)),
        BinaryOp::Div => Value::Number(to_f64(left) / to_f64(right)),
        BinaryOp::Rem => Value::Number(to_f64(left) % to_f64(right)),
        BinaryOp::Eq => Value::Bool(equal(left, right)),
        BinaryOp::NotEq => Value::Bool(!equal(left, right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
        BinaryOp::Lt => Value::Bool(less_than(left, right, false)),
        BinaryOp::Gt => Value::Bool(less_than(right, left, false)),
        BinaryOp::LtEq => Value::Bool(less_than(right, left, true)),
        BinaryOp::GtEq => Value::Bool(less_than(left, right, true)),
    }
}

/// `+`: concatenation if either side is string-like, otherwise addition.
pub fn add(left: &Value, right: &Value) -> Value {
    if is_string_like(left) || is_string_like(right) {
        let mut s = to_string(left);
        s.push_str(&to_string(right));
        Value::String(s)
    } else {
        Value::Number(to_f64(left) + to_f64(right))
    }
}

fn is_string_like(value: &Value) -> bool {
    matches!(
        value,
        Value::String(_) | Value::Array(_) | Value::Object(_) | Value::Function(_) | Value::Error(_)
    )
}

/// Relational comparison. With `negate` set this computes `!(a < b)`
/// except that NaN operands still yield `false`, which is how `<=` and `>=`
/// are defined.
fn less_than(a: &Value, b: &Value, negate: bool) -> bool {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        let lt = x < y;
        return if negate { !lt } else { lt };
    }
    if negate {
        compare_numeric(a, b, |x, y| x >= y)
    } else {
        compare_numeric(a, b, |x, y| x < y)
    }
}

/// Loose equality (`==`).
pub fn equal(value: &Value, target: &Value) -> bool {
    match (value, target) {
        (Value::Undefined | Value::Null, Value::Undefined | Value::Null) => true,
        (Value::Undefined | Value::Null, _) | (_, Value::Undefined | Value::Null) => false,
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_f64(value) == to_f64(target)
        }
        (Value::Bool(_), _) => equal(&Value::Number(to_f64(value)), target),
        (_, Value::Bool(_)) => equal(value, &Value::Number(to_f64(target))),
        (Value::Array(_) | Value::Object(_), Value::Number(_) | Value::String(_)) => {
            equal(&Value::String(to_string(value)), target)
        }
        (Value::Number(_) | Value::String(_), Value::Array(_) | Value::Object(_)) => {
            equal(value, &Value::String(to_string(target)))
        }
        _ => value.strict_equals(target),
    }
}

/// Membership test used by `includes`: strict equality, except NaN finds NaN.
pub fn contains(items: &[Value], target: &Value) -> bool {
    items.iter().any(|item| match (item, target) {
        (Value::Number(a), Value::Number(b)) if a.is_nan() && b.is_nan() => true,
        _ => item.strict_equals(target),
    })
}
