//! Property access and the builtin array/string methods.

use super::operators::contains;
use super::type_coercion::{number_to_string, to_index, to_integer, to_property_key, to_string};
use super::value::{ErrorKind, Value};

/// Writes past this many holes beyond the end of an array are refused.
const MAX_ARRAY_GAP: usize = 1 << 20;

pub type MemberResult = Result<Value, Value>;

fn type_error(message: impl Into<String>) -> Value {
    Value::error(ErrorKind::TypeError, message)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Undefined => "undefined",
        _ => "null",
    }
}

/// `object[key]` / `object.key`.
pub fn get_property(object: &Value, key: &Value) -> MemberResult {
    let name = to_property_key(key);
    match object {
        Value::Undefined | Value::Null => Err(type_error(format!(
            "Cannot read properties of {} (reading '{}')",
            describe(object),
            name
        ))),
        Value::Array(items) => {
            let items = items.lock();
            if name == "length" {
                return Ok(Value::from(items.len()));
            }
            Ok(to_index(key)
                .and_then(|i| items.get(i).cloned())
                .unwrap_or(Value::Undefined))
        }
        Value::String(s) => {
            if name == "length" {
                return Ok(Value::from(s.chars().count()));
            }
            Ok(to_index(key)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::String(c.to_string()))
                .unwrap_or(Value::Undefined))
        }
        Value::Object(props) => Ok(props.lock().get(&name).cloned().unwrap_or(Value::Undefined)),
        Value::Error(err) => Ok(match name.as_str() {
            "name" => Value::from(err.kind.name()),
            "message" => Value::from(err.message.as_str()),
            _ => Value::Undefined,
        }),
        Value::Function(callable) if name == "name" => Ok(Value::from(callable.name())),
        _ => Ok(Value::Undefined),
    }
}

/// `object[key] = value`.
pub fn set_property(object: &Value, key: &Value, value: Value) -> Result<(), Value> {
    let name = to_property_key(key);
    match object {
        Value::Undefined | Value::Null => Err(type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            describe(object),
            name
        ))),
        Value::Object(props) => {
            props.lock().set(name, value);
            Ok(())
        }
        Value::Array(items) => {
            let new_len = (name == "length").then(|| to_integer(&value));
            let mut items = items.lock();
            if let Some(len) = new_len {
                if len < 0.0 || len > (items.len() + MAX_ARRAY_GAP) as f64 {
                    return Err(Value::error(ErrorKind::RangeError, "Invalid array length"));
                }
                items.resize(len as usize, Value::Undefined);
                return Ok(());
            }
            let index = to_index(key).ok_or_else(|| {
                type_error(format!("Cannot create property '{}' on array", name))
            })?;
            if index > items.len() + MAX_ARRAY_GAP {
                return Err(Value::error(ErrorKind::RangeError, "Invalid array index"));
            }
            if index >= items.len() {
                items.resize(index + 1, Value::Undefined);
            }
            items[index] = value;
            Ok(())
        }
        other => Err(type_error(format!(
            "Cannot create property '{}' on {}",
            name,
            to_string(other)
        ))),
    }
}

/// Keys visited by `for (k in value)`.
pub fn enumerable_keys(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(props) => props.lock().keys().into_iter().map(Value::from).collect(),
        Value::Array(items) => (0..items.lock().len())
            .map(|i| Value::from(number_to_string(i as f64)))
            .collect(),
        Value::String(s) => (0..s.chars().count())
            .map(|i| Value::from(number_to_string(i as f64)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Whether `receiver.method(...)` names a builtin method.
pub fn has_builtin_method(receiver: &Value, method: &str) -> bool {
    match receiver {
        Value::Array(_) => matches!(
            method,
            "push"
                | "pop"
                | "shift"
                | "indexOf"
                | "includes"
                | "slice"
                | "join"
                | "concat"
                | "reverse"
        ),
        Value::String(_) => matches!(
            method,
            "indexOf" | "includes" | "slice" | "toUpperCase" | "toLowerCase" | "split" | "charAt"
        ),
        _ => false,
    }
}

/// Resolve `start`/`end` arguments the way `slice` does, clamped to `len`.
fn slice_bounds(args: &[Value], len: usize) -> (usize, usize) {
    let resolve = |arg: Option<&Value>, default: usize| -> usize {
        match arg {
            None | Some(Value::Undefined) => default,
            Some(v) => {
                let n = to_integer(v);
                if n < 0.0 {
                    (len as f64 + n).max(0.0) as usize
                } else {
                    (n as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

/// Invoke a builtin method on an array or string receiver.
pub fn call_builtin_method(receiver: &Value, method: &str, args: &[Value]) -> MemberResult {
    let arg0 = args.first().cloned().unwrap_or(Value::Undefined);
    match receiver {
        Value::Array(items) => match method {
            "push" => {
                let mut items = items.lock();
                items.extend(args.iter().cloned());
                Ok(Value::from(items.len()))
            }
            "pop" => Ok(items.lock().pop().unwrap_or(Value::Undefined)),
            "shift" => {
                let mut items = items.lock();
                if items.is_empty() {
                    Ok(Value::Undefined)
                } else {
                    Ok(items.remove(0))
                }
            }
            "indexOf" => Ok(Value::Number(
                items
                    .lock()
                    .iter()
                    .position(|item| item.strict_equals(&arg0))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            )),
            "includes" => Ok(Value::Bool(contains(&items.lock(), &arg0))),
            "slice" => {
                let snapshot = items.lock().clone();
                let (start, end) = slice_bounds(args, snapshot.len());
                Ok(Value::array(snapshot[start..end].to_vec()))
            }
            "join" => {
                let separator = match &arg0 {
                    Value::Undefined => ",".to_string(),
                    other => to_string(other),
                };
                let parts = items.lock().clone();
                let joined = parts
                    .iter()
                    .map(|item| match item {
                        Value::Undefined | Value::Null => String::new(),
                        other => to_string(other),
                    })
                    .collect::<Vec<_>>()
                    .join(&separator);
                Ok(Value::String(joined))
            }
            "concat" => {
                let mut combined = items.lock().clone();
                for arg in args {
                    match arg {
                        Value::Array(other) => {
                            let other = other.lock().clone();
                            combined.extend(other);
                        }
                        other => combined.push(other.clone()),
                    }
                }
                Ok(Value::array(combined))
            }
            "reverse" => {
                items.lock().reverse();
                Ok(receiver.clone())
            }
            other => Err(type_error(format!("array.{} is not a function", other))),
        },
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let result = match method {
                "indexOf" => {
                    let needle = to_string(&arg0);
                    Value::Number(
                        s.find(&needle)
                            .map(|byte| s[..byte].chars().count() as f64)
                            .unwrap_or(-1.0),
                    )
                }
                "includes" => Value::Bool(s.contains(&to_string(&arg0))),
                "slice" => {
                    let (start, end) = slice_bounds(args, chars.len());
                    Value::String(chars[start..end].iter().collect())
                }
                "toUpperCase" => Value::String(s.to_uppercase()),
                "toLowerCase" => Value::String(s.to_lowercase()),
                "split" => match &arg0 {
                    Value::Undefined => Value::array(vec![receiver.clone()]),
                    sep => {
                        let sep = to_string(sep);
                        let parts: Vec<Value> = if sep.is_empty() {
                            chars.iter().map(|c| Value::String(c.to_string())).collect()
                        } else {
                            s.split(sep.as_str()).map(Value::from).collect()
                        };
                        Value::array(parts)
                    }
                },
                "charAt" => {
                    let index = to_integer(&arg0);
                    if index < 0.0 {
                        Value::from("")
                    } else {
                        chars
                            .get(index as usize)
                            .map(|c| Value::String(c.to_string()))
                            .unwrap_or_else(|| Value::from(""))
                    }
                }
                other => return Err(type_error(format!("string.{} is not a function", other))),
            };
            Ok(result)
        }
        other => Err(type_error(format!(
            "{}.{} is not a function",
            to_string(other),
            method
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(receiver: &Value, method: &str, args: &[Value]) -> Value {
        call_builtin_method(receiver, method, args).unwrap()
    }

    #[test]
    fn test_array_methods_mutate_shared_storage() {
        let arr = Value::array(vec![Value::from(1)]);
        let alias = arr.clone();
        assert_eq!(call(&arr, "push", &[Value::from(2), Value::from(3)]), Value::from(3));
        assert_eq!(get_property(&alias, &Value::from("length")).unwrap(), Value::from(3));
        assert_eq!(call(&arr, "shift", &[]), Value::from(1));
        assert_eq!(call(&arr, "join", &[Value::from("-")]), Value::from("2-3"));
    }

    #[test]
    fn test_array_slice_and_index_of() {
        let arr = Value::array((1..=5).map(Value::from).collect());
        assert_eq!(call(&arr, "slice", &[Value::from(-2)]).to_string(), "4,5");
        assert_eq!(call(&arr, "slice", &[Value::from(3), Value::from(1)]).to_string(), "");
        assert_eq!(call(&arr, "indexOf", &[Value::from(4)]), Value::from(3));
        assert_eq!(call(&arr, "indexOf", &[Value::from("4")]), Value::from(-1));
    }

    #[test]
    fn test_string_methods() {
        let s = Value::from("rope-cut");
        assert_eq!(call(&s, "indexOf", &[Value::from("cut")]), Value::from(5));
        assert_eq!(call(&s, "toUpperCase", &[]), Value::from("ROPE-CUT"));
        assert_eq!(call(&s, "split", &[Value::from("-")]).to_string(), "rope,cut");
        assert_eq!(call(&s, "charAt", &[Value::from(2)]), Value::from("p"));
        assert_eq!(call(&s, "slice", &[Value::from(1), Value::from(4)]), Value::from("ope"));
    }

    #[test]
    fn test_property_access_on_undefined_throws() {
        let err = get_property(&Value::Undefined, &Value::from("x")).unwrap_err();
        assert_eq!(err.as_error().unwrap().kind, ErrorKind::TypeError);
    }

    #[test]
    fn test_array_index_assignment_extends() {
        let arr = Value::array(vec![]);
        set_property(&arr, &Value::from(2), Value::from("c")).unwrap();
        assert_eq!(get_property(&arr, &Value::from("length")).unwrap(), Value::from(3));
        assert!(set_property(&arr, &Value::from("x"), Value::from(1)).is_err());
    }

    #[test]
    fn test_error_properties() {
        let err = Value::error(ErrorKind::Error, "bad");
        assert_eq!(get_property(&err, &Value::from("message")).unwrap(), Value::from("bad"));
        assert_eq!(get_property(&err, &Value::from("name")).unwrap(), Value::from("Error"));
    }
}
