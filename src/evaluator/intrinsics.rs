//! Language-level builtins available without any host binding.

use rand::Rng;

use super::scope::Scope;
use super::type_coercion::{to_f64, to_string, truthy};
use super::value::{Callable, ErrorKind, PropertyMap, Value};
use crate::script::DeclKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathFn {
    Floor,
    Ceil,
    Round,
    Trunc,
    Abs,
    Sign,
    Min,
    Max,
    Sqrt,
    Pow,
    Random,
}

impl MathFn {
    const ALL: [MathFn; 11] = [
        MathFn::Floor,
        MathFn::Ceil,
        MathFn::Round,
        MathFn::Trunc,
        MathFn::Abs,
        MathFn::Sign,
        MathFn::Min,
        MathFn::Max,
        MathFn::Sqrt,
        MathFn::Pow,
        MathFn::Random,
    ];

    fn name(&self) -> &'static str {
        match self {
            MathFn::Floor => "floor",
            MathFn::Ceil => "ceil",
            MathFn::Round => "round",
            MathFn::Trunc => "trunc",
            MathFn::Abs => "abs",
            MathFn::Sign => "sign",
            MathFn::Min => "min",
            MathFn::Max => "max",
            MathFn::Sqrt => "sqrt",
            MathFn::Pow => "pow",
            MathFn::Random => "random",
        }
    }

    fn apply(&self, args: &[Value]) -> f64 {
        let arg = |i: usize| args.get(i).map(to_f64).unwrap_or(f64::NAN);
        match self {
            MathFn::Floor => arg(0).floor(),
            MathFn::Ceil => arg(0).ceil(),
            // Halves round towards +Infinity.
            MathFn::Round => (arg(0) + 0.5).floor(),
            MathFn::Trunc => arg(0).trunc(),
            MathFn::Abs => arg(0).abs(),
            MathFn::Sign => {
                let n = arg(0);
                if n.is_nan() || n == 0.0 {
                    n
                } else {
                    n.signum()
                }
            }
            MathFn::Min => args.iter().map(to_f64).fold(f64::INFINITY, |acc, n| {
                if acc.is_nan() || n.is_nan() {
                    f64::NAN
                } else {
                    acc.min(n)
                }
            }),
            MathFn::Max => args.iter().map(to_f64).fold(f64::NEG_INFINITY, |acc, n| {
                if acc.is_nan() || n.is_nan() {
                    f64::NAN
                } else {
                    acc.max(n)
                }
            }),
            MathFn::Sqrt => arg(0).sqrt(),
            MathFn::Pow => arg(0).powf(arg(1)),
            MathFn::Random => rand::thread_rng().gen::<f64>(),
        }
    }
}

/// A builtin function value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intrinsic {
    ErrorConstructor(ErrorKind),
    Math(MathFn),
    ParseInt,
    ParseFloat,
    IsNaN,
    Number,
    String,
    Boolean,
    ArrayIsArray,
}

impl Intrinsic {
    pub fn name(&self) -> &'static str {
        match self {
            Intrinsic::ErrorConstructor(kind) => kind.name(),
            Intrinsic::Math(f) => f.name(),
            Intrinsic::ParseInt => "parseInt",
            Intrinsic::ParseFloat => "parseFloat",
            Intrinsic::IsNaN => "isNaN",
            Intrinsic::Number => "Number",
            Intrinsic::String => "String",
            Intrinsic::Boolean => "Boolean",
            Intrinsic::ArrayIsArray => "isArray",
        }
    }

    pub fn is_constructor(&self) -> bool {
        matches!(self, Intrinsic::ErrorConstructor(_))
    }

    /// Invoke the builtin. `Err` carries a value to throw.
    pub fn call(&self, args: &[Value]) -> Result<Value, Value> {
        let first = args.first().cloned().unwrap_or(Value::Undefined);
        let value = match self {
            Intrinsic::ErrorConstructor(kind) => {
                let message = match &first {
                    Value::Undefined => String::new(),
                    other => to_string(other),
                };
                Value::error(*kind, message)
            }
            Intrinsic::Math(f) => Value::Number(f.apply(args)),
            Intrinsic::ParseInt => {
                let radix = args.get(1).map(to_f64).filter(|r| !r.is_nan() && *r != 0.0);
                Value::Number(parse_int(&to_string(&first), radix.map(|r| r as u32)))
            }
            Intrinsic::ParseFloat => Value::Number(parse_float(&to_string(&first))),
            Intrinsic::IsNaN => Value::Bool(to_f64(&first).is_nan()),
            Intrinsic::Number => {
                if args.is_empty() {
                    Value::Number(0.0)
                } else {
                    Value::Number(to_f64(&first))
                }
            }
            Intrinsic::String => {
                if args.is_empty() {
                    Value::String(String::new())
                } else {
                    Value::String(to_string(&first))
                }
            }
            Intrinsic::Boolean => Value::Bool(truthy(&first)),
            Intrinsic::ArrayIsArray => Value::Bool(matches!(first, Value::Array(_))),
        };
        Ok(value)
    }
}

fn parse_int(text: &str, radix: Option<u32>) -> f64 {
    let mut s = text.trim_start();
    let mut sign = 1.0;
    if let Some(rest) = s.strip_prefix('-') {
        sign = -1.0;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }
    let radix = match radix {
        None | Some(16) => match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(rest) => {
                s = rest;
                16
            }
            None => radix.unwrap_or(10),
        },
        Some(r) => r,
    };
    if !(2..=36).contains(&radix) {
        return f64::NAN;
    }
    let digits: String = s.chars().take_while(|c| c.is_digit(radix)).collect();
    if digits.is_empty() {
        return f64::NAN;
    }
    let mut result = 0.0;
    for c in digits.chars() {
        result = result * radix as f64 + c.to_digit(radix).unwrap_or(0) as f64;
    }
    sign * result
}

fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    if s.starts_with("Infinity") || s.starts_with("+Infinity") {
        return f64::INFINITY;
    }
    if s.starts_with("-Infinity") {
        return f64::NEG_INFINITY;
    }
    // Longest prefix that parses as a float.
    let candidate: String = s
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
        .collect();
    (1..=candidate.len())
        .rev()
        .find_map(|end| candidate[..end].parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn function(intrinsic: Intrinsic) -> Value {
    Value::Function(Callable::Intrinsic(intrinsic))
}

/// Bind every intrinsic into `scope`.
pub fn install(scope: &Scope) {
    let bind = |name: &str, value: Value| {
        // A fresh root scope cannot already hold these names.
        let _ = scope.declare(name, value, DeclKind::Var);
    };

    for kind in [
        ErrorKind::Error,
        ErrorKind::TypeError,
        ErrorKind::RangeError,
        ErrorKind::ReferenceError,
        ErrorKind::SyntaxError,
    ] {
        bind(kind.name(), function(Intrinsic::ErrorConstructor(kind)));
    }

    let mut math: PropertyMap = MathFn::ALL
        .iter()
        .map(|f| (f.name(), function(Intrinsic::Math(*f))))
        .collect();
    math.set("PI", Value::Number(std::f64::consts::PI));
    bind("Math", Value::object(math));

    let array: PropertyMap = [("isArray", function(Intrinsic::ArrayIsArray))]
        .into_iter()
        .collect();
    bind("Array", Value::object(array));

    bind("parseInt", function(Intrinsic::ParseInt));
    bind("parseFloat", function(Intrinsic::ParseFloat));
    bind("isNaN", function(Intrinsic::IsNaN));
    bind("Number", function(Intrinsic::Number));
    bind("String", function(Intrinsic::String));
    bind("Boolean", function(Intrinsic::Boolean));
    bind("NaN", Value::Number(f64::NAN));
    bind("Infinity", Value::Number(f64::INFINITY));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(intrinsic: Intrinsic, args: &[Value]) -> Value {
        intrinsic.call(args).unwrap()
    }

    #[test]
    fn test_parse_int() {
        assert_eq!(call(Intrinsic::ParseInt, &["42px".into()]), Value::from(42));
        assert_eq!(call(Intrinsic::ParseInt, &["-0x1f".into()]), Value::from(-31));
        assert_eq!(
            call(Intrinsic::ParseInt, &["101".into(), Value::from(2)]),
            Value::from(5)
        );
        assert!(call(Intrinsic::ParseInt, &["abc".into()])
            .as_f64()
            .unwrap()
            .is_nan());
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(call(Intrinsic::ParseFloat, &["3.5m".into()]), Value::from(3.5));
        assert_eq!(call(Intrinsic::ParseFloat, &["1e3".into()]), Value::from(1000.0));
        assert_eq!(call(Intrinsic::ParseFloat, &["2.".into()]), Value::from(2.0));
    }

    #[test]
    fn test_math_functions() {
        let math = |f: MathFn, args: &[Value]| call(Intrinsic::Math(f), args);
        assert_eq!(math(MathFn::Round, &[Value::from(2.5)]), Value::from(3));
        assert_eq!(math(MathFn::Round, &[Value::from(-2.5)]), Value::from(-2));
        assert_eq!(
            math(MathFn::Max, &[Value::from(1), Value::from(7), Value::from(3)]),
            Value::from(7)
        );
        assert_eq!(math(MathFn::Min, &[]), Value::Number(f64::INFINITY));
        assert_eq!(math(MathFn::Pow, &[Value::from(2), Value::from(10)]), Value::from(1024));
        let r = math(MathFn::Random, &[]).as_f64().unwrap();
        assert!((0.0..1.0).contains(&r));
    }

    #[test]
    fn test_error_constructor() {
        let err = call(Intrinsic::ErrorConstructor(ErrorKind::TypeError), &["bad".into()]);
        let err = err.as_error().unwrap();
        assert_eq!(err.kind, ErrorKind::TypeError);
        assert_eq!(err.message, "bad");
    }

    #[test]
    fn test_install_binds_names() {
        let scope = Scope::root();
        install(&scope);
        assert!(scope.lookup("Math").is_some());
        assert!(scope.lookup("RangeError").is_some());
        assert!(scope.lookup("window").is_none());
    }
}
