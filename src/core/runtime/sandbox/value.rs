// Scalar values and the loose-typing rules the sandbox applies to them.
use std::cmp::Ordering;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !(s.is_empty() || s == "0"),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn to_php_string(&self) -> String {
        match self {
            Value::Null | Value::Bool(false) => String::new(),
            Value::Bool(true) => "1".to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Str(s) => s.clone(),
        }
    }

    /// Numeric view used by arithmetic; non-numeric strings count as their leading number.
    pub fn to_number(&self) -> Value {
        match self {
            Value::Null | Value::Bool(false) => Value::Int(0),
            Value::Bool(true) => Value::Int(1),
            Value::Int(_) | Value::Float(_) => self.clone(),
            Value::Str(s) => numeric_string(s)
                .or_else(|| numeric_string(leading_numeric(s)))
                .unwrap_or(Value::Int(0)),
        }
    }

    pub fn to_int(&self) -> i64 {
        match self.to_number() {
            Value::Int(i) => i,
            Value::Float(f) if f.is_finite() => f.trunc() as i64,
            _ => 0,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.clone()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Str(s) => match numeric_string(s)? {
                Value::Int(i) => Some(i as f64),
                Value::Float(f) => Some(f),
                _ => None,
            },
            _ => None,
        }
    }
}

fn format_float(f: f64) -> String {
    if f.is_nan() {
        return "NAN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    if f.fract() == 0.0 && f.abs() < 1e15 {
        return format!("{}", f as i64);
    }
    format!("{f}")
}

/// Parse a whole string as a number the way numeric strings are recognised.
pub fn numeric_string(s: &str) -> Option<Value> {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if trimmed.is_empty()
        || !trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'))
    {
        return None;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Some(Value::Int(i));
    }
    trimmed.parse::<f64>().ok().map(Value::Float)
}

fn leading_numeric(s: &str) -> &str {
    let trimmed = s.trim_start_matches(|c: char| c.is_ascii_whitespace());
    let mut end = 0;
    for (idx, c) in trimmed.char_indices() {
        let sign = (c == '+' || c == '-') && idx == 0;
        if c.is_ascii_digit() || c == '.' || sign {
            end = idx + c.len_utf8();
        } else {
            break;
        }
    }
    &trimmed[..end]
}

/// Value of a numeric literal token (`42`, `1_000`, `0x1F`, `1.5e3`).
pub fn parse_number_literal(text: &str) -> Value {
    let cleaned = text.replace('_', "");
    if let Some(hex) = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(Value::Int)
            .unwrap_or(Value::Float(f64::INFINITY));
    }
    if let Ok(i) = cleaned.parse::<i64>() {
        return Value::Int(i);
    }
    Value::Float(cleaned.parse::<f64>().unwrap_or(0.0))
}

/// Three-way comparison with loose typing.
pub fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Str(s)) => "".cmp(s.as_str()),
        (Value::Str(s), Value::Null) => s.as_str().cmp(""),
        (Value::Bool(_) | Value::Null, _) | (_, Value::Bool(_) | Value::Null) => {
            a.truthy().cmp(&b.truthy())
        }
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_php_string().cmp(&b.to_php_string()),
        },
    }
}

pub fn loose_eq(a: &Value, b: &Value) -> bool {
    compare(a, b) == Ordering::Equal
}

pub fn strict_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Int(x), Value::Int(y)) => x == y,
        (Value::Float(x), Value::Float(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        _ => false,
    }
}

#[derive(Clone, Copy, Debug)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

/// Arithmetic on the numeric views; `None` signals division by zero.
pub fn arith(op: ArithOp, a: &Value, b: &Value) -> Option<Value> {
    let (x, y) = (a.to_number(), b.to_number());
    if let ArithOp::Mod = op {
        let (i, j) = (x.to_int(), y.to_int());
        return (j != 0).then(|| Value::Int(i.wrapping_rem(j)));
    }
    if let (Value::Int(i), Value::Int(j)) = (&x, &y) {
        let (i, j) = (*i, *j);
        let exact = match op {
            ArithOp::Add => i.checked_add(j),
            ArithOp::Sub => i.checked_sub(j),
            ArithOp::Mul => i.checked_mul(j),
            ArithOp::Div if j == 0 => return None,
            ArithOp::Div | ArithOp::Mod => i
                .checked_rem(j)
                .filter(|rem| *rem == 0)
                .and_then(|_| i.checked_div(j)),
        };
        if let Some(result) = exact {
            return Some(Value::Int(result));
        }
    }
    let (fx, fy) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
    let result = match op {
        ArithOp::Add => fx + fy,
        ArithOp::Sub => fx - fy,
        ArithOp::Mul => fx * fy,
        ArithOp::Div | ArithOp::Mod if fy == 0.0 => return None,
        ArithOp::Div | ArithOp::Mod => fx / fy,
    };
    Some(Value::Float(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_follows_php() {
        assert!(!Value::Str("0".into()).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Str("0.0".into()).truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::Null.truthy());
        assert!(Value::Float(0.5).truthy());
    }

    #[test]
    fn string_conversion() {
        assert_eq!(Value::Bool(true).to_php_string(), "1");
        assert_eq!(Value::Bool(false).to_php_string(), "");
        assert_eq!(Value::Float(2.0).to_php_string(), "2");
        assert_eq!(Value::Float(0.25).to_php_string(), "0.25");
    }

    #[test]
    fn loose_equality() {
        assert!(loose_eq(&Value::Str("1".into()), &Value::Int(1)));
        assert!(loose_eq(&Value::Str("abc".into()), &Value::Bool(true)));
        assert!(loose_eq(&Value::Null, &Value::Str(String::new())));
        assert!(!loose_eq(&Value::Null, &Value::Str("0".into())));
        assert!(!loose_eq(&Value::Str("abc".into()), &Value::Int(0)));
        assert!(!strict_eq(&Value::Str("1".into()), &Value::Int(1)));
    }

    #[test]
    fn arithmetic_promotes_and_guards_zero() {
        assert_eq!(
            arith(ArithOp::Add, &Value::Str("2".into()), &Value::Int(3)),
            Some(Value::Int(5))
        );
        assert_eq!(
            arith(ArithOp::Div, &Value::Int(7), &Value::Int(2)),
            Some(Value::Float(3.5))
        );
        assert_eq!(arith(ArithOp::Div, &Value::Int(1), &Value::Int(0)), None);
        assert_eq!(
            arith(ArithOp::Mul, &Value::Int(i64::MAX), &Value::Int(2)),
            Some(Value::Float(i64::MAX as f64 * 2.0))
        );
        assert_eq!(
            arith(ArithOp::Add, &Value::Str("12abc".into()), &Value::Int(1)),
            Some(Value::Int(13))
        );
    }

    #[test]
    fn number_literals() {
        assert_eq!(parse_number_literal("1_000"), Value::Int(1000));
        assert_eq!(parse_number_literal("0x1F"), Value::Int(31));
        assert_eq!(parse_number_literal("1.5e3"), Value::Float(1500.0));
    }
}
