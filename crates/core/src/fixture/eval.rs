//! Constant folding of literal expressions
//!
//! An expression is folded only when its value can be proven without running
//! code. Any reference to a binding, call, member access or other dynamic
//! construct makes the evaluation "not confident" and fails.

use super::lexer::{Token, TokenKind};
use crate::error::ExtractionFailure;
use serde_json::{Map, Number, Value};

/// Value of a folded expression
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<JsValue>),
    /// Properties in insertion order
    Object(Vec<(String, JsValue)>),
}

impl JsValue {
    fn truthy(&self) -> bool {
        match self {
            JsValue::Undefined | JsValue::Null => false,
            JsValue::Bool(b) => *b,
            JsValue::Number(n) => *n != 0.0 && !n.is_nan(),
            JsValue::String(s) => !s.is_empty(),
            JsValue::Array(_) | JsValue::Object(_) => true,
        }
    }

    fn is_nullish(&self) -> bool {
        matches!(self, JsValue::Undefined | JsValue::Null)
    }

    fn to_number(&self) -> Option<f64> {
        match self {
            JsValue::Undefined => Some(f64::NAN),
            JsValue::Null => Some(0.0),
            JsValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            JsValue::Number(n) => Some(*n),
            JsValue::String(s) => Some(string_to_number(s)),
            // Coercing composites goes through user-overridable methods.
            JsValue::Array(_) | JsValue::Object(_) => None,
        }
    }

    fn to_js_string(&self) -> Option<String> {
        match self {
            JsValue::Undefined => Some("undefined".to_string()),
            JsValue::Null => Some("null".to_string()),
            JsValue::Bool(b) => Some(b.to_string()),
            JsValue::Number(n) => Some(number_to_string(*n)),
            JsValue::String(s) => Some(s.clone()),
            JsValue::Array(_) | JsValue::Object(_) => None,
        }
    }

    /// Convert to JSON the way `JSON.stringify` would
    ///
    /// `undefined` properties are dropped, `undefined` array items and
    /// non-finite numbers become `null`.
    pub fn into_json(self) -> Value {
        match self {
            JsValue::Undefined | JsValue::Null => Value::Null,
            JsValue::Bool(b) => Value::Bool(b),
            JsValue::Number(n) => number_to_json(n),
            JsValue::String(s) => Value::String(s),
            JsValue::Array(items) => {
                Value::Array(items.into_iter().map(JsValue::into_json).collect())
            }
            JsValue::Object(props) => {
                let mut map = Map::new();
                for (key, value) in props {
                    if value != JsValue::Undefined {
                        map.insert(key, value.into_json());
                    }
                }
                Value::Object(map)
            }
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

/// Numeric value of a string the way unary `+` reads it
///
/// Accepts decimal literals, `Infinity` with an optional sign, and
/// unsigned `0x`, `0o` and `0b` integers. Anything else is NaN.
fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let radix = match trimmed.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = &trimmed[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return f64::NAN;
        }
        return digits
            .chars()
            .filter_map(|c| c.to_digit(radix))
            .fold(0.0, |acc, d| acc * f64::from(radix) + f64::from(d));
    }

    let (sign, unsigned) = match trimmed.as_bytes()[0] {
        b'-' => (-1.0, &trimmed[1..]),
        b'+' => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    if unsigned == "Infinity" {
        return sign * f64::INFINITY;
    }
    if !is_decimal_literal(unsigned) {
        return f64::NAN;
    }
    unsigned.parse::<f64>().map_or(f64::NAN, |n| sign * n)
}

/// `digits[.digits][(e|E)[+-]digits]`, with digits on at least one side of the dot
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;
    let digits = |i: &mut usize| {
        let start = *i;
        while *i < bytes.len() && bytes[*i].is_ascii_digit() {
            *i += 1;
        }
        *i - start
    };

    let mut mantissa = digits(&mut i);
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        mantissa += digits(&mut i);
    }
    if mantissa == 0 {
        return false;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        i += 1;
        if i < bytes.len() && matches!(bytes[i], b'+' | b'-') {
            i += 1;
        }
        if digits(&mut i) == 0 {
            return false;
        }
    }
    i == bytes.len()
}

/// String form of a number for keys and concatenation
fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{:.0}", n)
    } else {
        format!("{}", n)
    }
}

type EvalResult<T> = std::result::Result<T, ExtractionFailure>;

fn not_confident(reason: impl Into<String>) -> ExtractionFailure {
    ExtractionFailure::NotStaticallyEvaluable(reason.into())
}

/// Deepest nesting of sub-expressions and unary operators that is folded
const MAX_NESTING: usize = 64;

/// Folds one expression starting at a token index
pub struct Evaluator<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Evaluator<'t> {
    pub fn new(tokens: &'t [Token], pos: usize) -> Self {
        Self {
            tokens,
            pos,
            depth: 0,
        }
    }

    /// Index of the first token after the folded expression
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn peek_punct(&self, p: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(p))
    }

    fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek_punct(p) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, p: &str) -> EvalResult<()> {
        if self.eat_punct(p) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> ExtractionFailure {
        match self.peek() {
            Some(token) => not_confident(format!("unsupported syntax {}", describe(token))),
            None => ExtractionFailure::Syntax("unexpected end of input".to_string()),
        }
    }

    /// Fold a full expression (no comma operator)
    pub fn expression(&mut self) -> EvalResult<JsValue> {
        self.nested(Self::coalesce)
    }

    /// Run `fold` one nesting level deeper, bailing out past [`MAX_NESTING`]
    fn nested<T>(&mut self, fold: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(not_confident("expression nested too deeply"));
        }
        self.depth += 1;
        let result = fold(self);
        self.depth -= 1;
        result
    }

    fn coalesce(&mut self) -> EvalResult<JsValue> {
        let mut left = self.logical_or()?;
        while self.eat_punct("??") {
            let right = self.logical_or()?;
            if left.is_nullish() {
                left = right;
            }
        }
        Ok(left)
    }

    fn logical_or(&mut self) -> EvalResult<JsValue> {
        let mut left = self.logical_and()?;
        while self.eat_punct("||") {
            let right = self.logical_and()?;
            if !left.truthy() {
                left = right;
            }
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> EvalResult<JsValue> {
        let mut left = self.additive()?;
        while self.eat_punct("&&") {
            let right = self.additive()?;
            if left.truthy() {
                left = right;
            }
        }
        Ok(left)
    }

    fn additive(&mut self) -> EvalResult<JsValue> {
        let mut left = self.multiplicative()?;
        loop {
            if self.eat_punct("+") {
                let right = self.multiplicative()?;
                left = add(left, right)?;
            } else if self.eat_punct("-") {
                let right = self.multiplicative()?;
                left = JsValue::Number(number(&left)? - number(&right)?);
            } else {
                return Ok(left);
            }
        }
    }

    fn multiplicative(&mut self) -> EvalResult<JsValue> {
        let mut left = self.exponent()?;
        loop {
            let op = if self.eat_punct("*") {
                '*'
            } else if self.eat_punct("/") {
                '/'
            } else if self.eat_punct("%") {
                '%'
            } else {
                return Ok(left);
            };
            let right = self.exponent()?;
            let (a, b) = (number(&left)?, number(&right)?);
            left = JsValue::Number(match op {
                '*' => a * b,
                '/' => a / b,
                _ => a % b,
            });
        }
    }

    fn exponent(&mut self) -> EvalResult<JsValue> {
        let base = self.unary()?;
        if self.eat_punct("**") {
            // right associative
            let power = self.nested(Self::exponent)?;
            return Ok(JsValue::Number(number(&base)?.powf(number(&power)?)));
        }
        Ok(base)
    }

    fn unary(&mut self) -> EvalResult<JsValue> {
        if self.eat_punct("-") {
            let value = self.nested(Self::unary)?;
            return Ok(JsValue::Number(-number(&value)?));
        }
        if self.eat_punct("+") {
            let value = self.nested(Self::unary)?;
            return Ok(JsValue::Number(number(&value)?));
        }
        if self.eat_punct("!") {
            let value = self.nested(Self::unary)?;
            return Ok(JsValue::Bool(!value.truthy()));
        }
        self.primary()
    }

    fn primary(&mut self) -> EvalResult<JsValue> {
        let token = self.peek().ok_or_else(|| self.unexpected())?;
        let value = match &token.kind {
            TokenKind::Str(s) => {
                self.pos += 1;
                JsValue::String(s.clone())
            }
            TokenKind::Num(n) => {
                self.pos += 1;
                JsValue::Number(*n)
            }
            TokenKind::Template(Some(s)) => {
                self.pos += 1;
                JsValue::String(s.clone())
            }
            TokenKind::Template(None) => {
                return Err(not_confident("template literal with substitutions"))
            }
            TokenKind::Ident(name) => {
                let value = match name.as_str() {
                    "true" => JsValue::Bool(true),
                    "false" => JsValue::Bool(false),
                    "null" => JsValue::Null,
                    "undefined" => JsValue::Undefined,
                    "NaN" => JsValue::Number(f64::NAN),
                    "Infinity" => JsValue::Number(f64::INFINITY),
                    _ => return Err(not_confident(format!("reference to `{}`", name))),
                };
                self.pos += 1;
                value
            }
            TokenKind::Punct("(") => {
                self.pos += 1;
                let value = self.expression()?;
                self.expect_punct(")")?;
                value
            }
            TokenKind::Punct("[") => {
                self.pos += 1;
                self.array()?
            }
            TokenKind::Punct("{") => {
                self.pos += 1;
                self.object()?
            }
            _ => return Err(self.unexpected()),
        };

        // Member access, calls and tagged templates on a literal are left to the runtime.
        if let Some(next) = self.peek() {
            let dynamic = match &next.kind {
                // no semicolon is inserted before `[` or `(`, even across lines
                TokenKind::Punct(p) => matches!(*p, "." | "?." | "[" | "("),
                TokenKind::Template(_) => true,
                _ => false,
            };
            if dynamic {
                return Err(not_confident(format!("{} applied to a literal", describe(next))));
            }
        }

        Ok(value)
    }

    fn array(&mut self) -> EvalResult<JsValue> {
        let mut items = Vec::new();
        loop {
            if self.eat_punct("]") {
                return Ok(JsValue::Array(items));
            }
            if self.eat_punct(",") {
                // hole
                items.push(JsValue::Undefined);
                continue;
            }
            if self.peek_punct("...") {
                return Err(not_confident("spread element"));
            }
            items.push(self.expression()?);
            if !self.eat_punct(",") {
                self.expect_punct("]")?;
                return Ok(JsValue::Array(items));
            }
        }
    }

    fn object(&mut self) -> EvalResult<JsValue> {
        let mut props: Vec<(String, JsValue)> = Vec::new();
        loop {
            if self.eat_punct("}") {
                return Ok(JsValue::Object(props));
            }

            let token = self.peek().ok_or_else(|| self.unexpected())?;
            let key = match &token.kind {
                TokenKind::Ident(name) => name.clone(),
                TokenKind::Str(s) => s.clone(),
                TokenKind::Num(n) => number_to_string(*n),
                TokenKind::Punct("[") => return Err(not_confident("computed property key")),
                TokenKind::Punct("...") => return Err(not_confident("spread property")),
                _ => return Err(self.unexpected()),
            };
            self.pos += 1;

            if !self.peek_punct(":") {
                return Err(match self.peek() {
                    Some(t) if t.is_punct("(") => not_confident(format!("method `{}`", key)),
                    _ => not_confident(format!("shorthand property `{}`", key)),
                });
            }
            self.pos += 1;

            let value = self.expression()?;
            match props.iter_mut().find(|(k, _)| *k == key) {
                Some(existing) => existing.1 = value,
                None => props.push((key, value)),
            }

            if !self.eat_punct(",") {
                self.expect_punct("}")?;
                return Ok(JsValue::Object(props));
            }
        }
    }
}

fn number(value: &JsValue) -> EvalResult<f64> {
    value
        .to_number()
        .ok_or_else(|| not_confident("arithmetic on an object or array"))
}

fn add(left: JsValue, right: JsValue) -> EvalResult<JsValue> {
    match (&left, &right) {
        (JsValue::String(_), _) | (_, JsValue::String(_)) => {
            let (a, b) = (left.to_js_string(), right.to_js_string());
            match (a, b) {
                (Some(a), Some(b)) => Ok(JsValue::String(a + &b)),
                _ => Err(not_confident("string concatenation with an object or array")),
            }
        }
        _ => Ok(JsValue::Number(number(&left)? + number(&right)?)),
    }
}

fn describe(token: &Token) -> String {
    match &token.kind {
        TokenKind::Ident(name) => format!("`{}`", name),
        TokenKind::Punct(p) => format!("`{}`", p),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Template(_) => "template literal".to_string(),
        TokenKind::Num(_) => "number literal".to_string(),
        TokenKind::BigInt => "BigInt literal".to_string(),
        TokenKind::Regex => "regular expression".to_string(),
    }
}
