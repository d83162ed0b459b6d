//! Literal values and the duration literal grammar

use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::{char, digit0, digit1, one_of};
use nom::combinator::{all_consuming, opt, recognize, value};
use nom::multi::many1;
use nom::{IResult, Parser};

use super::kind::ValueType;
use crate::core::types::SimDuration;

/// A literal, materialized once in every representation it supports
///
/// Coercing a constant never wraps it; the copy just reports another type.
#[derive(Debug, Clone, PartialEq)]
pub struct Const {
    value_type: ValueType,
    text: String,
    bool_val: bool,
    int_val: i32,
    float_val: f64,
    duration_val: SimDuration,
}

impl Const {
    /// Parse a literal: boolean keyword, duration literal, integer,
    /// percentage, float, and finally opaque text
    pub fn parse(text: &str) -> Self {
        let mut result = Const {
            value_type: ValueType::String,
            text: text.to_string(),
            bool_val: !text.is_empty(),
            int_val: 0,
            float_val: 0.0,
            duration_val: SimDuration::ZERO,
        };

        if text.eq_ignore_ascii_case("true") || text.eq_ignore_ascii_case("false") {
            let b = text.eq_ignore_ascii_case("true");
            result.value_type = ValueType::Bool;
            result.bool_val = b;
            result.int_val = b as i32;
            result.float_val = if b { 1.0 } else { 0.0 };
            return result;
        }

        if let Some(duration) = parse_duration(text) {
            result.value_type = ValueType::Duration;
            result.duration_val = duration;
            result.int_val = duration.whole_secs() as i32;
            result.float_val = duration.as_secs_f64();
            result.bool_val = duration != SimDuration::ZERO;
            return result;
        }

        if let Ok(int) = text.parse::<i64>() {
            let int = int as i32;
            result.value_type = ValueType::Int;
            result.int_val = int;
            result.float_val = int as f64;
            result.duration_val = SimDuration::from_secs(int as i64);
            result.bool_val = int != 0;
            return result;
        }

        if text.len() > 1 && text.ends_with('%') {
            if let Ok(percent) = text[..text.len() - 1].parse::<f64>() {
                result.set_float(percent / 100.0);
                return result;
            }
        }

        if let Ok(float) = text.parse::<f64>() {
            result.set_float(float);
        }
        result
    }

    fn set_float(&mut self, float: f64) {
        self.value_type = ValueType::Float;
        self.float_val = float;
        self.int_val = float as i32;
        self.duration_val = SimDuration::from_secs_f64(float);
        self.bool_val = float != 0.0;
    }

    /// Same literal, reporting `value_type`
    pub fn retyped(&self, value_type: ValueType) -> Self {
        Const {
            value_type,
            ..self.clone()
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn get_bool(&self) -> bool {
        self.bool_val
    }

    pub fn get_int(&self) -> i32 {
        self.int_val
    }

    pub fn get_float(&self) -> f64 {
        self.float_val
    }

    pub fn get_duration(&self) -> SimDuration {
        self.duration_val
    }

    pub fn get_string(&self) -> String {
        self.text.clone()
    }
}

/// Parse a unit-suffixed duration literal such as `1.5s`, `-300ms` or `1h2m3s`
///
/// A bare number is not a duration; it falls through to the integer and
/// float forms.
pub fn parse_duration(input: &str) -> Option<SimDuration> {
    let (_, (sign, parts)) = duration_literal(input).ok()?;
    let mut nanos = 0.0f64;
    for (number, unit_nanos) in parts {
        let number: f64 = number.parse().ok()?;
        nanos += number * unit_nanos;
    }
    if sign == Some('-') {
        nanos = -nanos;
    }
    let nanos = nanos.round();
    if !nanos.is_finite() || nanos.abs() > i64::MAX as f64 {
        return None;
    }
    Some(SimDuration::from_nanos(nanos as i64))
}

type Component<'a> = (&'a str, f64);

fn duration_literal(input: &str) -> IResult<&str, (Option<char>, Vec<Component<'_>>)> {
    all_consuming((opt(one_of("+-")), many1((number, unit)))).parse(input)
}

fn number(input: &str) -> IResult<&str, &str> {
    alt((
        recognize((digit1, opt((char('.'), digit0)))),
        recognize((char('.'), digit1)),
    ))
    .parse(input)
}

fn unit(input: &str) -> IResult<&str, f64> {
    alt((
        value(1.0, tag("ns")),
        value(1e3, tag("us")),
        value(1e3, tag("µs")),
        value(1e3, tag("μs")),
        value(1e6, tag("ms")),
        value(1e9, tag("s")),
        value(60e9, tag("m")),
        value(3600e9, tag("h")),
    ))
    .parse(input)
}
