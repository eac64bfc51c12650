// extensions/interpolation.rs
//
// Blend functions for every tweenable value shape, and the resolver that
// picks one from a pair of sample values. Resolution happens once, when a
// tween is built; the returned fn pointer is what runs every frame.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Blends `start` toward `end` by `t`. `t` is not bounded to [0, 1].
pub type InterpolationFn<T> = fn(&T, &T, f32) -> T;

/// Named fields of a [`Value::Record`].
pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolationError {
    #[error(
        "unsupported tween type: {start} -> {end} \
         (supported: number, vector, color, or record with numeric fields)"
    )]
    UnsupportedType {
        start: &'static str,
        end: &'static str,
    },
}

/// RGB color. Components are nominally 0-255 but never clamped by blending.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::new(255.0, 255.0, 255.0);

    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Components clamped to [0, 255]. Opt-in; blends never do this.
    pub fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 255.0),
            g: self.g.clamp(0.0, 255.0),
            b: self.b.clamp(0.0, 255.0),
        }
    }
}

/// A dynamically shaped tween value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f32),
    Vector(Vec2),
    Color(Color),
    Record(Record),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Name of the runtime shape, used in error reports.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Vector(_) => "vector",
            Value::Color(_) => "color",
            Value::Record(_) => "record",
            Value::Text(_) => "text",
            Value::Bool(_) => "bool",
        }
    }

    pub fn as_number(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Build a record from `(name, value)` pairs.
    pub fn record<K, V>(fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        Value::Record(fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Number(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n as f32)
    }
}

impl From<Vec2> for Value {
    fn from(v: Vec2) -> Self {
        Value::Vector(v)
    }
}

impl From<Color> for Value {
    fn from(c: Color) -> Self {
        Value::Color(c)
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(r)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A value shape that can be tweened.
///
/// `resolve` inspects a start/end sample pair and returns the blend for
/// that shape, or fails if the pair has no common tweenable shape.
pub trait Interpolate: Clone + 'static {
    fn resolve(start: &Self, end: &Self) -> Result<InterpolationFn<Self>, InterpolationError>;
}

/// Pick the blend function for a pair of sample values.
pub fn resolve<T: Interpolate>(
    start: &T,
    end: &T,
) -> Result<InterpolationFn<T>, InterpolationError> {
    T::resolve(start, end)
}

impl Interpolate for f32 {
    fn resolve(_: &Self, _: &Self) -> Result<InterpolationFn<Self>, InterpolationError> {
        Ok(blend_scalar)
    }
}

impl Interpolate for Vec2 {
    fn resolve(_: &Self, _: &Self) -> Result<InterpolationFn<Self>, InterpolationError> {
        Ok(blend_vector)
    }
}

impl Interpolate for Color {
    fn resolve(_: &Self, _: &Self) -> Result<InterpolationFn<Self>, InterpolationError> {
        Ok(blend_color)
    }
}

impl Interpolate for Record {
    fn resolve(start: &Self, end: &Self) -> Result<InterpolationFn<Self>, InterpolationError> {
        if rgb(start).is_some() && rgb(end).is_some() {
            Ok(blend_rgb_record)
        } else if shares_numeric_field(start, end) {
            Ok(blend_record)
        } else {
            Err(InterpolationError::UnsupportedType {
                start: "record",
                end: "record",
            })
        }
    }
}

impl Interpolate for Value {
    fn resolve(start: &Self, end: &Self) -> Result<InterpolationFn<Self>, InterpolationError> {
        let unsupported = || InterpolationError::UnsupportedType {
            start: start.type_name(),
            end: end.type_name(),
        };
        match (start, end) {
            (Value::Number(_), Value::Number(_)) => Ok(value_number),
            (Value::Vector(_), Value::Vector(_)) => Ok(value_vector),
            (Value::Color(_), Value::Color(_)) => Ok(value_color),
            (Value::Record(a), Value::Record(b)) => {
                if rgb(a).is_some() && rgb(b).is_some() {
                    Ok(value_rgb_record)
                } else if shares_numeric_field(a, b) {
                    Ok(value_record)
                } else {
                    Err(unsupported())
                }
            }
            _ => Err(unsupported()),
        }
    }
}

// ── Blend functions ──────────────────────────────────────────────────────

/// Linearly interpolate between two values.
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Linearly interpolate between two Vec2 values.
#[inline]
pub fn lerp_vec2(a: Vec2, b: Vec2, t: f32) -> Vec2 {
    a + (b - a) * t
}

pub fn blend_scalar(start: &f32, end: &f32, t: f32) -> f32 {
    lerp(*start, *end, t)
}

pub fn blend_vector(start: &Vec2, end: &Vec2, t: f32) -> Vec2 {
    lerp_vec2(*start, *end, t)
}

/// Component-wise blend rounded to whole numbers, halves toward +inf.
pub fn blend_color(start: &Color, end: &Color, t: f32) -> Color {
    Color {
        r: round_half_up(lerp(start.r, end.r, t)),
        g: round_half_up(lerp(start.g, end.g, t)),
        b: round_half_up(lerp(start.b, end.b, t)),
    }
}

#[inline]
fn round_half_up(x: f32) -> f32 {
    (x + 0.5).floor()
}

/// Blend records that carry numeric `r`, `g` and `b`. Only those three
/// fields survive.
pub fn blend_rgb_record(start: &Record, end: &Record, t: f32) -> Record {
    let (Some(a), Some(b)) = (rgb(start), rgb(end)) else {
        return blend_record(start, end, t);
    };
    let c = blend_color(&a, &b, t);
    [("r", c.r), ("g", c.g), ("b", c.b)]
        .into_iter()
        .map(|(k, v)| (k.to_string(), Value::Number(v)))
        .collect()
}

/// Field-wise blend over the fields numeric in both records. Every other
/// field is dropped.
pub fn blend_record(start: &Record, end: &Record, t: f32) -> Record {
    start
        .iter()
        .filter_map(|(key, a)| {
            let a = a.as_number()?;
            let b = end.get(key)?.as_number()?;
            Some((key.clone(), Value::Number(lerp(a, b, t))))
        })
        .collect()
}

fn rgb(record: &Record) -> Option<Color> {
    let field = |name: &str| record.get(name).and_then(Value::as_number);
    Some(Color::new(field("r")?, field("g")?, field("b")?))
}

fn shares_numeric_field(start: &Record, end: &Record) -> bool {
    start.iter().any(|(key, a)| {
        a.as_number().is_some() && end.get(key).and_then(Value::as_number).is_some()
    })
}

// Value-level wrappers. Shapes are fixed at resolve time; a mismatch here
// means the caller swapped shapes mid-tween, and the start value is kept.

fn value_number(start: &Value, end: &Value, t: f32) -> Value {
    match (start, end) {
        (Value::Number(a), Value::Number(b)) => Value::Number(lerp(*a, *b, t)),
        _ => start.clone(),
    }
}

fn value_vector(start: &Value, end: &Value, t: f32) -> Value {
    match (start, end) {
        (Value::Vector(a), Value::Vector(b)) => Value::Vector(lerp_vec2(*a, *b, t)),
        _ => start.clone(),
    }
}

fn value_color(start: &Value, end: &Value, t: f32) -> Value {
    match (start, end) {
        (Value::Color(a), Value::Color(b)) => Value::Color(blend_color(a, b, t)),
        _ => start.clone(),
    }
}

fn value_rgb_record(start: &Value, end: &Value, t: f32) -> Value {
    match (start, end) {
        (Value::Record(a), Value::Record(b)) => Value::Record(blend_rgb_record(a, b, t)),
        _ => start.clone(),
    }
}

fn value_record(start: &Value, end: &Value, t: f32) -> Value {
    match (start, end) {
        (Value::Record(a), Value::Record(b)) => Value::Record(blend_record(a, b, t)),
        _ => start.clone(),
    }
}
