// MinIO Rust Library for Amazon S3 Compatible Cloud Storage
// Copyright 2025 MinIO, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Typed literal values
//!
//! A [`Datum`] pairs a primitive type with its value. Datums are decoded
//! from the binary single-value serialization used by column bounds and
//! partition summaries, and from the JSON single-value form used by field
//! defaults and predicate literals.
//!
//! Binary single-value layout:
//!
//! ```text
//! boolean                 1 byte, 0x00 or 0x01
//! int, date               4 bytes, little-endian
//! long, time, timestamp   8 bytes, little-endian
//! float, double           IEEE 754 bits, little-endian
//! decimal                 unscaled value, two's complement, big-endian, minimal length
//! string                  UTF-8 bytes, no length prefix
//! uuid                    16 bytes, big-endian
//! fixed, binary           raw bytes
//! ```

use crate::error::{Error, Result};
use crate::spec::datatypes::PrimitiveType;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::ser::{Serialize, Serializer};
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use uuid::Uuid;

/// Days between 0001-01-01 and 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;
const MICROS_PER_SECOND: i64 = 1_000_000;

/// Raw literal storage
#[derive(Debug, Clone)]
pub enum PrimitiveLiteral {
    /// Boolean
    Boolean(bool),
    /// int and date
    Int(i32),
    /// long, time, timestamp and timestamptz
    Long(i64),
    /// float
    Float(f32),
    /// double
    Double(f64),
    /// Unscaled decimal value
    Decimal(i128),
    /// string
    String(String),
    /// uuid
    Uuid(Uuid),
    /// fixed and binary
    Binary(Vec<u8>),
}

// Floats compare by bit pattern so literals can key hash maps
impl PartialEq for PrimitiveLiteral {
    fn eq(&self, other: &Self) -> bool {
        use PrimitiveLiteral::*;
        match (self, other) {
            (Boolean(a), Boolean(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Long(a), Long(b)) => a == b,
            (Float(a), Float(b)) => a.to_bits() == b.to_bits(),
            (Double(a), Double(b)) => a.to_bits() == b.to_bits(),
            (Decimal(a), Decimal(b)) => a == b,
            (String(a), String(b)) => a == b,
            (Uuid(a), Uuid(b)) => a == b,
            (Binary(a), Binary(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for PrimitiveLiteral {}

impl Hash for PrimitiveLiteral {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            PrimitiveLiteral::Boolean(v) => v.hash(state),
            PrimitiveLiteral::Int(v) => v.hash(state),
            PrimitiveLiteral::Long(v) => v.hash(state),
            PrimitiveLiteral::Float(v) => v.to_bits().hash(state),
            PrimitiveLiteral::Double(v) => v.to_bits().hash(state),
            PrimitiveLiteral::Decimal(v) => v.hash(state),
            PrimitiveLiteral::String(v) => v.hash(state),
            PrimitiveLiteral::Uuid(v) => v.hash(state),
            PrimitiveLiteral::Binary(v) => v.hash(state),
        }
    }
}

/// A typed literal value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Datum {
    ty: PrimitiveType,
    literal: PrimitiveLiteral,
}

impl Datum {
    /// Boolean datum
    pub fn bool(v: bool) -> Self {
        Datum {
            ty: PrimitiveType::Boolean,
            literal: PrimitiveLiteral::Boolean(v),
        }
    }

    /// 32-bit integer datum
    pub fn int(v: i32) -> Self {
        Datum {
            ty: PrimitiveType::Int,
            literal: PrimitiveLiteral::Int(v),
        }
    }

    /// 64-bit integer datum
    pub fn long(v: i64) -> Self {
        Datum {
            ty: PrimitiveType::Long,
            literal: PrimitiveLiteral::Long(v),
        }
    }

    /// 32-bit float datum
    pub fn float(v: f32) -> Self {
        Datum {
            ty: PrimitiveType::Float,
            literal: PrimitiveLiteral::Float(v),
        }
    }

    /// 64-bit float datum
    pub fn double(v: f64) -> Self {
        Datum {
            ty: PrimitiveType::Double,
            literal: PrimitiveLiteral::Double(v),
        }
    }

    /// Date datum from days since the epoch
    pub fn date(days: i32) -> Self {
        Datum {
            ty: PrimitiveType::Date,
            literal: PrimitiveLiteral::Int(days),
        }
    }

    /// Time datum from microseconds since midnight
    pub fn time_micros(micros: i64) -> Self {
        Datum {
            ty: PrimitiveType::Time,
            literal: PrimitiveLiteral::Long(micros),
        }
    }

    /// Timestamp datum from microseconds since the epoch
    pub fn timestamp_micros(micros: i64) -> Self {
        Datum {
            ty: PrimitiveType::Timestamp,
            literal: PrimitiveLiteral::Long(micros),
        }
    }

    /// Timestamptz datum from microseconds since the epoch
    pub fn timestamptz_micros(micros: i64) -> Self {
        Datum {
            ty: PrimitiveType::Timestamptz,
            literal: PrimitiveLiteral::Long(micros),
        }
    }

    /// String datum
    pub fn string(v: impl Into<String>) -> Self {
        Datum {
            ty: PrimitiveType::String,
            literal: PrimitiveLiteral::String(v.into()),
        }
    }

    /// UUID datum
    pub fn uuid(v: Uuid) -> Self {
        Datum {
            ty: PrimitiveType::Uuid,
            literal: PrimitiveLiteral::Uuid(v),
        }
    }

    /// Binary datum
    pub fn binary(v: impl Into<Vec<u8>>) -> Self {
        Datum {
            ty: PrimitiveType::Binary,
            literal: PrimitiveLiteral::Binary(v.into()),
        }
    }

    /// Fixed-length binary datum
    pub fn fixed(v: impl Into<Vec<u8>>) -> Self {
        let bytes = v.into();
        Datum {
            ty: PrimitiveType::Fixed(bytes.len() as u64),
            literal: PrimitiveLiteral::Binary(bytes),
        }
    }

    /// Decimal datum from its unscaled value
    pub fn decimal(unscaled: i128, precision: u32, scale: u32) -> Result<Self> {
        let ty = PrimitiveType::Decimal { precision, scale };
        if decimal_digits(unscaled) > precision {
            return Err(Error::invalid_argument(format!(
                "unscaled value {unscaled} does not fit {ty}"
            )));
        }
        Ok(Datum {
            ty,
            literal: PrimitiveLiteral::Decimal(unscaled),
        })
    }

    /// Type of this datum
    pub fn data_type(&self) -> &PrimitiveType {
        &self.ty
    }

    /// Raw literal
    pub fn literal(&self) -> &PrimitiveLiteral {
        &self.literal
    }

    /// Whether this is a floating point NaN
    pub fn is_nan(&self) -> bool {
        match self.literal {
            PrimitiveLiteral::Float(v) => v.is_nan(),
            PrimitiveLiteral::Double(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Compares two datums of compatible types
    ///
    /// Returns `None` when either side is NaN or the types have no common
    /// order. Strings and binary compare as unsigned bytes.
    pub fn compare(&self, other: &Datum) -> Option<Ordering> {
        use PrimitiveLiteral::*;
        let integers = |a: &PrimitiveType, b: &PrimitiveType| {
            matches!(a, PrimitiveType::Int | PrimitiveType::Long)
                && matches!(b, PrimitiveType::Int | PrimitiveType::Long)
        };
        match (&self.literal, &other.literal) {
            (Boolean(a), Boolean(b)) => Some(a.cmp(b)),
            (Int(a), Int(b)) => Some(a.cmp(b)),
            (Long(a), Long(b)) => Some(a.cmp(b)),
            (Int(a), Long(b)) if integers(&self.ty, &other.ty) => Some(i64::from(*a).cmp(b)),
            (Long(a), Int(b)) if integers(&self.ty, &other.ty) => Some(a.cmp(&i64::from(*b))),
            (Float(a), Float(b)) => a.partial_cmp(b),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Float(a), Double(b)) => f64::from(*a).partial_cmp(b),
            (Double(a), Float(b)) => a.partial_cmp(&f64::from(*b)),
            (Decimal(a), Decimal(b)) => match (&self.ty, &other.ty) {
                (
                    PrimitiveType::Decimal { scale: s1, .. },
                    PrimitiveType::Decimal { scale: s2, .. },
                ) if s1 == s2 => Some(a.cmp(b)),
                _ => None,
            },
            (String(a), String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
            (Uuid(a), Uuid(b)) => Some(a.as_u128().cmp(&b.as_u128())),
            (Binary(a), Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Decodes a binary single-value for the given type
    ///
    /// A 4-byte value read as `long` or `double` is widened, matching
    /// values written before an int or float column was promoted.
    pub fn try_from_bytes(bytes: &[u8], ty: &PrimitiveType) -> Result<Datum> {
        let literal = match ty {
            PrimitiveType::Boolean => match bytes {
                [0] => PrimitiveLiteral::Boolean(false),
                [_] => PrimitiveLiteral::Boolean(true),
                _ => return Err(bad_length(ty, bytes.len())),
            },
            PrimitiveType::Int | PrimitiveType::Date => {
                PrimitiveLiteral::Int(i32::from_le_bytes(fixed_bytes(bytes, ty)?))
            }
            PrimitiveType::Long
            | PrimitiveType::Time
            | PrimitiveType::Timestamp
            | PrimitiveType::Timestamptz => match bytes.len() {
                4 => PrimitiveLiteral::Long(i64::from(i32::from_le_bytes(fixed_bytes(
                    bytes, ty,
                )?))),
                _ => PrimitiveLiteral::Long(i64::from_le_bytes(fixed_bytes(bytes, ty)?)),
            },
            PrimitiveType::Float => {
                PrimitiveLiteral::Float(f32::from_le_bytes(fixed_bytes(bytes, ty)?))
            }
            PrimitiveType::Double => match bytes.len() {
                4 => PrimitiveLiteral::Double(f64::from(f32::from_le_bytes(fixed_bytes(
                    bytes, ty,
                )?))),
                _ => PrimitiveLiteral::Double(f64::from_le_bytes(fixed_bytes(bytes, ty)?)),
            },
            PrimitiveType::Decimal { .. } => PrimitiveLiteral::Decimal(decimal_from_bytes(bytes)?),
            PrimitiveType::String => PrimitiveLiteral::String(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| Error::invalid_argument(format!("invalid UTF-8 bound: {e}")))?,
            ),
            PrimitiveType::Uuid => {
                PrimitiveLiteral::Uuid(Uuid::from_bytes(fixed_bytes::<16>(bytes, ty)?))
            }
            PrimitiveType::Fixed(_) | PrimitiveType::Binary => {
                PrimitiveLiteral::Binary(bytes.to_vec())
            }
        };
        Ok(Datum { ty: *ty, literal })
    }

    /// Encodes this datum in the binary single-value form
    pub fn to_bytes(&self) -> Vec<u8> {
        match &self.literal {
            PrimitiveLiteral::Boolean(v) => vec![u8::from(*v)],
            PrimitiveLiteral::Int(v) => v.to_le_bytes().to_vec(),
            PrimitiveLiteral::Long(v) => v.to_le_bytes().to_vec(),
            PrimitiveLiteral::Float(v) => v.to_le_bytes().to_vec(),
            PrimitiveLiteral::Double(v) => v.to_le_bytes().to_vec(),
            PrimitiveLiteral::Decimal(v) => decimal_to_bytes(*v),
            PrimitiveLiteral::String(v) => v.as_bytes().to_vec(),
            PrimitiveLiteral::Uuid(v) => v.as_bytes().to_vec(),
            PrimitiveLiteral::Binary(v) => v.clone(),
        }
    }

    /// Decodes a JSON value for the given type
    ///
    /// Accepts the JSON single-value form (ISO-8601 strings for dates and
    /// times, decimal strings, hex for binary) and plain numbers for
    /// numeric, date and time types.
    pub fn try_from_json(value: &JsonValue, ty: &PrimitiveType) -> Result<Datum> {
        let mismatch = || {
            Error::invalid_argument(format!("cannot convert {value} to {ty}"))
        };
        let datum = match (ty, value) {
            (PrimitiveType::Boolean, JsonValue::Bool(b)) => Datum::bool(*b),
            (PrimitiveType::Int, JsonValue::Number(n)) => {
                let v = n.as_i64().ok_or_else(mismatch)?;
                Datum::int(i32::try_from(v).map_err(|_| mismatch())?)
            }
            (PrimitiveType::Long, JsonValue::Number(n)) => {
                Datum::long(n.as_i64().ok_or_else(mismatch)?)
            }
            (PrimitiveType::Float, JsonValue::Number(n)) => {
                Datum::float(n.as_f64().ok_or_else(mismatch)? as f32)
            }
            (PrimitiveType::Double, JsonValue::Number(n)) => {
                Datum::double(n.as_f64().ok_or_else(mismatch)?)
            }
            (PrimitiveType::Decimal { precision, scale }, JsonValue::String(s)) => {
                Datum::decimal(parse_decimal(s, *scale)?, *precision, *scale)?
            }
            (PrimitiveType::Decimal { precision, scale }, JsonValue::Number(n)) => {
                Datum::decimal(parse_decimal(&n.to_string(), *scale)?, *precision, *scale)?
            }
            (PrimitiveType::Date, JsonValue::String(s)) => {
                let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| mismatch())?;
                Datum::date(days_from_date(date))
            }
            (PrimitiveType::Date, JsonValue::Number(n)) => {
                let v = n.as_i64().ok_or_else(mismatch)?;
                Datum::date(i32::try_from(v).map_err(|_| mismatch())?)
            }
            (PrimitiveType::Time, JsonValue::String(s)) => {
                let time = NaiveTime::parse_from_str(s, "%H:%M:%S%.f").map_err(|_| mismatch())?;
                Datum::time_micros(
                    i64::from(time.num_seconds_from_midnight()) * MICROS_PER_SECOND
                        + i64::from(time.nanosecond() / 1_000),
                )
            }
            (PrimitiveType::Timestamp, JsonValue::String(s)) => {
                let ts = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .map_err(|_| mismatch())?;
                Datum::timestamp_micros(ts.and_utc().timestamp_micros())
            }
            (PrimitiveType::Timestamptz, JsonValue::String(s)) => {
                let ts = DateTime::parse_from_rfc3339(s).map_err(|_| mismatch())?;
                Datum::timestamptz_micros(ts.timestamp_micros())
            }
            (
                PrimitiveType::Time | PrimitiveType::Timestamp | PrimitiveType::Timestamptz,
                JsonValue::Number(n),
            ) => Datum {
                ty: *ty,
                literal: PrimitiveLiteral::Long(n.as_i64().ok_or_else(mismatch)?),
            },
            (PrimitiveType::String, JsonValue::String(s)) => Datum::string(s.clone()),
            (PrimitiveType::Uuid, JsonValue::String(s)) => {
                Datum::uuid(Uuid::parse_str(s).map_err(|_| mismatch())?)
            }
            (PrimitiveType::Fixed(len), JsonValue::String(s)) => {
                let bytes = decode_hex(s).ok_or_else(mismatch)?;
                if bytes.len() as u64 != *len {
                    return Err(mismatch());
                }
                Datum::fixed(bytes)
            }
            (PrimitiveType::Binary, JsonValue::String(s)) => {
                Datum::binary(decode_hex(s).ok_or_else(mismatch)?)
            }
            _ => return Err(mismatch()),
        };
        Ok(datum)
    }

    /// Encodes this datum in the JSON single-value form
    pub fn to_json(&self) -> JsonValue {
        match (&self.ty, &self.literal) {
            (_, PrimitiveLiteral::Boolean(v)) => JsonValue::Bool(*v),
            (PrimitiveType::Date, PrimitiveLiteral::Int(days)) => match date_from_days(*days) {
                Some(date) => JsonValue::String(date.format("%Y-%m-%d").to_string()),
                None => JsonValue::from(*days),
            },
            (_, PrimitiveLiteral::Int(v)) => JsonValue::from(*v),
            (PrimitiveType::Time, PrimitiveLiteral::Long(micros)) => {
                match time_from_micros(*micros) {
                    Some(time) => JsonValue::String(time.format("%H:%M:%S%.6f").to_string()),
                    None => JsonValue::from(*micros),
                }
            }
            (PrimitiveType::Timestamp, PrimitiveLiteral::Long(micros)) => {
                match DateTime::from_timestamp_micros(*micros) {
                    Some(ts) => JsonValue::String(
                        ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
                    ),
                    None => JsonValue::from(*micros),
                }
            }
            (PrimitiveType::Timestamptz, PrimitiveLiteral::Long(micros)) => {
                match DateTime::from_timestamp_micros(*micros) {
                    Some(ts) => JsonValue::String(
                        ts.naive_utc()
                            .format("%Y-%m-%dT%H:%M:%S%.6f+00:00")
                            .to_string(),
                    ),
                    None => JsonValue::from(*micros),
                }
            }
            (_, PrimitiveLiteral::Long(v)) => JsonValue::from(*v),
            (_, PrimitiveLiteral::Float(v)) => JsonValue::from(f64::from(*v)),
            (_, PrimitiveLiteral::Double(v)) => JsonValue::from(*v),
            (PrimitiveType::Decimal { scale, .. }, PrimitiveLiteral::Decimal(v)) => {
                JsonValue::String(format_decimal(*v, *scale))
            }
            (_, PrimitiveLiteral::Decimal(v)) => JsonValue::String(v.to_string()),
            (_, PrimitiveLiteral::String(v)) => JsonValue::String(v.clone()),
            (_, PrimitiveLiteral::Uuid(v)) => JsonValue::String(v.to_string()),
            (_, PrimitiveLiteral::Binary(v)) => JsonValue::String(encode_hex(v)),
        }
    }

    /// Converts this datum to another type where the value is preserved
    ///
    /// Used to line up literals with column types (int to long, float to
    /// double, date to timestamp and so on).
    pub fn to(&self, target: &PrimitiveType) -> Result<Datum> {
        if &self.ty == target {
            return Ok(self.clone());
        }
        let fail = || Error::invalid_argument(format!("cannot convert {self} to {target}"));
        let literal = match (&self.literal, target) {
            (PrimitiveLiteral::Int(v), PrimitiveType::Long) if self.ty == PrimitiveType::Int => {
                PrimitiveLiteral::Long(i64::from(*v))
            }
            (PrimitiveLiteral::Long(v), PrimitiveType::Int) if self.ty == PrimitiveType::Long => {
                PrimitiveLiteral::Int(i32::try_from(*v).map_err(|_| fail())?)
            }
            (PrimitiveLiteral::Float(v), PrimitiveType::Double) => {
                PrimitiveLiteral::Double(f64::from(*v))
            }
            (PrimitiveLiteral::Double(v), PrimitiveType::Float) => {
                PrimitiveLiteral::Float(*v as f32)
            }
            (PrimitiveLiteral::Int(v), PrimitiveType::Date) if self.ty == PrimitiveType::Int => {
                PrimitiveLiteral::Int(*v)
            }
            (PrimitiveLiteral::Long(v), PrimitiveType::Timestamp | PrimitiveType::Timestamptz)
                if matches!(
                    self.ty,
                    PrimitiveType::Long | PrimitiveType::Timestamp | PrimitiveType::Timestamptz
                ) =>
            {
                PrimitiveLiteral::Long(*v)
            }
            (
                PrimitiveLiteral::Decimal(v),
                PrimitiveType::Decimal { precision, scale },
            ) => match self.ty {
                PrimitiveType::Decimal { scale: s, .. } if s == *scale => {
                    return Datum::decimal(*v, *precision, *scale);
                }
                _ => return Err(fail()),
            },
            (PrimitiveLiteral::Binary(v), PrimitiveType::Binary) => {
                PrimitiveLiteral::Binary(v.clone())
            }
            (PrimitiveLiteral::Binary(v), PrimitiveType::Fixed(len)) if v.len() as u64 == *len => {
                PrimitiveLiteral::Binary(v.clone())
            }
            _ => return Err(fail()),
        };
        Ok(Datum {
            ty: *target,
            literal,
        })
    }

    /// Integer value of an int or long datum
    pub(crate) fn as_i64(&self) -> Option<i64> {
        match self.literal {
            PrimitiveLiteral::Int(v) => Some(i64::from(v)),
            PrimitiveLiteral::Long(v) => Some(v),
            _ => None,
        }
    }

    /// String value of a string datum
    pub(crate) fn as_str(&self) -> Option<&str> {
        match &self.literal {
            PrimitiveLiteral::String(v) => Some(v),
            _ => None,
        }
    }

    /// Builds a datum of the same type around a new literal
    pub(crate) fn with_literal(ty: PrimitiveType, literal: PrimitiveLiteral) -> Datum {
        Datum { ty, literal }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            JsonValue::String(s) => write!(f, "'{s}'"),
            other => write!(f, "{other}"),
        }
    }
}

impl Serialize for Datum {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

fn bad_length(ty: &PrimitiveType, len: usize) -> Error {
    Error::invalid_argument(format!("invalid {len}-byte value for {ty}"))
}

fn fixed_bytes<const N: usize>(bytes: &[u8], ty: &PrimitiveType) -> Result<[u8; N]> {
    bytes.try_into().map_err(|_| bad_length(ty, bytes.len()))
}

pub(crate) fn days_from_date(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

pub(crate) fn date_from_days(days: i32) -> Option<NaiveDate> {
    days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

fn time_from_micros(micros: i64) -> Option<NaiveTime> {
    let secs = u32::try_from(micros.div_euclid(MICROS_PER_SECOND)).ok()?;
    let nanos = u32::try_from(micros.rem_euclid(MICROS_PER_SECOND) * 1_000).ok()?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
}

fn decimal_digits(unscaled: i128) -> u32 {
    let mut v = unscaled.unsigned_abs();
    let mut digits = 1;
    while v >= 10 {
        v /= 10;
        digits += 1;
    }
    digits
}

/// Minimal two's complement big-endian encoding
pub(crate) fn decimal_to_bytes(unscaled: i128) -> Vec<u8> {
    let bytes = unscaled.to_be_bytes();
    let mut start = 0;
    while start < bytes.len() - 1 {
        let (b, next) = (bytes[start], bytes[start + 1]);
        let redundant = (b == 0x00 && next & 0x80 == 0) || (b == 0xff && next & 0x80 != 0);
        if !redundant {
            break;
        }
        start += 1;
    }
    bytes[start..].to_vec()
}

pub(crate) fn decimal_from_bytes(bytes: &[u8]) -> Result<i128> {
    if bytes.is_empty() || bytes.len() > 16 {
        return Err(Error::invalid_argument(format!(
            "invalid {}-byte decimal",
            bytes.len()
        )));
    }
    let fill = if bytes[0] & 0x80 != 0 { 0xff } else { 0x00 };
    let mut buf = [fill; 16];
    buf[16 - bytes.len()..].copy_from_slice(bytes);
    Ok(i128::from_be_bytes(buf))
}

fn parse_decimal(text: &str, scale: u32) -> Result<i128> {
    let invalid = || Error::invalid_argument(format!("invalid decimal literal '{text}'"));
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, f),
        None => (digits, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if frac_part.len() > scale as usize {
        return Err(invalid());
    }
    let padded = format!("{int_part}{frac_part:0<width$}", width = scale as usize);
    if !padded.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let value: i128 = padded.parse().map_err(|_| invalid())?;
    Ok(if negative { -value } else { value })
}

fn format_decimal(unscaled: i128, scale: u32) -> String {
    if scale == 0 {
        return unscaled.to_string();
    }
    let sign = if unscaled < 0 { "-" } else { "" };
    let digits = format!(
        "{:0>width$}",
        unscaled.unsigned_abs(),
        width = scale as usize + 1
    );
    let (int_part, frac_part) = digits.split_at(digits.len() - scale as usize);
    format!("{sign}{int_part}.{frac_part}")
}

fn encode_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}
