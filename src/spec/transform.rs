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

//! Partition transforms
//!
//! Each transform maps a source column value to a partition value. The
//! functions here are the table-format definitions and must stay bit-exact:
//! other engines compute the same partition values for the same rows.
//!
//! | Transform     | Source types                            | Result  |
//! |---------------|-----------------------------------------|---------|
//! | `identity`    | any                                     | source  |
//! | `bucket[N]`   | int, long, decimal, date, time,         | int     |
//! |               | timestamp(tz), string, uuid, fixed, binary |      |
//! | `truncate[W]` | int, long, decimal, string, binary      | source  |
//! | `year`        | date, timestamp(tz)                     | int     |
//! | `month`       | date, timestamp(tz)                     | int     |
//! | `day`         | date, timestamp(tz)                     | date    |
//! | `hour`        | timestamp(tz)                           | int     |
//! | `void`        | any                                     | source  |

use crate::error::{Error, Result};
use crate::spec::datatypes::PrimitiveType;
use crate::spec::values::{Datum, PrimitiveLiteral, date_from_days, decimal_to_bytes};
use chrono::{DateTime, Datelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static BUCKET_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^bucket\[(?P<n>\d+)\]$").expect("valid bucket regex"));

static TRUNCATE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^truncate\[(?P<w>\d+)\]$").expect("valid truncate regex"));

const MICROS_PER_HOUR: i64 = 3_600_000_000;
const MICROS_PER_DAY: i64 = 86_400_000_000;

/// Partition transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Source value, unmodified
    Identity,
    /// Hash of the value, mod N
    Bucket(u32),
    /// Value truncated to width W
    Truncate(u32),
    /// Years since 1970
    Year,
    /// Months since 1970-01
    Month,
    /// Days since 1970-01-01
    Day,
    /// Hours since 1970-01-01 00:00
    Hour,
    /// Always null
    Void,
}

impl Transform {
    /// Type of the partition value produced from a source type
    pub fn result_type(&self, source: &PrimitiveType) -> Result<PrimitiveType> {
        use PrimitiveType as P;
        let supported = match self {
            Transform::Identity | Transform::Void => true,
            Transform::Bucket(_) => !matches!(source, P::Boolean | P::Float | P::Double),
            Transform::Truncate(_) => matches!(
                source,
                P::Int | P::Long | P::Decimal { .. } | P::String | P::Binary
            ),
            Transform::Year | Transform::Month | Transform::Day => {
                matches!(source, P::Date | P::Timestamp | P::Timestamptz)
            }
            Transform::Hour => matches!(source, P::Timestamp | P::Timestamptz),
        };
        if !supported {
            return Err(Error::metadata_corrupt(format!(
                "transform {self} cannot be applied to {source}"
            )));
        }
        Ok(match self {
            Transform::Identity | Transform::Truncate(_) | Transform::Void => *source,
            Transform::Bucket(_) | Transform::Year | Transform::Month | Transform::Hour => P::Int,
            Transform::Day => P::Date,
        })
    }

    /// Whether the transform keeps the source value unchanged
    pub fn is_identity(&self) -> bool {
        matches!(self, Transform::Identity)
    }

    /// Computes the partition value for a source value
    ///
    /// Returns `None` for `void`, which always produces null.
    pub fn apply(&self, value: &Datum) -> Result<Option<Datum>> {
        let unsupported =
            || Error::invalid_argument(format!("transform {self} cannot be applied to {value}"));
        let result = match self {
            Transform::Identity => value.clone(),
            Transform::Void => return Ok(None),
            Transform::Bucket(n) => {
                let n = i32::try_from(*n)
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| Error::invalid_argument(format!("invalid bucket count {n}")))?;
                let hash = bucket_hash(value).ok_or_else(unsupported)?;
                Datum::int((hash & i32::MAX) % n)
            }
            Transform::Truncate(width) => truncate(value, *width).ok_or_else(unsupported)?,
            Transform::Year => Datum::int(year_ordinal(value).ok_or_else(unsupported)?),
            Transform::Month => Datum::int(month_ordinal(value).ok_or_else(unsupported)?),
            Transform::Day => Datum::date(day_ordinal(value).ok_or_else(unsupported)?),
            Transform::Hour => Datum::int(hour_ordinal(value).ok_or_else(unsupported)?),
        };
        Ok(Some(result))
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::Identity => write!(f, "identity"),
            Transform::Bucket(n) => write!(f, "bucket[{n}]"),
            Transform::Truncate(w) => write!(f, "truncate[{w}]"),
            Transform::Year => write!(f, "year"),
            Transform::Month => write!(f, "month"),
            Transform::Day => write!(f, "day"),
            Transform::Hour => write!(f, "hour"),
            Transform::Void => write!(f, "void"),
        }
    }
}

impl FromStr for Transform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let transform = match s {
            "identity" => Transform::Identity,
            "year" => Transform::Year,
            "month" => Transform::Month,
            "day" => Transform::Day,
            "hour" => Transform::Hour,
            "void" => Transform::Void,
            other => {
                if let Some(caps) = BUCKET_REGEX.captures(other) {
                    Transform::Bucket(
                        caps["n"]
                            .parse()
                            .map_err(|e| format!("invalid bucket count: {e}"))?,
                    )
                } else if let Some(caps) = TRUNCATE_REGEX.captures(other) {
                    Transform::Truncate(
                        caps["w"]
                            .parse()
                            .map_err(|e| format!("invalid truncate width: {e}"))?,
                    )
                } else {
                    return Err(format!("unknown transform '{other}'"));
                }
            }
        };
        match transform {
            Transform::Bucket(0) | Transform::Truncate(0) => {
                Err(format!("transform '{s}' needs a positive parameter"))
            }
            Transform::Bucket(n) if i32::try_from(n).is_err() => {
                Err(format!("bucket count {n} exceeds {}", i32::MAX))
            }
            t => Ok(t),
        }
    }
}

impl Serialize for Transform {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Transform {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// 32-bit Murmur3 (x86 variant, seed 0) of the value's hash bytes
pub(crate) fn bucket_hash(value: &Datum) -> Option<i32> {
    let bytes = match value.literal() {
        // int-like values hash as 8-byte little-endian longs
        PrimitiveLiteral::Int(v) => i64::from(*v).to_le_bytes().to_vec(),
        PrimitiveLiteral::Long(v) => v.to_le_bytes().to_vec(),
        PrimitiveLiteral::Decimal(v) => decimal_to_bytes(*v),
        PrimitiveLiteral::String(v) => v.as_bytes().to_vec(),
        PrimitiveLiteral::Uuid(v) => v.as_bytes().to_vec(),
        PrimitiveLiteral::Binary(v) => v.clone(),
        PrimitiveLiteral::Boolean(_) | PrimitiveLiteral::Float(_) | PrimitiveLiteral::Double(_) => {
            return None;
        }
    };
    murmur3::murmur3_32(&mut bytes.as_slice(), 0)
        .ok()
        .map(|h| h as i32)
}

fn truncate(value: &Datum, width: u32) -> Option<Datum> {
    if width == 0 {
        return None;
    }
    let ty = *value.data_type();
    let literal = match value.literal() {
        PrimitiveLiteral::Int(v) if ty == PrimitiveType::Int => {
            let w = i32::try_from(width).ok()?;
            PrimitiveLiteral::Int(v.checked_sub(v.rem_euclid(w))?)
        }
        PrimitiveLiteral::Long(v) if ty == PrimitiveType::Long => {
            let w = i64::from(width);
            PrimitiveLiteral::Long(v.checked_sub(v.rem_euclid(w))?)
        }
        PrimitiveLiteral::Decimal(v) => {
            let w = i128::from(width);
            PrimitiveLiteral::Decimal(v.checked_sub(v.rem_euclid(w))?)
        }
        PrimitiveLiteral::String(v) => {
            PrimitiveLiteral::String(v.chars().take(width as usize).collect())
        }
        PrimitiveLiteral::Binary(v) if ty == PrimitiveType::Binary => {
            PrimitiveLiteral::Binary(v.iter().take(width as usize).copied().collect())
        }
        _ => return None,
    };
    Some(Datum::with_literal(ty, literal))
}

fn year_month(value: &Datum) -> Option<(i32, u32)> {
    match (value.data_type(), value.literal()) {
        (PrimitiveType::Date, PrimitiveLiteral::Int(days)) => {
            let date = date_from_days(*days)?;
            Some((date.year(), date.month0()))
        }
        (PrimitiveType::Timestamp | PrimitiveType::Timestamptz, PrimitiveLiteral::Long(micros)) => {
            let ts = DateTime::from_timestamp_micros(*micros)?;
            Some((ts.year(), ts.month0()))
        }
        _ => None,
    }
}

fn year_ordinal(value: &Datum) -> Option<i32> {
    year_month(value).map(|(year, _)| year - 1970)
}

fn month_ordinal(value: &Datum) -> Option<i32> {
    year_month(value).map(|(year, month0)| (year - 1970) * 12 + month0 as i32)
}

fn day_ordinal(value: &Datum) -> Option<i32> {
    match (value.data_type(), value.literal()) {
        (PrimitiveType::Date, PrimitiveLiteral::Int(days)) => Some(*days),
        (PrimitiveType::Timestamp | PrimitiveType::Timestamptz, PrimitiveLiteral::Long(micros)) => {
            i32::try_from(micros.div_euclid(MICROS_PER_DAY)).ok()
        }
        _ => None,
    }
}

fn hour_ordinal(value: &Datum) -> Option<i32> {
    match (value.data_type(), value.literal()) {
        (PrimitiveType::Timestamp | PrimitiveType::Timestamptz, PrimitiveLiteral::Long(micros)) => {
            i32::try_from(micros.div_euclid(MICROS_PER_HOUR)).ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_transform_strings() {
        for text in [
            "identity",
            "bucket[16]",
            "truncate[10]",
            "year",
            "month",
            "day",
            "hour",
            "void",
        ] {
            let t: Transform = text.parse().unwrap();
            assert_eq!(t.to_string(), text);
        }
        assert!("bucket[0]".parse::<Transform>().is_err());
        assert!("bucket[x]".parse::<Transform>().is_err());
        assert!("bucket[2147483647]".parse::<Transform>().is_ok());
        assert!("bucket[2147483648]".parse::<Transform>().is_err());
        assert!(Transform::Bucket(1 << 31).apply(&Datum::int(1)).is_err());
        assert!("zorder".parse::<Transform>().is_err());
    }

    #[test]
    fn test_bucket_hash_reference_values() {
        // Reference values from the table format's hashing appendix
        assert_eq!(bucket_hash(&Datum::int(34)), Some(2017239379));
        assert_eq!(bucket_hash(&Datum::long(34)), Some(2017239379));
        assert_eq!(
            bucket_hash(&Datum::decimal(1420, 4, 2).unwrap()),
            Some(-500754589)
        );
        assert_eq!(bucket_hash(&Datum::date(17486)), Some(-653330422));
        assert_eq!(bucket_hash(&Datum::string("iceberg")), Some(1210000089));
        let uuid = Uuid::parse_str("f79c3e09-677c-4bbd-a479-3f349cb785e7").unwrap();
        assert_eq!(bucket_hash(&Datum::uuid(uuid)), Some(1488055340));
        assert_eq!(
            bucket_hash(&Datum::binary(vec![0x00, 0x01, 0x02, 0x03])),
            Some(-188683207)
        );
        assert_eq!(bucket_hash(&Datum::double(1.0)), None);
    }

    #[test]
    fn test_bucket_apply() {
        let bucket = Transform::Bucket(16);
        let value = bucket.apply(&Datum::int(34)).unwrap().unwrap();
        assert_eq!(value, Datum::int(2017239379 % 16));
        assert!(bucket.apply(&Datum::bool(true)).is_err());
    }

    #[test]
    fn test_truncate() {
        let t = Transform::Truncate(10);
        assert_eq!(t.apply(&Datum::int(1)).unwrap(), Some(Datum::int(0)));
        assert_eq!(t.apply(&Datum::int(-1)).unwrap(), Some(Datum::int(-10)));
        assert_eq!(t.apply(&Datum::long(19)).unwrap(), Some(Datum::long(10)));
        assert_eq!(
            t.apply(&Datum::decimal(1065, 9, 2).unwrap()).unwrap(),
            Some(Datum::decimal(1060, 9, 2).unwrap())
        );
        let t = Transform::Truncate(3);
        assert_eq!(
            t.apply(&Datum::string("iceberg")).unwrap(),
            Some(Datum::string("ice"))
        );
        assert_eq!(
            t.apply(&Datum::string("ab")).unwrap(),
            Some(Datum::string("ab"))
        );
    }

    #[test]
    fn test_truncate_at_type_minimum() {
        let t = Transform::Truncate(10);
        assert!(t.apply(&Datum::int(i32::MIN)).is_err());
        assert!(t.apply(&Datum::long(i64::MIN)).is_err());
        assert_eq!(
            t.apply(&Datum::int(i32::MIN + 8)).unwrap(),
            Some(Datum::int(i32::MIN + 8))
        );
        assert_eq!(
            Transform::Truncate(1).apply(&Datum::int(i32::MIN)).unwrap(),
            Some(Datum::int(i32::MIN))
        );
    }

    #[test]
    fn test_time_transforms() {
        // 2017-11-16T22:31:08 UTC
        let ts = Datum::timestamp_micros(1_510_871_468_000_000);
        assert_eq!(Transform::Year.apply(&ts).unwrap(), Some(Datum::int(47)));
        assert_eq!(
            Transform::Month.apply(&ts).unwrap(),
            Some(Datum::int(47 * 12 + 10))
        );
        assert_eq!(
            Transform::Day.apply(&ts).unwrap(),
            Some(Datum::date(17486))
        );
        assert_eq!(
            Transform::Hour.apply(&ts).unwrap(),
            Some(Datum::int(17486 * 24 + 22))
        );

        let date = Datum::date(17486);
        assert_eq!(Transform::Year.apply(&date).unwrap(), Some(Datum::int(47)));
        assert!(Transform::Hour.apply(&date).is_err());

        // Pre-epoch values floor toward negative infinity
        let before_epoch = Datum::timestamp_micros(-1);
        assert_eq!(
            Transform::Day.apply(&before_epoch).unwrap(),
            Some(Datum::date(-1))
        );
        assert_eq!(
            Transform::Hour.apply(&before_epoch).unwrap(),
            Some(Datum::int(-1))
        );
    }

    #[test]
    fn test_result_types() {
        assert_eq!(
            Transform::Bucket(4).result_type(&PrimitiveType::String).unwrap(),
            PrimitiveType::Int
        );
        assert_eq!(
            Transform::Day.result_type(&PrimitiveType::Timestamp).unwrap(),
            PrimitiveType::Date
        );
        assert!(Transform::Bucket(4).result_type(&PrimitiveType::Double).is_err());
        assert!(Transform::Hour.result_type(&PrimitiveType::Date).is_err());
        assert_eq!(
            Transform::Void.apply(&Datum::int(1)).unwrap(),
            None,
            "void always yields null"
        );
    }
}
