//! Serde helpers for upstream payloads that mix JSON numbers and numeric strings.

use serde::de::{self, Deserializer, Visitor};
use std::fmt;

/// Deserializes a string or an integer into a decimal `String`.
///
/// Use with `#[serde(deserialize_with = "crate::serde_helpers::string_from_any")]`.
pub fn string_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrNumberVisitor;

    impl Visitor<'_> for StringOrNumberVisitor {
        type Value = String;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("string or integer")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(v.to_owned())
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v.to_string())
        }
    }

    deserializer.deserialize_any(StringOrNumberVisitor)
}

/// Deserializes a non-negative integer given either as a number or a decimal string.
pub fn u64_from_any<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    struct U64Visitor;

    impl Visitor<'_> for U64Visitor {
        type Value = u64;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("non-negative integer or decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u64::try_from(v).map_err(|_| E::custom(format!("negative value {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            v.trim()
                .parse::<u64>()
                .map_err(|e| E::custom(format!("invalid integer '{}': {}", v, e)))
        }
    }

    deserializer.deserialize_any(U64Visitor)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Sample {
        #[serde(deserialize_with = "super::string_from_any")]
        amount: String,
        #[serde(deserialize_with = "super::u64_from_any")]
        fee: u64,
    }

    #[test]
    fn accepts_numbers_and_strings() {
        let a: Sample = serde_json::from_str(r#"{"amount": 1000, "fee": "25"}"#).unwrap();
        assert_eq!(a.amount, "1000");
        assert_eq!(a.fee, 25);

        let b: Sample = serde_json::from_str(r#"{"amount": "1000", "fee": 25}"#).unwrap();
        assert_eq!(b.amount, "1000");
        assert_eq!(b.fee, 25);
    }

    #[test]
    fn rejects_negative_fee() {
        assert!(serde_json::from_str::<Sample>(r#"{"amount": "1", "fee": -1}"#).is_err());
    }
}
