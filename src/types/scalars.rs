use crate::errors::Result;
use crate::types::{BulkType, impl_value_type_for_bulk};

/// 原样存储的字节串
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ByteString;

impl BulkType for ByteString {
    type Value = Vec<u8>;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value.clone())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        Ok(bulk.to_vec())
    }
}

/// UTF-8 编码的字符串；解码时校验 UTF-8
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnicodeString;

impl BulkType for UnicodeString {
    type Value = String;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value.clone().into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        Ok(std::str::from_utf8(bulk)?.to_string())
    }
}

/// 以十进制字符串存储的整数
///
/// 不用二进制存储是为了保持 INCR / INCRBY / DECR / DECRBY 这些命令
/// 仍然可以直接对键做加减。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Integer;

impl BulkType for Integer {
    type Value = i64;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Ok(value.to_string().into_bytes())
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let text = std::str::from_utf8(bulk)?;
        Ok(text.trim().parse::<i64>()?)
    }
}

/// 以 `"1"` / `"0"` 存储的布尔值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boolean;

impl BulkType for Boolean {
    type Value = bool;

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        Integer.encode(&i64::from(*value))
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        Ok(Integer.decode(bulk)? != 0)
    }
}

impl_value_type_for_bulk!(ByteString, UnicodeString, Integer, Boolean);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RedmapError;

    #[test]
    fn test_byte_string_round_trip() {
        let raw = b"annyeong".to_vec();
        assert_eq!(ByteString.encode(&raw).unwrap(), raw);
        assert_eq!(ByteString.decode(&raw).unwrap(), raw);
    }

    #[test]
    fn test_unicode_string_round_trip() {
        let text = "\u{c720}\u{b2c8}\u{cf54}\u{b4dc}".to_string();
        let encoded = UnicodeString.encode(&text).unwrap();
        assert_eq!(encoded, text.as_bytes());
        assert_eq!(UnicodeString.decode(&encoded).unwrap(), text);
    }

    #[test]
    fn test_unicode_string_rejects_invalid_utf8() {
        let err = UnicodeString.decode(&[0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, RedmapError::Decoding(_)));
    }

    #[test]
    fn test_integer_encodes_decimal() {
        assert_eq!(Integer.encode(&42).unwrap(), b"42");
        assert_eq!(Integer.decode(b"42").unwrap(), 42);
        assert_eq!(Integer.decode(b"-7").unwrap(), -7);
    }

    #[test]
    fn test_integer_rejects_garbage() {
        assert!(Integer.decode(b"forty-two").is_err());
    }

    #[test]
    fn test_boolean_encodes_as_digit() {
        assert_eq!(Boolean.encode(&true).unwrap(), b"1");
        assert_eq!(Boolean.encode(&false).unwrap(), b"0");
        assert!(Boolean.decode(b"1").unwrap());
        assert!(!Boolean.decode(b"0").unwrap());
        // 非零整数一律视为 true
        assert!(Boolean.decode(b"2").unwrap());
    }
}
