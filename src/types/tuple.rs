//! 定长元组的复合编码
//!
//! 不想为临时的组合值定义新类型时，可以把几个字段拼进一个 bulk：
//!
//! ```
//! use redmap::types::{BulkType, ByteString, Integer, Tuple3};
//!
//! let point = Tuple3(Integer, ByteString, Integer);
//! let encoded = point.encode(&(123, b"abc\ndef".to_vec(), 456)).unwrap();
//! assert_eq!(encoded, b"3,7,3\n123\nabc\ndef\n456");
//! ```
//!
//! 编码结果由一个头部行和各字段组成：头部是逗号分隔的各字段编码后
//! 字节长度，之后每个字段占自己声明的长度、以换行分隔。字段内容里的
//! 换行不影响解码，长度是权威。

use crate::errors::{RedmapError, Result};
use crate::types::BulkType;

/// 两个字段的复合类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tuple2<A, B>(pub A, pub B);

/// 三个字段的复合类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tuple3<A, B, C>(pub A, pub B, pub C);

impl<A, B> BulkType for Tuple2<A, B>
where
    A: BulkType,
    B: BulkType,
{
    type Value = (A::Value, B::Value);

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        encode_fields(&[self.0.encode(&value.0)?, self.1.encode(&value.1)?])
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let fields = decode_fields(bulk, 2)?;
        Ok((self.0.decode(fields[0])?, self.1.decode(fields[1])?))
    }
}

impl<A, B, C> BulkType for Tuple3<A, B, C>
where
    A: BulkType,
    B: BulkType,
    C: BulkType,
{
    type Value = (A::Value, B::Value, C::Value);

    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>> {
        encode_fields(&[
            self.0.encode(&value.0)?,
            self.1.encode(&value.1)?,
            self.2.encode(&value.2)?,
        ])
    }

    fn decode(&self, bulk: &[u8]) -> Result<Self::Value> {
        let fields = decode_fields(bulk, 3)?;
        Ok((
            self.0.decode(fields[0])?,
            self.1.decode(fields[1])?,
            self.2.decode(fields[2])?,
        ))
    }
}

#[async_trait::async_trait]
impl<A, B> crate::types::ValueType for Tuple2<A, B>
where
    A: BulkType,
    B: BulkType,
{
    type Input = (A::Value, B::Value);
    type Stored = Option<(A::Value, B::Value)>;

    async fn load(
        &self,
        session: &crate::session::Session,
        key: &str,
    ) -> Result<Self::Stored> {
        crate::types::load_bulk(self, session, key).await
    }

    async fn save(
        &self,
        session: &crate::session::Session,
        key: &str,
        value: Self::Input,
    ) -> Result<Self::Stored> {
        crate::types::save_bulk(self, session, key, value).await
    }
}

#[async_trait::async_trait]
impl<A, B, C> crate::types::ValueType for Tuple3<A, B, C>
where
    A: BulkType,
    B: BulkType,
    C: BulkType,
{
    type Input = (A::Value, B::Value, C::Value);
    type Stored = Option<(A::Value, B::Value, C::Value)>;

    async fn load(
        &self,
        session: &crate::session::Session,
        key: &str,
    ) -> Result<Self::Stored> {
        crate::types::load_bulk(self, session, key).await
    }

    async fn save(
        &self,
        session: &crate::session::Session,
        key: &str,
        value: Self::Input,
    ) -> Result<Self::Stored> {
        crate::types::save_bulk(self, session, key, value).await
    }
}

fn encode_fields(fields: &[Vec<u8>]) -> Result<Vec<u8>> {
    let header = fields
        .iter()
        .map(|f| f.len().to_string())
        .collect::<Vec<_>>()
        .join(",");
    let mut out = header.into_bytes();
    for field in fields {
        out.push(b'\n');
        out.extend_from_slice(field);
    }
    Ok(out)
}

fn decode_fields(bulk: &[u8], expected: usize) -> Result<Vec<&[u8]>> {
    let header_end = bulk
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| RedmapError::decoding("tuple bulk is missing its size header"))?;
    let header = std::str::from_utf8(&bulk[..header_end])?;
    let sizes = header
        .split(',')
        .map(|s| s.parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| RedmapError::decoding(format!("malformed tuple header {:?}: {}", header, e)))?;
    if sizes.len() != expected {
        return Err(RedmapError::decoding(format!(
            "expected {} tuple fields, header declares {}",
            expected,
            sizes.len()
        )));
    }
    let mut fields = Vec::with_capacity(expected);
    let mut pos = header_end + 1;
    for size in sizes {
        if pos > bulk.len() || size > bulk.len() - pos {
            return Err(RedmapError::decoding("tuple bulk shorter than its header"));
        }
        fields.push(&bulk[pos..pos + size]);
        pos += size + 1;
    }
    Ok(fields)
}
