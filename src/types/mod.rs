//! Rust 值与 Redis 类型之间的转换
//!
//! Redis 中的所有数据都是字节串（bulk）。为了存取更丰富的值，这里
//! 分两层做编解码：
//!
//! - [`BulkType`]：单个 bulk 与 Rust 值之间的编解码器，例如
//!   [`Integer`] 把 `i64` 编码成十进制字符串 `"42"`。实现了
//!   [`BulkType`] 的类型既能直接存到键上，也能作为集合的元素类型。
//! - [`ValueType`]：知道用哪些命令把整个值写入/读出某个键。标量用
//!   `GET`/`SET`；[`SetOf`]、[`ListOf`]、[`HashOf`]、[`SortedSetOf`]
//!   这些容器描述符在加载时构造集合句柄，保存时原子地整体替换键。

mod containers;
mod json;
mod scalars;
mod temporal;
mod tuple;

pub use containers::{HashOf, ListOf, SetOf, SortedSetOf};
pub use json::Json;
pub use scalars::{Boolean, ByteString, Integer, UnicodeString};
pub use temporal::{Date, DateTime, Time, TimeDelta, TzDateTime};
pub use tuple::{Tuple2, Tuple3};

use async_trait::async_trait;

use crate::errors::Result;
use crate::session::Session;

/// 单个 Redis bulk 与 Rust 值之间的编解码器
///
/// 编码结果必须能被 `decode` 还原。解码失败（格式损坏、非法 UTF-8
/// 等）返回 [`crate::RedmapError::Decoding`]，绝不 panic。
pub trait BulkType: Send + Sync {
    type Value: Send + Sync;

    /// 把 Rust 值编码成 Redis bulk
    fn encode(&self, value: &Self::Value) -> Result<Vec<u8>>;

    /// 把 Redis bulk 解码成 Rust 值
    fn decode(&self, bulk: &[u8]) -> Result<Self::Value>;
}

/// 知道如何把整个值保存到 Redis 键、从键加载的高层类型
#[async_trait]
pub trait ValueType: Send + Sync {
    /// 保存时接受的值
    type Input: Send;
    /// 加载/保存后返回的表示
    type Stored: Send;

    /// 从键加载值。`key` 是已加前缀的完整键。
    async fn load(&self, session: &Session, key: &str) -> Result<Self::Stored>;

    /// 把值存入键。`key` 是已加前缀的完整键。
    async fn save(&self, session: &Session, key: &str, value: Self::Input)
    -> Result<Self::Stored>;
}

/// GET 一个 bulk 键并解码；键不存在返回 `None`
pub(crate) async fn load_bulk<B: BulkType>(
    bulk_type: &B,
    session: &Session,
    key: &str,
) -> Result<Option<B::Value>> {
    let mut cmd = redis::cmd("GET");
    cmd.arg(key);
    let raw: Option<Vec<u8>> = session.run_query(&[key], cmd).await?;
    match raw {
        Some(bulk) => Ok(Some(bulk_type.decode(&bulk)?)),
        None => Ok(None),
    }
}

/// 编码后 SET 到键
pub(crate) async fn save_bulk<B: BulkType>(
    bulk_type: &B,
    session: &Session,
    key: &str,
    value: B::Value,
) -> Result<Option<B::Value>> {
    let encoded = bulk_type.encode(&value)?;
    let mut cmd = redis::cmd("SET");
    cmd.arg(key).arg(encoded);
    session.run_write(&[key], cmd).await?;
    Ok(Some(value))
}

/// 为标量 BulkType 生成 GET/SET 形式的 ValueType 实现
macro_rules! impl_value_type_for_bulk {
    ($($ty:ty),+ $(,)?) => {$(
        #[async_trait::async_trait]
        impl crate::types::ValueType for $ty {
            type Input = <$ty as crate::types::BulkType>::Value;
            type Stored = Option<<$ty as crate::types::BulkType>::Value>;

            async fn load(
                &self,
                session: &crate::session::Session,
                key: &str,
            ) -> crate::errors::Result<Self::Stored> {
                crate::types::load_bulk(self, session, key).await
            }

            async fn save(
                &self,
                session: &crate::session::Session,
                key: &str,
                value: Self::Input,
            ) -> crate::errors::Result<Self::Stored> {
                crate::types::save_bulk(self, session, key, value).await
            }
        }
    )+};
}

pub(crate) use impl_value_type_for_bulk;
