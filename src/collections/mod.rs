//! 绑定到 Redis 键的集合句柄
//!
//! 每个句柄持有会话克隆、完整键名和元素类型，把集合操作翻译成对应
//! 的 Redis 命令。句柄本身不缓存数据，所有读写都落到服务端。

pub mod hash;
pub mod list;
pub mod set;
pub mod sorted_set;

pub use hash::Hash;
pub use list::List;
pub use set::Set;
pub use sorted_set::SortedSet;

use crate::errors::Result;
use crate::types::BulkType;

/// 批量解码命令回复里的 bulk 列表
pub(crate) fn decode_all<T: BulkType>(value_type: &T, raw: Vec<Vec<u8>>) -> Result<Vec<T::Value>> {
    raw.iter().map(|bulk| value_type.decode(bulk)).collect()
}
