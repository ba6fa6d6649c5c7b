//! Redis hash 值的 Rust 侧表示
//!
//! 命令映射：
//!
//! | Redis 命令 | [`Hash`] 方法 |
//! |------------|---------------|
//! | `DEL`      | `clear` |
//! | `HDEL`     | `remove` |
//! | `HEXISTS`  | `contains_key` |
//! | `HGET`     | `get` |
//! | `HGETALL`  | `items` |
//! | `HKEYS`    | `keys` |
//! | `HLEN`     | `len` |
//! | `HSET`     | `insert`、`update` |
//! | `HSETNX`   | `set_default` |
//! | `HVALS`    | `values` |

use redis::Cmd;

use crate::collections::decode_all;
use crate::errors::{RedmapError, Result};
use crate::session::Session;
use crate::types::BulkType;

/// 绑定到 Redis 键的哈希句柄，字段和值各有自己的元素类型
pub struct Hash<K: BulkType, V: BulkType> {
    session: Session,
    key: String,
    key_type: K,
    value_type: V,
}

impl<K: BulkType, V: BulkType> Hash<K, V> {
    /// 在会话上绑定逻辑键，构造句柄。不发任何命令。
    pub fn new(session: &Session, key: &str, key_type: K, value_type: V) -> Self {
        let full_key = session.make_key(key);
        Self::attach(session.clone(), full_key, key_type, value_type)
    }

    pub(crate) fn attach(session: Session, key: String, key_type: K, value_type: V) -> Self {
        Self {
            session,
            key,
            key_type,
            value_type,
        }
    }

    /// 完整（已加前缀）的键名
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 字段数量（HLEN）
    pub async fn len(&self) -> Result<u64> {
        self.session
            .run_query(&[self.key.as_str()], key_cmd("HLEN", &self.key))
            .await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// 字段是否存在（HEXISTS）
    pub async fn contains_key(&self, field: &K::Value) -> Result<bool> {
        let encoded = self.key_type.encode(field)?;
        let mut cmd = key_cmd("HEXISTS", &self.key);
        cmd.arg(encoded);
        self.session.run_query(&[self.key.as_str()], cmd).await
    }

    /// 取字段的值（HGET）；字段不存在返回 `None`
    pub async fn get(&self, field: &K::Value) -> Result<Option<V::Value>> {
        let encoded = self.key_type.encode(field)?;
        let mut cmd = key_cmd("HGET", &self.key);
        cmd.arg(encoded);
        let raw: Option<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        match raw {
            Some(bulk) => Ok(Some(self.value_type.decode(&bulk)?)),
            None => Ok(None),
        }
    }

    /// 写入字段（HSET）
    pub async fn insert(&self, field: &K::Value, value: &V::Value) -> Result<()> {
        let encoded_field = self.key_type.encode(field)?;
        let encoded_value = self.value_type.encode(value)?;
        let mut cmd = key_cmd("HSET", &self.key);
        cmd.arg(encoded_field).arg(encoded_value);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 删除字段（HDEL）；字段不存在返回 [`RedmapError::FieldNotFound`]
    pub async fn remove(&self, field: &K::Value) -> Result<()> {
        let encoded = self.key_type.encode(field)?;
        if self.session.in_transaction().await {
            // 事务中 HDEL 的回复要到 EXEC 才可见，先在查询阶段确认存在
            let mut probe = key_cmd("HEXISTS", &self.key);
            probe.arg(encoded.as_slice());
            let exists: bool = self.session.run_query(&[self.key.as_str()], probe).await?;
            if !exists {
                return Err(RedmapError::field_not_found(
                    "no such field in the hash to remove",
                ));
            }
            let mut cmd = key_cmd("HDEL", &self.key);
            cmd.arg(encoded);
            self.session.run_write(&[self.key.as_str()], cmd).await
        } else {
            let mut cmd = key_cmd("HDEL", &self.key);
            cmd.arg(encoded);
            let removed: i64 = self.session.run_write_reply(cmd).await?;
            if removed == 0 {
                return Err(RedmapError::field_not_found(
                    "no such field in the hash to remove",
                ));
            }
            Ok(())
        }
    }

    /// 所有字段名（HKEYS）。没有任何顺序保证。
    pub async fn keys(&self) -> Result<Vec<K::Value>> {
        let raw: Vec<Vec<u8>> = self
            .session
            .run_query(&[self.key.as_str()], key_cmd("HKEYS", &self.key))
            .await?;
        decode_all(&self.key_type, raw)
    }

    /// 所有字段值（HVALS）。没有任何顺序保证。
    pub async fn values(&self) -> Result<Vec<V::Value>> {
        let raw: Vec<Vec<u8>> = self
            .session
            .run_query(&[self.key.as_str()], key_cmd("HVALS", &self.key))
            .await?;
        decode_all(&self.value_type, raw)
    }

    /// 所有 `(字段, 值)` 对（HGETALL）。没有任何顺序保证。
    pub async fn items(&self) -> Result<Vec<(K::Value, V::Value)>> {
        let raw: Vec<(Vec<u8>, Vec<u8>)> = self
            .session
            .run_query(&[self.key.as_str()], key_cmd("HGETALL", &self.key))
            .await?;
        raw.iter()
            .map(|(field, value)| {
                Ok((self.key_type.decode(field)?, self.value_type.decode(value)?))
            })
            .collect()
    }

    /// 批量写入字段（多字段 HSET）
    pub async fn update(&self, pairs: &[(K::Value, V::Value)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut cmd = key_cmd("HSET", &self.key);
        for (field, value) in pairs {
            cmd.arg(self.key_type.encode(field)?);
            cmd.arg(self.value_type.encode(value)?);
        }
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 字段不存在时写入 `default` 并返回它，存在时返回当前值
    ///
    /// 整个检查加写入在（并入的）事务里原子执行。
    pub async fn set_default(&self, field: &K::Value, default: &V::Value) -> Result<V::Value>
    where
        V::Value: Clone,
    {
        let encoded_field = self.key_type.encode(field)?;
        let encoded_default = self.value_type.encode(default)?;
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let encoded_field_ref = &encoded_field;
        let encoded_default_ref = &encoded_default;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut probe = key_cmd("HGET", &self.key);
                probe.arg(encoded_field_ref.as_slice());
                let raw: Option<Vec<u8>> =
                    self.session.run_query(&[self.key.as_str()], probe).await?;
                if let Some(bulk) = raw {
                    return self.value_type.decode(&bulk);
                }
                let mut cmd = key_cmd("HSETNX", &self.key);
                cmd.arg(encoded_field_ref.as_slice())
                    .arg(encoded_default_ref.as_slice());
                self.session.run_write(&[self.key.as_str()], cmd).await?;
                Ok(default.clone())
            })
            .await
    }

    /// 清空哈希（DEL 键）
    pub async fn clear(&self) -> Result<()> {
        self.session
            .run_write(&[self.key.as_str()], key_cmd("DEL", &self.key))
            .await
    }
}

fn key_cmd(name: &str, key: &str) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}
