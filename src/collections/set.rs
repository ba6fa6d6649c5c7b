//! Redis set 值的 Rust 侧表示
//!
//! 命令映射：
//!
//! | Redis 命令    | [`Set`] 方法 |
//! |---------------|--------------|
//! | `DEL`         | `clear` |
//! | `SADD`        | `add`、`insert_all`、`update` |
//! | `SCARD`       | `len` |
//! | `SDIFF`       | `difference`、`is_subset`、`same_as` |
//! | `SDIFFSTORE`  | `difference_update` |
//! | `SINTER`      | `intersection`、`is_disjoint` |
//! | `SINTERSTORE` | `intersection_update` |
//! | `SISMEMBER`   | `contains` |
//! | `SMEMBERS`    | `members` |
//! | `SPOP`        | `pop` |
//! | `SREM`        | `discard`、`remove`、`remove_all` |
//! | `SUNION`      | `union`、`symmetric_difference` |
//! | `SUNIONSTORE` | `update`、`symmetric_difference_update` |

use std::collections::HashSet;
use std::hash::Hash as StdHash;

use redis::Cmd;
use tracing::trace;

use crate::collections::decode_all;
use crate::errors::{RedmapError, Result};
use crate::session::Session;
use crate::types::BulkType;

/// 绑定到 Redis 键的集合句柄
pub struct Set<T: BulkType> {
    session: Session,
    key: String,
    value_type: T,
}

impl<T: BulkType> Set<T> {
    /// 在会话上绑定逻辑键，构造句柄。不发任何命令。
    pub fn new(session: &Session, key: &str, value_type: T) -> Self {
        let full_key = session.make_key(key);
        Self::attach(session.clone(), full_key, value_type)
    }

    pub(crate) fn attach(session: Session, key: String, value_type: T) -> Self {
        Self {
            session,
            key,
            value_type,
        }
    }

    /// 完整（已加前缀）的键名
    pub fn key(&self) -> &str {
        &self.key
    }

    /// 集合基数（SCARD）
    pub async fn len(&self) -> Result<u64> {
        self.session
            .run_query(&[self.key.as_str()], key_cmd("SCARD", &self.key))
            .await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// 成员测试（SISMEMBER）
    pub async fn contains(&self, member: &T::Value) -> Result<bool> {
        let encoded = self.value_type.encode(member)?;
        let mut cmd = key_cmd("SISMEMBER", &self.key);
        cmd.arg(encoded);
        self.session.run_query(&[self.key.as_str()], cmd).await
    }

    /// 所有成员（SMEMBERS）。没有任何顺序保证。
    pub async fn members(&self) -> Result<Vec<T::Value>> {
        let raw: Vec<Vec<u8>> = self
            .session
            .run_query(&[self.key.as_str()], key_cmd("SMEMBERS", &self.key))
            .await?;
        decode_all(&self.value_type, raw)
    }

    /// 添加成员，已存在则无效果（SADD）
    pub async fn add(&self, member: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(member)?;
        let mut cmd = key_cmd("SADD", &self.key);
        cmd.arg(encoded);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 批量添加成员（多参数 SADD）
    pub async fn insert_all(&self, members: &[T::Value]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut cmd = key_cmd("SADD", &self.key);
        for member in members {
            cmd.arg(self.value_type.encode(member)?);
        }
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 移除成员，不存在则无效果（SREM）
    pub async fn discard(&self, member: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(member)?;
        let mut cmd = key_cmd("SREM", &self.key);
        cmd.arg(encoded);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 移除成员，不存在时返回 [`RedmapError::MemberNotFound`]
    pub async fn remove(&self, member: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(member)?;
        if self.session.in_transaction().await {
            // 事务中 SREM 的回复要到 EXEC 才可见，先在查询阶段确认存在
            let mut probe = key_cmd("SISMEMBER", &self.key);
            probe.arg(encoded.as_slice());
            let exists: bool = self.session.run_query(&[self.key.as_str()], probe).await?;
            if !exists {
                return Err(RedmapError::member_not_found(
                    "no such member in the set to remove",
                ));
            }
            let mut cmd = key_cmd("SREM", &self.key);
            cmd.arg(encoded);
            self.session.run_write(&[self.key.as_str()], cmd).await
        } else {
            let mut cmd = key_cmd("SREM", &self.key);
            cmd.arg(encoded);
            let removed: i64 = self.session.run_write_reply(cmd).await?;
            if removed == 0 {
                return Err(RedmapError::member_not_found(
                    "no such member in the set to remove",
                ));
            }
            Ok(())
        }
    }

    /// 移除并返回任意成员（SPOP）；空集合是 [`RedmapError::MemberNotFound`]
    pub async fn pop(&self) -> Result<T::Value> {
        if self.session.in_transaction().await {
            // 事务中拆成 SRANDMEMBER 查询 + 排队的 SREM
            let raw: Option<Vec<u8>> = self
                .session
                .run_query(&[self.key.as_str()], key_cmd("SRANDMEMBER", &self.key))
                .await?;
            let Some(raw) = raw else {
                return Err(RedmapError::member_not_found("pop from an empty set"));
            };
            let value = self.value_type.decode(&raw)?;
            let mut cmd = key_cmd("SREM", &self.key);
            cmd.arg(raw);
            self.session.run_write(&[self.key.as_str()], cmd).await?;
            Ok(value)
        } else {
            let raw: Option<Vec<u8>> = self
                .session
                .run_write_reply(key_cmd("SPOP", &self.key))
                .await?;
            let Some(raw) = raw else {
                return Err(RedmapError::member_not_found("pop from an empty set"));
            };
            self.value_type.decode(&raw)
        }
    }

    /// 清空集合（DEL 键）
    pub async fn clear(&self) -> Result<()> {
        self.session
            .run_write(&[self.key.as_str()], key_cmd("DEL", &self.key))
            .await
    }
}

impl<T> Set<T>
where
    T: BulkType,
    T::Value: Eq + StdHash,
{
    /// 差集（SDIFF）：在本集合而不在 `others` 里的成员
    pub async fn difference(&self, others: &[&Set<T>]) -> Result<HashSet<T::Value>> {
        let mut cmd = key_cmd("SDIFF", &self.key);
        for other in others {
            cmd.arg(&other.key);
        }
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        self.decode_into_set(raw)
    }

    /// 交集（SINTER）
    pub async fn intersection(&self, others: &[&Set<T>]) -> Result<HashSet<T::Value>> {
        let mut cmd = key_cmd("SINTER", &self.key);
        for other in others {
            cmd.arg(&other.key);
        }
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        self.decode_into_set(raw)
    }

    /// 并集（SUNION）
    pub async fn union(&self, others: &[&Set<T>]) -> Result<HashSet<T::Value>> {
        let mut cmd = key_cmd("SUNION", &self.key);
        for other in others {
            cmd.arg(&other.key);
        }
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        self.decode_into_set(raw)
    }

    /// 对称差：SUNION 和 SINTER 各取一次，再在客户端相减
    pub async fn symmetric_difference(&self, other: &Set<T>) -> Result<HashSet<T::Value>> {
        let mut union_cmd = key_cmd("SUNION", &self.key);
        union_cmd.arg(&other.key);
        let union: Vec<Vec<u8>> = self
            .session
            .run_query(&[self.key.as_str()], union_cmd)
            .await?;
        let mut inter_cmd = key_cmd("SINTER", &self.key);
        inter_cmd.arg(&other.key);
        let inter: Vec<Vec<u8>> = self
            .session
            .run_query(&[self.key.as_str()], inter_cmd)
            .await?;
        let inter: HashSet<Vec<u8>> = inter.into_iter().collect();
        let mut out = HashSet::new();
        for raw in union {
            if !inter.contains(&raw) {
                out.insert(self.value_type.decode(&raw)?);
            }
        }
        Ok(out)
    }

    /// 是否为 `other` 的子集
    ///
    /// 先 SDIFF：有任何成员多出来就直接是 false；否则比较自身基数和
    /// SINTER 的基数。
    pub async fn is_subset(&self, other: &Set<T>) -> Result<bool> {
        if !self.raw_difference_is_empty(other).await? {
            return Ok(false);
        }
        let card = self.len().await?;
        Ok(card == self.raw_intersection_len(other).await?)
    }

    /// 是否为 `other` 的真子集（相等时为 false）
    pub async fn is_proper_subset(&self, other: &Set<T>) -> Result<bool> {
        if !self.raw_difference_is_empty(other).await? {
            return Ok(false);
        }
        let card = self.len().await?;
        if card != self.raw_intersection_len(other).await? {
            return Ok(false);
        }
        Ok(card < other.len().await?)
    }

    /// 是否为 `other` 的超集
    pub async fn is_superset(&self, other: &Set<T>) -> Result<bool> {
        other.is_subset(self).await
    }

    /// 是否为 `other` 的真超集
    pub async fn is_proper_superset(&self, other: &Set<T>) -> Result<bool> {
        other.is_proper_subset(self).await
    }

    /// 两个集合是否没有公共成员（SINTER 为空）
    pub async fn is_disjoint(&self, other: &Set<T>) -> Result<bool> {
        Ok(self.raw_intersection_len(other).await? == 0)
    }

    /// 两个集合内容是否相同（双向 SDIFF 都为空）
    pub async fn same_as(&self, other: &Set<T>) -> Result<bool> {
        if self.len().await? == 0 {
            return Ok(other.len().await? == 0);
        }
        if !self.raw_difference_is_empty(other).await? {
            return Ok(false);
        }
        Ok(other.raw_difference_is_empty(self).await?)
    }

    /// 用与 `others` 的并集更新本集合（SUNIONSTORE）
    pub async fn update(&self, others: &[&Set<T>]) -> Result<()> {
        if others.is_empty() {
            return Ok(());
        }
        let keys = self.keys_with(others);
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut cmd = key_cmd("SUNIONSTORE", &self.key);
                cmd.arg(&self.key);
                for other_key in keys_ref.iter().skip(1) {
                    cmd.arg(other_key);
                }
                self.session.run_write(&[self.key.as_str()], cmd).await
            })
            .await
    }

    /// 用与 `others` 的交集更新本集合（SINTERSTORE）
    pub async fn intersection_update(&self, others: &[&Set<T>]) -> Result<()> {
        if others.is_empty() {
            return Ok(());
        }
        let keys = self.keys_with(others);
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut cmd = key_cmd("SINTERSTORE", &self.key);
                cmd.arg(&self.key);
                for other_key in keys_ref.iter().skip(1) {
                    cmd.arg(other_key);
                }
                self.session.run_write(&[self.key.as_str()], cmd).await
            })
            .await
    }

    /// 只保留 `keep` 中出现的成员，其余 SREM 掉
    ///
    /// 这是对内存集合求交集的落地形式：先读出全部成员，再删掉不在
    /// `keep` 里的。整个过程在（并入的）事务里执行。
    pub async fn retain_only(&self, keep: &HashSet<T::Value>) -> Result<()> {
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let raw: Vec<Vec<u8>> = self
                    .session
                    .run_query(&[self.key.as_str()], key_cmd("SMEMBERS", &self.key))
                    .await?;
                let mut doomed: Vec<Vec<u8>> = Vec::new();
                for bulk in raw {
                    let value = self.value_type.decode(&bulk)?;
                    if !keep.contains(&value) {
                        doomed.push(bulk);
                    }
                }
                if doomed.is_empty() {
                    return Ok(());
                }
                trace!("retain_only removing {} members", doomed.len());
                let mut cmd = key_cmd("SREM", &self.key);
                for bulk in &doomed {
                    cmd.arg(bulk.as_slice());
                }
                self.session.run_write(&[self.key.as_str()], cmd).await
            })
            .await
    }

    /// 从本集合移除 `others` 的所有成员（SDIFFSTORE）
    pub async fn difference_update(&self, others: &[&Set<T>]) -> Result<()> {
        if others.is_empty() {
            return Ok(());
        }
        let keys = self.keys_with(others);
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut cmd = key_cmd("SDIFFSTORE", &self.key);
                cmd.arg(&self.key);
                for other_key in keys_ref.iter().skip(1) {
                    cmd.arg(other_key);
                }
                let key_refs: Vec<&str> = keys_ref.iter().map(String::as_str).collect();
                self.session.run_write(&key_refs, cmd).await
            })
            .await
    }

    /// 批量移除给定成员（多参数 SREM）
    pub async fn remove_all(&self, members: &[T::Value]) -> Result<()> {
        if members.is_empty() {
            return Ok(());
        }
        let mut cmd = key_cmd("SREM", &self.key);
        for member in members {
            cmd.arg(self.value_type.encode(member)?);
        }
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 就地求与 `other` 的对称差
    ///
    /// 一个事务块内：SINTER 取公共成员（查询），SUNIONSTORE 合并
    /// （提交），再 SREM 掉公共成员（提交）。
    pub async fn symmetric_difference_update(&self, other: &Set<T>) -> Result<()> {
        let keys = vec![self.key.clone(), other.key.clone()];
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut inter_cmd = key_cmd("SINTER", &self.key);
                inter_cmd.arg(&other.key);
                let inter: Vec<Vec<u8>> = self
                    .session
                    .run_query(&[self.key.as_str()], inter_cmd)
                    .await?;
                let mut union_cmd = key_cmd("SUNIONSTORE", &self.key);
                union_cmd.arg(&self.key).arg(&other.key);
                self.session
                    .run_write(&[self.key.as_str()], union_cmd)
                    .await?;
                if !inter.is_empty() {
                    let mut srem = key_cmd("SREM", &self.key);
                    for bulk in &inter {
                        srem.arg(bulk.as_slice());
                    }
                    self.session.run_write(&[self.key.as_str()], srem).await?;
                }
                Ok(())
            })
            .await
    }

    fn decode_into_set(&self, raw: Vec<Vec<u8>>) -> Result<HashSet<T::Value>> {
        raw.iter().map(|bulk| self.value_type.decode(bulk)).collect()
    }

    async fn raw_difference_is_empty(&self, other: &Set<T>) -> Result<bool> {
        let mut cmd = key_cmd("SDIFF", &self.key);
        cmd.arg(&other.key);
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        Ok(raw.is_empty())
    }

    async fn raw_intersection_len(&self, other: &Set<T>) -> Result<u64> {
        let mut cmd = key_cmd("SINTER", &self.key);
        cmd.arg(&other.key);
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        Ok(raw.len() as u64)
    }

    fn keys_with(&self, others: &[&Set<T>]) -> Vec<String> {
        let mut keys = Vec::with_capacity(others.len() + 1);
        keys.push(self.key.clone());
        keys.extend(others.iter().map(|o| o.key.clone()));
        keys
    }
}

fn key_cmd(name: &str, key: &str) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}
