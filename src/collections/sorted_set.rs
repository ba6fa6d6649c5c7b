//! Redis sorted set 值的 Rust 侧表示
//!
//! 行为上接近一个计数器集合：成员带分数，`add`/`discard` 做的是
//! 分数的增减而不是单纯的存在性翻转。
//!
//! 命令映射：
//!
//! | Redis 命令            | [`SortedSet`] 方法 |
//! |-----------------------|--------------------|
//! | `DEL`                 | `clear` |
//! | `ZADD`                | `set_score`、`set_default` |
//! | `ZCARD`               | `len` |
//! | `ZINCRBY`             | `add`、`discard`、`update_scores`、`update_members` |
//! | `ZRANGE`              | `members`、`items`、`least_common` |
//! | `ZRANGE WITHSCORES`   | `items`、`pop_item` |
//! | `ZREVRANGE`           | `most_common` |
//! | `ZREM`                | `remove`、`discard`、`pop_item`、`pop_member` |
//! | `ZSCORE`              | `score`、`contains` |
//! | `ZUNIONSTORE`         | `update_from` |

use redis::Cmd;

use crate::collections::decode_all;
use crate::errors::{RedmapError, Result};
use crate::session::Session;
use crate::types::BulkType;

/// 绑定到 Redis 键的有序集合句柄
pub struct SortedSet<T: BulkType> {
    session: Session,
    key: String,
    value_type: T,
}

impl<T: BulkType> SortedSet<T> {
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

    /// 集合基数（ZCARD）
    pub async fn len(&self) -> Result<u64> {
        self.session
            .run_query(&[self.key.as_str()], key_cmd("ZCARD", &self.key))
            .await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// 按分数升序列出所有成员（ZRANGE）
    pub async fn members(&self) -> Result<Vec<T::Value>> {
        let mut cmd = key_cmd("ZRANGE", &self.key);
        cmd.arg(0).arg(-1);
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        decode_all(&self.value_type, raw)
    }

    /// 成员的分数（ZSCORE）；不存在返回 `None`
    pub async fn score(&self, member: &T::Value) -> Result<Option<f64>> {
        let encoded = self.value_type.encode(member)?;
        let mut cmd = key_cmd("ZSCORE", &self.key);
        cmd.arg(encoded);
        self.session.run_query(&[self.key.as_str()], cmd).await
    }

    /// 成员测试（ZSCORE 非空）
    pub async fn contains(&self, member: &T::Value) -> Result<bool> {
        Ok(self.score(member).await?.is_some())
    }

    /// 设置成员分数，成员不存在则添加（ZADD）
    pub async fn set_score(&self, member: &T::Value, score: f64) -> Result<()> {
        let encoded = self.value_type.encode(member)?;
        let mut cmd = key_cmd("ZADD", &self.key);
        cmd.arg(score).arg(encoded);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 删除成员（ZREM）；不存在返回 [`RedmapError::MemberNotFound`]
    pub async fn remove(&self, member: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(member)?;
        if self.session.in_transaction().await {
            // 事务中 ZREM 的回复要到 EXEC 才可见，先用 ZSCORE 确认存在
            let mut probe = key_cmd("ZSCORE", &self.key);
            probe.arg(encoded.as_slice());
            let score: Option<f64> = self.session.run_query(&[self.key.as_str()], probe).await?;
            if score.is_none() {
                return Err(RedmapError::member_not_found(
                    "no such member in the sorted set to remove",
                ));
            }
            let mut cmd = key_cmd("ZREM", &self.key);
            cmd.arg(encoded);
            self.session.run_write(&[self.key.as_str()], cmd).await
        } else {
            let mut cmd = key_cmd("ZREM", &self.key);
            cmd.arg(encoded);
            let removed: i64 = self.session.run_write_reply(cmd).await?;
            if removed == 0 {
                return Err(RedmapError::member_not_found(
                    "no such member in the sorted set to remove",
                ));
            }
            Ok(())
        }
    }

    /// 添加成员或给已有成员加分（ZINCRBY）
    pub async fn add(&self, member: &T::Value, by: f64) -> Result<()> {
        let encoded = self.value_type.encode(member)?;
        let mut cmd = key_cmd("ZINCRBY", &self.key);
        cmd.arg(by).arg(encoded);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// [`SortedSet::add`] 的反操作：减分，降到 `floor` 及以下就删除
    ///
    /// `floor` 为 `None` 时只减分、永不删除（一条 ZINCRBY）。其他
    /// 情况在（并入的）事务里先 ZSCORE 再决定 ZINCRBY 还是 ZREM；
    /// 成员不存在则什么都不做。
    pub async fn discard(&self, member: &T::Value, by: f64, floor: Option<f64>) -> Result<()> {
        let Some(floor) = floor else {
            return self.add(member, -by).await;
        };
        let encoded = self.value_type.encode(member)?;
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let encoded_ref = &encoded;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut probe = key_cmd("ZSCORE", &self.key);
                probe.arg(encoded_ref.as_slice());
                let current: Option<f64> =
                    self.session.run_query(&[self.key.as_str()], probe).await?;
                let Some(current) = current else {
                    return Ok(());
                };
                if current - by > floor {
                    let mut cmd = key_cmd("ZINCRBY", &self.key);
                    cmd.arg(-by).arg(encoded_ref.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await
                } else {
                    let mut cmd = key_cmd("ZREM", &self.key);
                    cmd.arg(encoded_ref.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await
                }
            })
            .await
    }

    /// 成员存在时返回当前分数，否则以 `default` 分数添加并返回它
    pub async fn set_default(&self, member: &T::Value, default: f64) -> Result<f64> {
        let encoded = self.value_type.encode(member)?;
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let encoded_ref = &encoded;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut probe = key_cmd("ZSCORE", &self.key);
                probe.arg(encoded_ref.as_slice());
                let current: Option<f64> =
                    self.session.run_query(&[self.key.as_str()], probe).await?;
                if let Some(score) = current {
                    return Ok(score);
                }
                let mut cmd = key_cmd("ZADD", &self.key);
                cmd.arg(default).arg(encoded_ref.as_slice());
                self.session.run_write(&[self.key.as_str()], cmd).await?;
                Ok(default)
            })
            .await
    }

    /// 弹出分数最低（`desc` 为 true 时最高）的成员
    ///
    /// 返回成员和它提交前的分数。`floor` 为 `None` 或扣分后降到
    /// `floor` 及以下时直接 ZREM，否则只 ZINCRBY 减分。空集合返回
    /// [`RedmapError::MemberNotFound`]。
    pub async fn pop_item(
        &self,
        desc: bool,
        by: f64,
        floor: Option<f64>,
    ) -> Result<(T::Value, f64)> {
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let (raw, score) = self
            .session
            .join_transaction(keys_ref, |_trial| async move {
                let range = if desc { "ZREVRANGE" } else { "ZRANGE" };
                let mut head_cmd = key_cmd(range, &self.key);
                head_cmd.arg(0).arg(0).arg("WITHSCORES");
                let head: Vec<(Vec<u8>, f64)> = self
                    .session
                    .run_query(&[self.key.as_str()], head_cmd)
                    .await?;
                let Some((raw, score)) = head.into_iter().next() else {
                    return Err(RedmapError::member_not_found(
                        "pop from an empty sorted set",
                    ));
                };
                if floor.is_none() || score - by <= floor.unwrap_or(0.0) {
                    let mut cmd = key_cmd("ZREM", &self.key);
                    cmd.arg(raw.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await?;
                } else {
                    let mut cmd = key_cmd("ZINCRBY", &self.key);
                    cmd.arg(-by).arg(raw.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await?;
                }
                Ok((raw, score))
            })
            .await?;
        Ok((self.value_type.decode(&raw)?, score))
    }

    /// 弹出指定成员，返回它提交前的分数；成员不存在返回 `None`
    ///
    /// 扣分与删除的规则同 [`SortedSet::pop_item`]。
    pub async fn pop_member(
        &self,
        member: &T::Value,
        by: f64,
        floor: Option<f64>,
    ) -> Result<Option<f64>> {
        let encoded = self.value_type.encode(member)?;
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let encoded_ref = &encoded;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut probe = key_cmd("ZSCORE", &self.key);
                probe.arg(encoded_ref.as_slice());
                let current: Option<f64> =
                    self.session.run_query(&[self.key.as_str()], probe).await?;
                let Some(current) = current else {
                    return Ok(None);
                };
                if floor.is_none() || current - by <= floor.unwrap_or(0.0) {
                    let mut cmd = key_cmd("ZREM", &self.key);
                    cmd.arg(encoded_ref.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await?;
                } else {
                    let mut cmd = key_cmd("ZINCRBY", &self.key);
                    cmd.arg(-by).arg(encoded_ref.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await?;
                }
                Ok(Some(current))
            })
            .await
    }

    /// `(成员, 分数)` 对，按分数排序（ZRANGE/ZREVRANGE WITHSCORES）
    pub async fn items(&self, reverse: bool) -> Result<Vec<(T::Value, f64)>> {
        self.ranged_items(reverse, -1).await
    }

    /// 分数最低的 `n` 个成员和分数，从低到高；`n` 为 `None` 时返回全部
    pub async fn least_common(&self, n: Option<usize>) -> Result<Vec<(T::Value, f64)>> {
        let stop = n.map(|n| n as i64 - 1).unwrap_or(-1);
        self.ranged_items(false, stop).await
    }

    /// 分数最高的 `n` 个成员和分数，从高到低；`n` 为 `None` 时返回全部
    pub async fn most_common(&self, n: Option<usize>) -> Result<Vec<(T::Value, f64)>> {
        let stop = n.map(|n| n as i64 - 1).unwrap_or(-1);
        self.ranged_items(true, stop).await
    }

    /// 所有分数，按成员的分数顺序排列
    pub async fn values(&self, reverse: bool) -> Result<Vec<f64>> {
        let items = self.items(reverse).await?;
        Ok(items.into_iter().map(|(_, score)| score).collect())
    }

    /// 给一组成员各加一分（逐条 ZINCRBY，在一个事务里）
    pub async fn update_members(&self, members: &[T::Value]) -> Result<()> {
        let pairs: Vec<(&T::Value, f64)> = members.iter().map(|m| (m, 1.0)).collect();
        self.incr_all(&pairs).await
    }

    /// 按 `(成员, 增量)` 对批量加分（逐条 ZINCRBY，在一个事务里）
    pub async fn update_scores(&self, pairs: &[(T::Value, f64)]) -> Result<()> {
        let pairs: Vec<(&T::Value, f64)> = pairs.iter().map(|(m, s)| (m, *s)).collect();
        self.incr_all(&pairs).await
    }

    /// 合并其他有序集合的成员和分数（ZUNIONSTORE）
    pub async fn update_from(&self, others: &[&SortedSet<T>]) -> Result<()> {
        if others.is_empty() {
            return Ok(());
        }
        let mut keys = Vec::with_capacity(others.len() + 1);
        keys.push(self.key.clone());
        keys.extend(others.iter().map(|o| o.key.clone()));
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut cmd = key_cmd("ZUNIONSTORE", &self.key);
                cmd.arg(keys_ref.len());
                for key in keys_ref {
                    cmd.arg(key);
                }
                self.session.run_write(&[self.key.as_str()], cmd).await
            })
            .await
    }

    /// 清空集合（DEL 键）
    pub async fn clear(&self) -> Result<()> {
        self.session
            .run_write(&[self.key.as_str()], key_cmd("DEL", &self.key))
            .await
    }

    async fn incr_all(&self, pairs: &[(&T::Value, f64)]) -> Result<()> {
        if pairs.is_empty() {
            return Ok(());
        }
        let mut encoded = Vec::with_capacity(pairs.len());
        for (member, by) in pairs {
            encoded.push((self.value_type.encode(member)?, *by));
        }
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let encoded_ref = &encoded;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                for (bulk, by) in encoded_ref {
                    let mut cmd = key_cmd("ZINCRBY", &self.key);
                    cmd.arg(*by).arg(bulk.as_slice());
                    self.session.run_write(&[self.key.as_str()], cmd).await?;
                }
                Ok(())
            })
            .await
    }

    async fn ranged_items(&self, reverse: bool, stop: i64) -> Result<Vec<(T::Value, f64)>> {
        let range = if reverse { "ZREVRANGE" } else { "ZRANGE" };
        let mut cmd = key_cmd(range, &self.key);
        cmd.arg(0).arg(stop).arg("WITHSCORES");
        let raw: Vec<(Vec<u8>, f64)> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        raw.iter()
            .map(|(bulk, score)| Ok((self.value_type.decode(bulk)?, *score)))
            .collect()
    }
}

fn key_cmd(name: &str, key: &str) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}
