//! Redis list 值的 Rust 侧表示
//!
//! 命令映射：
//!
//! | Redis 命令 | [`List`] 方法 |
//! |------------|---------------|
//! | `LLEN`     | `len` |
//! | `LPUSH`    | `push_front`、`extend_front`、`insert` |
//! | `LPOP`     | `pop_front` |
//! | `RPUSH`    | `append`、`extend` |
//! | `RPOP`     | `pop_back` |
//! | `LINDEX`   | `get`、`pop_at` |
//! | `LRANGE`   | `range`、`to_vec` |
//! | `LTRIM`    | `drop_front`、`keep_front`、`remove_range` |
//! | `LSET`     | `set` |
//! | `DEL`      | `clear` |
//!
//! Redis 没有随机插入/删除的原语，`insert`、`pop_at` 和
//! `remove_range` 的中间位置形态靠整表重写来模拟，代价和表长成正比，
//! 调用时会记一条 warn 日志。

use redis::Cmd;
use tracing::warn;

use crate::collections::decode_all;
use crate::errors::{RedmapError, Result};
use crate::session::Session;
use crate::types::BulkType;

/// 一次取多少个元素。LRANGE 全量拉取大表会卡住连接，分片读。
const SCAN_CHUNK: i64 = 100;

/// 绑定到 Redis 键的列表句柄
pub struct List<T: BulkType> {
    session: Session,
    key: String,
    value_type: T,
}

impl<T: BulkType> List<T> {
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

    /// 列表长度（LLEN）
    pub async fn len(&self) -> Result<u64> {
        self.session
            .run_query(&[self.key.as_str()], key_cmd("LLEN", &self.key))
            .await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// 取下标处的元素（LINDEX）。负数下标从尾部数。
    /// 下标越界返回 [`RedmapError::IndexOutOfRange`]。
    pub async fn get(&self, index: i64) -> Result<T::Value> {
        let mut cmd = key_cmd("LINDEX", &self.key);
        cmd.arg(index);
        let raw: Option<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        match raw {
            Some(bulk) => self.value_type.decode(&bulk),
            None => Err(RedmapError::index_out_of_range(format!(
                "list index {} out of range",
                index
            ))),
        }
    }

    /// 取闭区间 `[start, stop]` 的元素（LRANGE 语义，含两端，负数下标有效）
    pub async fn range(&self, start: i64, stop: i64) -> Result<Vec<T::Value>> {
        let mut cmd = key_cmd("LRANGE", &self.key);
        cmd.arg(start).arg(stop);
        let raw: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
        decode_all(&self.value_type, raw)
    }

    /// 整表读出，按 [`SCAN_CHUNK`] 分片拉取
    pub async fn to_vec(&self) -> Result<Vec<T::Value>> {
        let mut out = Vec::new();
        let mut start: i64 = 0;
        loop {
            let mut cmd = key_cmd("LRANGE", &self.key);
            cmd.arg(start).arg(start + SCAN_CHUNK - 1);
            let chunk: Vec<Vec<u8>> = self.session.run_query(&[self.key.as_str()], cmd).await?;
            let fetched = chunk.len();
            for bulk in &chunk {
                out.push(self.value_type.decode(bulk)?);
            }
            if (fetched as i64) < SCAN_CHUNK {
                return Ok(out);
            }
            start += SCAN_CHUNK;
        }
    }

    /// 覆写下标处的元素（LSET）
    ///
    /// 下标越界返回 [`RedmapError::IndexOutOfRange`]。事务中先用 LLEN
    /// 做边界检查，再把 LSET 排入提交管道。
    pub async fn set(&self, index: i64, value: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(value)?;
        if self.session.in_transaction().await {
            let length: i64 = self
                .session
                .run_query(&[self.key.as_str()], key_cmd("LLEN", &self.key))
                .await?;
            let in_range = (0..length).contains(&index) || (-length..0).contains(&index);
            if !in_range {
                return Err(RedmapError::index_out_of_range(format!(
                    "list index {} out of range",
                    index
                )));
            }
            let mut cmd = key_cmd("LSET", &self.key);
            cmd.arg(index).arg(encoded);
            self.session.run_write(&[self.key.as_str()], cmd).await
        } else {
            let mut cmd = key_cmd("LSET", &self.key);
            cmd.arg(index).arg(encoded);
            match self.session.run_write_reply::<redis::Value>(cmd).await {
                Ok(_) => Ok(()),
                Err(RedmapError::Command(msg))
                    if msg.contains("index out of range") || msg.contains("no such key") =>
                {
                    Err(RedmapError::index_out_of_range(format!(
                        "list index {} out of range",
                        index
                    )))
                }
                Err(e) => Err(e),
            }
        }
    }

    /// 头插（LPUSH）
    pub async fn push_front(&self, value: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(value)?;
        let mut cmd = key_cmd("LPUSH", &self.key);
        cmd.arg(encoded);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 尾插（RPUSH）
    pub async fn append(&self, value: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(value)?;
        let mut cmd = key_cmd("RPUSH", &self.key);
        cmd.arg(encoded);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 批量尾插（多参数 RPUSH），保持 `values` 的顺序
    pub async fn extend(&self, values: &[T::Value]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut cmd = key_cmd("RPUSH", &self.key);
        for value in values {
            cmd.arg(self.value_type.encode(value)?);
        }
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 批量头插，`values` 的顺序在列表头部保持不变
    ///
    /// LPUSH 多个参数是逐个头插，所以先反转再推。
    pub async fn extend_front(&self, values: &[T::Value]) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut cmd = key_cmd("LPUSH", &self.key);
        for value in values.iter().rev() {
            cmd.arg(self.value_type.encode(value)?);
        }
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 在下标处插入元素
    ///
    /// 下标为 0 时就是一条 LPUSH。其他下标 Redis 没有原语，只能在事务
    /// 里整表读出、删键、按新内容重建，下标按 `Vec::insert` 的语义
    /// 截断到 `[0, len]`。
    pub async fn insert(&self, index: i64, value: &T::Value) -> Result<()> {
        let encoded = self.value_type.encode(value)?;
        if index == 0 {
            let mut cmd = key_cmd("LPUSH", &self.key);
            cmd.arg(encoded);
            return self.session.run_write(&[self.key.as_str()], cmd).await;
        }
        warn!(
            "List::insert at index {} rewrites the whole list; this is expensive",
            index
        );
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let encoded_ref = &encoded;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut read = key_cmd("LRANGE", &self.key);
                read.arg(0).arg(-1);
                let mut elements: Vec<Vec<u8>> = self
                    .session
                    .run_query(&[self.key.as_str()], read)
                    .await?;
                let len = elements.len() as i64;
                let position = if index < 0 {
                    (len + index).max(0)
                } else {
                    index.min(len)
                } as usize;
                elements.insert(position, encoded_ref.clone());
                self.rewrite(elements).await
            })
            .await
    }

    /// 头弹出（LPOP）；空列表返回 [`RedmapError::IndexOutOfRange`]
    pub async fn pop_front(&self) -> Result<T::Value> {
        if self.session.in_transaction().await {
            // 事务中拆成 LINDEX 查询 + 排队的 LTRIM
            let mut probe = key_cmd("LINDEX", &self.key);
            probe.arg(0);
            let raw: Option<Vec<u8>> =
                self.session.run_query(&[self.key.as_str()], probe).await?;
            let Some(raw) = raw else {
                return Err(RedmapError::index_out_of_range("pop from an empty list"));
            };
            let mut trim = key_cmd("LTRIM", &self.key);
            trim.arg(1).arg(-1);
            self.session.run_write(&[self.key.as_str()], trim).await?;
            self.value_type.decode(&raw)
        } else {
            let raw: Option<Vec<u8>> = self
                .session
                .run_write_reply(key_cmd("LPOP", &self.key))
                .await?;
            let Some(raw) = raw else {
                return Err(RedmapError::index_out_of_range("pop from an empty list"));
            };
            self.value_type.decode(&raw)
        }
    }

    /// 尾弹出（RPOP）；空列表返回 [`RedmapError::IndexOutOfRange`]
    pub async fn pop_back(&self) -> Result<T::Value> {
        if self.session.in_transaction().await {
            let mut probe = key_cmd("LINDEX", &self.key);
            probe.arg(-1);
            let raw: Option<Vec<u8>> =
                self.session.run_query(&[self.key.as_str()], probe).await?;
            let Some(raw) = raw else {
                return Err(RedmapError::index_out_of_range("pop from an empty list"));
            };
            let mut trim = key_cmd("LTRIM", &self.key);
            trim.arg(0).arg(-2);
            self.session.run_write(&[self.key.as_str()], trim).await?;
            self.value_type.decode(&raw)
        } else {
            let raw: Option<Vec<u8>> = self
                .session
                .run_write_reply(key_cmd("RPOP", &self.key))
                .await?;
            let Some(raw) = raw else {
                return Err(RedmapError::index_out_of_range("pop from an empty list"));
            };
            self.value_type.decode(&raw)
        }
    }

    /// 弹出任意下标的元素
    ///
    /// 头尾之外的下标没有对应原语，在事务里用 LINDEX、LRANGE、LTRIM
    /// 和 RPUSH 模拟，代价和尾部长度成正比。
    pub async fn pop_at(&self, index: i64) -> Result<T::Value> {
        if index == 0 {
            return self.pop_front().await;
        }
        if index == -1 {
            return self.pop_back().await;
        }
        warn!(
            "List::pop_at at index {} rewrites the list tail; this is expensive",
            index
        );
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        let popped = self
            .session
            .join_transaction(keys_ref, |_trial| async move {
                let mut probe = key_cmd("LINDEX", &self.key);
                probe.arg(index);
                let raw: Option<Vec<u8>> =
                    self.session.run_query(&[self.key.as_str()], probe).await?;
                let Some(raw) = raw else {
                    return Err(RedmapError::index_out_of_range(format!(
                        "list index {} out of range",
                        index
                    )));
                };
                let mut tail_cmd = key_cmd("LRANGE", &self.key);
                tail_cmd.arg(index + 1).arg(-1);
                let tail: Vec<Vec<u8>> = self
                    .session
                    .run_query(&[self.key.as_str()], tail_cmd)
                    .await?;
                let mut trim = key_cmd("LTRIM", &self.key);
                trim.arg(0).arg(index - 1);
                self.session.run_write(&[self.key.as_str()], trim).await?;
                if !tail.is_empty() {
                    let mut push = key_cmd("RPUSH", &self.key);
                    for bulk in &tail {
                        push.arg(bulk.as_slice());
                    }
                    self.session.run_write(&[self.key.as_str()], push).await?;
                }
                Ok(raw)
            })
            .await?;
        self.value_type.decode(&popped)
    }

    /// 删除前 `count` 个元素（LTRIM）
    pub async fn drop_front(&self, count: i64) -> Result<()> {
        let mut cmd = key_cmd("LTRIM", &self.key);
        cmd.arg(count).arg(-1);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 只保留前 `count` 个元素，其余删除（LTRIM）
    pub async fn keep_front(&self, count: i64) -> Result<()> {
        let mut cmd = key_cmd("LTRIM", &self.key);
        cmd.arg(0).arg(count - 1);
        self.session.run_write(&[self.key.as_str()], cmd).await
    }

    /// 删除半开区间 `[start, stop)` 的元素
    ///
    /// 区间贴着头或尾时是一条 LTRIM；在中间时要在事务里读出尾部、
    /// 截断再补回，代价和尾部长度成正比。
    pub async fn remove_range(&self, start: i64, stop: i64) -> Result<()> {
        if start == 0 {
            return self.drop_front(stop).await;
        }
        warn!(
            "List::remove_range({}, {}) rewrites the list tail; this is expensive",
            start, stop
        );
        let keys = vec![self.key.clone()];
        let keys_ref = &keys;
        self.session
            .join_transaction(keys_ref, |_trial| async move {
                let mut tail_cmd = key_cmd("LRANGE", &self.key);
                tail_cmd.arg(stop).arg(-1);
                let tail: Vec<Vec<u8>> = self
                    .session
                    .run_query(&[self.key.as_str()], tail_cmd)
                    .await?;
                let mut trim = key_cmd("LTRIM", &self.key);
                trim.arg(0).arg(start - 1);
                self.session.run_write(&[self.key.as_str()], trim).await?;
                if !tail.is_empty() {
                    let mut push = key_cmd("RPUSH", &self.key);
                    for bulk in &tail {
                        push.arg(bulk.as_slice());
                    }
                    self.session.run_write(&[self.key.as_str()], push).await?;
                }
                Ok(())
            })
            .await
    }

    /// 清空列表（DEL 键）
    pub async fn clear(&self) -> Result<()> {
        self.session
            .run_write(&[self.key.as_str()], key_cmd("DEL", &self.key))
            .await
    }

    /// DEL 后按给定内容重建，两条命令都进当前事务的提交管道
    async fn rewrite(&self, elements: Vec<Vec<u8>>) -> Result<()> {
        self.session
            .run_write(&[self.key.as_str()], key_cmd("DEL", &self.key))
            .await?;
        if elements.is_empty() {
            return Ok(());
        }
        let mut push = key_cmd("RPUSH", &self.key);
        for bulk in &elements {
            push.arg(bulk.as_slice());
        }
        self.session.run_write(&[self.key.as_str()], push).await
    }
}

fn key_cmd(name: &str, key: &str) -> Cmd {
    let mut cmd = redis::cmd(name);
    cmd.arg(key);
    cmd
}
