//! 乐观事务
//!
//! 事务块在 WATCH 的保护下反复执行，直到提交时没有遇到其他会话的
//! 并发修改为止。块内分两个阶段：查询阶段的读命令在专用连接上立即
//! 执行并自动 WATCH 涉及的键；第一条写命令开始提交阶段，之后所有写
//! 命令排入 MULTI/EXEC 管道，提交阶段中的查询会得到
//! [`RedmapError::CommitPhase`]。EXEC 返回 nil 表示被监视的键被并发
//! 修改，整个块重试。
//!
//! 块可能执行多次，所以块内不要做 redmap 操作之外的副作用（IO 等）。

use std::collections::HashSet;
use std::future::Future;

use redis::aio::MultiplexedConnection;
use tracing::{debug, warn};

use crate::errors::{RedmapError, Result};
use crate::session::Session;

/// 事务的连接级状态
#[derive(Debug)]
pub(crate) struct TxState {
    /// 专用连接；WATCH 是连接级状态，不能与其他任务共享
    pub(crate) conn: MultiplexedConnection,
    pub(crate) watched: HashSet<String>,
    pub(crate) commit_phase: bool,
    /// 提交阶段累积的原子管道
    pub(crate) pipe: redis::Pipeline,
}

impl TxState {
    fn new(conn: MultiplexedConnection, watched: HashSet<String>) -> Self {
        let mut pipe = redis::pipe();
        pipe.atomic();
        Self {
            conn,
            watched,
            commit_phase: false,
            pipe,
        }
    }
}

impl Session {
    /// 在乐观事务中执行 `block`，直到成功提交
    ///
    /// `block` 收到当前重试计数（从 0 开始），冲突时计数递增并重新
    /// 执行。`keys` 中的逻辑键在进入块之前就会被 WATCH；块内操作触及
    /// 的其他键会被自动补充 WATCH。
    ///
    /// 会话上已有事务在执行时返回 [`RedmapError::DoubleTransaction`]。
    ///
    /// ```no_run
    /// # use redmap::{Session, types::Integer};
    /// # async fn demo(session: &Session) -> redmap::Result<()> {
    /// session
    ///     .transaction(&["counter"], |_trial| async move {
    ///         let current = session.get("counter", Integer).await?.unwrap_or(0);
    ///         session.set("counter", current + 1, Integer).await?;
    ///         Ok(())
    ///     })
    ///     .await
    /// # }
    /// ```
    pub async fn transaction<T, F, Fut>(&self, keys: &[&str], block: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let full_keys: Vec<String> = keys.iter().map(|k| self.make_key(k)).collect();
        self.transaction_raw(&full_keys, block, false).await
    }

    /// 集合内部的多命令操作用这个入口：已有事务时并入其中，否则开启
    /// 新事务。键必须是完整（已加前缀）的键。
    pub(crate) async fn join_transaction<T, F, Fut>(&self, keys: &[String], block: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.transaction_raw(keys, block, true).await
    }

    async fn transaction_raw<T, F, Fut>(&self, keys: &[String], mut block: F, join: bool) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        // 已有事务：并入或报错
        {
            let mut guard = self.tx.lock().await;
            if let Some(state) = guard.as_mut() {
                if !join {
                    return Err(RedmapError::double_transaction(
                        "a transaction is already in progress for this session",
                    ));
                }
                let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
                Self::watch_more(state, &key_refs).await?;
                drop(guard);
                return block(0).await;
            }
        }

        let retry_limit = self.transaction_config.retry_limit;
        let mut trial: u32 = 0;
        loop {
            let mut conn = self.dedicated_connection().await?;
            if !keys.is_empty() {
                let mut cmd = redis::cmd("WATCH");
                for key in keys {
                    cmd.arg(key);
                }
                let _: () = cmd.query_async(&mut conn).await?;
            }

            {
                let mut guard = self.tx.lock().await;
                if guard.is_some() {
                    // 另一个任务抢先在同一会话上开启了事务
                    return Err(RedmapError::double_transaction(
                        "a transaction is already in progress for this session",
                    ));
                }
                *guard = Some(TxState::new(conn, keys.iter().cloned().collect()));
            }

            let outcome = block(trial).await;

            let state = self
                .tx
                .lock()
                .await
                .take()
                .expect("transaction state disappeared mid-block");
            let mut conn = state.conn;

            match outcome {
                Err(e) => {
                    // 专用连接随 drop 关闭，WATCH 状态一并失效
                    return Err(e);
                }
                Ok(value) => {
                    if !state.commit_phase {
                        // 纯查询块没有排队任何写命令，无需 EXEC
                        return Ok(value);
                    }
                    let committed: Option<()> = state.pipe.query_async(&mut conn).await?;
                    match committed {
                        Some(()) => {
                            if trial > 0 {
                                debug!("transaction committed after {} conflict retries", trial);
                            }
                            return Ok(value);
                        }
                        None => {
                            trial += 1;
                            if retry_limit > 0 && trial >= retry_limit {
                                return Err(RedmapError::conflict(format!(
                                    "transaction kept conflicting after {} trials",
                                    trial
                                )));
                            }
                            warn!("transaction met a conflict; retrying (trial {})", trial);
                        }
                    }
                }
            }
        }
    }
}
