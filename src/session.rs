//! 会话：Redis 连接、键命名空间与命令路由
//!
//! [`Session`] 持有 Redis 客户端和懒建立的 multiplexed 连接，负责把
//! 类型层和集合层发出的命令路由到正确的执行路径：普通模式直接执行
//! （带断线重试），事务模式下查询命令在被 WATCH 的专用连接上立即执行、
//! 写命令进入 MULTI/EXEC 管道等待提交。

use std::sync::Arc;

use redis::aio::MultiplexedConnection;
use redis::{Cmd, RedisResult};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::config::{RedmapConfig, TransactionConfig};
use crate::errors::{RedmapError, Result};
use crate::retry::{self, RetryConfig};
use crate::transaction::TxState;
use crate::types::ValueType;

/// Redis 服务端版本信息，首次查询后缓存
#[derive(Debug, Clone)]
pub(crate) struct ServerVersion {
    pub raw: String,
    pub triple: (u64, u64, u64),
}

/// 管理绑定到 Redis 键的类型化对象的会话
///
/// `Session` 可以廉价克隆，克隆体共享连接与事务状态。集合句柄
/// （Set/List/Hash/SortedSet）各自持有一个克隆。
#[derive(Clone, Debug)]
pub struct Session {
    client: redis::Client,
    /// 持久化连接，使用 RwLock 保护
    connection: Arc<RwLock<Option<MultiplexedConnection>>>,
    /// 当前事务状态；None 表示不在事务中
    pub(crate) tx: Arc<Mutex<Option<TxState>>>,
    key_prefix: Arc<str>,
    server_info: Arc<RwLock<Option<ServerVersion>>>,
    pub(crate) retry: RetryConfig,
    pub(crate) transaction_config: TransactionConfig,
}

impl Session {
    /// 按配置建立会话，并用 PING 验证连接可用
    pub async fn open(config: &RedmapConfig) -> Result<Self> {
        let client = redis::Client::open(config.redis.url.as_str()).map_err(|e| {
            RedmapError::config(format!(
                "invalid Redis URL '{}': {}",
                config.redis.url, e
            ))
        })?;

        let session = Self {
            client,
            connection: Arc::new(RwLock::new(None)),
            tx: Arc::new(Mutex::new(None)),
            key_prefix: Arc::from(config.redis.key_prefix.as_str()),
            server_info: Arc::new(RwLock::new(None)),
            retry: config.retry,
            transaction_config: config.transaction,
        };

        let pong: String = session.run_direct(redis::cmd("PING")).await?;
        debug!("Redis connection test successful: {}", pong);

        Ok(session)
    }

    /// 使用默认配置和给定 URL 建立会话
    pub async fn open_url(url: &str) -> Result<Self> {
        Self::open(&RedmapConfig::with_url(url)).await
    }

    /// 逻辑键加上配置的前缀
    pub(crate) fn make_key(&self, key: &str) -> String {
        format!("{}{}", self.key_prefix, key)
    }

    /// 获取或建立持久连接
    pub(crate) async fn connection(&self) -> RedisResult<MultiplexedConnection> {
        // 首先尝试读取现有连接
        {
            let conn_guard = self.connection.read().await;
            if let Some(ref conn) = *conn_guard {
                return Ok(conn.clone());
            }
        }

        // 需要建立新连接
        let mut conn_guard = self.connection.write().await;

        // 双重检查，避免竞态条件
        if let Some(ref conn) = *conn_guard {
            return Ok(conn.clone());
        }

        let new_conn = self.client.get_multiplexed_async_connection().await?;
        *conn_guard = Some(new_conn.clone());
        debug!("Redis connection established and cached");

        Ok(new_conn)
    }

    /// 重置连接（在连接错误时调用）
    pub(crate) async fn reset_connection(&self) {
        let mut conn_guard = self.connection.write().await;
        *conn_guard = None;
        debug!("Redis connection reset due to error");
    }

    /// 事务外获取专用连接（WATCH 状态是连接级的，不能走共享连接）
    pub(crate) async fn dedicated_connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| {
                RedmapError::connection(format!("failed to open transaction connection: {}", e))
            })
    }

    /// 在共享连接上直接执行命令，可重试错误触发重连
    pub(crate) async fn run_direct<T>(&self, cmd: Cmd) -> Result<T>
    where
        T: redis::FromRedisValue + Send,
    {
        let cmd = &cmd;
        let value = retry::with_retry("redis command", self.retry, || async move {
            let mut conn = self.connection().await?;
            match cmd.query_async(&mut conn).await {
                Ok(v) => Ok(v),
                Err(e) => {
                    if retry::is_retryable_error(&e) {
                        self.reset_connection().await;
                    }
                    Err(e)
                }
            }
        })
        .await?;
        Ok(value)
    }

    /// 在共享连接上直接执行管道
    pub(crate) async fn run_pipe_direct(&self, pipe: redis::Pipeline) -> Result<()> {
        let pipe = &pipe;
        retry::with_retry("redis pipeline", self.retry, || async move {
            let mut conn = self.connection().await?;
            match pipe.query_async::<()>(&mut conn).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    if retry::is_retryable_error(&e) {
                        self.reset_connection().await;
                    }
                    Err(e)
                }
            }
        })
        .await?;
        Ok(())
    }

    /// 查询路径：事务中先 WATCH 相关键并在事务连接上立即执行；
    /// 提交阶段开始后的查询是错误
    pub(crate) async fn run_query<T>(&self, keys: &[&str], cmd: Cmd) -> Result<T>
    where
        T: redis::FromRedisValue + Send,
    {
        let mut guard = self.tx.lock().await;
        if let Some(state) = guard.as_mut() {
            if state.commit_phase {
                return Err(RedmapError::commit_phase(
                    "query operation was tried during commit phase",
                ));
            }
            Self::watch_more(state, keys).await?;
            let mut conn = state.conn.clone();
            drop(guard);
            let value = cmd.query_async(&mut conn).await?;
            Ok(value)
        } else {
            drop(guard);
            self.run_direct(cmd).await
        }
    }

    /// 写路径：事务中 WATCH 相关键后把命令排入提交管道，同时进入提交阶段；
    /// 普通模式直接执行
    pub(crate) async fn run_write(&self, keys: &[&str], cmd: Cmd) -> Result<()> {
        let mut guard = self.tx.lock().await;
        if let Some(state) = guard.as_mut() {
            Self::watch_more(state, keys).await?;
            state.commit_phase = true;
            state.pipe.add_command(cmd).ignore();
            trace!("queued manipulative command into transaction pipeline");
            Ok(())
        } else {
            drop(guard);
            let _: redis::Value = self.run_direct(cmd).await?;
            Ok(())
        }
    }

    /// 把多条写命令作为一个原子单元执行（事务中并入提交管道）
    pub(crate) async fn run_write_batch(&self, keys: &[&str], cmds: Vec<Cmd>) -> Result<()> {
        let mut guard = self.tx.lock().await;
        if let Some(state) = guard.as_mut() {
            Self::watch_more(state, keys).await?;
            state.commit_phase = true;
            for cmd in cmds {
                state.pipe.add_command(cmd).ignore();
            }
            Ok(())
        } else {
            drop(guard);
            let mut pipe = redis::pipe();
            pipe.atomic();
            for cmd in cmds {
                pipe.add_command(cmd).ignore();
            }
            self.run_pipe_direct(pipe).await
        }
    }

    /// 仅在事务外合法的、需要回复的写命令（如 SPOP）。
    /// 调用方负责先用 [`Session::in_transaction`] 分流。
    pub(crate) async fn run_write_reply<T>(&self, cmd: Cmd) -> Result<T>
    where
        T: redis::FromRedisValue + Send,
    {
        self.run_direct(cmd).await
    }

    /// 当前是否处于事务中
    pub async fn in_transaction(&self) -> bool {
        self.tx.lock().await.is_some()
    }

    /// WATCH 尚未被监视的键
    pub(crate) async fn watch_more(state: &mut TxState, keys: &[&str]) -> Result<()> {
        let fresh: Vec<&str> = keys
            .iter()
            .copied()
            .filter(|k| !state.watched.contains(*k))
            .collect();
        if fresh.is_empty() {
            return Ok(());
        }
        let mut cmd = redis::cmd("WATCH");
        for key in &fresh {
            cmd.arg(*key);
        }
        let _: () = cmd.query_async(&mut state.conn).await?;
        for key in fresh {
            state.watched.insert(key.to_string());
        }
        Ok(())
    }

    /// 按给定类型从键加载值
    pub async fn get<V: ValueType>(&self, key: &str, value_type: V) -> Result<V::Stored> {
        let full_key = self.make_key(key);
        value_type.load(self, &full_key).await
    }

    /// 按给定类型把值存入键
    pub async fn set<V: ValueType>(
        &self,
        key: &str,
        value: V::Input,
        value_type: V,
    ) -> Result<V::Stored> {
        let full_key = self.make_key(key);
        value_type.save(self, &full_key, value).await
    }

    /// 删除键，返回键是否存在过
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let full_key = self.make_key(key);
        if self.in_transaction().await {
            // 事务中 DEL 的回复在 EXEC 前不可见，用查询阶段的 EXISTS 给出结果
            let existed: bool = self
                .run_query(&[full_key.as_str()], exists_cmd(&full_key))
                .await?;
            self.run_write(&[full_key.as_str()], del_cmd(&full_key))
                .await?;
            Ok(existed)
        } else {
            let deleted: i64 = self.run_write_reply(del_cmd(&full_key)).await?;
            Ok(deleted > 0)
        }
    }

    /// 键是否存在
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let full_key = self.make_key(key);
        self.run_query(&[full_key.as_str()], exists_cmd(&full_key))
            .await
    }

    /// Redis 服务端版本字符串，例如 `"7.2.4"`
    pub async fn server_version(&self) -> Result<String> {
        Ok(self.server_version_cached().await?.raw)
    }

    /// Redis 服务端版本三元组，例如 `(7, 2, 4)`，可用于版本比较
    pub async fn server_version_info(&self) -> Result<(u64, u64, u64)> {
        Ok(self.server_version_cached().await?.triple)
    }

    async fn server_version_cached(&self) -> Result<ServerVersion> {
        {
            let guard = self.server_info.read().await;
            if let Some(info) = guard.as_ref() {
                return Ok(info.clone());
            }
        }
        let mut cmd = redis::cmd("INFO");
        cmd.arg("server");
        let info: String = self.run_direct(cmd).await?;
        let version = parse_server_version(&info).ok_or_else(|| {
            RedmapError::command("INFO server reply did not contain redis_version")
        })?;
        let mut guard = self.server_info.write().await;
        *guard = Some(version.clone());
        Ok(version)
    }
}

fn del_cmd(key: &str) -> Cmd {
    let mut cmd = redis::cmd("DEL");
    cmd.arg(key);
    cmd
}

fn exists_cmd(key: &str) -> Cmd {
    let mut cmd = redis::cmd("EXISTS");
    cmd.arg(key);
    cmd
}

fn parse_server_version(info: &str) -> Option<ServerVersion> {
    let raw = info
        .lines()
        .find_map(|line| line.strip_prefix("redis_version:"))?
        .trim()
        .to_string();
    let mut parts = raw.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    let patch = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
    Some(ServerVersion {
        raw,
        triple: (major, minor, patch),
    })
}
