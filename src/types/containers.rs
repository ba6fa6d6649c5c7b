//! 容器类型描述符
//!
//! 这些描述符让集合也能走 [`Session::get`] / [`Session::set`] 的统一
//! 入口：加载只是构造一个绑定到键的句柄，不发命令；保存会原子地
//! 整体替换键的内容（DEL 加重填，单个原子管道）并返回句柄。

use async_trait::async_trait;

use crate::collections::{Hash, List, Set, SortedSet};
use crate::errors::Result;
use crate::session::Session;
use crate::types::{BulkType, ValueType};

/// [`Set`] 句柄的类型描述符
#[derive(Debug, Clone, Copy, Default)]
pub struct SetOf<T: BulkType>(pub T);

/// [`List`] 句柄的类型描述符
#[derive(Debug, Clone, Copy, Default)]
pub struct ListOf<T: BulkType>(pub T);

/// [`Hash`] 句柄的类型描述符
#[derive(Debug, Clone, Copy, Default)]
pub struct HashOf<K: BulkType, V: BulkType>(pub K, pub V);

/// [`SortedSet`] 句柄的类型描述符
#[derive(Debug, Clone, Copy, Default)]
pub struct SortedSetOf<T: BulkType>(pub T);

#[async_trait]
impl<T> ValueType for SetOf<T>
where
    T: BulkType + Clone + 'static,
{
    type Input = Vec<T::Value>;
    type Stored = Set<T>;

    async fn load(&self, session: &Session, key: &str) -> Result<Self::Stored> {
        Ok(Set::attach(session.clone(), key.to_string(), self.0.clone()))
    }

    async fn save(&self, session: &Session, key: &str, value: Self::Input) -> Result<Self::Stored> {
        let mut cmds = vec![del_cmd(key)];
        if !value.is_empty() {
            let mut sadd = redis::cmd("SADD");
            sadd.arg(key);
            for member in &value {
                sadd.arg(self.0.encode(member)?);
            }
            cmds.push(sadd);
        }
        session.run_write_batch(&[key], cmds).await?;
        Ok(Set::attach(session.clone(), key.to_string(), self.0.clone()))
    }
}

#[async_trait]
impl<T> ValueType for ListOf<T>
where
    T: BulkType + Clone + 'static,
{
    type Input = Vec<T::Value>;
    type Stored = List<T>;

    async fn load(&self, session: &Session, key: &str) -> Result<Self::Stored> {
        Ok(List::attach(session.clone(), key.to_string(), self.0.clone()))
    }

    async fn save(&self, session: &Session, key: &str, value: Self::Input) -> Result<Self::Stored> {
        let mut cmds = vec![del_cmd(key)];
        if !value.is_empty() {
            let mut rpush = redis::cmd("RPUSH");
            rpush.arg(key);
            for element in &value {
                rpush.arg(self.0.encode(element)?);
            }
            cmds.push(rpush);
        }
        session.run_write_batch(&[key], cmds).await?;
        Ok(List::attach(session.clone(), key.to_string(), self.0.clone()))
    }
}

#[async_trait]
impl<K, V> ValueType for HashOf<K, V>
where
    K: BulkType + Clone + 'static,
    V: BulkType + Clone + 'static,
{
    type Input = Vec<(K::Value, V::Value)>;
    type Stored = Hash<K, V>;

    async fn load(&self, session: &Session, key: &str) -> Result<Self::Stored> {
        Ok(Hash::attach(
            session.clone(),
            key.to_string(),
            self.0.clone(),
            self.1.clone(),
        ))
    }

    async fn save(&self, session: &Session, key: &str, value: Self::Input) -> Result<Self::Stored> {
        let mut cmds = vec![del_cmd(key)];
        if !value.is_empty() {
            let mut hset = redis::cmd("HSET");
            hset.arg(key);
            for (field, val) in &value {
                hset.arg(self.0.encode(field)?);
                hset.arg(self.1.encode(val)?);
            }
            cmds.push(hset);
        }
        session.run_write_batch(&[key], cmds).await?;
        Ok(Hash::attach(
            session.clone(),
            key.to_string(),
            self.0.clone(),
            self.1.clone(),
        ))
    }
}

#[async_trait]
impl<T> ValueType for SortedSetOf<T>
where
    T: BulkType + Clone + 'static,
{
    type Input = Vec<(T::Value, f64)>;
    type Stored = SortedSet<T>;

    async fn load(&self, session: &Session, key: &str) -> Result<Self::Stored> {
        Ok(SortedSet::attach(
            session.clone(),
            key.to_string(),
            self.0.clone(),
        ))
    }

    async fn save(&self, session: &Session, key: &str, value: Self::Input) -> Result<Self::Stored> {
        let mut cmds = vec![del_cmd(key)];
        if !value.is_empty() {
            let mut zadd = redis::cmd("ZADD");
            zadd.arg(key);
            for (member, score) in &value {
                zadd.arg(*score);
                zadd.arg(self.0.encode(member)?);
            }
            cmds.push(zadd);
        }
        session.run_write_batch(&[key], cmds).await?;
        Ok(SortedSet::attach(
            session.clone(),
            key.to_string(),
            self.0.clone(),
        ))
    }
}

fn del_cmd(key: &str) -> redis::Cmd {
    let mut cmd = redis::cmd("DEL");
    cmd.arg(key);
    cmd
}
