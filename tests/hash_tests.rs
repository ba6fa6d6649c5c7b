//! Hash 句柄测试：字段读写、批量更新与原子 set_default
//!
//! 需要 REDMAP_TEST_URL 指向一个可用的 Redis。

mod common;

use std::collections::HashSet;

use redmap::RedmapError;
use redmap::types::{HashOf, Integer, UnicodeString};

fn pairs(values: &[(&str, i64)]) -> Vec<(String, i64)> {
    values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

#[tokio::test]
async fn test_field_basics() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("hash_basics");

    let hash = session
        .set(
            &key,
            pairs(&[("one", 1), ("two", 2)]),
            HashOf(UnicodeString, Integer),
        )
        .await
        .unwrap();

    assert_eq!(hash.len().await.unwrap(), 2);
    assert!(hash.contains_key(&"one".to_string()).await.unwrap());
    assert_eq!(hash.get(&"two".to_string()).await.unwrap(), Some(2));
    assert_eq!(hash.get(&"three".to_string()).await.unwrap(), None);

    hash.insert(&"three".to_string(), &3).await.unwrap();
    assert_eq!(hash.get(&"three".to_string()).await.unwrap(), Some(3));

    // 覆写已有字段
    hash.insert(&"one".to_string(), &11).await.unwrap();
    assert_eq!(hash.get(&"one".to_string()).await.unwrap(), Some(11));
    assert_eq!(hash.len().await.unwrap(), 3);

    // 直接构造的句柄绑定到同一个键
    let rebound = redmap::Hash::new(&session, &key, UnicodeString, Integer);
    assert_eq!(rebound.get(&"one".to_string()).await.unwrap(), Some(11));

    hash.clear().await.unwrap();
    assert!(hash.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_remove() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("hash_remove");

    let hash = session
        .set(&key, pairs(&[("a", 1)]), HashOf(UnicodeString, Integer))
        .await
        .unwrap();

    hash.remove(&"a".to_string()).await.unwrap();
    let err = hash.remove(&"a".to_string()).await.unwrap_err();
    assert!(matches!(err, RedmapError::FieldNotFound(_)));
}

#[tokio::test]
async fn test_keys_values_items() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("hash_views");

    let hash = session
        .set(
            &key,
            pairs(&[("a", 1), ("b", 2), ("c", 3)]),
            HashOf(UnicodeString, Integer),
        )
        .await
        .unwrap();

    let keys: HashSet<String> = hash.keys().await.unwrap().into_iter().collect();
    assert_eq!(
        keys,
        HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()])
    );

    let values: HashSet<i64> = hash.values().await.unwrap().into_iter().collect();
    assert_eq!(values, HashSet::from([1, 2, 3]));

    let items: HashSet<(String, i64)> = hash.items().await.unwrap().into_iter().collect();
    assert!(items.contains(&("b".to_string(), 2)));
    assert_eq!(items.len(), 3);

    hash.clear().await.unwrap();
}

#[tokio::test]
async fn test_bulk_update() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("hash_update");

    let hash = session
        .set(&key, pairs(&[("a", 1)]), HashOf(UnicodeString, Integer))
        .await
        .unwrap();

    hash.update(&pairs(&[("a", 10), ("b", 20)])).await.unwrap();
    assert_eq!(hash.get(&"a".to_string()).await.unwrap(), Some(10));
    assert_eq!(hash.get(&"b".to_string()).await.unwrap(), Some(20));

    hash.clear().await.unwrap();
}

#[tokio::test]
async fn test_set_default_is_first_writer_wins() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("hash_setdefault");

    let hash = session
        .set(
            &key,
            Vec::<(String, i64)>::new(),
            HashOf(UnicodeString, Integer),
        )
        .await
        .unwrap();

    // 第一次写入默认值，第二次返回已有值
    assert_eq!(hash.set_default(&"n".to_string(), &5).await.unwrap(), 5);
    assert_eq!(hash.set_default(&"n".to_string(), &9).await.unwrap(), 5);
    assert_eq!(hash.get(&"n".to_string()).await.unwrap(), Some(5));

    hash.clear().await.unwrap();
}
