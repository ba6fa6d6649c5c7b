//! List 句柄测试：下标访问、推入弹出与区间删除
//!
//! 需要 REDMAP_TEST_URL 指向一个可用的 Redis。

mod common;

use redmap::RedmapError;
use redmap::types::{Integer, ListOf, UnicodeString};

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_len_get_and_range() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_basics");

    let list = session
        .set(&key, strings(&["a", "b", "c"]), ListOf(UnicodeString))
        .await
        .unwrap();

    assert_eq!(list.len().await.unwrap(), 3);
    assert_eq!(list.get(0).await.unwrap(), "a");
    assert_eq!(list.get(-1).await.unwrap(), "c");

    let err = list.get(7).await.unwrap_err();
    assert!(matches!(err, RedmapError::IndexOutOfRange(_)));

    assert_eq!(list.range(0, 1).await.unwrap(), strings(&["a", "b"]));
    assert_eq!(list.range(0, -1).await.unwrap(), strings(&["a", "b", "c"]));

    // 直接构造的句柄绑定到同一个键
    let rebound = redmap::List::new(&session, &key, UnicodeString);
    assert_eq!(rebound.to_vec().await.unwrap(), strings(&["a", "b", "c"]));

    list.clear().await.unwrap();
}

#[tokio::test]
async fn test_to_vec_fetches_in_chunks() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_chunks");

    // 超过一个分片长度，覆盖分页读取
    let values: Vec<i64> = (0..250).collect();
    let list = session
        .set(&key, values.clone(), ListOf(Integer))
        .await
        .unwrap();

    assert_eq!(list.to_vec().await.unwrap(), values);

    list.clear().await.unwrap();
}

#[tokio::test]
async fn test_set_overwrites_and_checks_bounds() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_set");

    let list = session
        .set(&key, strings(&["a", "b", "c"]), ListOf(UnicodeString))
        .await
        .unwrap();

    list.set(1, &"B".to_string()).await.unwrap();
    list.set(-1, &"C".to_string()).await.unwrap();
    assert_eq!(list.to_vec().await.unwrap(), strings(&["a", "B", "C"]));

    let err = list.set(9, &"x".to_string()).await.unwrap_err();
    assert!(matches!(err, RedmapError::IndexOutOfRange(_)));

    list.clear().await.unwrap();
}

#[tokio::test]
async fn test_push_and_extend() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_push");

    let list = session
        .set(&key, strings(&["m"]), ListOf(UnicodeString))
        .await
        .unwrap();

    list.push_front(&"a".to_string()).await.unwrap();
    list.append(&"z".to_string()).await.unwrap();
    list.extend(&strings(&["1", "2"])).await.unwrap();
    list.extend_front(&strings(&["x", "y"])).await.unwrap();

    assert_eq!(
        list.to_vec().await.unwrap(),
        strings(&["x", "y", "a", "m", "z", "1", "2"])
    );

    list.clear().await.unwrap();
}

#[tokio::test]
async fn test_insert() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_insert");

    let list = session
        .set(&key, strings(&["a", "c"]), ListOf(UnicodeString))
        .await
        .unwrap();

    // 下标 0 直接 LPUSH
    list.insert(0, &"z".to_string()).await.unwrap();
    // 中间下标走整表重写
    list.insert(2, &"b".to_string()).await.unwrap();
    assert_eq!(
        list.to_vec().await.unwrap(),
        strings(&["z", "a", "b", "c"])
    );

    // 越界下标截断成尾插
    list.insert(100, &"end".to_string()).await.unwrap();
    assert_eq!(list.get(-1).await.unwrap(), "end");

    list.clear().await.unwrap();
}

#[tokio::test]
async fn test_pops() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_pop");

    let list = session
        .set(&key, strings(&["a", "b", "c", "d"]), ListOf(UnicodeString))
        .await
        .unwrap();

    assert_eq!(list.pop_front().await.unwrap(), "a");
    assert_eq!(list.pop_back().await.unwrap(), "d");
    // 中间下标走事务模拟
    assert_eq!(list.pop_at(1).await.unwrap(), "c");
    assert_eq!(list.to_vec().await.unwrap(), strings(&["b"]));

    assert_eq!(list.pop_front().await.unwrap(), "b");
    let err = list.pop_front().await.unwrap_err();
    assert!(matches!(err, RedmapError::IndexOutOfRange(_)));
    let err = list.pop_back().await.unwrap_err();
    assert!(matches!(err, RedmapError::IndexOutOfRange(_)));
}

#[tokio::test]
async fn test_trims_and_remove_range() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("list_trim");

    let values: Vec<i64> = (0..10).collect();
    let list = session
        .set(&key, values, ListOf(Integer))
        .await
        .unwrap();

    list.drop_front(2).await.unwrap();
    assert_eq!(list.to_vec().await.unwrap(), (2..10).collect::<Vec<i64>>());

    list.keep_front(6).await.unwrap();
    assert_eq!(list.to_vec().await.unwrap(), (2..8).collect::<Vec<i64>>());

    // 删掉中间 [1, 3)：剩 2, 5, 6, 7
    list.remove_range(1, 3).await.unwrap();
    assert_eq!(list.to_vec().await.unwrap(), vec![2, 5, 6, 7]);

    list.clear().await.unwrap();
    assert!(list.is_empty().await.unwrap());
}
