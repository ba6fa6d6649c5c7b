//! SortedSet 句柄测试：分数增减、弹出规则与排序视图
//!
//! 需要 REDMAP_TEST_URL 指向一个可用的 Redis。

mod common;

use redmap::RedmapError;
use redmap::types::{SortedSetOf, UnicodeString};

fn scored(values: &[(&str, f64)]) -> Vec<(String, f64)> {
    values.iter().map(|(m, s)| (m.to_string(), *s)).collect()
}

#[tokio::test]
async fn test_scores_and_membership() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_basics");

    let zset = session
        .set(
            &key,
            scored(&[("c", 1.0), ("a", 2.0), ("b", 3.0)]),
            SortedSetOf(UnicodeString),
        )
        .await
        .unwrap();

    assert_eq!(zset.len().await.unwrap(), 3);
    assert_eq!(zset.score(&"a".to_string()).await.unwrap(), Some(2.0));
    assert_eq!(zset.score(&"z".to_string()).await.unwrap(), None);
    assert!(zset.contains(&"b".to_string()).await.unwrap());

    // 按分数升序
    assert_eq!(
        zset.members().await.unwrap(),
        vec!["c".to_string(), "a".to_string(), "b".to_string()]
    );

    zset.set_score(&"c".to_string(), 9.0).await.unwrap();
    assert_eq!(zset.score(&"c".to_string()).await.unwrap(), Some(9.0));

    // 直接构造的句柄绑定到同一个键
    let rebound = redmap::SortedSet::new(&session, &key, UnicodeString);
    assert_eq!(rebound.score(&"c".to_string()).await.unwrap(), Some(9.0));

    zset.clear().await.unwrap();
    assert!(zset.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_add_increments() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_add");

    let zset = session
        .set(&key, scored(&[("n", 1.0)]), SortedSetOf(UnicodeString))
        .await
        .unwrap();

    zset.add(&"n".to_string(), 1.0).await.unwrap();
    zset.add(&"fresh".to_string(), 1.0).await.unwrap();
    assert_eq!(zset.score(&"n".to_string()).await.unwrap(), Some(2.0));
    assert_eq!(zset.score(&"fresh".to_string()).await.unwrap(), Some(1.0));

    zset.clear().await.unwrap();
}

#[tokio::test]
async fn test_remove() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_remove");

    let zset = session
        .set(&key, scored(&[("a", 1.0)]), SortedSetOf(UnicodeString))
        .await
        .unwrap();

    zset.remove(&"a".to_string()).await.unwrap();
    let err = zset.remove(&"a".to_string()).await.unwrap_err();
    assert!(matches!(err, RedmapError::MemberNotFound(_)));
}

#[tokio::test]
async fn test_discard_score_floor() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_discard");

    let zset = session
        .set(
            &key,
            scored(&[("a", 3.0), ("b", 1.0)]),
            SortedSetOf(UnicodeString),
        )
        .await
        .unwrap();

    // 3 - 1 > 0：只减分
    zset.discard(&"a".to_string(), 1.0, Some(0.0)).await.unwrap();
    assert_eq!(zset.score(&"a".to_string()).await.unwrap(), Some(2.0));

    // 1 - 1 <= 0：直接移除
    zset.discard(&"b".to_string(), 1.0, Some(0.0)).await.unwrap();
    assert_eq!(zset.score(&"b".to_string()).await.unwrap(), None);

    // floor 为 None：永不移除，可以减成负数
    zset.discard(&"a".to_string(), 5.0, None).await.unwrap();
    assert_eq!(zset.score(&"a".to_string()).await.unwrap(), Some(-3.0));

    // 不存在的成员什么都不做
    zset.discard(&"ghost".to_string(), 1.0, Some(0.0))
        .await
        .unwrap();

    zset.clear().await.unwrap();
}

#[tokio::test]
async fn test_set_default() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_setdefault");

    let zset = session
        .set(&key, scored(&[("a", 4.0)]), SortedSetOf(UnicodeString))
        .await
        .unwrap();

    assert_eq!(zset.set_default(&"a".to_string(), 1.0).await.unwrap(), 4.0);
    assert_eq!(zset.set_default(&"b".to_string(), 1.0).await.unwrap(), 1.0);
    assert_eq!(zset.score(&"b".to_string()).await.unwrap(), Some(1.0));

    zset.clear().await.unwrap();
}

#[tokio::test]
async fn test_pop_item() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_popitem");

    let zset = session
        .set(
            &key,
            scored(&[("low", 1.0), ("high", 9.0)]),
            SortedSetOf(UnicodeString),
        )
        .await
        .unwrap();

    // 最低分被移除（1 - 1 <= 0）
    let (member, score) = zset.pop_item(false, 1.0, Some(0.0)).await.unwrap();
    assert_eq!((member.as_str(), score), ("low", 1.0));
    assert_eq!(zset.len().await.unwrap(), 1);

    // 最高分只减分（9 - 1 > 0）
    let (member, score) = zset.pop_item(true, 1.0, Some(0.0)).await.unwrap();
    assert_eq!((member.as_str(), score), ("high", 9.0));
    assert_eq!(zset.score(&"high".to_string()).await.unwrap(), Some(8.0));

    zset.clear().await.unwrap();
    let err = zset.pop_item(false, 1.0, Some(0.0)).await.unwrap_err();
    assert!(matches!(err, RedmapError::MemberNotFound(_)));
}

#[tokio::test]
async fn test_pop_member() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_popmember");

    let zset = session
        .set(&key, scored(&[("a", 5.0)]), SortedSetOf(UnicodeString))
        .await
        .unwrap();

    // 返回提交前的分数，5 - 1 > 0 所以只减分
    assert_eq!(
        zset.pop_member(&"a".to_string(), 1.0, Some(0.0))
            .await
            .unwrap(),
        Some(5.0)
    );
    assert_eq!(zset.score(&"a".to_string()).await.unwrap(), Some(4.0));

    assert_eq!(
        zset.pop_member(&"missing".to_string(), 1.0, Some(0.0))
            .await
            .unwrap(),
        None
    );

    zset.clear().await.unwrap();
}

#[tokio::test]
async fn test_ordered_views() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key = common::unique_key("zset_views");

    let zset = session
        .set(
            &key,
            scored(&[("c", 1.0), ("a", 2.0), ("b", 3.0)]),
            SortedSetOf(UnicodeString),
        )
        .await
        .unwrap();

    assert_eq!(
        zset.items(false).await.unwrap(),
        scored(&[("c", 1.0), ("a", 2.0), ("b", 3.0)])
    );
    assert_eq!(
        zset.items(true).await.unwrap(),
        scored(&[("b", 3.0), ("a", 2.0), ("c", 1.0)])
    );
    assert_eq!(
        zset.least_common(Some(2)).await.unwrap(),
        scored(&[("c", 1.0), ("a", 2.0)])
    );
    assert_eq!(
        zset.most_common(Some(1)).await.unwrap(),
        scored(&[("b", 3.0)])
    );
    assert_eq!(zset.values(false).await.unwrap(), vec![1.0, 2.0, 3.0]);

    zset.clear().await.unwrap();
}

#[tokio::test]
async fn test_updates() {
    let Some(session) = common::test_session().await else {
        return;
    };
    let key_a = common::unique_key("zset_upd_a");
    let key_b = common::unique_key("zset_upd_b");

    let a = session
        .set(
            &key_a,
            scored(&[("c", 1.0), ("a", 2.0)]),
            SortedSetOf(UnicodeString),
        )
        .await
        .unwrap();

    // 普通成员集：每个加 1 分，新成员从 1 开始
    a.update_members(&["a".to_string(), "d".to_string()])
        .await
        .unwrap();
    assert_eq!(a.score(&"a".to_string()).await.unwrap(), Some(3.0));
    assert_eq!(a.score(&"d".to_string()).await.unwrap(), Some(1.0));

    // 带分数的批量增量
    a.update_scores(&scored(&[("c", 2.5), ("e", 0.5)]))
        .await
        .unwrap();
    assert_eq!(a.score(&"c".to_string()).await.unwrap(), Some(3.5));
    assert_eq!(a.score(&"e".to_string()).await.unwrap(), Some(0.5));

    // ZUNIONSTORE 合并另一个有序集合的分数
    let b = session
        .set(&key_b, scored(&[("a", 10.0)]), SortedSetOf(UnicodeString))
        .await
        .unwrap();
    a.update_from(&[&b]).await.unwrap();
    assert_eq!(a.score(&"a".to_string()).await.unwrap(), Some(13.0));

    a.clear().await.unwrap();
    b.clear().await.unwrap();
}
