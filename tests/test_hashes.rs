//! Integration tests: hash commands.

mod common;

use bytes::Bytes;
use common::*;
use respool::{Argument, Error};

#[tokio::test]
async fn hmset_and_hgetall_keep_field_order() {
    let s = MockServer::start().await;
    let c = s.client().await;
    let key = format!("{}_hash", test_prefix());

    c.hmset(
        &key,
        &[
            ("name", Argument::from("ada")),
            ("age", Argument::int(36)),
            ("raw", Argument::from(&b"\x00\x01"[..])),
        ],
    )
    .await
    .unwrap();

    let fields = c.hgetall(&key).await.unwrap();
    assert_eq!(
        fields,
        vec![
            ("name".to_string(), Bytes::from_static(b"ada")),
            ("age".to_string(), Bytes::from_static(b"36")),
            ("raw".to_string(), Bytes::from_static(b"\x00\x01")),
        ]
    );
}

#[tokio::test]
async fn hmset_overwrites_field() {
    let s = MockServer::start().await;
    let c = s.client().await;
    let key = format!("{}_over", test_prefix());

    c.hmset(&key, &[("f", "1".into())]).await.unwrap();
    c.hmset(&key, &[("f", "2".into())]).await.unwrap();
    assert_eq!(
        c.hgetall(&key).await.unwrap(),
        vec![("f".to_string(), Bytes::from_static(b"2"))]
    );
}

#[tokio::test]
async fn hmset_requires_pairs() {
    let s = MockServer::start().await;
    let c = s.client().await;
    assert!(matches!(c.hmset("k", &[]).await, Err(Error::Argument(_))));
    assert_eq!(s.count("HMSET"), 0);
}

#[tokio::test]
async fn hgetall_missing_is_empty() {
    let s = MockServer::start().await;
    let c = s.client().await;
    assert!(c.hgetall("no_such_hash").await.unwrap().is_empty());
}

#[tokio::test]
async fn expire_reports_existence() {
    let s = MockServer::start().await;
    let c = s.client().await;
    let key = format!("{}_ttl", test_prefix());

    assert!(!c.expire(&key, 60).await.unwrap());
    c.hmset(&key, &[("f", "v".into())]).await.unwrap();
    assert!(c.expire(&key, 60).await.unwrap());
}
