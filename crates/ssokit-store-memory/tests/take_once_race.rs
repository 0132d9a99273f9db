//! Concurrency guarantees of the take-once primitive.

use std::sync::Arc;
use std::time::Duration;

use ssokit_auth::{AuthorizationCodeIssuer, EphemeralStore};
use ssokit_store_memory::MemoryEphemeralStore;

const TTL: Duration = Duration::from_secs(60);

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn take_once_has_exactly_one_winner() {
    let store = Arc::new(MemoryEphemeralStore::new());
    store.put("contended", "prize", TTL).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..64 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.take_once("contended").await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if let Some(value) = handle.await.unwrap() {
            assert_eq!(value, "prize");
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_redemption_yields_one_code() {
    let store = Arc::new(MemoryEphemeralStore::new());
    let issuer = Arc::new(AuthorizationCodeIssuer::new(store));
    let code = issuer
        .issue("web-client", "user-1", vec!["openid".to_string()], None)
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let issuer = issuer.clone();
        let value = code.value.clone();
        handles.push(tokio::spawn(
            async move { issuer.redeem(&value).await.unwrap() },
        ));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().is_some() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn distinct_keys_do_not_contend() {
    let store = Arc::new(MemoryEphemeralStore::new());
    for i in 0..16 {
        store
            .put(&format!("key-{i}"), "v", TTL)
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for i in 0..16 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store.take_once(&format!("key-{i}")).await.unwrap()
        }));
    }

    for handle in handles {
        assert!(handle.await.unwrap().is_some());
    }
}
