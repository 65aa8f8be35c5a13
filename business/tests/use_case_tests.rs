//! Use-case scenarios against counting store doubles.

mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{Calls, Harness, PICKED_HANDLE, U1};
use roster_business::{AttachmentKind, Error, Latency, User, UserStore, asset_key};
use tokio::task::JoinSet;

fn draft(nickname: &str) -> User {
    User {
        nickname: nickname.to_owned(),
        email: format!("{}@test.com", nickname.to_lowercase()),
        description: "Created in tests".to_owned(),
        ..User::default()
    }
}

#[tokio::test]
async fn test_show_list_returns_seeded_user() {
    let h = Harness::new();

    let users = h.use_cases.show_list().await.unwrap();

    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, U1);
    assert_eq!(users[0].nickname, "Nickname1");
    assert_eq!(users[0].email, "nickname1@test.com");
}

#[tokio::test]
async fn test_show_details_unknown_id_skips_assets() {
    let h = Harness::new();

    let result = h.use_cases.show_details("unknown-id").await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(Calls::count(&h.calls.get), 1);
    assert_eq!(Calls::count(&h.calls.asset_get), 0);
}

#[tokio::test]
async fn test_show_details_fetches_both_assets() {
    let h = Harness::new();

    let user = h.use_cases.show_details(U1).await.unwrap();

    assert_eq!(user.id.as_deref(), Some(U1));
    assert_eq!(Calls::count(&h.calls.asset_get), 2);
}

#[tokio::test]
async fn test_update_without_id_inserts_once() {
    let h = Harness::new();

    let id = h.use_cases.update(draft("Fresh")).await.unwrap();

    assert!(!id.is_empty());
    assert_ne!(id, U1);
    assert_eq!(Calls::count(&h.calls.insert), 1);
    assert_eq!(Calls::count(&h.calls.update), 0);

    let stored = h.users.get(&id).await.unwrap();
    assert_eq!(stored.id, id);
    assert_eq!(stored.nickname, "Fresh");
}

#[tokio::test]
async fn test_update_with_empty_id_is_an_insert() {
    let h = Harness::new();
    let user = User {
        id: Some(String::new()),
        ..draft("Blank")
    };

    h.use_cases.update(user).await.unwrap();

    assert_eq!(Calls::count(&h.calls.insert), 1);
    assert_eq!(Calls::count(&h.calls.update), 0);
}

#[tokio::test]
async fn test_update_unknown_id_fails_not_found() {
    let h = Harness::new();
    let user = User {
        id: Some("ghost".to_owned()),
        ..draft("Ghost")
    };

    let result = h.use_cases.update(user).await;

    assert!(matches!(result, Err(Error::NotFound(_))));
    assert_eq!(Calls::count(&h.calls.asset_save), 0);
}

#[tokio::test]
async fn test_insert_round_trip_keeps_avatar_bytes() {
    let h = Harness::new();
    let avatar: Vec<u8> = (0..=255).collect();
    let user = User {
        photo: Some(avatar.clone()),
        ..draft("Pictured")
    };

    let id = h.use_cases.update(user).await.unwrap();
    let loaded = h.use_cases.show_details(&id).await.unwrap();

    assert_eq!(loaded.nickname, "Pictured");
    assert_eq!(loaded.photo, Some(avatar));
    assert_eq!(loaded.id_scan, None);
}

#[tokio::test]
async fn test_add_attachment_stores_loaded_bytes() {
    let h = Harness::new();

    let key = h
        .use_cases
        .add_attachment(U1, PICKED_HANDLE, AttachmentKind::Avatar)
        .await
        .unwrap();

    assert_eq!(key, "u1-avatar");
    assert_eq!(key, asset_key(U1, AttachmentKind::Avatar));
    assert!(h.assets.contains("u1-avatar"));
    assert_eq!(h.use_cases.get_attachment(&key).await.unwrap(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_delete_twice_fails_second_time() {
    let h = Harness::new();

    h.use_cases.delete_user(U1).await.unwrap();
    let second = h.use_cases.delete_user(U1).await;

    assert!(matches!(second, Err(Error::NotFound(_))));
    assert!(h.users.is_empty());
}

#[tokio::test]
async fn test_update_password_of_unknown_user_fails() {
    let h = Harness::new();

    let result = h.use_cases.update_password("ghost", "V@lid001").await;

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_inserts_get_distinct_ids() {
    const N: usize = 32;
    let h = Harness::empty();

    let mut tasks = JoinSet::new();
    for i in 0..N {
        let use_cases = Arc::clone(&h.use_cases);
        tasks.spawn(async move { use_cases.update(draft(&format!("User{i}"))).await });
    }

    let mut ids = HashSet::new();
    while let Some(joined) = tasks.join_next().await {
        ids.insert(joined.unwrap().unwrap());
    }

    assert_eq!(ids.len(), N);
    assert_eq!(h.use_cases.show_list().await.unwrap().len(), N);
    assert_eq!(Calls::count(&h.calls.insert), N);
}

#[tokio::test(start_paused = true)]
async fn test_latency_applies_to_failures_too() {
    let h = Harness::with_latency(Latency::from_millis(300));
    let start = tokio::time::Instant::now();

    let result = h.use_cases.delete_user("ghost").await;

    assert!(result.is_err());
    assert!(start.elapsed() >= Duration::from_millis(300));
}
