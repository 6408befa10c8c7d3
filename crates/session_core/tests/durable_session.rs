use std::sync::Arc;

use session_core::{
    IdentityStore, Latency, SessionController, SessionPhase, StorageTokenSlot, TokenSlot,
};
use shared::domain::{Credentials, Registration};

fn database_url(dir: &tempfile::TempDir) -> String {
    let path = dir.path().join("profile").join("session.db");
    format!("sqlite://{}", path.to_string_lossy().replace('\\', "/"))
}

#[tokio::test]
async fn session_survives_controller_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir);
    let store = IdentityStore::with_demo_user(Latency::none());

    let first = SessionController::initialize(
        Arc::new(store.clone()),
        Arc::new(StorageTokenSlot::open(&url).await.expect("slot")),
    )
    .await;
    let john = first
        .login(&Credentials::new("john@example.com", "password123"))
        .await
        .expect("login");
    drop(first);

    let second = SessionController::initialize(
        Arc::new(store),
        Arc::new(StorageTokenSlot::open(&url).await.expect("slot")),
    )
    .await;
    assert_eq!(
        second.snapshot().await.phase,
        SessionPhase::Authenticated(john)
    );
}

#[tokio::test]
async fn token_for_vanished_user_is_purged_on_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = database_url(&dir);

    let first = SessionController::initialize(
        Arc::new(IdentityStore::without_latency()),
        Arc::new(StorageTokenSlot::open(&url).await.expect("slot")),
    )
    .await;
    first
        .register(&Registration::new("a@x.com", "pw1", "Ann"))
        .await
        .expect("register");
    drop(first);

    // A fresh registry no longer knows the registered user.
    let slot = StorageTokenSlot::open(&url).await.expect("slot");
    let second = SessionController::initialize(
        Arc::new(IdentityStore::without_latency()),
        Arc::new(slot.clone()),
    )
    .await;

    assert_eq!(second.snapshot().await.phase, SessionPhase::Anonymous);
    assert_eq!(slot.load().await.expect("load"), None);
}
