use super::*;

#[test]
fn token_round_trips_user_id() {
    let id = UserId::new("user42");
    let token = token_for(&id);
    assert_eq!(token, "token-user42");
    assert_eq!(user_id_from_token(&token), Some(id));
}

#[test]
fn malformed_tokens_do_not_decode() {
    assert_eq!(user_id_from_token("user42"), None);
    assert_eq!(user_id_from_token("token-"), None);
    assert_eq!(user_id_from_token(""), None);
}

#[tokio::test]
async fn create_assigns_sequential_ids_and_default_goal() {
    let store = IdentityStore::without_latency();
    let ann = store.create("a@x.com", "pw1", "Ann").await.expect("ann");
    let bob = store.create("b@x.com", "pw2", "Bob").await.expect("bob");

    assert_eq!(ann.id, UserId::new("user1"));
    assert_eq!(bob.id, UserId::new("user2"));
    assert_eq!(ann.goal, TrainingGoal::Bulking);
    assert!(ann.weight.is_none() && ann.height.is_none());
    assert_eq!(store.user_count().await, 2);
}

#[tokio::test]
async fn demo_user_is_seeded_and_next_id_follows_it() {
    let store = IdentityStore::with_demo_user(Latency::none());
    let john = store
        .authenticate("john@example.com", "password123")
        .await
        .expect("demo login");
    assert_eq!(john.id, UserId::new("user1"));
    assert_eq!(john.weight.as_deref(), Some("185 lbs"));

    let next = store.create("a@x.com", "pw1", "Ann").await.expect("create");
    assert_eq!(next.id, UserId::new("user2"));
}

#[tokio::test]
async fn duplicate_email_is_rejected_without_touching_registry() {
    let store = IdentityStore::without_latency();
    store.create("a@x.com", "pw1", "Ann").await.expect("first");

    let err = store
        .create("a@x.com", "other", "Imposter")
        .await
        .expect_err("duplicate");
    assert_eq!(err, AuthError::DuplicateEmail);
    assert_eq!(store.user_count().await, 1);

    let kept = store.find_by_email("a@x.com").await.expect("still there");
    assert_eq!(kept.name, "Ann");
}

#[tokio::test]
async fn email_lookup_is_case_sensitive() {
    let store = IdentityStore::without_latency();
    store.create("a@x.com", "pw1", "Ann").await.expect("create");

    assert!(store.find_by_email("A@X.com").await.is_none());
    assert_eq!(
        store.authenticate("A@X.com", "pw1").await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn authenticate_rejects_unknown_email_and_wrong_secret() {
    let store = IdentityStore::without_latency();
    store.create("a@x.com", "pw1", "Ann").await.expect("create");

    assert_eq!(
        store.authenticate("nobody@x.com", "pw1").await,
        Err(AuthError::InvalidCredentials)
    );
    assert_eq!(
        store.authenticate("a@x.com", "PW1").await,
        Err(AuthError::InvalidCredentials)
    );
}

#[tokio::test]
async fn resolve_token_finds_live_users_only() {
    let store = IdentityStore::without_latency();
    let ann = store.create("a@x.com", "pw1", "Ann").await.expect("create");

    let resolved = store
        .resolve_token(&token_for(&ann.id))
        .await
        .expect("resolves");
    assert_eq!(resolved, ann);
    assert!(store.resolve_token("token-user99").await.is_none());
    assert!(store.resolve_token("garbage").await.is_none());
}

#[tokio::test]
async fn update_merges_fields_and_keeps_identity() {
    let store = IdentityStore::without_latency();
    let ann = store.create("a@x.com", "pw1", "Ann").await.expect("create");

    let patch = ProfilePatch {
        weight: Some("60 kg".into()),
        goal: Some(TrainingGoal::Cutting),
        ..ProfilePatch::default()
    };
    let updated = store.update(&ann.id, &patch).await.expect("update");
    assert_eq!(updated.id, ann.id);
    assert_eq!(updated.name, "Ann");
    assert_eq!(updated.weight.as_deref(), Some("60 kg"));
    assert_eq!(updated.goal, TrainingGoal::Cutting);

    let reread = store.find_by_email("a@x.com").await.expect("reread");
    assert_eq!(reread, updated);
    store
        .authenticate("a@x.com", "pw1")
        .await
        .expect("secret unchanged by profile update");
}

#[tokio::test]
async fn update_unknown_user_fails() {
    let store = IdentityStore::without_latency();
    let err = store
        .update(&UserId::new("user9"), &ProfilePatch::default())
        .await
        .expect_err("missing");
    assert_eq!(err, AuthError::UserNotFound);
}

#[tokio::test]
async fn update_unknown_user_fails_even_with_taken_email() {
    let store = IdentityStore::without_latency();
    store.create("a@x.com", "pw1", "Ann").await.expect("create");

    let patch = ProfilePatch {
        email: Some("a@x.com".into()),
        ..ProfilePatch::default()
    };
    assert_eq!(
        store.update(&UserId::new("user9"), &patch).await,
        Err(AuthError::UserNotFound)
    );
}

#[tokio::test]
async fn update_cannot_take_another_users_email() {
    let store = IdentityStore::without_latency();
    let ann = store.create("a@x.com", "pw1", "Ann").await.expect("ann");
    store.create("b@x.com", "pw2", "Bob").await.expect("bob");

    let steal = ProfilePatch {
        email: Some("b@x.com".into()),
        ..ProfilePatch::default()
    };
    assert_eq!(
        store.update(&ann.id, &steal).await,
        Err(AuthError::DuplicateEmail)
    );

    let same = ProfilePatch {
        email: Some("a@x.com".into()),
        ..ProfilePatch::default()
    };
    store
        .update(&ann.id, &same)
        .await
        .expect("re-setting own email is allowed");
}

#[tokio::test]
async fn clones_share_one_registry() {
    let store = IdentityStore::without_latency();
    let handle = store.clone();
    handle.create("a@x.com", "pw1", "Ann").await.expect("create");
    assert!(store.find_by_email("a@x.com").await.is_some());
}

#[tokio::test]
async fn configured_latency_delays_calls() {
    let store = IdentityStore::new(Latency {
        auth: Duration::from_millis(40),
        lookup: Duration::ZERO,
    });
    let started = std::time::Instant::now();
    store.create("a@x.com", "pw1", "Ann").await.expect("create");
    assert!(started.elapsed() >= Duration::from_millis(40));
}
