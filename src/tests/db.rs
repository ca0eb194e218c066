//! Repository contract tests against the in-memory backend

use crate::db::models::{Entity, Role, UserAuth, UserProfile};
use crate::db::repository::{
    with_transaction, Collection, Cursor, FieldMap, FieldValue, Filter, MemoryRepository,
    Repository, RepositoryError, TransactionConfig,
};
use crate::db::stores::{ensure_indexes, ProfileStore, UserAuthStore};
use pretty_assertions::assert_eq;
use uuid::Uuid;

fn user(username: &str) -> UserAuth {
    UserAuth::new(Uuid::new_v4(), username, "$2b$04$testhash", Role::User)
}

async fn repo() -> MemoryRepository {
    let repo = MemoryRepository::new();
    ensure_indexes(&repo).await.unwrap();
    repo
}

#[tokio::test]
async fn test_unique_username_enforced() {
    let repo = repo().await;
    UserAuthStore::insert(&repo, &user("dup@example.com"))
        .await
        .unwrap();
    let err = UserAuthStore::insert(&repo, &user("dup@example.com"))
        .await
        .unwrap_err();
    assert_eq!(err, RepositoryError::DuplicateKey("username".to_string()));
}

#[tokio::test]
async fn test_tombstoned_rows_are_invisible() {
    let repo = repo().await;
    let stored = UserAuthStore::insert(&repo, &user("gone@example.com"))
        .await
        .unwrap();
    UserAuthStore::tombstone(&repo, stored.object_id).await.unwrap();

    assert!(UserAuthStore::find_by_id(&repo, stored.object_id)
        .await
        .unwrap()
        .is_none());
    assert!(UserAuthStore::find_by_username(&repo, "gone@example.com")
        .await
        .unwrap()
        .is_none());

    // A tombstone does not reserve the username.
    assert!(UserAuthStore::insert(&repo, &user("gone@example.com"))
        .await
        .is_ok());
}

#[tokio::test]
async fn test_ownership_miss_and_foreign_owner_are_indistinguishable() {
    let repo = repo().await;
    let profile = UserProfile::bootstrap(Uuid::new_v4(), "Owner", "owner@example.com");
    ProfileStore::insert(&repo, &profile).await.unwrap();

    let updates = FieldMap::new().set("tagline", FieldValue::String("hi".into()));

    let missing = repo
        .update_with_ownership(
            Collection::UserProfile,
            Uuid::new_v4(),
            Uuid::new_v4(),
            &updates,
        )
        .await
        .unwrap_err();
    let not_owned = repo
        .update_with_ownership(
            Collection::UserProfile,
            profile.object_id,
            Uuid::new_v4(),
            &updates,
        )
        .await
        .unwrap_err();
    assert_eq!(missing, RepositoryError::NotFound);
    assert_eq!(missing, not_owned);

    // The right owner succeeds.
    repo.update_with_ownership(
        Collection::UserProfile,
        profile.object_id,
        profile.object_id,
        &updates,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_unknown_fields_rejected() {
    let repo = repo().await;
    let filter = Filter::new().eq("no_such_field", FieldValue::Bool(true));
    let err = repo
        .find_one(Collection::UserAuth, &filter)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidFilter(_)));

    let updates = FieldMap::new().set("not_a_field", FieldValue::Null);
    let err = repo
        .update_fields(Collection::UserAuth, &Filter::new(), &updates)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::InvalidFilter(_)));
}

#[tokio::test]
async fn test_commit_then_commit_is_inactive() {
    let repo = repo().await;
    let tx = repo
        .begin_transaction(TransactionConfig::default())
        .await
        .unwrap();
    tx.save(Collection::UserAuth, user("tx@example.com").to_document().unwrap())
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(tx.commit().await.unwrap_err(), RepositoryError::TransactionInactive);
    assert_eq!(
        tx.rollback().await.unwrap_err(),
        RepositoryError::TransactionInactive
    );

    // The write landed exactly once.
    assert!(UserAuthStore::find_by_username(&repo, "tx@example.com")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn test_rollback_discards_staged_writes() {
    let repo = repo().await;
    let tx = repo
        .begin_transaction(TransactionConfig::default())
        .await
        .unwrap();
    tx.save(Collection::UserAuth, user("rb@example.com").to_document().unwrap())
        .await
        .unwrap();

    // The transaction reads its own staged write; the store does not.
    assert!(UserAuthStore::find_by_username(&tx, "rb@example.com")
        .await
        .unwrap()
        .is_some());
    assert!(UserAuthStore::find_by_username(&repo, "rb@example.com")
        .await
        .unwrap()
        .is_none());

    tx.rollback().await.unwrap();
    assert_eq!(
        tx.rollback().await.unwrap_err(),
        RepositoryError::TransactionInactive
    );
    assert!(UserAuthStore::find_by_username(&repo, "rb@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_nested_transaction_is_an_error() {
    let repo = repo().await;
    let tx = repo
        .begin_transaction(TransactionConfig::default())
        .await
        .unwrap();
    let err = tx
        .begin_transaction(TransactionConfig::default())
        .await
        .unwrap_err();
    assert_eq!(err, RepositoryError::NestedTransaction);
}

#[tokio::test]
async fn test_read_only_transaction_rejects_writes() {
    let repo = repo().await;
    let tx = repo
        .begin_transaction(TransactionConfig::read_only())
        .await
        .unwrap();
    let err = tx
        .save(Collection::UserAuth, user("ro@example.com").to_document().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::UnsupportedOperation(_)));
}

#[tokio::test]
async fn test_concurrent_writer_conflicts_the_commit() {
    let repo = repo().await;
    let stored = UserAuthStore::insert(&repo, &user("racy@example.com"))
        .await
        .unwrap();

    let tx = repo
        .begin_transaction(TransactionConfig::default())
        .await
        .unwrap();
    UserAuthStore::update_password(&tx, stored.object_id, "$2b$04$staged")
        .await
        .unwrap();

    // Another writer gets there first. A different stamp guarantees the
    // precondition no longer holds.
    let updates = FieldMap::new()
        .set("password", FieldValue::String("$2b$04$other".into()))
        .set("last_updated", FieldValue::Timestamp(stored.last_updated + 10));
    repo.update_fields(
        Collection::UserAuth,
        &Filter::by_id(stored.object_id),
        &updates,
    )
    .await
    .unwrap();

    assert_eq!(
        tx.commit().await.unwrap_err(),
        RepositoryError::TransactionConflict
    );

    let current = UserAuthStore::find_by_id(&repo, stored.object_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.password, "$2b$04$other");
}

#[tokio::test]
async fn test_with_transaction_rolls_back_on_error() {
    let repo = repo().await;
    let outcome: Result<(), RepositoryError> = with_transaction(
        &repo,
        TransactionConfig::default(),
        |tx| {
            Box::pin(async move {
                tx.save(
                    Collection::UserAuth,
                    user("doomed@example.com").to_document().unwrap(),
                )
                .await?;
                Err(RepositoryError::TransactionFailed("callback failed".into()))
            })
        },
    )
    .await;
    assert!(outcome.is_err());
    assert!(UserAuthStore::find_by_username(&repo, "doomed@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_cursor_pagination_orders_newest_first() {
    let repo = repo().await;
    for i in 0..15 {
        let mut account = user(&format!("page{}@example.com", i));
        account.created_date = 1_700_000_000 + i;
        account.last_updated = account.created_date;
        UserAuthStore::insert(&repo, &account).await.unwrap();
    }

    let first = repo
        .find_many(Collection::UserAuth, &Filter::new(), &Cursor::first(10))
        .await
        .unwrap();
    assert_eq!(first.documents.len(), 10);
    let next = first.next_cursor.expect("second page exists");

    let second = repo
        .find_many(Collection::UserAuth, &Filter::new(), &Cursor::after(next, 10))
        .await
        .unwrap();
    assert_eq!(second.documents.len(), 5);
    assert!(second.next_cursor.is_none());

    let newest = first.documents[0]["created_date"].as_i64().unwrap();
    let oldest = second.documents[4]["created_date"].as_i64().unwrap();
    assert!(newest > oldest);

    let mut seen: Vec<&str> = first
        .documents
        .iter()
        .chain(second.documents.iter())
        .map(|doc| doc["object_id"].as_str().unwrap())
        .collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 15);
}

#[tokio::test]
async fn test_increment_fields() {
    let repo = repo().await;
    let verification = crate::db::models::UserVerification::new(
        Uuid::new_v4(),
        "123456",
        "count@example.com",
        crate::db::models::TargetType::Email,
        "$2b$04$hash",
        "Counting User",
        "10.0.0.1",
        900,
    );
    let stored = crate::db::stores::VerificationStore::insert(&repo, &verification)
        .await
        .unwrap();

    for _ in 0..3 {
        crate::db::stores::VerificationStore::increment_counter(&repo, stored.object_id)
            .await
            .unwrap();
    }
    let loaded = crate::db::stores::VerificationStore::find_by_id(&repo, stored.object_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.counter, 3);
}
