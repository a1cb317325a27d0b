mod common;

use common::{insert_user, memory_db};
use tessera_orm::models::User;
use tessera_orm::{CrudOperations, Database, ModelError, ModelResult};

async fn user_count(db: &Database) -> u64 {
    User::query().count(db).await.unwrap()
}

#[tokio::test]
async fn test_commit_keeps_writes() {
    let db = memory_db().await;

    db.begin_transaction().await.unwrap();
    assert!(db.in_transaction().await);
    insert_user(&db, "Ann", "ann@example.com", "member").await;
    User::create(&db, [("name", "Bo"), ("email", "bo@example.com")])
        .await
        .unwrap();
    db.commit().await.unwrap();

    assert!(!db.in_transaction().await);
    assert_eq!(user_count(&db).await, 2);
}

#[tokio::test]
async fn test_roll_back_discards_writes() {
    let db = memory_db().await;
    insert_user(&db, "Ann", "ann@example.com", "member").await;

    db.begin_transaction().await.unwrap();
    insert_user(&db, "Bo", "bo@example.com", "member").await;
    // reads inside the transaction see its own writes
    assert_eq!(user_count(&db).await, 2);
    db.roll_back().await.unwrap();

    assert_eq!(user_count(&db).await, 1);
}

#[tokio::test]
async fn test_nested_and_unmatched_calls_are_rejected() {
    let db = memory_db().await;

    assert!(matches!(db.commit().await, Err(ModelError::Transaction(_))));
    assert!(matches!(db.roll_back().await, Err(ModelError::Transaction(_))));

    db.begin_transaction().await.unwrap();
    assert!(matches!(
        db.begin_transaction().await,
        Err(ModelError::Transaction(_))
    ));
    // the outer transaction is still usable
    insert_user(&db, "Ann", "ann@example.com", "member").await;
    db.commit().await.unwrap();
    assert_eq!(user_count(&db).await, 1);
}

#[tokio::test]
async fn test_scoped_transaction_commits_on_ok() {
    let db = memory_db().await;

    let id = db
        .transaction(|db| async move {
            let user = User::create(db, [("name", "Ann"), ("email", "ann@example.com")]).await?;
            user.primary_key()
                .ok_or(ModelError::MissingPrimaryKey)
        })
        .await
        .unwrap();

    assert!(!db.in_transaction().await);
    assert!(User::find(&db, id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_scoped_transaction_rolls_back_on_err() {
    let db = memory_db().await;

    let result: ModelResult<()> = db
        .transaction(|db| async move {
            insert_user(db, "Ann", "ann@example.com", "member").await;
            // duplicate email violates the unique index
            User::create(db, [("name", "Ann"), ("email", "ann@example.com")]).await?;
            Ok(())
        })
        .await;

    assert!(matches!(result, Err(ModelError::Database(_))));
    assert!(!db.in_transaction().await);
    assert_eq!(user_count(&db).await, 0);
}
