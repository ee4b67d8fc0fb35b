//! `PgCommentStore` against a real database.
//!
//! Ignored by default; run with `DATABASE_URL` set and `--ignored`.

use assert_matches::assert_matches;
use sqlx::PgPool;
use tutor_core::comment::{CommentError, CommentStatus, TOMBSTONE_CONTENT};
use tutor_core::paging::PageRequest;
use tutor_core::policy::CommentPolicy;
use tutor_core::types::DbId;
use tutor_db::models::comment::NewComment;
use tutor_db::models::exercise::CreateExercise;
use tutor_db::models::user::CreateUser;
use tutor_db::repositories::{CommentFlagRepo, ExerciseRepo, UserRepo};
use tutor_db::{CommentStore, PgCommentStore, StoreError};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn seed_exercise(pool: &PgPool) -> DbId {
    ExerciseRepo::create(
        pool,
        &CreateExercise {
            title: "Fractions".to_string(),
            published: true,
            commentable: true,
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_users(pool: &PgPool, count: usize) -> Vec<DbId> {
    let mut ids = Vec::with_capacity(count);
    for i in 0..count {
        let user = UserRepo::create(
            pool,
            &CreateUser {
                username: format!("learner{i}"),
                role: "learner".to_string(),
            },
        )
        .await
        .unwrap();
        ids.push(user.id);
    }
    ids
}

fn store(pool: PgPool, threshold: i32) -> PgCommentStore {
    PgCommentStore::new(
        pool,
        CommentPolicy {
            flag_threshold: threshold,
            ..Default::default()
        },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_create_and_list_top_level(pool: PgPool) {
    let exercise_id = seed_exercise(&pool).await;
    let users = seed_users(&pool, 1).await;
    let store = store(pool, 5);

    store
        .create(NewComment::top_level(exercise_id, "Hello").by_author(users[0]))
        .await
        .unwrap();

    let listed = store
        .find_top_level(exercise_id, PageRequest::new(0, 10))
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].content, "Hello");
    assert_eq!(listed[0].status, CommentStatus::Visible);
    assert_eq!(listed[0].flags_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_flag_threshold_and_duplicate(pool: PgPool) {
    let exercise_id = seed_exercise(&pool).await;
    let users = seed_users(&pool, 6).await;
    let store = store(pool.clone(), 5);

    let comment = store
        .create(NewComment::top_level(exercise_id, "Hello").by_author(users[5]))
        .await
        .unwrap();

    for flagger in &users[..4] {
        let result = store.flag(comment.id, *flagger).await.unwrap();
        assert_eq!(result.comment.status, CommentStatus::Visible);
    }
    let fifth = store.flag(comment.id, users[4]).await.unwrap();
    assert!(fifth.became_hidden);
    assert_eq!(fifth.comment.flags_count, 5);

    assert_matches!(
        store.flag(comment.id, users[0]).await,
        Err(StoreError::Comment(CommentError::AlreadyFlagged { .. }))
    );

    let stored = store.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.flags_count, 5);
    assert_eq!(
        CommentFlagRepo::count_for_comment(&pool, comment.id)
            .await
            .unwrap(),
        5
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_soft_delete_keeps_replies(pool: PgPool) {
    let exercise_id = seed_exercise(&pool).await;
    let users = seed_users(&pool, 2).await;
    let store = store(pool, 5);

    let parent = store
        .create(NewComment::top_level(exercise_id, "Hello").by_author(users[0]))
        .await
        .unwrap();
    store
        .create(
            NewComment::top_level(exercise_id, "Thanks")
                .by_author(users[1])
                .reply_to(parent.id),
        )
        .await
        .unwrap();

    let deleted = store.soft_delete(parent.id, users[0], false).await.unwrap();
    assert_eq!(deleted.status, CommentStatus::Deleted);
    assert_eq!(deleted.content, TOMBSTONE_CONTENT);

    let replies = store
        .find_replies(parent.id, PageRequest::new(0, 10))
        .await
        .unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].content, "Thanks");
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_cross_exercise_parent_rejected(pool: PgPool) {
    let first = seed_exercise(&pool).await;
    let second = seed_exercise(&pool).await;
    let store = store(pool, 5);

    let parent = store
        .create(NewComment::top_level(first, "root"))
        .await
        .unwrap();
    assert_matches!(
        store
            .create(NewComment::top_level(second, "stray").reply_to(parent.id))
            .await,
        Err(StoreError::Comment(CommentError::ParentNotFound { .. }))
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_flags_all_counted(pool: PgPool) {
    let exercise_id = seed_exercise(&pool).await;
    let users = seed_users(&pool, 10).await;
    let store = std::sync::Arc::new(store(pool, 100));

    let comment = store
        .create(NewComment::top_level(exercise_id, "popular"))
        .await
        .unwrap();

    let tasks: Vec<_> = users
        .iter()
        .map(|&flagger| {
            let store = store.clone();
            tokio::spawn(async move { store.flag(comment.id, flagger).await })
        })
        .collect();
    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    let stored = store.find_by_id(comment.id).await.unwrap().unwrap();
    assert_eq!(stored.flags_count, 10);
    assert_eq!(store.count_flags(comment.id).await.unwrap(), 10);

    let mut flaggers: Vec<DbId> = CommentFlagRepo::list_for_comment(store.pool(), comment.id)
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.flagger_id)
        .collect();
    flaggers.sort_unstable();
    let mut expected = users.clone();
    expected.sort_unstable();
    assert_eq!(flaggers, expected);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_creates_respect_rate_limit(pool: PgPool) {
    let exercise_id = seed_exercise(&pool).await;
    let users = seed_users(&pool, 1).await;
    let author = users[0];
    let store = std::sync::Arc::new(store(pool, 5));

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .create(
                        NewComment::top_level(exercise_id, format!("burst {i}"))
                            .by_author(author)
                            .limited(2, 60),
                    )
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_matches!(e, StoreError::Comment(CommentError::RateLimited { .. })),
        }
    }
    assert_eq!(created, 2);
    assert_eq!(
        store
            .find_by_author(author, PageRequest::new(0, 50))
            .await
            .unwrap()
            .len(),
        2
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_moderation_lookups(pool: PgPool) {
    let exercise_id = seed_exercise(&pool).await;
    let users = seed_users(&pool, 2).await;
    let store = store(pool, 1);
    let page = PageRequest::new(0, 50);

    let spam = store
        .create(NewComment::top_level(exercise_id, "Buy 100% cheap answers").by_author(users[0]))
        .await
        .unwrap();
    let question = store
        .create(NewComment::top_level(exercise_id, "How do fractions work?").by_author(users[1]))
        .await
        .unwrap();
    store.flag(spam.id, users[1]).await.unwrap();

    let hidden = store.find_by_status(CommentStatus::Hidden, page).await.unwrap();
    assert_eq!(hidden.len(), 1);
    assert_eq!(hidden[0].id, spam.id);

    let by_author = store.find_by_author(users[1], page).await.unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].id, question.id);

    let found = store.search("FRACTIONS", page).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, question.id);
    // `%` is matched literally.
    assert_eq!(store.search("100%", page).await.unwrap().len(), 1);
    assert!(store.search("%x%", page).await.unwrap().is_empty());

    let start = spam.created_at - chrono::Duration::seconds(1);
    let end = question.created_at + chrono::Duration::seconds(1);
    assert_eq!(store.find_by_date_range(start, end).await.unwrap().len(), 2);
    assert!(store.find_by_date_range(end, end).await.unwrap().is_empty());
}
