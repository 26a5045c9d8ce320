use globetrotter_core::model::{
    AnswerStatus, DestinationDraft, DestinationId, Handle, OptionSet, QuestionDraft, SessionState,
    UserId,
};
use globetrotter_core::time::fixed_now;
use storage::repository::{
    AnswerRecord, DestinationRepository, NewSessionRecord, SessionRepository, StorageError,
    UserRepository,
};
use storage::seed::{SeedOutcome, parse_dataset, seed_if_empty};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn connect_file(dir: &tempfile::TempDir) -> SqliteRepository {
    let path = dir.path().join("globetrotter.sqlite3");
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn draft(city: &str, country: &str) -> DestinationDraft {
    DestinationDraft {
        city: city.into(),
        country: country.into(),
        clues: vec![format!("Somewhere in {country}")],
        fun_facts: vec![format!("{city} fact")],
        trivia: vec![format!("{city} trivia")],
    }
}

async fn seeded(repo: &SqliteRepository) -> Vec<DestinationId> {
    repo.insert_destinations(&[
        draft("Paris", "France"),
        draft("Tokyo", "Japan"),
        draft("Lima", "Peru"),
        draft("Cairo", "Egypt"),
    ])
    .await
    .expect("insert destinations")
}

fn question(ids: &[DestinationId], correct: usize) -> QuestionDraft {
    let options = OptionSet::from_slice(&ids[..4]).unwrap();
    QuestionDraft::new("Which city?", options, ids[correct]).unwrap()
}

#[tokio::test]
async fn destinations_roundtrip_with_json_lists() {
    let repo = connect("memdb_destinations").await;
    let ids = seeded(&repo).await;

    let listed = repo.list_destinations().await.unwrap();
    assert_eq!(listed.len(), 4);
    assert_eq!(listed[0].id(), ids[0]);
    assert_eq!(listed[0].label(), "Paris, France");
    assert_eq!(listed[0].clues(), ["Somewhere in France".to_string()]);
    assert_eq!(listed[3].fun_facts(), ["Cairo fact".to_string()]);
    assert_eq!(repo.count_destinations().await.unwrap(), 4);
}

#[tokio::test]
async fn migrations_are_idempotent() {
    let repo = connect("memdb_migrate_twice").await;
    repo.migrate().await.expect("second migrate");
    assert_eq!(repo.count_destinations().await.unwrap(), 0);
}

#[tokio::test]
async fn users_are_unique_by_handle() {
    let repo = connect("memdb_users").await;
    let handle = Handle::new("alice").unwrap();

    let user = repo.insert_user(&handle, fixed_now()).await.unwrap();
    let err = repo.insert_user(&handle, fixed_now()).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let by_handle = repo.get_user_by_handle(&handle).await.unwrap().unwrap();
    assert_eq!(by_handle, user);
    assert_eq!(by_handle.created_at(), fixed_now());
    assert!(repo.get_user(UserId::new(404)).await.unwrap().is_none());
}

#[tokio::test]
async fn session_with_unknown_user_writes_nothing() {
    let repo = connect("memdb_unknown_user").await;
    let ids = seeded(&repo).await;

    let err = repo
        .create_session(NewSessionRecord::new(
            UserId::new(77),
            fixed_now(),
            vec![question(&ids, 0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_questions")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!((sessions, questions), (0, 0));
}

#[tokio::test]
async fn answering_updates_question_and_counters() {
    let repo = connect("memdb_answers").await;
    let ids = seeded(&repo).await;
    let user = repo
        .insert_user(&Handle::new("bob").unwrap(), fixed_now())
        .await
        .unwrap();

    let session_id = repo
        .create_session(NewSessionRecord::new(
            user.id(),
            fixed_now(),
            vec![question(&ids, 0), question(&ids, 1)],
        ))
        .await
        .unwrap();

    let session = repo.get_session(session_id).await.unwrap().unwrap();
    assert_eq!(session.total_questions(), 2);
    assert_eq!(session.state(), SessionState::Created);
    assert_eq!(repo.count_unanswered(session_id).await.unwrap(), 2);

    let first = repo.next_unanswered(session_id).await.unwrap().unwrap();
    assert_eq!(first.options().ids(), &ids[..4]);

    // Wrong pick on the first question.
    let answer = AnswerRecord {
        session_id,
        question_id: first.id(),
        selected: ids[2],
        correct: false,
        answered_at: fixed_now(),
    };
    repo.record_answer(answer).await.unwrap();

    let err = repo.record_answer(answer).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let stored = repo.get_question(first.id()).await.unwrap().unwrap();
    assert_eq!(
        stored.status(),
        AnswerStatus::Answered {
            selected: ids[2],
            correct: false,
            answered_at: fixed_now(),
        }
    );

    let session = repo.get_session(session_id).await.unwrap().unwrap();
    let counters = session.counters();
    assert_eq!(
        (counters.answered(), counters.correct(), counters.incorrect()),
        (1, 0, 1)
    );
    assert_eq!(session.state(), SessionState::InProgress);

    let second = repo.next_unanswered(session_id).await.unwrap().unwrap();
    assert_ne!(second.id(), first.id());
    repo.record_answer(AnswerRecord {
        session_id,
        question_id: second.id(),
        selected: ids[1],
        correct: true,
        answered_at: fixed_now(),
    })
    .await
    .unwrap();

    let session = repo.get_session(session_id).await.unwrap().unwrap();
    assert_eq!(session.state(), SessionState::Completed);
    assert_eq!(session.counters().correct(), 1);
    assert!(repo.next_unanswered(session_id).await.unwrap().is_none());
    assert_eq!(repo.list_questions(session_id).await.unwrap().len(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_session_creation_on_file_db_all_succeed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = connect_file(&dir).await;
    let ids = seeded(&repo).await;
    let user = repo
        .insert_user(&Handle::new("crowd").unwrap(), fixed_now())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..48 {
        let repo = repo.clone();
        let record = NewSessionRecord::new(
            user.id(),
            fixed_now(),
            vec![question(&ids, 0), question(&ids, 1)],
        );
        handles.push(tokio::spawn(async move { repo.create_session(record).await }));
    }

    let mut created = Vec::new();
    for handle in handles {
        created.push(handle.await.unwrap().expect("create_session under contention"));
    }
    created.sort();
    created.dedup();
    assert_eq!(created.len(), 48);

    let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM session_questions")
        .fetch_one(repo.pool())
        .await
        .unwrap();
    assert_eq!((sessions, questions), (48, 96));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn unknown_user_on_file_db_is_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = connect_file(&dir).await;
    let ids = seeded(&repo).await;

    let err = repo
        .create_session(NewSessionRecord::new(
            UserId::new(9),
            fixed_now(),
            vec![question(&ids, 2)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_answers_on_file_db_have_one_winner() {
    let dir = tempfile::tempdir().expect("tempdir");
    let repo = connect_file(&dir).await;
    let ids = seeded(&repo).await;
    let user = repo
        .insert_user(&Handle::new("racer").unwrap(), fixed_now())
        .await
        .unwrap();
    let session_id = repo
        .create_session(NewSessionRecord::new(
            user.id(),
            fixed_now(),
            vec![question(&ids, 0)],
        ))
        .await
        .unwrap();
    let target = repo.next_unanswered(session_id).await.unwrap().unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let repo = repo.clone();
        let selected = ids[i % 4];
        let answer = AnswerRecord {
            session_id,
            question_id: target.id(),
            selected,
            correct: selected == ids[0],
            answered_at: fixed_now(),
        };
        handles.push(tokio::spawn(async move { repo.record_answer(answer).await }));
    }

    let mut winners = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => winners += 1,
            Err(StorageError::Conflict) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(winners, 1);

    let session = repo.get_session(session_id).await.unwrap().unwrap();
    assert_eq!(session.counters().answered(), 1);
    assert_eq!(session.state(), SessionState::Completed);
    assert!(repo.get_question(target.id()).await.unwrap().unwrap().is_answered());
}

#[tokio::test]
async fn answer_for_foreign_session_is_not_found() {
    let repo = connect("memdb_foreign").await;
    let ids = seeded(&repo).await;
    let user = repo
        .insert_user(&Handle::new("carol").unwrap(), fixed_now())
        .await
        .unwrap();

    let mine = repo
        .create_session(NewSessionRecord::new(
            user.id(),
            fixed_now(),
            vec![question(&ids, 0)],
        ))
        .await
        .unwrap();
    let other = repo
        .create_session(NewSessionRecord::new(
            user.id(),
            fixed_now(),
            vec![question(&ids, 0)],
        ))
        .await
        .unwrap();
    let q = repo.next_unanswered(mine).await.unwrap().unwrap();

    let err = repo
        .record_answer(AnswerRecord {
            session_id: other,
            question_id: q.id(),
            selected: ids[0],
            correct: true,
            answered_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(!repo.get_question(q.id()).await.unwrap().unwrap().is_answered());
}

#[tokio::test]
async fn mismatched_correctness_rolls_back() {
    let repo = connect("memdb_rollback").await;
    let ids = seeded(&repo).await;
    let user = repo
        .insert_user(&Handle::new("dave").unwrap(), fixed_now())
        .await
        .unwrap();
    let session_id = repo
        .create_session(NewSessionRecord::new(
            user.id(),
            fixed_now(),
            vec![question(&ids, 0)],
        ))
        .await
        .unwrap();
    let q = repo.next_unanswered(session_id).await.unwrap().unwrap();

    let err = repo
        .record_answer(AnswerRecord {
            session_id,
            question_id: q.id(),
            selected: ids[0],
            correct: false,
            answered_at: fixed_now(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Serialization(_)));
    assert_eq!(repo.count_unanswered(session_id).await.unwrap(), 1);
    let session = repo.get_session(session_id).await.unwrap().unwrap();
    assert_eq!(session.counters().answered(), 0);
}

#[tokio::test]
async fn seeding_sqlite_is_idempotent() {
    let repo = connect("memdb_seed").await;
    let drafts = parse_dataset(
        r#"[{"city": "Oslo", "country": "Norway", "clues": ["Fjords"], "fun_fact": [], "trivia": []}]"#,
    )
    .unwrap();

    assert_eq!(
        seed_if_empty(&repo, &drafts).await.unwrap(),
        SeedOutcome::Inserted(1)
    );
    assert_eq!(
        seed_if_empty(&repo, &drafts).await.unwrap(),
        SeedOutcome::AlreadySeeded { existing: 1 }
    );
}
