//! End-to-end behavior of the poll engine against an in-memory database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use polis_common::{AppError, ManualClock, PollConfig, SharedClock};
use polis_core::{
    AggregationEngine, PartialPayload, PollResult, PollService, PollSpec, PollView, Respondent,
    ResponseLedger, ResponsePayload, ResultBreakdown, VisibilityGate, WindowPhase,
};
use polis_db::entities::{
    poll::{QuestionType, VisibilityMode},
    poll_response::ResponseStatus,
};
use polis_db::repositories::{PollOptionRepository, PollRepository, PollResponseRepository};
use polis_db::test_utils::TestDatabase;

struct Engine {
    polls: PollService,
    ledger: ResponseLedger,
    gate: VisibilityGate,
    responses: PollResponseRepository,
    clock: Arc<ManualClock>,
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
}

async fn engine() -> Engine {
    let db = Arc::new(
        TestDatabase::in_memory()
            .await
            .expect("in-memory database")
            .into_connection(),
    );
    let clock = Arc::new(ManualClock::new(start()));
    let shared: SharedClock = clock.clone();

    let poll_repo = PollRepository::new(db.clone());
    let option_repo = PollOptionRepository::new(db.clone());
    let response_repo = PollResponseRepository::new(db);

    let engine = AggregationEngine::new(
        poll_repo.clone(),
        option_repo.clone(),
        response_repo.clone(),
        shared.clone(),
    );

    Engine {
        polls: PollService::new(
            poll_repo.clone(),
            option_repo.clone(),
            shared.clone(),
            PollConfig::default(),
        ),
        ledger: ResponseLedger::new(
            poll_repo.clone(),
            option_repo,
            response_repo.clone(),
            shared.clone(),
        ),
        gate: VisibilityGate::new(poll_repo, response_repo.clone(), engine, shared),
        responses: response_repo,
        clock,
    }
}

fn spec(question_type: QuestionType, options: &[&str]) -> PollSpec {
    PollSpec {
        question: "Which one?".to_string(),
        question_type,
        visibility_mode: VisibilityMode::AlwaysVisible,
        expert_only: false,
        allow_vote_change: false,
        start_at: start(),
        end_at: start() + Duration::hours(2),
        options: options.iter().map(|o| (*o).to_string()).collect(),
        scale_points: None,
        min_label: None,
        mid_label: None,
        max_label: None,
    }
}

fn likert(points: i32) -> PollSpec {
    PollSpec {
        scale_points: Some(points),
        min_label: Some("Disagree".to_string()),
        max_label: Some("Agree".to_string()),
        ..spec(QuestionType::Likert, &[])
    }
}

async fn create(engine: &Engine, spec: PollSpec) -> PollView {
    engine
        .polls
        .create_poll("thread1", "author1", spec)
        .await
        .unwrap()
}

fn pick(view: &PollView, index: usize) -> ResponsePayload {
    ResponsePayload::SingleChoice {
        option_id: view.options[index].id.clone(),
    }
}

fn choice_counts(result: &PollResult) -> Vec<u64> {
    match &result.breakdown {
        ResultBreakdown::Choice { options } => options.iter().map(|o| o.count).collect(),
        ResultBreakdown::Likert { .. } => panic!("Expected choice breakdown"),
    }
}

#[tokio::test]
async fn test_created_poll_keeps_options_in_order() {
    let engine = engine().await;
    let created = create(&engine, spec(QuestionType::SingleChoice, &["A", "B", "C"])).await;

    let view = engine.polls.get_poll(&created.poll.id).await.unwrap();
    let texts: Vec<_> = view.options.iter().map(|o| o.text.as_str()).collect();
    assert_eq!(texts, vec!["A", "B", "C"]);
    assert_eq!(view.phase, WindowPhase::Open);

    let listed = engine.polls.list_polls("thread1").await.unwrap();
    assert_eq!(listed.len(), 1);
}

#[tokio::test]
async fn test_invalid_poll_is_not_stored() {
    let engine = engine().await;
    let result = engine
        .polls
        .create_poll("thread1", "author1", spec(QuestionType::SingleChoice, &["A"]))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
    assert!(engine.polls.list_polls("thread1").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_vote_change_conflict() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::SingleChoice, &["A", "B"])).await;
    let x = Respondent::new("x");

    engine
        .ledger
        .submit(&view.poll.id, &x, pick(&view, 0))
        .await
        .unwrap();
    let second = engine.ledger.submit(&view.poll.id, &x, pick(&view, 1)).await;

    match second {
        Err(AppError::Conflict(msg)) => assert_eq!(msg, "vote change not permitted"),
        other => panic!("Expected Conflict error, got {other:?}"),
    }

    let result = engine.gate.results(&view.poll.id, Some("x")).await.unwrap();
    assert_eq!(choice_counts(&result), vec![1, 0]);
}

#[tokio::test]
async fn test_likert_update_changes_mean() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            allow_vote_change: true,
            ..likert(5)
        },
    )
    .await;
    let x = Respondent::new("x");

    let response = engine
        .ledger
        .submit(&view.poll.id, &x, ResponsePayload::Likert { value: 3 })
        .await
        .unwrap();
    engine
        .ledger
        .update(
            &view.poll.id,
            &response.id,
            &Respondent::new("x"),
            PartialPayload {
                option_id: None,
                value: Some(5),
            },
        )
        .await
        .unwrap();

    let result = engine.gate.results(&view.poll.id, None).await.unwrap();
    assert_eq!(result.total_respondents, 1);
    match result.breakdown {
        ResultBreakdown::Likert { mean, distribution } => {
            assert_eq!(mean, Some(5.0));
            assert_eq!(distribution[4].count, 1);
            assert_eq!(distribution[2].count, 0);
        }
        ResultBreakdown::Choice { .. } => panic!("Expected likert breakdown"),
    }
}

#[tokio::test]
async fn test_hidden_until_close() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            visibility_mode: VisibilityMode::HiddenUntilClose,
            ..spec(QuestionType::SingleChoice, &["A", "B"])
        },
    )
    .await;

    engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("x"), pick(&view, 1))
        .await
        .unwrap();

    for viewer in [Some("author1"), Some("x"), None] {
        match engine.gate.results(&view.poll.id, viewer).await {
            Err(AppError::State(msg)) => assert_eq!(msg, "results hidden"),
            other => panic!("Expected State error, got {other:?}"),
        }
    }

    engine.clock.advance(Duration::hours(2));

    let result = engine
        .gate
        .results(&view.poll.id, Some("author1"))
        .await
        .unwrap();
    assert_eq!(choice_counts(&result), vec![0, 1]);
}

#[tokio::test]
async fn test_replaced_selection_is_swapped_whole() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            allow_vote_change: true,
            ..spec(QuestionType::MultiChoice, &["one", "two", "three"])
        },
    )
    .await;
    let ids: Vec<String> = view.options.iter().map(|o| o.id.clone()).collect();
    let x = Respondent::new("x");

    let first = engine
        .ledger
        .replace_options(&view.poll.id, None, &x, &ids[..2])
        .await
        .unwrap();
    let result = engine.gate.results(&view.poll.id, None).await.unwrap();
    assert_eq!(choice_counts(&result), vec![1, 1, 0]);

    engine
        .ledger
        .replace_options(&view.poll.id, Some(first.response.id.as_str()), &x, &ids[2..])
        .await
        .unwrap();

    let result = engine.gate.results(&view.poll.id, None).await.unwrap();
    assert_eq!(result.total_respondents, 1);
    assert_eq!(choice_counts(&result), vec![0, 0, 1]);

    let own = engine
        .ledger
        .get_own_response(&view.poll.id, "x")
        .await
        .unwrap();
    assert_eq!(own.option_ids, vec![ids[2].clone()]);
}

#[tokio::test]
async fn test_replace_without_vote_change() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::MultiChoice, &["one", "two", "three"])).await;
    let ids: Vec<String> = view.options.iter().map(|o| o.id.clone()).collect();
    let x = Respondent::new("x");

    engine
        .ledger
        .replace_options(&view.poll.id, None, &x, &[ids[2].clone(), ids[0].clone()])
        .await
        .unwrap();

    // same set in another order is not a change
    engine
        .ledger
        .replace_options(&view.poll.id, None, &x, &[ids[0].clone(), ids[2].clone()])
        .await
        .unwrap();

    let changed = engine
        .ledger
        .replace_options(&view.poll.id, None, &x, &ids[1..2])
        .await;
    assert!(matches!(changed, Err(AppError::Conflict(_))));

    let duplicate = engine
        .ledger
        .replace_options(&view.poll.id, None, &x, &[ids[0].clone(), ids[0].clone()])
        .await;
    assert!(matches!(duplicate, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn test_submit_at_window_boundary() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::SingleChoice, &["A", "B"])).await;
    let end = start() + Duration::hours(2);

    engine.clock.set(end - Duration::milliseconds(1));
    engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("early"), pick(&view, 0))
        .await
        .unwrap();

    engine.clock.set(end);
    match engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("late"), pick(&view, 0))
        .await
    {
        Err(AppError::State(msg)) => assert_eq!(msg, "poll not open"),
        other => panic!("Expected State error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_submit_before_start() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            start_at: start() + Duration::hours(1),
            end_at: start() + Duration::hours(3),
            ..spec(QuestionType::SingleChoice, &["A", "B"])
        },
    )
    .await;
    assert_eq!(view.phase, WindowPhase::NotYetOpen);

    let result = engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("x"), pick(&view, 0))
        .await;
    assert!(matches!(result, Err(AppError::State(_))));
    assert!(matches!(
        engine.gate.results(&view.poll.id, None).await,
        Err(AppError::State(_))
    ));
}

#[tokio::test]
async fn test_withdraw_is_idempotent_and_reactivation_reuses_slot() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::SingleChoice, &["A", "B"])).await;
    let x = Respondent::new("x");

    let response = engine
        .ledger
        .submit(&view.poll.id, &x, pick(&view, 0))
        .await
        .unwrap();

    engine
        .ledger
        .withdraw(&view.poll.id, &response.id, "x")
        .await
        .unwrap();
    engine
        .ledger
        .withdraw(&view.poll.id, &response.id, "x")
        .await
        .unwrap();

    let result = engine.gate.results(&view.poll.id, None).await.unwrap();
    assert_eq!(result.total_respondents, 0);
    assert_eq!(choice_counts(&result), vec![0, 0]);

    let reactivated = engine
        .ledger
        .submit(&view.poll.id, &x, pick(&view, 1))
        .await
        .unwrap();
    assert_eq!(reactivated.id, response.id);
    assert_eq!(reactivated.status, ResponseStatus::Active);
    assert_eq!(engine.responses.count_by_poll(&view.poll.id).await.unwrap(), 1);

    let result = engine.gate.results(&view.poll.id, None).await.unwrap();
    assert_eq!(choice_counts(&result), vec![0, 1]);
}

#[tokio::test]
async fn test_zero_responses_have_zero_percentages() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::SingleChoice, &["A", "B", "C"])).await;

    let result = engine.gate.results(&view.poll.id, None).await.unwrap();
    match result.breakdown {
        ResultBreakdown::Choice { options } => {
            assert_eq!(options.len(), 3);
            assert!(options.iter().all(|o| o.percentage == 0.0));
        }
        ResultBreakdown::Likert { .. } => panic!("Expected choice breakdown"),
    }
}

#[tokio::test]
async fn test_visible_after_vote_counts_withdrawn_participation() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            visibility_mode: VisibilityMode::VisibleAfterVote,
            ..spec(QuestionType::SingleChoice, &["A", "B"])
        },
    )
    .await;

    assert!(engine.gate.can_view(&view.poll.id, Some("x")).await.is_err());

    let response = engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("x"), pick(&view, 0))
        .await
        .unwrap();
    engine.gate.can_view(&view.poll.id, Some("x")).await.unwrap();

    engine
        .ledger
        .withdraw(&view.poll.id, &response.id, "x")
        .await
        .unwrap();
    engine.gate.can_view(&view.poll.id, Some("x")).await.unwrap();

    assert!(engine.gate.can_view(&view.poll.id, Some("y")).await.is_err());
    assert!(engine.gate.can_view(&view.poll.id, None).await.is_err());
}

#[tokio::test]
async fn test_expert_only_poll() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            expert_only: true,
            allow_vote_change: true,
            ..likert(3)
        },
    )
    .await;

    let denied = engine
        .ledger
        .submit(
            &view.poll.id,
            &Respondent::new("x"),
            ResponsePayload::Likert { value: 2 },
        )
        .await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    let response = engine
        .ledger
        .submit(
            &view.poll.id,
            &Respondent::expert("doc"),
            ResponsePayload::Likert { value: 2 },
        )
        .await
        .unwrap();

    let change = PartialPayload {
        option_id: None,
        value: Some(3),
    };
    let revoked = engine
        .ledger
        .update(
            &view.poll.id,
            &response.id,
            &Respondent::new("doc"),
            change.clone(),
        )
        .await;
    assert!(matches!(revoked, Err(AppError::Forbidden(_))));

    let updated = engine
        .ledger
        .update(&view.poll.id, &response.id, &Respondent::expert("doc"), change)
        .await
        .unwrap();
    assert_eq!(updated.likert_value, Some(3));
}

#[tokio::test]
async fn test_only_owner_can_mutate_response() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            allow_vote_change: true,
            ..spec(QuestionType::SingleChoice, &["A", "B"])
        },
    )
    .await;

    let response = engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("x"), pick(&view, 0))
        .await
        .unwrap();

    let update = engine
        .ledger
        .update(
            &view.poll.id,
            &response.id,
            &Respondent::new("mallory"),
            PartialPayload {
                option_id: Some(view.options[1].id.clone()),
                value: None,
            },
        )
        .await;
    assert!(matches!(update, Err(AppError::Forbidden(_))));

    let withdraw = engine
        .ledger
        .withdraw(&view.poll.id, &response.id, "mallory")
        .await;
    assert!(matches!(withdraw, Err(AppError::Forbidden(_))));

    let missing = engine.ledger.withdraw(&view.poll.id, "nope", "x").await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_update_requires_vote_change() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::SingleChoice, &["A", "B"])).await;

    let response = engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("x"), pick(&view, 0))
        .await
        .unwrap();

    let result = engine
        .ledger
        .update(
            &view.poll.id,
            &response.id,
            &Respondent::new("x"),
            PartialPayload {
                option_id: Some(view.options[1].id.clone()),
                value: None,
            },
        )
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn test_archived_poll_is_closed() {
    let engine = engine().await;
    let view = create(&engine, spec(QuestionType::SingleChoice, &["A", "B"])).await;

    let denied = engine.polls.archive_poll(&view.poll.id, "x").await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    engine
        .polls
        .archive_poll(&view.poll.id, "author1")
        .await
        .unwrap();

    let shown = engine.polls.get_poll(&view.poll.id).await.unwrap();
    assert_eq!(shown.phase, WindowPhase::Closed);

    let result = engine
        .ledger
        .submit(&view.poll.id, &Respondent::new("x"), pick(&view, 0))
        .await;
    assert!(matches!(result, Err(AppError::State(_))));
}

#[tokio::test]
async fn test_concurrent_submissions_leave_one_active_response() {
    let engine = engine().await;
    let view = create(
        &engine,
        PollSpec {
            allow_vote_change: true,
            ..spec(QuestionType::SingleChoice, &["A", "B"])
        },
    )
    .await;
    let x = Respondent::new("x");

    let (first, second) = tokio::join!(
        engine.ledger.submit(&view.poll.id, &x, pick(&view, 0)),
        engine.ledger.submit(&view.poll.id, &x, pick(&view, 1)),
    );
    let first = first.unwrap();
    let second = second.unwrap();

    assert_eq!(first.id, second.id);
    let active = engine
        .responses
        .find_active_by_poll(&view.poll.id)
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
}
