use crate::catalog::StaticCatalog;
use crate::clock::FixedClock;
use crate::error::{ReviewError, StoreError};
use crate::models::{ContentType, LearnerKey, ProgressItem, ReviewAction};
use crate::scheduler::{due_filter, next_state, ReviewScheduler};
use crate::srs::{MAX_INTERVAL, MIN_EASE_FACTOR};
use crate::store::{MemoryStore, ProgressStore};
use chrono::{DateTime, Duration, TimeZone, Utc};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap()
}

fn learner() -> LearnerKey {
    LearnerKey::Anonymous("tab-1".to_string())
}

fn scheduler_at(now: DateTime<Utc>) -> ReviewScheduler<MemoryStore, FixedClock> {
    ReviewScheduler::with_clock(MemoryStore::new(), FixedClock(now))
}

/// Accepts reads, refuses writes.
#[derive(Default)]
struct ReadOnlyStore(MemoryStore);

impl ProgressStore for ReadOnlyStore {
    async fn get(&self, learner: &LearnerKey, content_type: ContentType, content_id: &str) -> Result<Option<ProgressItem>, StoreError> {
        self.0.get(learner, content_type, content_id).await
    }

    async fn upsert(&self, _: &LearnerKey, _: &ProgressItem) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("write rejected".to_string()))
    }

    async fn list(&self, learner: &LearnerKey, content_type: Option<ContentType>) -> Result<Vec<ProgressItem>, StoreError> {
        self.0.list(learner, content_type).await
    }

    async fn remove(&self, _: &LearnerKey, _: ContentType, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("write rejected".to_string()))
    }
}

#[tokio::test]
async fn test_first_review_creates_state() {
    let scheduler = scheduler_at(t0());
    let item = scheduler
        .record_review(&learner(), ContentType::Kanji, "k1", ReviewAction::Good)
        .await
        .unwrap();

    assert_eq!(item.interval, 1);
    assert_eq!(item.repetitions, 1);
    assert_eq!(item.review_count, 1);
    assert_eq!(item.mastery_level, 0);
    assert_eq!(item.last_reviewed, Some(t0()));
    assert_eq!(item.next_review, Some(t0() + Duration::days(1)));

    let stored = scheduler.progress(&learner(), ContentType::Kanji, "k1").await.unwrap();
    assert_eq!(stored, Some(item));
}

#[tokio::test]
async fn test_good_good_easy_sequence() {
    let scheduler = scheduler_at(t0());
    let l = learner();

    let first = scheduler.record_review(&l, ContentType::Kosakata, "v1", ReviewAction::Good).await.unwrap();
    let second = scheduler.record_review(&l, ContentType::Kosakata, "v1", ReviewAction::Good).await.unwrap();
    let third = scheduler.record_review(&l, ContentType::Kosakata, "v1", ReviewAction::Easy).await.unwrap();

    assert_eq!(first.interval, 1);
    assert_eq!(second.interval, 6);
    assert_eq!(third.interval, (6.0 * second.ease_factor).round() as i64);
    assert!(third.ease_factor > second.ease_factor);
    assert_eq!(third.repetitions, 3);
    assert_eq!(third.review_count, 3);
    // 3 / 2 + ease bonus
    assert_eq!(third.mastery_level, 2);
}

#[tokio::test]
async fn test_again_after_streak() {
    let scheduler = scheduler_at(t0());
    let l = learner();
    let mut seeded = ProgressItem::new(ContentType::Grammar, "g1");
    seeded.repetitions = 3;
    seeded.ease_factor = 2.5;
    seeded.interval = 10;
    seeded.review_count = 3;
    scheduler.store().upsert(&l, &seeded).await.unwrap();

    let item = scheduler.record_review(&l, ContentType::Grammar, "g1", ReviewAction::Again).await.unwrap();

    assert_eq!(item.repetitions, 0);
    assert_eq!(item.interval, 1);
    assert_eq!(item.ease_factor, (2.5_f64 + (0.1 - 5.0 * (0.08 + 5.0 * 0.02))).max(MIN_EASE_FACTOR));
    assert_eq!(item.review_count, 4);
    assert_eq!(item.mastery_level, 0);
}

#[tokio::test]
async fn test_repeated_again_never_undercuts_floor() {
    let scheduler = scheduler_at(t0());
    let l = learner();
    for expected_count in 1..=12 {
        let item = scheduler.record_review(&l, ContentType::Kanji, "k9", ReviewAction::Again).await.unwrap();
        assert!(item.ease_factor >= MIN_EASE_FACTOR);
        assert_eq!(item.review_count, expected_count);
        assert_eq!(item.interval, 1);
    }
}

#[tokio::test]
async fn test_long_easy_streak_stays_schedulable() {
    let scheduler = scheduler_at(t0());
    let l = learner();
    let mut last_interval = 0;
    for expected_count in 1..=40 {
        let item = scheduler.record_review(&l, ContentType::Kanji, "k3", ReviewAction::Easy).await.unwrap();
        assert!(item.interval >= last_interval);
        assert!(item.interval <= MAX_INTERVAL);
        assert_eq!(item.next_review, Some(t0() + Duration::days(item.interval)));
        assert_eq!(item.review_count, expected_count);
        last_interval = item.interval;
    }
    assert_eq!(last_interval, MAX_INTERVAL);
}

#[tokio::test]
async fn test_unknown_label_grades_as_three() {
    let scheduler = scheduler_at(t0());
    let l = learner();
    let item = scheduler
        .record_review_label(&l, ContentType::PolaKalimat, "p1", "maybe")
        .await
        .unwrap();

    // quality 3 passes but costs ease: 0.1 - 2 * (0.08 + 2 * 0.02)
    assert_eq!(item.repetitions, 1);
    assert_eq!(item.interval, 1);
    assert_eq!(item.ease_factor, 2.5 + (0.1 - 2.0 * (0.08 + 2.0 * 0.02)));

    let known = scheduler
        .record_review_label(&l, ContentType::PolaKalimat, "p2", "easy")
        .await
        .unwrap();
    assert!(known.ease_factor > 2.5);
}

#[tokio::test]
async fn test_write_failure_returns_unsaved_state() {
    let scheduler = ReviewScheduler::with_clock(ReadOnlyStore::default(), FixedClock(t0()));
    let l = learner();

    let err = scheduler
        .record_review(&l, ContentType::Kanji, "k1", ReviewAction::Easy)
        .await
        .unwrap_err();

    match &err {
        ReviewError::Persistence { source, unsaved } => {
            assert!(matches!(source, StoreError::Unavailable(_)));
            assert_eq!(unsaved.review_count, 1);
            assert_eq!(unsaved.content_id, "k1");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert!(err.unsaved().is_some());
    assert!(scheduler.progress(&l, ContentType::Kanji, "k1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_due_items_filtering() {
    let scheduler = scheduler_at(t0());
    let l = learner();

    let never = ProgressItem::new(ContentType::Kanji, "never");
    let mut past = ProgressItem::new(ContentType::Kanji, "past");
    past.next_review = Some(t0() - Duration::days(2));
    let mut now = ProgressItem::new(ContentType::Grammar, "now");
    now.next_review = Some(t0());
    let mut future = ProgressItem::new(ContentType::Kanji, "future");
    future.next_review = Some(t0() + Duration::minutes(1));

    for item in [&never, &past, &now, &future] {
        scheduler.store().upsert(&l, item).await.unwrap();
    }

    let mut due: Vec<String> = scheduler
        .due_items(&l, None)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.content_id)
        .collect();
    due.sort();
    assert_eq!(due, vec!["never", "now", "past"]);

    let kanji = scheduler.due_items(&l, Some(ContentType::Kanji)).await.unwrap();
    assert_eq!(kanji.len(), 2);
    assert!(kanji.iter().all(|i| i.content_type == ContentType::Kanji));

    let other = LearnerKey::User("someone-else".to_string());
    assert!(scheduler.due_items(&other, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_reviewed_item_leaves_due_list() {
    let scheduler = scheduler_at(t0());
    let l = learner();
    scheduler.store().upsert(&l, &ProgressItem::new(ContentType::Kanji, "k1")).await.unwrap();
    assert_eq!(scheduler.due_items(&l, None).await.unwrap().len(), 1);

    scheduler.record_review(&l, ContentType::Kanji, "k1", ReviewAction::Hard).await.unwrap();
    assert!(scheduler.due_items(&l, None).await.unwrap().is_empty());

    let later = ReviewScheduler::with_clock(MemoryStore::new(), FixedClock(t0() + Duration::days(1)));
    let item = scheduler.progress(&l, ContentType::Kanji, "k1").await.unwrap().unwrap();
    later.store().upsert(&l, &item).await.unwrap();
    assert_eq!(later.due_items(&l, None).await.unwrap().len(), 1);
}

#[test]
fn test_due_filter_is_restartable() {
    let mut future = ProgressItem::new(ContentType::Kanji, "f");
    future.next_review = Some(t0() + Duration::days(3));
    let items = vec![ProgressItem::new(ContentType::Kanji, "n"), future];

    let first: Vec<_> = due_filter(items.clone(), t0()).collect();
    let second: Vec<_> = due_filter(items, t0()).collect();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn test_review_count_keeps_counting_past_u32() {
    let mut current = ProgressItem::new(ContentType::Kanji, "k4");
    current.review_count = u64::from(u32::MAX);
    let next = next_state(&current, 4, t0());
    assert_eq!(next.review_count, u64::from(u32::MAX) + 1);
}

#[test]
fn test_next_state_keeps_identity() {
    let current = ProgressItem::new(ContentType::Grammar, "g2");
    let next = next_state(&current, 4, t0());
    assert_eq!(next.content_type, ContentType::Grammar);
    assert_eq!(next.content_id, "g2");
    assert_eq!(next.review_count, current.review_count + 1);
}

#[tokio::test]
async fn test_mastery_and_stats() {
    let scheduler = scheduler_at(t0());
    let l = learner();

    for _ in 0..8 {
        scheduler.record_review(&l, ContentType::Kanji, "k1", ReviewAction::Easy).await.unwrap();
    }
    scheduler.record_review(&l, ContentType::Kanji, "k2", ReviewAction::Again).await.unwrap();
    scheduler.store().upsert(&l, &ProgressItem::new(ContentType::Grammar, "g1")).await.unwrap();

    let k1 = scheduler.progress(&l, ContentType::Kanji, "k1").await.unwrap().unwrap();
    assert_eq!(k1.mastery_level, 5);

    let mastered = scheduler.items_by_mastery_level(&l, 5).await.unwrap();
    assert_eq!(mastered.len(), 1);
    assert_eq!(mastered[0].content_id, "k1");
    assert_eq!(scheduler.items_by_mastery_level(&l, 0).await.unwrap().len(), 2);

    let stats = scheduler.stats(&l, None).await.unwrap();
    assert_eq!(stats.total_reviewed, 2);
    assert_eq!(stats.mastered, 1);
    // only the never-reviewed grammar row is due right now
    assert_eq!(stats.due_today, 1);

    let kanji_stats = scheduler.stats(&l, Some(ContentType::Kanji)).await.unwrap();
    assert_eq!(kanji_stats.due_today, 0);
}

#[tokio::test]
async fn test_study_batch_prefers_due_then_fills_from_catalog() {
    let scheduler = scheduler_at(t0());
    let l = learner();
    let catalog = StaticCatalog::n5();

    let mut overdue = ProgressItem::new(ContentType::Kanji, "k1");
    overdue.review_count = 2;
    overdue.next_review = Some(t0() - Duration::days(1));
    let mut waiting = ProgressItem::new(ContentType::Kanji, "k2");
    waiting.review_count = 1;
    waiting.next_review = Some(t0() + Duration::days(5));
    scheduler.store().upsert(&l, &overdue).await.unwrap();
    scheduler.store().upsert(&l, &waiting).await.unwrap();

    let batch = scheduler.study_batch(&l, ContentType::Kanji, &catalog, 4).await.unwrap();
    let ids: Vec<&str> = batch.iter().map(|i| i.content_id.as_str()).collect();

    assert_eq!(batch.len(), 4);
    assert!(ids.contains(&"k1"));
    assert!(!ids.contains(&"k2"));
    assert!(batch.iter().all(|i| i.content_type == ContentType::Kanji));
    let fresh = batch.iter().filter(|i| i.review_count == 0).count();
    assert_eq!(fresh, 3);

    let small = scheduler.study_batch(&l, ContentType::Kanji, &catalog, 1).await.unwrap();
    assert_eq!(small.len(), 1);
    assert_eq!(small[0].content_id, "k1");

    // reading a batch never writes
    assert_eq!(scheduler.store().len().await, 2);
}
