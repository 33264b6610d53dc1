use crate::catalog::ContentCatalog;
use crate::clock::{Clock, UtcClock};
use crate::error::{Result, ReviewError};
use crate::models::{ContentType, LearnerKey, ProgressItem, ProgressStats, ReviewAction};
use crate::srs;
use crate::store::ProgressStore;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use std::collections::HashSet;

/// Mastery level from which an item counts as mastered in [`ProgressStats`].
pub const MASTERED_LEVEL: u8 = 4;

/// Applies one graded review to `current`. Pure: nothing is read or written.
pub fn next_state(current: &ProgressItem, quality: i32, now: DateTime<Utc>) -> ProgressItem {
    let result = srs::calculate_next_review(
        quality,
        current.repetitions,
        current.ease_factor,
        current.interval,
        now,
    );

    ProgressItem {
        content_type: current.content_type,
        content_id: current.content_id.clone(),
        mastery_level: srs::mastery_level(result.repetitions, result.ease_factor),
        ease_factor: result.ease_factor,
        interval: result.interval,
        repetitions: result.repetitions,
        last_reviewed: Some(now),
        next_review: Some(result.next_review),
        review_count: current.review_count + 1,
    }
}

/// Lazily keeps the items that are due at `now`.
pub fn due_filter<I>(items: I, now: DateTime<Utc>) -> impl Iterator<Item = ProgressItem>
where
    I: IntoIterator<Item = ProgressItem>,
{
    items
        .into_iter()
        .filter(move |item| srs::is_due_for_review(item.next_review, now))
}

/// One learner session's view of the review schedule.
///
/// Holds no progress of its own; every call goes through the store. Two
/// reviews of the same item racing each other resolve as last write wins.
pub struct ReviewScheduler<S, C = UtcClock> {
    store: S,
    clock: C,
}

impl<S: ProgressStore> ReviewScheduler<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, UtcClock)
    }
}

impl<S: ProgressStore, C: Clock> ReviewScheduler<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub async fn record_review(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
        action: ReviewAction,
    ) -> Result<ProgressItem> {
        self.record_quality(learner, content_type, content_id, srs::quality_from_action(action))
            .await
    }

    /// Same as [`Self::record_review`] for a free-form action label. Labels
    /// outside again/hard/good/easy grade as quality 3.
    pub async fn record_review_label(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
        label: &str,
    ) -> Result<ProgressItem> {
        self.record_quality(learner, content_type, content_id, srs::quality_from_label(label))
            .await
    }

    async fn record_quality(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
        quality: i32,
    ) -> Result<ProgressItem> {
        let current = self
            .store
            .get(learner, content_type, content_id)
            .await?
            .unwrap_or_else(|| ProgressItem::new(content_type, content_id));

        let updated = next_state(&current, quality, self.clock.now());

        match self.store.upsert(learner, &updated).await {
            Ok(()) => Ok(updated),
            Err(source) => Err(ReviewError::Persistence {
                source,
                unsaved: Box::new(updated),
            }),
        }
    }

    pub async fn progress(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        content_id: &str,
    ) -> Result<Option<ProgressItem>> {
        Ok(self.store.get(learner, content_type, content_id).await?)
    }

    pub async fn due_items(
        &self,
        learner: &LearnerKey,
        content_type: Option<ContentType>,
    ) -> Result<Vec<ProgressItem>> {
        let items = self.store.list(learner, content_type).await?;
        Ok(due_filter(items, self.clock.now()).collect())
    }

    pub async fn items_by_mastery_level(
        &self,
        learner: &LearnerKey,
        level: u8,
    ) -> Result<Vec<ProgressItem>> {
        let items = self.store.list(learner, None).await?;
        Ok(items.into_iter().filter(|item| item.mastery_level == level).collect())
    }

    pub async fn stats(
        &self,
        learner: &LearnerKey,
        content_type: Option<ContentType>,
    ) -> Result<ProgressStats> {
        let now = self.clock.now();
        let items = self.store.list(learner, content_type).await?;

        let mut stats = ProgressStats::default();
        for item in &items {
            if item.review_count > 0 {
                stats.total_reviewed += 1;
            }
            if item.mastery_level >= MASTERED_LEVEL {
                stats.mastered += 1;
            }
            if srs::is_due_for_review(item.next_review, now) {
                stats.due_today += 1;
            }
        }
        Ok(stats)
    }

    /// Builds the next flashcard deck: due items first (most overdue first),
    /// topped up with catalog items the learner has never seen, then shuffled
    /// so content interleaves.
    pub async fn study_batch<K: ContentCatalog + ?Sized>(
        &self,
        learner: &LearnerKey,
        content_type: ContentType,
        catalog: &K,
        limit: usize,
    ) -> Result<Vec<ProgressItem>> {
        let now = self.clock.now();
        let stored = self.store.list(learner, Some(content_type)).await?;
        let seen: HashSet<String> = stored.iter().map(|item| item.content_id.clone()).collect();

        let mut batch: Vec<ProgressItem> = due_filter(stored, now).collect();
        batch.sort_by_key(|item| item.next_review);
        batch.truncate(limit);

        if batch.len() < limit {
            let needed = limit - batch.len();
            batch.extend(
                catalog
                    .item_ids(content_type)
                    .into_iter()
                    .filter(|id| !seen.contains(id))
                    .take(needed)
                    .map(|id| ProgressItem::new(content_type, id)),
            );
        }

        batch.shuffle(&mut rand::thread_rng());
        Ok(batch)
    }
}
