use crate::models::ReviewAction;
use chrono::{DateTime, Duration, Utc};

pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Longest interval ever scheduled, in days (about a century).
pub const MAX_INTERVAL: i64 = 36_500;
pub const MAX_QUALITY: i32 = 5;
pub const PASSING_QUALITY: i32 = 3;
pub const MAX_MASTERY_LEVEL: u8 = 5;
/// Quality used for any action label outside the known four.
pub const FALLBACK_QUALITY: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReviewResult {
    pub next_review: DateTime<Utc>,
    pub ease_factor: f64,
    pub interval: i64,
    pub repetitions: u32,
}

/// Quality grades:
/// 5 - Perfect response
/// 4 - Correct response after a hesitation
/// 3 - Correct response recalled with serious difficulty
/// 2 - Incorrect response; where the correct one seemed easy to recall
/// 1 - Incorrect response; the correct one remembered
/// 0 - Complete blackout.
///
/// The flashcard buttons only ever produce 0, 2, 4 and 5.
pub fn quality_from_action(action: ReviewAction) -> i32 {
    match action {
        ReviewAction::Again => 0,
        ReviewAction::Hard => 2,
        ReviewAction::Good => 4,
        ReviewAction::Easy => 5,
    }
}

/// Like [`quality_from_action`] but for raw labels; unknown labels grade as
/// "correct with difficulty" instead of failing.
pub fn quality_from_label(label: &str) -> i32 {
    ReviewAction::parse(label)
        .map(quality_from_action)
        .unwrap_or(FALLBACK_QUALITY)
}

/// Calculates the next review interval and easiness factor based on the grade
/// (SM-2). Out of range inputs are clamped, never rejected.
pub fn calculate_next_review(
    quality: i32,
    repetitions: u32,
    ease_factor: f64,
    interval: i64,
    now: DateTime<Utc>,
) -> ReviewResult {
    let quality = quality.clamp(0, MAX_QUALITY);
    let interval = interval.clamp(1, MAX_INTERVAL);

    let (new_interval, new_repetitions) = if quality >= PASSING_QUALITY {
        let next = match repetitions {
            0 => 1,
            1 => 6,
            _ => (interval as f64 * ease_factor).round() as i64,
        };
        (next.clamp(1, MAX_INTERVAL), repetitions.saturating_add(1))
    } else {
        (1, 0)
    };

    // EF' = EF + (0.1 - (5 - q) * (0.08 + (5 - q) * 0.02)), applied on every grade
    let q = quality as f64;
    let new_ef = ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));

    ReviewResult {
        next_review: now + Duration::days(new_interval),
        ease_factor: new_ef.max(MIN_EASE_FACTOR),
        interval: new_interval,
        repetitions: new_repetitions,
    }
}

/// 0..=5 badge shown next to an item. Derived, never stored on its own.
pub fn mastery_level(repetitions: u32, ease_factor: f64) -> u8 {
    let bonus = if ease_factor > 2.5 { 1 } else { 0 };
    let level = (repetitions / 2).saturating_add(bonus);
    level.min(MAX_MASTERY_LEVEL as u32) as u8
}

/// Never scheduled items are always due.
pub fn is_due_for_review(next_review: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    match next_review {
        None => true,
        Some(at) => at <= now,
    }
}

pub fn format_interval(days: f64) -> String {
    // negated so NaN lands in the sub-day bucket
    if !(days >= 1.0) {
        "< 1 hari".to_string()
    } else if days == 1.0 {
        "1 hari".to_string()
    } else if days < 7.0 {
        format!("{} hari", days.round() as i64)
    } else if days < 30.0 {
        format!("{} minggu", (days / 7.0).round() as i64)
    } else if days < 365.0 {
        format!("{} bulan", (days / 30.0).round() as i64)
    } else {
        format!("{} tahun", (days / 365.0).round() as i64)
    }
}
