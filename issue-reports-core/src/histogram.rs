use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Display height of the tallest bar.
pub const MAX_HEIGHT: i64 = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub start_date: DateTime<Utc>,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramResult {
    pub buckets: Vec<Bucket>,
    pub max_count: i64,
    /// Empty when `max_count` is 0 (or negative) or already equals `MAX_HEIGHT`.
    pub normalized: Vec<i64>,
}

impl HistogramResult {
    pub fn counts(&self) -> Vec<i64> {
        self.buckets.iter().map(|b| b.count).collect()
    }

    pub fn dates(&self) -> Vec<DateTime<Utc>> {
        self.buckets.iter().map(|b| b.start_date).collect()
    }

    /// Bar heights to draw: the normalized sequence, or the raw counts when
    /// normalization was skipped because they already span `MAX_HEIGHT`.
    pub fn heights(&self) -> Vec<i64> {
        if self.max_count == MAX_HEIGHT { self.counts() } else { self.normalized.clone() }
    }
}

/// Splits `[start, end)` into `interval_days` slices and counts each one.
///
/// `interval_days` must be positive; the caller substitutes its default before
/// calling. The last slice is clipped to `end`. Any counting error aborts the
/// whole build.
pub fn build_histogram<F, E>(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval_days: i64,
    mut count: F,
) -> Result<HistogramResult, E>
where
    F: FnMut(DateTime<Utc>, DateTime<Utc>) -> Result<i64, E>,
{
    let step = Duration::try_days(interval_days);
    let mut buckets = Vec::new();
    let mut max_count: Option<i64> = None;
    let mut cursor = start;
    while cursor < end {
        // None past the last representable date: that bucket reaches `end`
        let next = step.and_then(|s| cursor.checked_add_signed(s));
        let bucket_end = next.map_or(end, |n| n.min(end));
        let c = count(cursor, bucket_end)?;
        max_count = Some(max_count.map_or(c, |m| m.max(c)));
        buckets.push(Bucket { start_date: cursor, count: c });
        match next {
            Some(n) => cursor = n,
            None => break,
        }
    }
    let max_count = max_count.unwrap_or(0);
    let normalized = normalize(&buckets, max_count);
    Ok(HistogramResult { buckets, max_count, normalized })
}

// single-precision scale then truncate toward zero, kept for output compatibility
fn normalize(buckets: &[Bucket], max_count: i64) -> Vec<i64> {
    if max_count <= 0 || max_count == MAX_HEIGHT {
        return Vec::new();
    }
    buckets
        .iter()
        .map(|b| ((b.count as f32 / max_count as f32) * MAX_HEIGHT as f32) as i64)
        .collect()
}
