use clai_types::stats::decay_factor;

/// Effective score of a stored aggregate row at read time: the stored value
/// carries decay up to `last_seen_ms`, the residual decay covers the gap to
/// `now_ms`.
pub fn effective_score(stored: f64, last_seen_ms: i64, now_ms: i64, half_life_ms: i64) -> f64 {
    stored * decay_factor(now_ms - last_seen_ms, half_life_ms)
}

/// Recency feature: exponential decay over time since last sighting, on its
/// own (much shorter) half-life so "used this morning" outranks "used last
/// month" even at equal frequency.
pub fn recency_factor(last_seen_ms: i64, now_ms: i64, recency_half_life_ms: i64) -> f64 {
    decay_factor(now_ms - last_seen_ms, recency_half_life_ms)
}
