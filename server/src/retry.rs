//! Bounded-retry fill.
//!
//! Generic form of the "keep asking until the list is full or we run out
//! of attempts" loop: each attempt sees a snapshot of what has been
//! gathered so far, a failed attempt contributes nothing, and the caller
//! always gets the partial result back instead of an error.

use std::future::Future;

use tracing::warn;

pub async fn fill_bounded<T, E, F, Fut, S>(
    max_attempts: usize,
    seed: Vec<T>,
    mut is_satisfied: S,
    mut fetch: F,
) -> Vec<T>
where
    T: Clone,
    E: std::fmt::Display,
    S: FnMut(&[T]) -> bool,
    F: FnMut(usize, Vec<T>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let mut items = seed;
    for attempt in 1..=max_attempts {
        if is_satisfied(&items) {
            break;
        }
        match fetch(attempt, items.clone()).await {
            Ok(batch) => items.extend(batch),
            Err(e) => warn!(attempt, error = %e, "fill attempt failed"),
        }
    }
    items
}
