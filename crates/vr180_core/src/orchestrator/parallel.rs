//! Per-eye fan-out for data-independent work.

use std::thread;

use super::errors::{StepError, StepResult};
use crate::models::Eye;

/// Run `work` for both eyes, on two scoped threads when `parallel` is set.
///
/// Results come back in `[left, right]` order. When both eyes fail the
/// left eye's error is returned.
pub fn for_each_eye<T, F>(parallel: bool, work: F) -> StepResult<[T; 2]>
where
    T: Send,
    F: Fn(Eye) -> StepResult<T> + Sync,
{
    if !parallel {
        let left = work(Eye::Left)?;
        let right = work(Eye::Right)?;
        return Ok([left, right]);
    }

    let work = &work;
    let (left, right) = thread::scope(|scope| {
        let right = scope.spawn(move || work(Eye::Right));
        let left = work(Eye::Left);
        let right = right
            .join()
            .unwrap_or_else(|_| Err(StepError::other("right eye worker panicked")));
        (left, right)
    });
    Ok([left?, right?])
}
