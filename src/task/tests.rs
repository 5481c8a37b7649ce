use super::*;
use crate::pool::FineGrainedPool;
use crate::test_utils::eventually;
use anyhow::Result;
use static_assertions::assert_impl_all;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

assert_impl_all!(Task<String>: Send, Sync, Clone);
assert_impl_all!(TaskResult<String>: Send, Sync);
assert_impl_all!(TaskFuture<String>: Send, Sync, Clone);
assert_impl_all!(TaskError: Send, Sync, Clone);

const BOUNDED: Duration = Duration::from_secs(5);

/// A handle whose run yields forever and counts its completion notices.
fn endless_task(notices: &Arc<AtomicU32>) -> Task<u32> {
    let notices = Arc::clone(notices);
    Task::with_hooks(
        || Step::NotYet,
        || false,
        move || {
            notices.fetch_add(1, Ordering::SeqCst);
        },
    )
}

#[test]
fn dropping_every_result_cancels_the_run() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let notices = Arc::new(AtomicU32::new(0));
    let task = endless_task(&notices);

    let result = task.share(&pool);
    assert!(task.has_active_results());
    assert!(task.is_active());

    drop(result);
    assert!(!task.has_active_results());

    assert!(eventually(BOUNDED, || !task.is_active()));
    assert_eq!(notices.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn a_thousand_result_clones_release_down_to_zero() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let notices = Arc::new(AtomicU32::new(0));
    let task = endless_task(&notices);

    let result = task.share(&pool);
    let clones: Vec<_> = (0..1000).map(|_| result.clone()).collect();
    assert_eq!(result.count(), 1001);

    drop(clones);
    assert_eq!(result.count(), 1);

    drop(result);
    assert!(!task.has_active_results());
    assert!(eventually(BOUNDED, || !task.is_active()));
    assert_eq!(notices.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn kill_terminates_the_run_with_incomplete() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let task: Task<u32> = Task::new(|| Step::NotYet);

    let result = task.share(&pool);
    task.kill();

    assert_eq!(result.get(), Err(TaskError::Incomplete));
    Ok(())
}

#[test]
fn share_after_kill_restarts_with_a_clean_flag() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;

    // The first run cannot finish (the latch is shut) and gets killed; the
    // restart reuses the same step function and completes once the latch
    // opens.
    let latch = Arc::new(AtomicBool::new(false));
    let task = {
        let latch = Arc::clone(&latch);
        let mut steps = 0u32;
        Task::new(move || {
            steps += 1;
            if latch.load(Ordering::Acquire) {
                Step::Done(steps)
            } else {
                Step::NotYet
            }
        })
    };

    let first = task.share(&pool);
    task.kill();
    assert_eq!(first.get(), Err(TaskError::Incomplete));
    assert!(eventually(BOUNDED, || !task.is_active()));

    latch.store(true, Ordering::Release);
    let second = task.share(&pool);
    let steps = second.get().expect("restarted run completes");
    assert!(steps >= 1);
    Ok(())
}

#[test]
fn sharing_an_active_task_joins_the_same_run() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let done = Arc::new(AtomicBool::new(false));

    let task = {
        let done = Arc::clone(&done);
        Task::new(move || {
            if done.load(Ordering::Acquire) {
                Step::Done("finished")
            } else {
                Step::NotYet
            }
        })
    };

    let first = task.share(&pool);
    let second = task.share(&pool);

    // Both views observe the same run and the same counter.
    assert_eq!(first.count(), 2);
    assert_eq!(second.count(), 2);

    done.store(true, Ordering::Release);
    assert_eq!(first.get(), Ok("finished"));
    assert_eq!(second.get(), Ok("finished"));
    Ok(())
}

#[test]
fn dropping_the_handle_mid_run_cancels_the_orphan() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let task: Task<u32> = Task::new(|| Step::NotYet);

    let result = task.share(&pool);
    drop(task);

    // The wrapped closures fail to upgrade their weak back-reference and the
    // run winds down instead of spinning forever.
    assert_eq!(result.get(), Err(TaskError::Incomplete));
    Ok(())
}

#[test]
fn reset_is_rejected_while_a_run_is_in_flight() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let task: Task<u32> = Task::new(|| Step::NotYet);

    let result = task.share(&pool);
    assert_eq!(
        task.reset(|| Step::Done(1), || false, || {}),
        Err(TaskError::StillActive)
    );

    task.kill();
    result.wait();
    assert!(eventually(BOUNDED, || !task.is_active()));

    // Idle again: the replacement takes and the next share runs it.
    task.reset(|| Step::Done(2), || false, || {})
        .expect("idle handle accepts new callables");
    let rerun = task.share(&pool);
    assert_eq!(rerun.get(), Ok(2));
    Ok(())
}

#[test]
fn user_cancel_predicate_applies_to_handle_runs() -> Result<()> {
    let pool = FineGrainedPool::new(1)?;
    let stop = Arc::new(AtomicBool::new(false));

    let task = {
        let stop = Arc::clone(&stop);
        Task::with_cancel(|| Step::<u32>::NotYet, move || stop.load(Ordering::Acquire))
    };

    let result = task.share(&pool);
    stop.store(true, Ordering::Release);
    assert_eq!(result.get(), Err(TaskError::Incomplete));
    Ok(())
}

mod registry {
    use super::*;

    #[test]
    fn share_creates_then_joins_the_same_run() -> Result<()> {
        let pool = FineGrainedPool::new(1)?;
        let mut registry: TaskRegistry<u32, u32> = TaskRegistry::new();
        let done = Arc::new(AtomicBool::new(false));

        let make_main = |done: &Arc<AtomicBool>| {
            let done = Arc::clone(done);
            move || {
                if done.load(Ordering::Acquire) {
                    Step::Done(1)
                } else {
                    Step::NotYet
                }
            }
        };

        let first = registry.share(7, &pool, make_main(&done), || false, || {});
        assert!(registry.contains(&7));
        assert_eq!(registry.len(), 1);

        let second = registry.share(7, &pool, make_main(&done), || false, || {});
        assert_eq!(first.count(), 2, "same run, same counter");

        done.store(true, Ordering::Release);
        assert_eq!(first.get(), Ok(1));
        assert_eq!(second.get(), Ok(1));
        Ok(())
    }

    #[test]
    fn kill_cancels_and_forgets_the_key() -> Result<()> {
        let pool = FineGrainedPool::new(1)?;
        let mut registry: TaskRegistry<&str, u32> = TaskRegistry::new();

        let result = registry.share("spinner", &pool, || Step::NotYet, || false, || {});
        assert!(registry.kill(&"spinner"));
        assert!(!registry.contains(&"spinner"));
        assert!(!registry.kill(&"spinner"));

        assert_eq!(result.get(), Err(TaskError::Incomplete));
        Ok(())
    }

    #[test]
    fn idle_entries_accept_new_callables() -> Result<()> {
        let pool = FineGrainedPool::new(1)?;
        let mut registry: TaskRegistry<u8, u32> = TaskRegistry::new();

        let first = registry.share(0, &pool, || Step::Done(10), || false, || {});
        assert_eq!(first.get(), Ok(10));

        let handle = registry.get(&0).expect("key registered").clone();
        assert!(eventually(BOUNDED, || !handle.is_active()));

        let second = registry.share(0, &pool, || Step::Done(20), || false, || {});
        assert_eq!(second.get(), Ok(20));
        Ok(())
    }
}
