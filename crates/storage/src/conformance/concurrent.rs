use std::future::Future;
use std::sync::Arc;

use super::{make_event, make_process, TestResult};
use crate::{ProcessStorage, StorageError};

/// Number of concurrent tasks to spawn in each test.
const N: usize = 10;

pub(super) async fn run_concurrent_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "concurrent",
            "concurrent_appends_exactly_one_wins",
            concurrent_appends_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_creates_same_uuid_exactly_one_wins",
            concurrent_creates_same_uuid_exactly_one_wins(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_appends_different_processes_all_succeed",
            concurrent_appends_different_processes_all_succeed(factory).await,
        ),
        TestResult::from_result(
            "concurrent",
            "concurrent_appends_final_state_consistent",
            concurrent_appends_final_state_consistent(factory).await,
        ),
    ]
}

/// Race N appends at the same expected version. Returns (winners, losers).
async fn race_appends<S: ProcessStorage>(
    storage: &Arc<S>,
    uuid: &str,
    version: i64,
) -> Result<(usize, usize), String> {
    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        let uuid = uuid.to_string();
        handles.push(tokio::spawn(async move {
            let name = format!("status-{i}");
            match s
                .append_status("requests", &uuid, version, make_event(&name))
                .await
            {
                Ok(_) => Ok(true),
                Err(StorageError::ConcurrentConflict { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    let mut losers = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        } else {
            losers += 1;
        }
    }
    Ok((winners, losers))
}

// ── Concurrent append: exactly one wins ─────────────────────────────────────

/// N tasks append to the same process from version 0. Exactly one append
/// lands; the rest get ConcurrentConflict.
async fn concurrent_appends_exactly_one_wins<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .create(make_process(Some("req-1"), "requests"))
        .await
        .map_err(|e| format!("create: {e}"))?;

    let (winners, losers) = race_appends(&storage, "req-1", 0).await?;
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    if losers != N - 1 {
        return Err(format!("expected {} losers, got {losers}", N - 1));
    }
    Ok(())
}

// ── Concurrent create: exactly one wins ─────────────────────────────────────

async fn concurrent_creates_same_uuid_exactly_one_wins<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);

    let mut handles = Vec::new();
    for _ in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            match s.create(make_process(Some("req-1"), "requests")).await {
                Ok(_) => Ok(true),
                Err(StorageError::AlreadyExists { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        }));
    }

    let mut winners = 0usize;
    for handle in handles {
        let won = handle
            .await
            .map_err(|e| format!("task panic: {e}"))?
            .map_err(|e: StorageError| format!("storage error: {e}"))?;
        if won {
            winners += 1;
        }
    }
    if winners != 1 {
        return Err(format!("expected exactly 1 winner, got {winners}"));
    }
    Ok(())
}

// ── Concurrent appends to different processes: all succeed ──────────────────

/// No false conflicts when there is no contention.
async fn concurrent_appends_different_processes_all_succeed<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    for i in 0..N {
        storage
            .create(make_process(Some(&format!("req-{i}")), "requests"))
            .await
            .map_err(|e| format!("create req-{i}: {e}"))?;
    }

    let mut handles = Vec::new();
    for i in 0..N {
        let s = storage.clone();
        handles.push(tokio::spawn(async move {
            s.append_status("requests", &format!("req-{i}"), 0, make_event("open"))
                .await
        }));
    }
    for (i, handle) in handles.into_iter().enumerate() {
        handle
            .await
            .map_err(|e| format!("task {i} panic: {e}"))?
            .map_err(|e| format!("task {i} failed: {e}"))?;
    }

    for i in 0..N {
        let rec = storage
            .get_by_uuid("requests", &format!("req-{i}"))
            .await
            .map_err(|e| format!("get req-{i}: {e}"))?;
        if rec.version != 1 || rec.history.len() != 1 {
            return Err(format!(
                "req-{i}: expected version 1 with one event, got version {} with {}",
                rec.version,
                rec.history.len()
            ));
        }
    }
    Ok(())
}

// ── Concurrent appends: final state consistent ──────────────────────────────

/// After a race on a process that already has history, exactly one event is
/// added on top of the existing ones, and it is the one the winner wrote.
async fn concurrent_appends_final_state_consistent<S, F, Fut>(
    factory: &F,
) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let storage = Arc::new(factory().await);
    storage
        .create(make_process(Some("req-1"), "requests"))
        .await
        .map_err(|e| format!("create: {e}"))?;
    storage
        .append_status("requests", "req-1", 0, make_event("open"))
        .await
        .map_err(|e| format!("append open: {e}"))?;

    race_appends(&storage, "req-1", 1).await?;

    let rec = storage
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| format!("get: {e}"))?;
    if rec.version != 2 || rec.history.len() != 2 {
        return Err(format!(
            "expected version 2 with 2 events, got version {} with {}",
            rec.version,
            rec.history.len()
        ));
    }
    let newest = &rec.history[0];
    if newest.sequence != 2 || !newest.name.starts_with("status-") {
        return Err(format!(
            "expected a racing event at sequence 2, got {} at {}",
            newest.name, newest.sequence
        ));
    }
    if rec.history[1].name != "open" {
        return Err(format!("earlier event replaced: {}", rec.history[1].name));
    }
    Ok(())
}
