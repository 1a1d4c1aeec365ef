use std::future::Future;

use super::{make_event, make_process, TestResult};
use crate::{ProcessStorage, StorageError};

pub(super) async fn run_append_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "append",
            "append_increments_version",
            append_increments_version(factory).await,
        ),
        TestResult::from_result(
            "append",
            "append_stale_version_conflicts",
            append_stale_version_conflicts(factory).await,
        ),
        TestResult::from_result(
            "append",
            "append_future_version_conflicts",
            append_future_version_conflicts(factory).await,
        ),
        TestResult::from_result(
            "append",
            "append_to_missing_process_not_found",
            append_to_missing_process_not_found(factory).await,
        ),
        TestResult::from_result(
            "append",
            "append_keeps_earlier_events",
            append_keeps_earlier_events(factory).await,
        ),
        TestResult::from_result(
            "append",
            "history_newest_first",
            history_newest_first(factory).await,
        ),
        TestResult::from_result(
            "append",
            "append_does_not_touch_payload",
            append_does_not_touch_payload(factory).await,
        ),
    ]
}

async fn create_one<S: ProcessStorage>(s: &S) -> Result<(), String> {
    s.create(make_process(Some("req-1"), "requests"))
        .await
        .map(|_| ())
        .map_err(|e| format!("create: {}", e))
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn append_increments_version<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_one(&s).await?;
    let v1 = s
        .append_status("requests", "req-1", 0, make_event("open"))
        .await
        .map_err(|e| e.to_string())?;
    let v2 = s
        .append_status("requests", "req-1", 1, make_event("in_progress"))
        .await
        .map_err(|e| e.to_string())?;
    if v1 != 1 || v2 != 2 {
        return Err(format!("expected versions 1 and 2, got {} and {}", v1, v2));
    }
    let rec = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    if rec.version != 2 || rec.history.len() != 2 {
        return Err(format!(
            "expected version 2 with 2 events, got version {} with {}",
            rec.version,
            rec.history.len()
        ));
    }
    Ok(())
}

/// An append against an already-advanced version is refused and writes nothing.
async fn append_stale_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_one(&s).await?;
    s.append_status("requests", "req-1", 0, make_event("open"))
        .await
        .map_err(|e| e.to_string())?;

    match s
        .append_status("requests", "req-1", 0, make_event("open"))
        .await
    {
        Err(StorageError::ConcurrentConflict {
            expected_version: 0,
            actual_version: 1,
            ..
        }) => {}
        Err(e) => return Err(format!("expected ConcurrentConflict 0/1, got: {}", e)),
        Ok(v) => return Err(format!("stale append accepted at version {}", v)),
    }

    let rec = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    if rec.history.len() != 1 {
        return Err(format!(
            "conflicting append wrote an event: {} events",
            rec.history.len()
        ));
    }
    Ok(())
}

async fn append_future_version_conflicts<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_one(&s).await?;
    match s
        .append_status("requests", "req-1", 3, make_event("open"))
        .await
    {
        Err(StorageError::ConcurrentConflict { .. }) => Ok(()),
        Err(e) => Err(format!("expected ConcurrentConflict, got: {}", e)),
        Ok(v) => Err(format!("append at unseen version accepted: {}", v)),
    }
}

async fn append_to_missing_process_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s
        .append_status("requests", "missing", 0, make_event("open"))
        .await
    {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got: {}", e)),
        Ok(_) => Err("append to missing process accepted".to_string()),
    }
}

/// Every earlier event is still present, unchanged, after later appends.
async fn append_keeps_earlier_events<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_one(&s).await?;
    s.append_status("requests", "req-1", 0, make_event("open"))
        .await
        .map_err(|e| e.to_string())?;
    let before = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;

    s.append_status("requests", "req-1", 1, make_event("in_progress"))
        .await
        .map_err(|e| e.to_string())?;
    s.append_status("requests", "req-1", 2, make_event("done"))
        .await
        .map_err(|e| e.to_string())?;
    let after = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;

    for event in &before.history {
        if !after.history.contains(event) {
            return Err(format!("event {} ({}) was lost or changed", event.sequence, event.name));
        }
    }
    Ok(())
}

async fn history_newest_first<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_one(&s).await?;
    for (version, name) in ["open", "in_progress", "done"].into_iter().enumerate() {
        s.append_status("requests", "req-1", version as i64, make_event(name))
            .await
            .map_err(|e| e.to_string())?;
    }
    let rec = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    let sequences: Vec<i64> = rec.history.iter().map(|e| e.sequence).collect();
    if sequences != vec![3, 2, 1] {
        return Err(format!("expected sequences [3, 2, 1], got {:?}", sequences));
    }
    if rec.history[0].name != "done" {
        return Err(format!("expected newest event \"done\", got \"{}\"", rec.history[0].name));
    }
    Ok(())
}

/// The process-level payload is written once at creation only.
async fn append_does_not_touch_payload<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    create_one(&s).await?;
    let before = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    s.append_status("requests", "req-1", 0, make_event("open"))
        .await
        .map_err(|e| e.to_string())?;
    let after = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    if before.payload != after.payload || before.created_at != after.created_at {
        return Err("process payload or created_at changed by append".to_string());
    }
    Ok(())
}
