use std::future::Future;

use super::{make_process, TestResult};
use crate::{ProcessStorage, StorageError};

pub(super) async fn run_create_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "create",
            "create_returns_supplied_uuid",
            create_returns_supplied_uuid(factory).await,
        ),
        TestResult::from_result(
            "create",
            "create_generates_distinct_uuids",
            create_generates_distinct_uuids(factory).await,
        ),
        TestResult::from_result(
            "create",
            "create_starts_with_empty_history",
            create_starts_with_empty_history(factory).await,
        ),
        TestResult::from_result(
            "create",
            "create_keeps_payload_bytes",
            create_keeps_payload_bytes(factory).await,
        ),
        TestResult::from_result(
            "create",
            "duplicate_uuid_returns_already_exists",
            duplicate_uuid_returns_already_exists(factory).await,
        ),
        TestResult::from_result(
            "create",
            "duplicate_uuid_across_types_rejected",
            duplicate_uuid_across_types_rejected(factory).await,
        ),
    ]
}

// ── Test implementations ──────────────────────────────────────────────────────

/// A caller-supplied uuid is kept as is.
async fn create_returns_supplied_uuid<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let uuid = s
        .create(make_process(Some("req-1"), "requests"))
        .await
        .map_err(|e| e.to_string())?;
    if uuid != "req-1" {
        return Err(format!("expected uuid \"req-1\", got \"{}\"", uuid));
    }
    Ok(())
}

/// Without a supplied uuid, the backend generates a fresh one per process.
async fn create_generates_distinct_uuids<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let a = s
        .create(make_process(None, "requests"))
        .await
        .map_err(|e| e.to_string())?;
    let b = s
        .create(make_process(None, "requests"))
        .await
        .map_err(|e| e.to_string())?;
    if a.is_empty() || b.is_empty() {
        return Err("generated uuid is empty".to_string());
    }
    if a == b {
        return Err(format!("generated uuids collide: {}", a));
    }
    Ok(())
}

/// A new process has version 0 and no status events.
async fn create_starts_with_empty_history<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let uuid = s
        .create(make_process(None, "requests"))
        .await
        .map_err(|e| e.to_string())?;
    let rec = s
        .get_by_uuid("requests", &uuid)
        .await
        .map_err(|e| e.to_string())?;
    if rec.version != 0 {
        return Err(format!("expected version 0, got {}", rec.version));
    }
    if !rec.history.is_empty() {
        return Err(format!("expected empty history, got {} events", rec.history.len()));
    }
    if rec.process_type != "requests" {
        return Err(format!(
            "expected process_type \"requests\", got \"{}\"",
            rec.process_type
        ));
    }
    Ok(())
}

/// The payload bytes read back are the bytes written.
async fn create_keeps_payload_bytes<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let process = make_process(Some("req-1"), "requests");
    let expected = process.payload.clone();
    s.create(process).await.map_err(|e| e.to_string())?;
    let rec = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    if rec.payload != expected {
        return Err(format!(
            "payload changed: {:?}",
            String::from_utf8_lossy(&rec.payload)
        ));
    }
    Ok(())
}

/// Creating the same uuid twice fails with AlreadyExists.
async fn duplicate_uuid_returns_already_exists<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create(make_process(Some("req-1"), "requests"))
        .await
        .map_err(|e| e.to_string())?;
    match s.create(make_process(Some("req-1"), "requests")).await {
        Err(StorageError::AlreadyExists { uuid }) if uuid == "req-1" => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists for req-1, got: {}", e)),
        Ok(_) => Err("expected AlreadyExists, got Ok".to_string()),
    }
}

/// Uuids are unique across all process types, not per type.
async fn duplicate_uuid_across_types_rejected<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create(make_process(Some("shared"), "requests"))
        .await
        .map_err(|e| e.to_string())?;
    match s.create(make_process(Some("shared"), "orders")).await {
        Err(StorageError::AlreadyExists { .. }) => Ok(()),
        Err(e) => Err(format!("expected AlreadyExists, got: {}", e)),
        Ok(_) => Err("uuid reused across process types".to_string()),
    }
}
