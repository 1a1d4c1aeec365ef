use std::future::Future;

use super::{make_event, make_process, TestResult};
use crate::{ProcessStorage, StorageError};

pub(super) async fn run_query_tests<S, F, Fut>(factory: &F) -> Vec<TestResult>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    vec![
        TestResult::from_result(
            "query",
            "unknown_uuid_returns_not_found",
            unknown_uuid_returns_not_found(factory).await,
        ),
        TestResult::from_result(
            "query",
            "wrong_type_returns_not_found",
            wrong_type_returns_not_found(factory).await,
        ),
        TestResult::from_result(
            "query",
            "repeated_reads_identical",
            repeated_reads_identical(factory).await,
        ),
        TestResult::from_result(
            "query",
            "get_by_type_filters_by_type",
            get_by_type_filters_by_type(factory).await,
        ),
        TestResult::from_result(
            "query",
            "get_by_type_pages_are_one_indexed",
            get_by_type_pages_are_one_indexed(factory).await,
        ),
        TestResult::from_result(
            "query",
            "get_by_type_page_past_end_is_not_found",
            get_by_type_page_past_end_is_not_found(factory).await,
        ),
        TestResult::from_result(
            "query",
            "get_by_type_no_rows_is_not_found",
            get_by_type_no_rows_is_not_found(factory).await,
        ),
        TestResult::from_result(
            "query",
            "get_by_type_includes_history",
            get_by_type_includes_history(factory).await,
        ),
    ]
}

async fn seed<S: ProcessStorage>(s: &S, process_type: &str, count: usize) -> Result<Vec<String>, String> {
    let mut uuids = Vec::with_capacity(count);
    for i in 0..count {
        let uuid = format!("{}-{}", process_type, i);
        s.create(make_process(Some(&uuid), process_type))
            .await
            .map_err(|e| format!("seed {}: {}", uuid, e))?;
        uuids.push(uuid);
    }
    Ok(uuids)
}

// ── Test implementations ──────────────────────────────────────────────────────

async fn unknown_uuid_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    match s.get_by_uuid("requests", "missing").await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got: {}", e)),
        Ok(_) => Err("expected NotFound, got Ok".to_string()),
    }
}

/// A uuid looked up under the wrong process type does not match.
async fn wrong_type_returns_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create(make_process(Some("req-1"), "requests"))
        .await
        .map_err(|e| e.to_string())?;
    match s.get_by_uuid("orders", "req-1").await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got: {}", e)),
        Ok(_) => Err("process found under the wrong type".to_string()),
    }
}

/// Two reads with no write in between return the same record.
async fn repeated_reads_identical<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    s.create(make_process(Some("req-1"), "requests"))
        .await
        .map_err(|e| e.to_string())?;
    s.append_status("requests", "req-1", 0, make_event("open"))
        .await
        .map_err(|e| e.to_string())?;
    s.append_status("requests", "req-1", 1, make_event("in_progress"))
        .await
        .map_err(|e| e.to_string())?;

    let first = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    let second = s
        .get_by_uuid("requests", "req-1")
        .await
        .map_err(|e| e.to_string())?;
    if first != second {
        return Err(format!("reads differ: {:?} vs {:?}", first, second));
    }
    Ok(())
}

async fn get_by_type_filters_by_type<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, "requests", 3).await?;
    seed(&s, "orders", 2).await?;

    let page = s
        .get_by_type("orders", 1, 10)
        .await
        .map_err(|e| e.to_string())?;
    if page.len() != 2 {
        return Err(format!("expected 2 orders, got {}", page.len()));
    }
    if let Some(stray) = page.iter().find(|r| r.process_type != "orders") {
        return Err(format!("listing returned {} of type {}", stray.uuid, stray.process_type));
    }
    Ok(())
}

/// Page 1 starts at offset 0; page 2 starts at offset page_size.
async fn get_by_type_pages_are_one_indexed<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    let uuids = seed(&s, "requests", 5).await?;

    let first = s
        .get_by_type("requests", 1, 2)
        .await
        .map_err(|e| e.to_string())?;
    let second = s
        .get_by_type("requests", 2, 2)
        .await
        .map_err(|e| e.to_string())?;
    let third = s
        .get_by_type("requests", 3, 2)
        .await
        .map_err(|e| e.to_string())?;

    let got: Vec<String> = first
        .iter()
        .chain(second.iter())
        .chain(third.iter())
        .map(|r| r.uuid.clone())
        .collect();
    if got != uuids {
        return Err(format!("expected pages {:?}, got {:?}", uuids, got));
    }
    if third.len() != 1 {
        return Err(format!("expected short last page of 1, got {}", third.len()));
    }
    Ok(())
}

async fn get_by_type_page_past_end_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, "requests", 3).await?;
    match s.get_by_type("requests", 2, 10).await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got: {}", e)),
        Ok(page) => Err(format!("expected NotFound, got page of {}", page.len())),
    }
}

/// No matching rows is an error, never an empty page.
async fn get_by_type_no_rows_is_not_found<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, "requests", 1).await?;
    match s.get_by_type("orders", 1, 10).await {
        Err(StorageError::NotFound { .. }) => Ok(()),
        Err(e) => Err(format!("expected NotFound, got: {}", e)),
        Ok(page) => Err(format!("expected NotFound, got page of {}", page.len())),
    }
}

async fn get_by_type_includes_history<S, F, Fut>(factory: &F) -> Result<(), String>
where
    S: ProcessStorage,
    F: Fn() -> Fut,
    Fut: Future<Output = S>,
{
    let s = factory().await;
    seed(&s, "requests", 1).await?;
    s.append_status("requests", "requests-0", 0, make_event("open"))
        .await
        .map_err(|e| e.to_string())?;
    let page = s
        .get_by_type("requests", 1, 10)
        .await
        .map_err(|e| e.to_string())?;
    let history = &page[0].history;
    if history.len() != 1 || history[0].name != "open" {
        return Err(format!("expected history [open], got {:?}", history));
    }
    Ok(())
}
