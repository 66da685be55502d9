//! Store and ledger behavior against a real embedded backend.

use std::sync::Arc;

use tempfile::TempDir;

use flowd::execution::ExecutionInstance;
use flowd::job::{JobId, JobSpec};
use flowd::kv::{FjallKv, KvBackend};
use flowd::schedule::Schedule;
use flowd::store::{Store, StoreError, MAX_EXECUTIONS};

fn open_test_store() -> (Store, Arc<FjallKv>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let kv = Arc::new(FjallKv::open(temp_dir.path().join("kv")).unwrap());
    let store = Store::open(kv.clone(), "/flow").unwrap();
    (store, kv, temp_dir)
}

fn minute_job(ns: &str, name: &str) -> JobSpec {
    JobSpec::new(
        JobId::new(ns, name),
        Schedule::every(std::time::Duration::from_secs(60)),
        "shell",
    )
}

#[test]
fn test_set_job_requires_schedule_or_parent() {
    let (store, _, _temp) = open_test_store();
    let mut job = minute_job("ops", "backup");
    job.schedule = None;

    let err = store.set_job(job).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn test_set_job_rejects_self_parent() {
    let (store, _, _temp) = open_test_store();
    let mut job = minute_job("ops", "backup");
    job.parent_job = Some(job.id.clone());

    let err = store.set_job(job).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn test_set_job_rejects_out_of_range_interval() {
    let (store, _, _temp) = open_test_store();
    let mut job = minute_job("ops", "backup");
    job.schedule = Some(Schedule::Interval {
        period_secs: u64::MAX,
    });

    let err = store.set_job(job).unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
}

#[test]
fn test_set_job_sanitizes_name() {
    let (store, _, _temp) = open_test_store();
    let mut job = minute_job("ops", "backup");
    job.id.name = "Nightly Backup!".to_string();

    let stored = store.set_job(job).unwrap();
    assert_eq!(stored.id.name, "nightly-backup");
    assert!(store.get_job(&JobId::new("ops", "nightly-backup")).is_ok());
}

#[test]
fn test_stat_merge_is_monotonic() {
    let (store, _, _temp) = open_test_store();
    let mut job = minute_job("ops", "backup");
    job.success_count = 5;
    store.set_job(job.clone()).unwrap();

    // A stale snapshot cannot regress counters advanced by a run.
    job.success_count = 3;
    let stored = store.set_job(job).unwrap();
    assert_eq!(stored.success_count, 5);

    let fetched = store.get_job(&JobId::new("ops", "backup")).unwrap();
    assert_eq!(fetched.success_count, 5);
}

#[test]
fn test_get_jobs_empty_keyspace() {
    let (store, _, _temp) = open_test_store();
    assert!(store.get_jobs().unwrap().is_empty());
}

#[test]
fn test_get_jobs_lists_all_namespaces() {
    let (store, _, _temp) = open_test_store();
    store.set_job(minute_job("ops", "backup")).unwrap();
    store.set_job(minute_job("ops", "reindex")).unwrap();
    store.set_job(minute_job("data", "etl")).unwrap();

    assert_eq!(store.get_jobs().unwrap().len(), 3);
}

#[test]
fn test_get_missing_job_is_not_found() {
    let (store, _, _temp) = open_test_store();
    let err = store.get_job(&JobId::new("ops", "ghost")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_delete_job_cascades_to_executions() {
    let (store, kv, _temp) = open_test_store();
    let job = store.set_job(minute_job("ops", "backup")).unwrap();

    let instance = ExecutionInstance::new(job.id.clone());
    store.set_execution(&instance).unwrap();

    let deleted = store.delete_job(&job.id).unwrap();
    assert_eq!(deleted.id, job.id);

    assert!(store.get_job(&job.id).unwrap_err().is_not_found());
    assert!(store.get_executions(&job.id).unwrap().is_empty());
    assert!(kv.list("/flow/instances/").is_err());
}

#[test]
fn test_delete_missing_job_is_not_found() {
    let (store, _, _temp) = open_test_store();
    let err = store.delete_job(&JobId::new("ops", "ghost")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_retention_keeps_most_recent_groups() {
    let (store, _, _temp) = open_test_store();
    let id = JobId::new("ops", "busy");

    for group in 1..=(MAX_EXECUTIONS as i64 + 5) {
        let mut instance = ExecutionInstance::new(id.clone());
        instance.group = group;
        store.set_execution(&instance).unwrap();
    }

    let remaining = store.get_executions(&id).unwrap();
    assert_eq!(remaining.len(), MAX_EXECUTIONS);

    // The oldest groups were evicted first.
    let min_group = remaining.iter().map(|e| e.group).min().unwrap();
    assert_eq!(min_group, 6);
}

#[test]
fn test_retention_evicts_whole_groups() {
    let (store, _, _temp) = open_test_store();
    let id = JobId::new("ops", "retry-heavy");

    // 51 groups of two attempts each: 102 instances, two over the limit,
    // so the entire oldest group (both attempts) goes.
    for group in 1..=51i64 {
        let mut first = ExecutionInstance::new(id.clone());
        first.group = group;
        store.set_execution(&first).unwrap();
        let mut second = first.retry();
        second.group = group;
        store.set_execution(&second).unwrap();
    }

    let remaining = store.get_executions(&id).unwrap();
    assert_eq!(remaining.len(), MAX_EXECUTIONS);
    assert!(remaining.iter().all(|e| e.group >= 2));
}

#[test]
fn test_execution_groups() {
    let (store, _, _temp) = open_test_store();
    let id = JobId::new("ops", "backup");

    let mut first = ExecutionInstance::new(id.clone());
    first.group = 100;
    store.set_execution(&first).unwrap();

    let mut retry = first.retry();
    retry.group = 100;
    store.set_execution(&retry).unwrap();

    let mut newer = ExecutionInstance::new(id.clone());
    newer.group = 200;
    store.set_execution(&newer).unwrap();

    let group = store.get_execution_group(&first).unwrap();
    assert_eq!(group.len(), 2);

    let last = store.get_last_execution_group(&id).unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].group, 200);

    let (grouped, by_group) = store.get_grouped_executions(&id).unwrap();
    assert_eq!(by_group, vec![200, 100]);
    assert_eq!(grouped[&100].len(), 2);
}

#[test]
fn test_executions_filter_foreign_path_segments() {
    let (store, kv, _temp) = open_test_store();
    let id = JobId::new("ops", "backup");

    let instance = ExecutionInstance::new(id.clone());
    store.set_execution(&instance).unwrap();

    // A backend listing can hand back nested entries whose trailing
    // segments no longer name this job; those must be filtered out.
    let stray = ExecutionInstance::new(id.clone());
    let payload = serde_json::to_vec(&stray).unwrap();
    kv.put(
        &format!("/flow/instances/ops/backup/nested/{}", stray.id),
        &payload,
    )
    .unwrap();

    let listed = store.get_executions(&id).unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].job, id);
}

#[test]
fn test_leader_key_and_read() {
    let (store, kv, _temp) = open_test_store();
    assert_eq!(store.leader_key(), "/flow/leader");
    assert!(store.get_leader().is_none());

    kv.put("/flow/leader", b"node-a").unwrap();
    assert_eq!(store.get_leader().unwrap(), b"node-a");
}
