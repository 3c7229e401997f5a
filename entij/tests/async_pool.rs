// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Async entry pool tests
//!
//! Ordering of submissions on one entry, shutdown semantics, and asynchronous
//! reactions bound to entities.

use entij::{
    AsyncEntryPool, EntijError, Entity, PoolConfig, PoolLifecycle, Reaction, Terrain, Value,
};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

fn stepper() -> Entity {
    let e = Entity::named("stepper");
    e.add_logic(|e: &Entity, input: &Value| {
        let step = input.get::<i64>().ok()?;
        Some(Reaction::new().posit(e.posit() + step))
    });
    e
}

#[test]
fn test_submissions_run_in_order_without_overlap() {
    let pool = AsyncEntryPool::new();
    let entry = pool.get().unwrap();
    let e = Entity::new();
    let spans = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let spans = Arc::clone(&spans);
            entry
                .submit(&e, move |_| {
                    let start = Instant::now();
                    thread::sleep(Duration::from_millis(2));
                    spans.lock().unwrap().push((i, start, Instant::now()));
                })
                .unwrap()
        })
        .collect();
    for handle in handles {
        handle.wait().unwrap();
    }

    let spans = spans.lock().unwrap();
    let order: Vec<usize> = spans.iter().map(|(i, _, _)| *i).collect();
    assert_eq!(order, (0..8).collect::<Vec<_>>());
    for pair in spans.windows(2) {
        assert!(pair[0].2 <= pair[1].1, "task {} overlapped task {}", pair[0].0, pair[1].0);
    }
}

#[test]
fn test_shutdown_now_refuses_but_drains() {
    let pool = AsyncEntryPool::new();
    let entry = pool.get().unwrap();
    let e = Entity::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();

    let blocker = entry
        .submit(&e, move |_| {
            let _ = release_rx.recv();
        })
        .unwrap();
    let queued = entry.submit(&e, |e| e.set_posit(7)).unwrap();

    pool.shutdown_now();
    assert!(matches!(entry.submit(&e, |_| ()), Err(EntijError::PoolShutdown)));
    assert!(matches!(e.react_async(&pool, 1), Err(EntijError::PoolShutdown)));

    release_tx.send(()).unwrap();
    blocker.wait().unwrap();
    queued.wait().unwrap();
    assert_eq!(e.posit(), 7);
    assert!(entry.is_shutdown());
    assert_eq!(pool.join_retired(), 1);
}

#[test]
fn test_shutdown_later_lets_checked_out_entry_finish() {
    let pool = AsyncEntryPool::new();
    let idle = pool.get().unwrap();
    let busy = pool.get().unwrap();
    pool.put_back(idle.clone());
    let e = Entity::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let first = busy
        .submit(&e, move |_| {
            let _ = release_rx.recv();
        })
        .unwrap();

    pool.shutdown_later();
    assert_eq!(pool.lifecycle(), PoolLifecycle::Draining);
    assert!(idle.is_shutdown());
    assert!(!busy.is_shutdown());

    // still accepted while draining
    let second = busy.submit(&e, |e| e.set_state(3)).unwrap();
    release_tx.send(()).unwrap();
    first.wait().unwrap();
    second.wait().unwrap();

    assert_eq!(e.state(), 3);
    assert!(busy.is_shutdown());
    assert!(matches!(busy.submit(&e, |_| ()), Err(EntijError::EntryShutdown)));
    pool.put_back(busy);
    assert_eq!(pool.idle_count(), 0);
    assert_eq!(pool.join_retired(), 2);
}

#[test]
fn test_entity_drained_during_shutdown_is_retired_not_discarded() {
    let pool = AsyncEntryPool::new();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let gate = Mutex::new(release_rx);
    let e = Entity::named("slow");
    e.add_logic(move |_: &Entity, _: &Value| -> Option<Reaction> {
        let _ = gate.lock().unwrap().recv();
        Some(Reaction::new().state(1))
    });

    let handle = e.react_async(&pool, true).unwrap();
    pool.shutdown_later();
    release_tx.send(()).unwrap();
    handle.wait().unwrap();

    assert_eq!(e.state(), 1);
    assert!(!e.has_async_entry());
    let stats = pool.stats();
    assert_eq!(stats.retired, 1);
    assert_eq!(stats.discarded, 0);
    assert_eq!(pool.join_retired(), 1);
}

#[test]
fn test_react_async_serializes_and_releases() {
    let pool = AsyncEntryPool::with_config(PoolConfig::new(4));
    let e = stepper();

    let handles: Vec<_> = (1..=5).map(|step| e.react_async(&pool, step).unwrap()).collect();
    let mut seen = Vec::new();
    for handle in handles {
        let reaction = handle.wait().unwrap().unwrap();
        seen.push(reaction.next_posit().unwrap());
    }

    assert_eq!(seen, vec![1, 3, 6, 10, 15]);
    assert_eq!(e.posit(), 15);
    assert!(!e.has_async_entry());
    assert_eq!(pool.idle_count(), 1);
    assert_eq!(pool.stats().misses, 1);
}

#[test]
fn test_react_async_errors_reach_handle() {
    let pool = AsyncEntryPool::new();
    let e = Entity::new();
    e.add_logic(|_: &Entity, _: &Value| Some(Reaction::new().and_then_call("absent", vec![])));
    let handle = e.react_async(&pool, "go").unwrap();
    assert!(matches!(handle.wait(), Err(EntijError::FunctionNotFound(_))));
    assert!(matches!(e.react_async(&pool, Value::Nil), Err(EntijError::InvalidArgument(_))));
}

#[test]
fn test_entities_share_workers_across_checkouts() {
    let pool = AsyncEntryPool::new();
    let walkers: Vec<Entity> = (0..3).map(|_| stepper()).collect();
    for walker in &walkers {
        walker.react_async(&pool, 2).unwrap().wait().unwrap();
    }
    let stats = pool.stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 2);
    assert!(walkers.iter().all(|w| w.posit() == 2));
}

#[test]
fn test_async_reaction_updates_terrain() {
    let pool = AsyncEntryPool::new();
    let terrain = Terrain::named("board");
    let e = stepper();
    terrain.add(&e);

    e.react_async(&pool, 5).unwrap().wait().unwrap();
    assert!(terrain.get_by_posit(5).contains(&e));
    assert!(terrain.get_by_posit(0).is_empty());

    pool.shutdown_now();
    assert_eq!(pool.join_retired(), 1);
}
