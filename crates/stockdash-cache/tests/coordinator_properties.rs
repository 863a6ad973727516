//! 페치 조정자 동작 통합 테스트.
//!
//! 신선도, 중복 제거, 강제 페치, 실패 시 캐시 보존, 로딩 플래그, 무효화,
//! 취소, 패닉 복구를 검증합니다.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use stockdash_cache::{
    CacheKey, CacheStore, Clock, EnsureOptions, EnsureOutcome, FetchCoordinator, ManualClock,
    StalenessPolicy, SystemClock,
};
use tokio_util::sync::CancellationToken;

const START_MILLIS: i64 = 1_700_000_000_000;

fn manual_coordinator<T: Send + Sync + 'static>(
    max_age: Duration,
) -> (Arc<FetchCoordinator<T>>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(START_MILLIS));
    let store = Arc::new(CacheStore::with_clock("test", clock.clone()));
    (
        Arc::new(FetchCoordinator::new(store, StalenessPolicy::new(max_age))),
        clock,
    )
}

fn key(raw: &str) -> CacheKey {
    CacheKey::new(raw).unwrap()
}

/// 호출 횟수를 세는 페치 함수 생성기.
#[derive(Clone, Default)]
struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    fn hit(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[tokio::test]
async fn fresh_read_invokes_fetch_at_most_once() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));
    let calls = CallCounter::default();
    let k = key("AAPL");

    for _ in 0..2 {
        let calls = calls.clone();
        coordinator
            .ensure(
                &k,
                || async move { Ok::<_, String>(calls.hit() as u32) },
                EnsureOptions::default(),
            )
            .await;
    }

    assert_eq!(calls.count(), 1);
    assert_eq!(coordinator.store().get(&k).map(|v| *v), Some(1));
}

#[tokio::test(start_paused = true)]
async fn overlapping_ensure_calls_fetch_once() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));
    let calls = CallCounter::default();
    let k = key("AAPL");

    let slow = |calls: CallCounter| {
        move || async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, String>(calls.hit() as u32)
        }
    };

    let (first, second) = tokio::join!(
        coordinator.ensure(&k, slow(calls.clone()), EnsureOptions::default()),
        coordinator.ensure(&k, slow(calls.clone()), EnsureOptions::default()),
    );

    assert_eq!(first, EnsureOutcome::Fetched);
    assert_eq!(second, EnsureOutcome::InFlight);
    assert_eq!(calls.count(), 1);
    assert_eq!(coordinator.stats().deduplicated, 1);
}

#[tokio::test(start_paused = true)]
async fn force_does_not_start_a_second_concurrent_fetch() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));
    let calls = CallCounter::default();
    let k = key("AAPL");

    let slow = |calls: CallCounter| {
        move || async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, String>(calls.hit() as u32)
        }
    };

    let (_, forced) = tokio::join!(
        coordinator.ensure(&k, slow(calls.clone()), EnsureOptions::default()),
        coordinator.ensure(&k, slow(calls.clone()), EnsureOptions::force()),
    );

    assert_eq!(forced, EnsureOutcome::InFlight);
    assert_eq!(calls.count(), 1);
}

#[tokio::test]
async fn force_always_fetches_even_when_fresh() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(300));
    let calls = CallCounter::default();
    let k = key("AAPL:1M");

    for options in [EnsureOptions::default(), EnsureOptions::force(), EnsureOptions::force()] {
        let calls = calls.clone();
        coordinator
            .ensure(&k, || async move { Ok::<_, String>(calls.hit() as u32) }, options)
            .await;
    }

    assert_eq!(calls.count(), 3);
    assert_eq!(coordinator.store().get(&k).map(|v| *v), Some(3));
}

#[tokio::test]
async fn failed_fetch_keeps_cached_value_and_sets_error() {
    let (coordinator, _) = manual_coordinator::<String>(Duration::from_secs(30));
    let k = key("AAPL");

    coordinator
        .ensure(
            &k,
            || async { Ok::<_, String>("good".to_string()) },
            EnsureOptions::default(),
        )
        .await;
    let fetched_at = coordinator.store().last_fetch(&k);

    let outcome = coordinator
        .ensure(
            &k,
            || async { Err::<String, _>("Network error: connection refused") },
            EnsureOptions::force(),
        )
        .await;

    assert_eq!(
        outcome,
        EnsureOutcome::Failed("Network error: connection refused".to_string())
    );
    let store = coordinator.store();
    assert_eq!(store.get(&k).as_deref().map(String::as_str), Some("good"));
    assert_eq!(
        store.error(&k).as_deref(),
        Some("Network error: connection refused")
    );
    assert_eq!(store.last_fetch(&k), fetched_at);
    assert!(!store.loading(&k));
}

#[tokio::test]
async fn next_attempt_clears_previous_error() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));
    let k = key("AAPL");

    coordinator
        .ensure(&k, || async { Err::<u32, _>("boom") }, EnsureOptions::default())
        .await;
    assert!(coordinator.store().error(&k).is_some());

    let store = Arc::clone(coordinator.store());
    let probe_key = k.clone();
    coordinator
        .ensure(
            &k,
            move || async move {
                // 시작 시점에 에러가 지워져 있어야 함
                assert_eq!(store.error(&probe_key), None);
                Ok::<_, String>(1)
            },
            EnsureOptions::default(),
        )
        .await;
    assert_eq!(coordinator.store().error(&k), None);
}

#[tokio::test]
async fn loading_flag_is_true_only_while_fetching() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));
    let k = key("AAPL");

    for succeed in [true, false] {
        assert!(!coordinator.store().loading(&k));

        let store = Arc::clone(coordinator.store());
        let probe_key = k.clone();
        coordinator
            .ensure(
                &k,
                move || async move {
                    assert!(store.loading(&probe_key));
                    if succeed {
                        Ok(1u32)
                    } else {
                        Err("failed")
                    }
                },
                EnsureOptions::force(),
            )
            .await;

        assert!(!coordinator.store().loading(&k));
    }
}

#[tokio::test]
async fn invalidate_forces_refetch_but_keeps_value() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(600));
    let calls = CallCounter::default();
    let k = key("AAPL:1M");

    let fetch = |calls: CallCounter| move || async move { Ok::<_, String>(calls.hit() as u32) };

    coordinator
        .ensure(&k, fetch(calls.clone()), EnsureOptions::default())
        .await;
    coordinator.store().invalidate(&k);

    assert_eq!(coordinator.store().get(&k).map(|v| *v), Some(1));
    assert_eq!(coordinator.store().last_fetch(&k), Some(0));

    let outcome = coordinator
        .ensure(&k, fetch(calls.clone()), EnsureOptions::default())
        .await;
    assert_eq!(outcome, EnsureOutcome::Fetched);
    assert_eq!(calls.count(), 2);
}

#[tokio::test]
async fn prefix_invalidation_covers_every_period_of_a_symbol() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(600));
    let keys = ["AAPL:1M", "AAPL:1Y", "MSFT:1M"].map(key);

    for k in &keys {
        coordinator
            .ensure(k, || async { Ok::<_, String>(1) }, EnsureOptions::default())
            .await;
    }
    coordinator.store().invalidate_prefix("AAPL");

    assert!(!coordinator.is_fresh(&keys[0]));
    assert!(!coordinator.is_fresh(&keys[1]));
    assert!(coordinator.is_fresh(&keys[2]));
}

#[tokio::test]
async fn staleness_follows_max_age() {
    let (coordinator, clock) = manual_coordinator::<u32>(Duration::from_secs(30));
    let calls = CallCounter::default();
    let k = key("AAPL");
    let fetch = |calls: CallCounter| move || async move { Ok::<_, String>(calls.hit() as u32) };

    coordinator
        .ensure(&k, fetch(calls.clone()), EnsureOptions::default())
        .await;
    clock.advance(Duration::from_secs(29));
    assert_eq!(
        coordinator
            .ensure(&k, fetch(calls.clone()), EnsureOptions::default())
            .await,
        EnsureOutcome::Fresh
    );

    clock.advance(Duration::from_secs(1));
    assert_eq!(
        coordinator
            .ensure(&k, fetch(calls.clone()), EnsureOptions::default())
            .await,
        EnsureOutcome::Fetched
    );
    assert_eq!(calls.count(), 2);
}

#[derive(Debug, Clone, PartialEq)]
struct Point {
    date: &'static str,
    price: u32,
    volume: u64,
}

#[tokio::test]
async fn chart_example_populates_entry() {
    let store = Arc::new(CacheStore::new("chart"));
    let coordinator = FetchCoordinator::new(store, StalenessPolicy::new(Duration::from_secs(600)));
    let k = CacheKey::symbol_period("AAPL", "1M").unwrap();
    let expected = vec![Point {
        date: "2024-01-01",
        price: 100,
        volume: 1000,
    }];

    let returned = expected.clone();
    let outcome = coordinator
        .ensure(&k, || async move { Ok::<_, String>(returned) }, EnsureOptions::default())
        .await;

    assert_eq!(outcome, EnsureOutcome::Fetched);
    let store = coordinator.store();
    assert_eq!(store.get(&k).as_deref(), Some(&expected));
    assert!(!store.loading(&k));
    assert_eq!(store.error(&k), None);

    let fetched_at = store.last_fetch(&k).unwrap();
    let now = SystemClock.now_millis();
    assert!(fetched_at <= now && now - fetched_at < 5_000);
}

#[tokio::test(start_paused = true)]
async fn two_consumers_ten_ms_apart_share_one_slow_fetch() {
    let (coordinator, _) = manual_coordinator::<String>(Duration::from_secs(30));
    let calls = CallCounter::default();

    let slow_fetch = |calls: CallCounter| {
        move || async move {
            calls.hit();
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, String>("MSFT quote".to_string())
        }
    };

    let first = {
        let coordinator = Arc::clone(&coordinator);
        let fetch = slow_fetch(calls.clone());
        tokio::spawn(async move {
            let k = key("MSFT");
            let outcome = coordinator.ensure(&k, fetch, EnsureOptions::default()).await;
            outcome
        })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;

    let second = {
        let coordinator = Arc::clone(&coordinator);
        let fetch = slow_fetch(calls.clone());
        tokio::spawn(async move {
            let k = key("MSFT");
            let outcome = coordinator
                .ensure(&k, fetch, EnsureOptions::default())
                .await;
            coordinator.wait_for_idle(&k).await;
            (outcome, coordinator.store().get(&k))
        })
    };

    let first = first.await.unwrap();
    let (second, seen) = second.await.unwrap();

    assert_eq!(first, EnsureOutcome::Fetched);
    assert_eq!(second, EnsureOutcome::InFlight);
    assert_eq!(seen.as_deref().map(String::as_str), Some("MSFT quote"));
    assert_eq!(calls.count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancellation_clears_loading_without_error_or_entry() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));
    let k = key("AAPL");
    let token = CancellationToken::new();

    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };

    let outcome = coordinator
        .ensure_with_cancel(
            &k,
            &token,
            |signal| async move {
                signal.cancelled().await;
                tokio::time::sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(1)
            },
            EnsureOptions::default(),
        )
        .await;
    canceller.await.unwrap();

    assert_eq!(outcome, EnsureOutcome::Cancelled);
    let store = coordinator.store();
    assert!(!store.loading(&k));
    assert_eq!(store.error(&k), None);
    assert!(store.get(&k).is_none());
    assert_eq!(coordinator.stats().cancellations, 1);
}

#[tokio::test]
async fn panicking_fetch_does_not_leave_key_loading() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(30));

    let task = {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move {
            let k = key("AAPL");
            let outcome = coordinator
                .ensure(
                    &k,
                    || async {
                        if true {
                            panic!("fetch exploded");
                        }
                        Ok::<u32, String>(0)
                    },
                    EnsureOptions::default(),
                )
                .await;
            outcome
        })
    };

    assert!(task.await.is_err());
    assert!(!coordinator.store().loading(&key("AAPL")));

    let outcome = coordinator
        .ensure(&key("AAPL"), || async { Ok::<_, String>(7) }, EnsureOptions::default())
        .await;
    assert_eq!(outcome, EnsureOutcome::Fetched);
}

#[tokio::test(start_paused = true)]
async fn refresh_every_refetches_until_cancelled() {
    let (coordinator, _) = manual_coordinator::<u32>(Duration::from_secs(300));
    let calls = CallCounter::default();
    let token = CancellationToken::new();

    let refresher = {
        let coordinator = Arc::clone(&coordinator);
        let token = token.clone();
        let calls = calls.clone();
        tokio::spawn(async move {
            let k = key("AAPL");
            let refreshed = coordinator
                .refresh_every(
                    &k,
                    move |_| {
                        let calls = calls.clone();
                        async move { Ok::<_, String>(calls.hit() as u32) }
                    },
                    Duration::from_secs(30),
                    &token,
                )
                .await;
            refreshed
        })
    };

    // 0s, 30s, 60s, 90s 틱
    tokio::time::sleep(Duration::from_secs(95)).await;
    token.cancel();

    let refreshed = refresher.await.unwrap();
    assert_eq!(refreshed, 4);
    assert_eq!(calls.count(), 4);
    assert_eq!(coordinator.store().get(&key("AAPL")).map(|v| *v), Some(4));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_callers_across_worker_threads_fetch_once() {
    const CALLERS: usize = 32;

    for round in 0..20 {
        let (coordinator, _) = manual_coordinator::<usize>(Duration::from_secs(30));
        let calls = CallCounter::default();
        let barrier = Arc::new(tokio::sync::Barrier::new(CALLERS));
        let raw = format!("SYM{}", round);

        let handles: Vec<_> = (0..CALLERS)
            .map(|_| {
                let coordinator = Arc::clone(&coordinator);
                let calls = calls.clone();
                let barrier = Arc::clone(&barrier);
                let raw = raw.clone();
                tokio::spawn(async move {
                    let k = key(&raw);
                    barrier.wait().await;
                    let outcome = coordinator
                        .ensure_and_wait(
                            &k,
                            move || async move {
                                let n = calls.hit();
                                tokio::time::sleep(Duration::from_millis(5)).await;
                                Ok::<_, String>(n)
                            },
                            EnsureOptions::default(),
                        )
                        .await;
                    let value = coordinator.store().get(&k).map(|v| *v);
                    (outcome, value)
                })
            })
            .collect();

        let mut fetched = 0;
        for handle in handles {
            let (outcome, value) = handle.await.unwrap();
            match outcome {
                EnsureOutcome::Fetched => fetched += 1,
                EnsureOutcome::InFlight | EnsureOutcome::Fresh => {}
                other => panic!("unexpected outcome {:?}", other),
            }
            assert_eq!(value, Some(1));
        }

        let k = key(&raw);
        assert_eq!(calls.count(), 1, "round {}", round);
        assert_eq!(fetched, 1);
        assert!(!coordinator.store().loading(&k));
        assert_eq!(coordinator.stats().misses, 1);
    }
}
