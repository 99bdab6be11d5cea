use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

use pnet::util::MacAddr;
use tokio::time::Instant;

use arpsweep_common::config::{DuplicatePolicy, ScanConfig, ScanMode};
use arpsweep_common::error::ScanError;
use arpsweep_common::network::host::{HostBinding, ScanResult};
use arpsweep_common::network::target::TargetRange;
use arpsweep_core::scanner::Scan;
use arpsweep_core::signal::StopSignal;

use crate::segment::{Responder, SCANNER_MAC, SimulatedSegment, foreign_reply, mac};

fn lan(d: u8) -> Ipv4Addr {
    Ipv4Addr::new(192, 168, 1, d)
}

fn cfg(timeout_ms: u64, retries: u32, mode: ScanMode) -> ScanConfig {
    ScanConfig {
        per_target_timeout: Duration::from_millis(timeout_ms),
        retries,
        mode,
        workers: 4,
        ..Default::default()
    }
}

async fn run(segment: &Arc<SimulatedSegment>, range: &str, cfg: ScanConfig) -> ScanResult {
    let range: TargetRange = range.parse().unwrap();
    Scan::new(segment.clone(), cfg).run(&range).await.unwrap()
}

fn segment(responders: Vec<Responder>) -> Arc<SimulatedSegment> {
    Arc::new(SimulatedSegment::new(lan(100), 24, responders))
}

/*************************************************************
                      Documented scenarios
**************************************************************/

#[tokio::test(start_paused = true)]
async fn slash_30_with_one_silent_host() {
    let segment = segment(vec![Responder::new(lan(1), mac(0x01)).after(Duration::from_millis(200))]);
    let started = Instant::now();

    let result = run(&segment, "192.168.1.0/30", cfg(1000, 0, ScanMode::Auto)).await;

    assert_eq!(result.bindings.len(), 1);
    assert_eq!(result.bindings[0].ip, lan(1));
    assert_eq!(result.bindings[0].mac, mac(0x01));
    assert_eq!(result.unanswered, vec![lan(2)]);
    assert!(result.excluded.is_empty());
    assert!(!result.cancelled);
    assert!(started.elapsed() <= Duration::from_millis(1100));
}

#[tokio::test(start_paused = true)]
async fn invalid_entry_does_not_stop_the_rest_of_the_list() {
    let segment = segment(vec![Responder::new(lan(1), mac(0x01))]);

    let result = run(&segment, "192.168.1.1, 10.0.0.999", cfg(500, 0, ScanMode::Auto)).await;

    assert_eq!(result.bindings.len(), 1);
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].target, "10.0.0.999");
    assert_eq!(segment.requests_sent(), vec![lan(1)]);
}

#[tokio::test(start_paused = true)]
async fn single_invalid_target_is_an_invalid_target_error() {
    let err = "10.0.0.999".parse::<TargetRange>().unwrap_err();
    assert!(matches!(err, ScanError::InvalidTarget { .. }));
}

#[tokio::test(start_paused = true)]
async fn stale_duplicate_reply_keeps_first_binding() {
    let ip = Ipv4Addr::new(10, 0, 0, 5);
    let responders = vec![
        Responder::new(ip, mac(0x05))
            .after(Duration::from_millis(10))
            .also_from(mac(0x55), Duration::from_millis(20)),
    ];
    let segment = Arc::new(SimulatedSegment::new(Ipv4Addr::new(10, 0, 0, 100), 24, responders));

    // 10.0.0.6 never answers, so the window stays open for the second reply
    let result = run(&segment, "10.0.0.5-6", cfg(500, 0, ScanMode::Broadcast)).await;

    assert_eq!(result.bindings.len(), 1);
    assert_eq!(result.bindings[0].mac, mac(0x05));
    assert_eq!(result.unanswered, vec![Ipv4Addr::new(10, 0, 0, 6)]);
}

#[tokio::test(start_paused = true)]
async fn keep_latest_follows_reassignment() {
    let ip = Ipv4Addr::new(10, 0, 0, 5);
    let responders = vec![Responder::new(ip, mac(0x05)).also_from(mac(0x55), Duration::from_millis(20))];
    let segment = Arc::new(SimulatedSegment::new(Ipv4Addr::new(10, 0, 0, 100), 24, responders));

    let cfg = ScanConfig {
        duplicate_policy: DuplicatePolicy::KeepLatest,
        ..cfg(500, 0, ScanMode::Broadcast)
    };
    let result = run(&segment, "10.0.0.5-6", cfg).await;

    assert_eq!(result.bindings.len(), 1);
    assert_eq!(result.bindings[0].mac, mac(0x55));
}

#[tokio::test(start_paused = true)]
async fn keep_latest_on_a_single_target_waits_for_the_second_reply() {
    for mode in [ScanMode::Broadcast, ScanMode::PerTarget] {
        let ip = Ipv4Addr::new(10, 0, 0, 5);
        let responders = vec![Responder::new(ip, mac(0x05)).also_from(mac(0x55), Duration::from_millis(20))];
        let segment = Arc::new(SimulatedSegment::new(Ipv4Addr::new(10, 0, 0, 100), 24, responders));
        let started = Instant::now();

        let cfg = ScanConfig {
            duplicate_policy: DuplicatePolicy::KeepLatest,
            ..cfg(500, 0, mode)
        };
        let result = run(&segment, "10.0.0.5", cfg).await;

        assert_eq!(result.bindings.len(), 1, "{mode:?}");
        assert_eq!(result.bindings[0].mac, mac(0x55), "{mode:?}");
        assert!(result.unanswered.is_empty(), "{mode:?}");
        assert!(started.elapsed() >= Duration::from_millis(500), "{mode:?}");
    }
}

/*************************************************************
                    Partial results and budget
**************************************************************/

#[tokio::test(start_paused = true)]
async fn k_of_n_replies_in_every_mode() {
    for mode in [ScanMode::Broadcast, ScanMode::PerTarget, ScanMode::Auto] {
        let segment = segment(
            [2, 5, 7].into_iter().map(|d| Responder::new(lan(d), mac(d))).collect(),
        );

        let result = run(&segment, "192.168.1.1-10", cfg(300, 0, mode)).await;

        assert_eq!(result.responded(), 3, "{mode:?}");
        assert_eq!(result.unanswered.len(), 7, "{mode:?}");
        assert_eq!(result.probed(), 10, "{mode:?}");
        let mut bound: Vec<Ipv4Addr> = result.bindings.iter().map(|b| b.ip).collect();
        bound.sort();
        assert_eq!(bound, vec![lan(2), lan(5), lan(7)], "{mode:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn zero_replies_terminate_within_budget() {
    let segment = segment(Vec::new());
    let started = Instant::now();
    let result = run(&segment, "192.168.1.1-8", cfg(500, 1, ScanMode::Broadcast)).await;

    assert!(result.bindings.is_empty());
    assert_eq!(result.unanswered.len(), 8);
    // one window per attempt
    assert!(started.elapsed() <= Duration::from_millis(500 * 2 + 50));

    let started = Instant::now();
    let result = run(&segment, "192.168.1.1-8", cfg(500, 1, ScanMode::PerTarget)).await;

    assert_eq!(result.unanswered.len(), 8);
    // timeout x attempts x targets, shared by 4 workers
    assert!(started.elapsed() <= Duration::from_millis(500 * 2 * 8));
    assert!(started.elapsed() >= Duration::from_millis(500 * 2 * 2));
}

#[tokio::test(start_paused = true)]
async fn bindings_come_back_in_arrival_order() {
    let segment = segment(vec![
        Responder::new(lan(9), mac(9)).after(Duration::from_millis(10)),
        Responder::new(lan(3), mac(3)).after(Duration::from_millis(40)),
        Responder::new(lan(6), mac(6)).after(Duration::from_millis(25)),
    ]);

    let result = run(&segment, "192.168.1.1-10", cfg(300, 0, ScanMode::Broadcast)).await;

    let arrival: Vec<Ipv4Addr> = result.bindings.iter().map(|b| b.ip).collect();
    assert_eq!(arrival, vec![lan(9), lan(6), lan(3)]);
    assert!(result.bindings.windows(2).all(|w| w[0].first_seen_order < w[1].first_seen_order));

    let sorted: Vec<Ipv4Addr> = result.sorted_bindings().iter().map(|b| b.ip).collect();
    assert_eq!(sorted, vec![lan(3), lan(6), lan(9)]);
}

/*************************************************************
                            Retries
**************************************************************/

#[tokio::test(start_paused = true)]
async fn retries_only_go_to_timed_out_targets() {
    let segment = segment(vec![
        Responder::new(lan(1), mac(1)),
        Responder::new(lan(2), mac(2)).ignore_first(1),
    ]);

    let result = run(&segment, "192.168.1.1-3", cfg(200, 2, ScanMode::Broadcast)).await;

    assert_eq!(result.responded(), 2);
    assert_eq!(result.unanswered, vec![lan(3)]);
    assert_eq!(segment.requests_for(lan(1)), 1);
    assert_eq!(segment.requests_for(lan(2)), 2);
    assert_eq!(segment.requests_for(lan(3)), 3);
}

#[tokio::test(start_paused = true)]
async fn per_target_workers_retry_independently() {
    let segment = segment(vec![Responder::new(lan(2), mac(2)).ignore_first(2)]);

    let result = run(&segment, "192.168.1.1-4", cfg(200, 2, ScanMode::PerTarget)).await;

    assert!(result.binding_for(lan(2)).is_some());
    assert_eq!(result.unanswered, vec![lan(1), lan(3), lan(4)]);
    assert_eq!(segment.requests_for(lan(2)), 3);
    assert_eq!(segment.requests_for(lan(4)), 3);
}

#[tokio::test(start_paused = true)]
async fn without_retries_a_late_host_stays_unanswered() {
    let segment = segment(vec![Responder::new(lan(1), mac(1)).ignore_first(1)]);

    let result = run(&segment, "192.168.1.1", cfg(200, 0, ScanMode::Broadcast)).await;

    assert!(result.bindings.is_empty());
    assert_eq!(result.unanswered, vec![lan(1)]);
}

/*************************************************************
                    Filtering and exclusion
**************************************************************/

#[tokio::test(start_paused = true)]
async fn replies_to_another_requester_are_not_bound() {
    let other = (MacAddr::new(0x02, 0, 0, 0, 0, 0x99), lan(99));
    let chatter = vec![foreign_reply((mac(4), lan(4)), other)];
    let segment = Arc::new(SimulatedSegment::new(lan(100), 24, vec![Responder::new(lan(1), mac(1))]).with_chatter(chatter));

    let result = run(&segment, "192.168.1.1-4", cfg(200, 0, ScanMode::Broadcast)).await;

    assert_eq!(
        result.bindings,
        vec![HostBinding::new(lan(1), mac(1), result.bindings[0].first_seen_order)]
    );
    assert!(result.unanswered.contains(&lan(4)));
    assert_ne!(SCANNER_MAC, other.0);
}

#[tokio::test(start_paused = true)]
async fn own_address_is_never_probed() {
    let segment = segment(Vec::new());

    let result = run(&segment, "192.168.1.99-101", cfg(100, 0, ScanMode::Broadcast)).await;

    assert!(!segment.requests_sent().contains(&lan(100)));
    assert_eq!(result.unanswered, vec![lan(99), lan(101)]);
    assert_eq!(result.excluded.len(), 1);
    assert_eq!(result.excluded[0].target, "192.168.1.100");
}

#[tokio::test(start_paused = true)]
async fn lan_keyword_expands_to_the_interface_network() {
    let segment = Arc::new(SimulatedSegment::new(lan(100), 29, vec![Responder::new(lan(97), mac(97))]));

    let result = run(&segment, "lan", cfg(100, 0, ScanMode::Auto)).await;

    // 192.168.1.96/29 minus network, broadcast and our own address
    assert_eq!(result.probed(), 5);
    assert!(result.binding_for(lan(97)).is_some());
}

#[tokio::test(start_paused = true)]
async fn nothing_to_probe_opens_no_transport() {
    let segment = segment(Vec::new());

    let result = run(&segment, "192.168.1.100, 10.0.0.999", cfg(100, 0, ScanMode::Auto)).await;

    assert_eq!(segment.opened(), 0);
    assert_eq!(result.excluded.len(), 2);
    assert_eq!(result.probed(), 0);
}

/*************************************************************
                      Mode and pool sizing
**************************************************************/

#[tokio::test(start_paused = true)]
async fn auto_mode_broadcasts_on_link() {
    let segment = segment(Vec::new());
    run(&segment, "192.168.1.1-20", cfg(100, 0, ScanMode::Auto)).await;
    assert_eq!(segment.opened(), 1);
}

#[tokio::test(start_paused = true)]
async fn auto_mode_goes_per_target_off_link() {
    let segment = segment(vec![Responder::new(Ipv4Addr::new(10, 1, 1, 1), mac(1))]);

    let result = run(&segment, "192.168.1.1, 10.1.1.1-3", cfg(100, 0, ScanMode::Auto)).await;

    assert_eq!(segment.opened(), 4);
    assert_eq!(result.responded(), 1);
    assert_eq!(result.probed(), 4);
}

#[tokio::test(start_paused = true)]
async fn pool_never_exceeds_the_target_count() {
    let segment = segment(Vec::new());
    let cfg = ScanConfig {
        workers: 64,
        ..cfg(100, 0, ScanMode::PerTarget)
    };
    run(&segment, "192.168.1.1-2", cfg).await;
    assert_eq!(segment.opened(), 2);
}

/*************************************************************
                    Cancellation and failures
**************************************************************/

#[tokio::test(start_paused = true)]
async fn cancellation_returns_partial_result() {
    let segment = segment(vec![Responder::new(lan(1), mac(1))]);
    let (handle, stop) = StopSignal::new();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        handle.stop();
    });

    let cfg = ScanConfig {
        workers: 1,
        ..cfg(1000, 5, ScanMode::PerTarget)
    };
    let range: TargetRange = "192.168.1.1-6".parse().unwrap();
    let started = Instant::now();
    let result = Scan::new(segment.clone(), cfg).with_stop_signal(stop).run(&range).await.unwrap();

    assert!(result.cancelled);
    assert!(started.elapsed() < Duration::from_millis(1000));
    assert_eq!(result.responded(), 1);
    assert_eq!(result.unanswered.len(), 5);
    // .1 answered, .2 was on the wire when the stop fired, nothing after that
    assert_eq!(segment.requests_sent(), vec![lan(1), lan(2)]);
}

#[tokio::test(start_paused = true)]
async fn stop_before_start_sends_nothing() {
    let segment = segment(vec![Responder::new(lan(1), mac(1))]);
    let (handle, stop) = StopSignal::new();
    handle.stop();

    let range: TargetRange = "192.168.1.1-3".parse().unwrap();
    let result = Scan::new(segment.clone(), cfg(1000, 0, ScanMode::Broadcast))
        .with_stop_signal(stop)
        .run(&range)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert!(segment.requests_sent().is_empty());
    assert_eq!(result.unanswered.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn permission_failure_aborts_before_probing() {
    for mode in [ScanMode::Broadcast, ScanMode::PerTarget] {
        let segment = Arc::new(
            SimulatedSegment::new(lan(100), 24, Vec::new()).failing_with(io::ErrorKind::PermissionDenied),
        );
        let range: TargetRange = "192.168.1.1-4".parse().unwrap();

        let err = Scan::new(segment.clone(), cfg(100, 0, mode)).run(&range).await.unwrap_err();

        assert!(matches!(err, ScanError::Permission { .. }), "{mode:?}: {err}");
        assert!(segment.requests_sent().is_empty());
    }
}

#[tokio::test(start_paused = true)]
async fn host_callback_counts_new_bindings() {
    let segment = segment([1, 2, 3].into_iter().map(|d| Responder::new(lan(d), mac(d))).collect());
    let counts = Arc::new(std::sync::Mutex::new(Vec::new()));

    let range: TargetRange = "192.168.1.1-5".parse().unwrap();
    let recorded = counts.clone();
    Scan::new(segment.clone(), cfg(200, 0, ScanMode::Broadcast))
        .on_host_found(Box::new(move |n| recorded.lock().unwrap().push(n)))
        .run(&range)
        .await
        .unwrap();

    assert_eq!(*counts.lock().unwrap(), vec![1, 2, 3]);
}

