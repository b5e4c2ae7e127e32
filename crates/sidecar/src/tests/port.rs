use crate::SupervisorError;
use crate::clock::tokio_clock;
use crate::port::{
    BindProbe, ListenTableProbe, PortAllocator, PortLease, PortProbe, PortStatus, SharedPortProbe,
    parse_listening_ports,
};
use crate::tests::{FakePortProbe, ManualClock};

use std::pin::Pin;
use std::task::Poll;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::eq;
use serial_test::serial;

const START_PORT: u16 = 8000;
const WINDOW: u16 = 10;

fn allocator(probe: SharedPortProbe) -> PortAllocator {
    PortAllocator::new(probe, tokio_clock(), WINDOW)
}

// =========================================================================
// Allocation
// =========================================================================

#[test]
fn given_first_nine_ports_busy_when_find_then_returns_last_in_window() {
    let probe = FakePortProbe::with_busy(8000..=8008);

    let port = allocator(probe).find_available_port(START_PORT).unwrap();

    assert_that!(port, eq(8009));
}

#[test]
fn given_free_window_when_find_then_returns_start_port() {
    let port = allocator(FakePortProbe::free())
        .find_available_port(START_PORT)
        .unwrap();

    assert_that!(port, eq(START_PORT));
}

#[test]
fn given_whole_window_busy_when_find_then_no_port_available() {
    let probe = FakePortProbe::with_busy(8000..=8009);

    let result = allocator(probe).find_available_port(START_PORT);

    let Err(SupervisorError::NoPortAvailable { start, end, .. }) = result else {
        panic!("expected NoPortAvailable, got {result:?}");
    };
    assert_that!((start, end), eq((8000, 8009)));
}

#[test]
fn given_port_beyond_window_free_when_find_then_not_returned() {
    let allocator = allocator(FakePortProbe::with_busy(8000..=8009));

    assert!(allocator.find_available_port(START_PORT).is_err());
    assert!(allocator.find_available_port(8010).is_ok());
}

#[test]
fn given_unconfirmed_port_when_find_excluding_then_skips_it() {
    let port = allocator(FakePortProbe::free())
        .find_available_port_excluding(START_PORT, &[8000])
        .unwrap();

    assert_that!(port, eq(8001));
}

#[test]
fn given_window_near_u16_max_when_find_then_end_saturates() {
    let probe = FakePortProbe::with_busy(65530..=65535);

    let result = allocator(probe).find_available_port(65530);

    let Err(SupervisorError::NoPortAvailable { start, end, .. }) = result else {
        panic!("expected NoPortAvailable, got {result:?}");
    };
    assert_that!((start, end), eq((65530, 65535)));
}

// =========================================================================
// Release Wait
// =========================================================================

#[tokio::test]
async fn given_port_freed_during_wait_when_wait_release_then_returns_true() {
    let clock = ManualClock::new();
    let probe = FakePortProbe::with_busy([8000]);
    let allocator = PortAllocator::new(probe.clone(), clock.clone(), WINDOW);

    let wait = allocator.wait_for_port_release(
        8000,
        Duration::from_millis(150),
        Duration::from_secs(8),
    );
    tokio::pin!(wait);

    // First poll sees the port busy and parks in the virtual sleep
    assert!(poll_once(wait.as_mut()).await.is_none());
    probe.release(8000);

    assert!(wait.await);
    assert_that!(clock.sleeps(), eq(&vec![Duration::from_millis(150)]));
}

#[tokio::test]
async fn given_port_never_freed_when_wait_release_then_stops_at_budget() {
    let clock = ManualClock::new();
    let probe = FakePortProbe::with_busy([8000]);
    let allocator = PortAllocator::new(probe, clock.clone(), WINDOW);

    let released = allocator
        .wait_for_port_release(8000, Duration::from_millis(150), Duration::from_secs(8))
        .await;

    assert!(!released);
    assert_that!(clock.elapsed(), eq(Duration::from_secs(8)));
    let sleeps = clock.sleeps();
    assert!(sleeps.iter().all(|sleep| *sleep <= Duration::from_millis(150)));
    assert_that!(sleeps.last(), eq(Some(&Duration::from_millis(50))));
}

#[tokio::test]
async fn given_free_port_when_wait_release_then_returns_without_sleeping() {
    let clock = ManualClock::new();
    let allocator = PortAllocator::new(FakePortProbe::free(), clock.clone(), WINDOW);

    let released = allocator
        .wait_for_port_release(8000, Duration::from_millis(150), Duration::from_secs(8))
        .await;

    assert!(released);
    assert!(clock.sleeps().is_empty());
}

/// Poll a future exactly once.
async fn poll_once<F: Future>(mut future: Pin<&mut F>) -> Option<F::Output> {
    std::future::poll_fn(|cx| match future.as_mut().poll(cx) {
        Poll::Ready(output) => Poll::Ready(Some(output)),
        Poll::Pending => Poll::Ready(None),
    })
    .await
}

// =========================================================================
// Lease State
// =========================================================================

#[test]
fn given_bound_or_unknown_lease_when_is_unconfirmed_then_true() {
    assert!(PortLease::bound(8000).is_unconfirmed());
    assert!(
        PortLease {
            port: 8000,
            status: PortStatus::Unknown
        }
        .is_unconfirmed()
    );
    assert!(
        !PortLease {
            port: 8000,
            status: PortStatus::Free
        }
        .is_unconfirmed()
    );
}

// =========================================================================
// Probes
// =========================================================================

const TCP_TABLE: &str = "\
  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
   0: 0100007F:1F40 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 11111 1 0000000000000000 100 0 0 10 0
   1: 0100007F:1F41 0100007F:C350 06 00000000:00000000 03:00000F9A 00000000     0        0 0 3 0000000000000000
   2: 00000000:0016 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 22222 1 0000000000000000 100 0 0 10 0
   3: 0100007F:1F42 0100007F:D431 01 00000000:00000000 00:00000000 00000000  1000        0 33333 1 0000000000000000 20 4 30 10 -1
";

#[test]
fn given_tcp_table_when_parse_then_only_listen_sockets_reported() {
    let ports = parse_listening_ports(TCP_TABLE);

    // 0x1F40 = 8000 LISTEN, 0x0016 = 22 LISTEN; TIME_WAIT and ESTABLISHED ignored
    assert_that!(ports.len(), eq(2));
    assert!(ports.contains(&8000));
    assert!(ports.contains(&22));
    assert!(!ports.contains(&8001));
    assert!(!ports.contains(&8002));
}

#[test]
fn given_garbage_table_when_parse_then_empty() {
    assert!(parse_listening_ports("").is_empty());
    assert!(parse_listening_ports("header\nnot a socket row\n").is_empty());
}

#[test]
fn given_missing_tables_when_listen_probe_then_unsupported_and_nothing_in_use() {
    let probe = ListenTableProbe::new(vec!["/nonexistent/tcp".into()]);

    assert!(!probe.is_supported());
    assert!(!probe.is_port_in_use(8000));
}

#[test]
#[serial]
fn given_bound_listener_when_bind_probe_then_in_use_until_dropped() {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    assert!(BindProbe.is_port_in_use(port));

    drop(listener);
    assert!(!BindProbe.is_port_in_use(port));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn given_bound_listener_when_listen_table_probe_then_in_use() {
    let probe = ListenTableProbe::system();
    if !probe.is_supported() {
        return;
    }
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).unwrap();
    let port = listener.local_addr().unwrap().port();

    assert!(probe.is_port_in_use(port));

    drop(listener);
    assert!(!probe.is_port_in_use(port));
}

#[cfg(target_os = "linux")]
#[test]
fn given_proc_stat_with_parenthesised_name_when_parse_then_parent_found() {
    use crate::process::parse_parent_pid;

    let stat = "4242 (my (odd) name) S 17 4242 4242 0 -1 4194560 120 0 0 0";

    assert_that!(parse_parent_pid(stat), eq(Some(17)));
    assert_that!(parse_parent_pid("garbage"), eq(None));
}
