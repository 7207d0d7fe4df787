//! Concurrent ledger access tests
//!
//! Many threads share one `LedgerContext` and hit the same account at the
//! same moment. Read-modify-write sequences must never lose an update or
//! push a balance below its minimum.
//!
//! Run with: cargo test --test concurrent_access_test -- --nocapture

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Instant;
use tempfile::TempDir;

use rust_decimal::Decimal;

use ledger_core::config::Config;
use ledger_core::domain::{AccountNumber, Error, NewAccount, NewUser, Session};
use ledger_core::LedgerContext;

/// Number of concurrent threads for stress tests
const THREAD_COUNT: usize = 8;

/// Number of operations per thread
const ITERATIONS_PER_THREAD: usize = 5;

fn create_shared_context(temp_dir: &TempDir) -> Arc<LedgerContext> {
    let ctx = LedgerContext::with_config(temp_dir.path(), Config::default().with_insecure_hashing())
        .expect("Failed to create ledger context");
    Arc::new(ctx)
}

fn teller_session(ctx: &LedgerContext) -> Session {
    ctx.auth_service
        .register_user(&NewUser::new("teller", "pw", "teller@example.com"))
        .unwrap();
    ctx.auth_service.login("teller", "pw").unwrap()
}

fn open_account(
    ctx: &LedgerContext,
    session: &Session,
    balance: i64,
    minimum: i64,
    limit: i64,
) -> AccountNumber {
    let request = NewAccount::new(
        "Shared Holder",
        Decimal::new(balance, 0),
        Decimal::new(limit, 0),
        "555-0100",
        "secret",
    )
    .with_minimum_balance(Decimal::new(minimum, 0));
    ctx.ledger_service.open_account(session, &request).unwrap()
}

/// Withdrawals racing on one account: exactly as many succeed as the
/// headroom above the minimum allows
#[test]
fn test_concurrent_withdrawals_never_break_minimum() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_shared_context(&temp_dir);
    let session = teller_session(&ctx);

    // 1000 above the minimum, 100 per withdrawal: 10 may succeed
    let number = open_account(&ctx, &session, 2000, 1000, 100);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let success_count = Arc::new(AtomicUsize::new(0));
    let rejected_count = Arc::new(AtomicUsize::new(0));

    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let ctx = Arc::clone(&ctx);
        let session = session.clone();
        let barrier = Arc::clone(&barrier);
        let success_count = Arc::clone(&success_count);
        let rejected_count = Arc::clone(&rejected_count);

        let handle = thread::spawn(move || {
            // Wait for all threads to be ready
            barrier.wait();
            let start = Instant::now();

            for i in 0..ITERATIONS_PER_THREAD {
                match ctx
                    .ledger_service
                    .withdraw(&session, number, Decimal::new(100, 0), "secret")
                {
                    Ok(balance) => {
                        assert!(balance >= Decimal::new(1000, 0));
                        success_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(Error::InsufficientBalance { .. }) => {
                        rejected_count.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(e) => panic!("Thread {}: unexpected error at {}: {}", thread_id, i, e),
                }
            }
            println!("Thread {}: done in {:?}", thread_id, start.elapsed());
        });

        handles.push(handle);
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let successes = success_count.load(Ordering::SeqCst);
    let rejected = rejected_count.load(Ordering::SeqCst);
    println!("Successes: {}, rejected: {}", successes, rejected);

    assert_eq!(successes, 10);
    assert_eq!(successes + rejected, THREAD_COUNT * ITERATIONS_PER_THREAD);
    assert_eq!(
        ctx.ledger_service.check_balance(&session, number, "secret").unwrap(),
        Decimal::new(1000, 0)
    );
}

/// Concurrent deposits are all counted
#[test]
fn test_concurrent_deposits_lose_no_updates() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_shared_context(&temp_dir);
    let session = teller_session(&ctx);
    let number = open_account(&ctx, &session, 0, 0, 100);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let mut handles = vec![];

    for _ in 0..THREAD_COUNT {
        let ctx = Arc::clone(&ctx);
        let session = session.clone();
        let barrier = Arc::clone(&barrier);

        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..ITERATIONS_PER_THREAD {
                ctx.ledger_service
                    .deposit(&session, number, Decimal::new(1050, 2))
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let expected = Decimal::new(1050, 2) * Decimal::from(THREAD_COUNT * ITERATIONS_PER_THREAD);
    assert_eq!(
        ctx.ledger_service.check_balance(&session, number, "secret").unwrap(),
        expected
    );
}

/// Opposing transfers between two accounts keep the total constant
#[test]
fn test_concurrent_opposing_transfers_conserve_total() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_shared_context(&temp_dir);
    let session = teller_session(&ctx);
    let a = open_account(&ctx, &session, 5000, 0, 100);
    let b = open_account(&ctx, &session, 5000, 0, 100);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let mut handles = vec![];

    for thread_id in 0..THREAD_COUNT {
        let ctx = Arc::clone(&ctx);
        let session = session.clone();
        let barrier = Arc::clone(&barrier);
        let (from, to) = if thread_id % 2 == 0 { (a, b) } else { (b, a) };

        handles.push(thread::spawn(move || {
            barrier.wait();
            for _ in 0..ITERATIONS_PER_THREAD {
                ctx.ledger_service
                    .transfer(&session, from, to, Decimal::new(25, 0), "secret")
                    .unwrap();
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }

    let status = ctx.status_service.get_status().unwrap();
    assert_eq!(status.total_balance, Decimal::new(10_000, 0));
    // Equal numbers of threads push each way
    assert_eq!(
        ctx.ledger_service.check_balance(&session, a, "secret").unwrap(),
        Decimal::new(5000, 0)
    );
}

/// Accounts opened concurrently all get distinct numbers
#[test]
fn test_concurrent_opens_get_distinct_numbers() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_shared_context(&temp_dir);
    let session = teller_session(&ctx);

    let barrier = Arc::new(Barrier::new(THREAD_COUNT));
    let mut handles = vec![];

    for _ in 0..THREAD_COUNT {
        let ctx = Arc::clone(&ctx);
        let session = session.clone();
        let barrier = Arc::clone(&barrier);
        handles.push(thread::spawn(move || {
            barrier.wait();
            open_account(&ctx, &session, 10, 0, 10)
        }));
    }

    let mut numbers: Vec<AccountNumber> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    numbers.sort();
    numbers.dedup();
    assert_eq!(numbers.len(), THREAD_COUNT);
    assert_eq!(numbers[0], AccountNumber::new(1001));
    assert_eq!(
        numbers[THREAD_COUNT - 1],
        AccountNumber::new(1001 + THREAD_COUNT as i64 - 1)
    );
}
