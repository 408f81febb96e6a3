use std::time::Duration;

use photos_album_downloader::shutdown::ShutdownCoordinator;

#[tokio::test]
async fn shutdown_notifies_waiters() {
    let shutdown = ShutdownCoordinator::shared();
    let waiter = {
        let handle = shutdown.clone();
        tokio::spawn(async move {
            handle.wait_for_shutdown().await;
            true
        })
    };

    // Give the task time to start waiting
    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok());
}

/// Shutdown requested before anyone waits must not deadlock the waiter.
#[tokio::test]
async fn shutdown_race_condition_no_deadlock() {
    let shutdown = ShutdownCoordinator::shared();
    shutdown.request_shutdown();

    let handle = shutdown.clone();
    let waiter = tokio::spawn(async move {
        handle.wait_for_shutdown().await;
        true
    });

    let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
    assert!(result.is_ok(), "wait_for_shutdown() deadlocked despite shutdown already requested");
}

/// All concurrent waiters are woken by a single request.
#[tokio::test]
async fn shutdown_concurrent_waiters_all_notified() {
    let shutdown = ShutdownCoordinator::shared();

    let mut waiters = Vec::new();
    for _ in 0..10 {
        let handle = shutdown.clone();
        waiters.push(tokio::spawn(async move {
            handle.wait_for_shutdown().await;
        }));
    }

    tokio::time::sleep(Duration::from_millis(10)).await;
    shutdown.request_shutdown();

    for waiter in waiters {
        let result = tokio::time::timeout(Duration::from_secs(1), waiter).await;
        assert!(result.is_ok(), "A waiter was not notified of shutdown");
    }
}

/// A long courtesy sleep ends as soon as shutdown is requested.
#[tokio::test]
async fn sleep_or_shutdown_wakes_early() {
    let shutdown = ShutdownCoordinator::shared();
    let sleeper = {
        let handle = shutdown.clone();
        tokio::spawn(async move { handle.sleep_or_shutdown(Duration::from_secs(60)).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown.request_shutdown();

    let completed = tokio::time::timeout(Duration::from_secs(1), sleeper)
        .await
        .expect("sleep was not interrupted")
        .unwrap();
    assert!(!completed);
}
