use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

use anyhow::{Result, anyhow};
use notification_pipeline::{models::retry::RetryConfig, utils::retry_with_backoff};
use tokio::time::Instant;

fn quick_config(max_attempts: u32) -> RetryConfig {
    RetryConfig {
        max_attempts,
        initial_delay_ms: 50,
        max_delay_ms: 400,
        backoff_multiplier: 2,
    }
}

/// Test: A successful operation returns on the first attempt
#[tokio::test]
async fn test_success_skips_retry() -> Result<()> {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let result = retry_with_backoff(&quick_config(3), || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, anyhow::Error>(42)
        }
    })
    .await?;

    assert_eq!(result, 42);
    assert_eq!(attempts.load(Ordering::SeqCst), 1);

    Ok(())
}

/// Test: Transient failures are retried until the operation succeeds
#[tokio::test]
async fn test_transient_failure_eventually_succeeds() -> Result<()> {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let result = retry_with_backoff(&quick_config(5), || {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow!("broker not reachable yet"))
            } else {
                Ok("connected")
            }
        }
    })
    .await?;

    assert_eq!(result, "connected");
    assert_eq!(
        attempts.load(Ordering::SeqCst),
        3,
        "Two failures then a success should take three attempts"
    );

    Ok(())
}

/// Test: A persistent failure surfaces after exactly max_attempts tries
#[tokio::test]
async fn test_persistent_failure_exhausts_attempts() {
    let attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&attempts);

    let result = retry_with_backoff(&quick_config(4), || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(anyhow!("storage offline"))
        }
    })
    .await;

    assert!(result.is_err());
    assert_eq!(attempts.load(Ordering::SeqCst), 4);
}

/// Test: Backoff delays never exceed the configured cap (plus jitter)
#[tokio::test]
async fn test_delay_cap_is_respected() {
    let config = RetryConfig {
        max_attempts: 6,
        initial_delay_ms: 50,
        max_delay_ms: 150,
        backoff_multiplier: 2,
    };

    let start = Instant::now();
    let attempt_times = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let times = Arc::clone(&attempt_times);

    let _ = retry_with_backoff(&config, || {
        let times = Arc::clone(&times);
        async move {
            times.lock().await.push(start.elapsed().as_millis());
            Err::<(), _>(anyhow!("still down"))
        }
    })
    .await;

    let times = attempt_times.lock().await;
    assert_eq!(times.len(), 6);

    // The cap kicks in from the third delay onward (50 -> 100 -> 150).
    for i in 3..times.len() {
        let delay = times[i] - times[i - 1];
        assert!(
            delay <= (config.max_delay_ms * 12 / 10) as u128,
            "Delay {} exceeded the cap (actual: {}ms)",
            i,
            delay
        );
    }
}

/// Test: Concurrent retry loops keep independent attempt state
#[tokio::test]
async fn test_retry_state_is_per_operation() -> Result<()> {
    let config = Arc::new(quick_config(5));

    let failing_config = Arc::clone(&config);
    let failing = tokio::spawn(async move {
        retry_with_backoff(&failing_config, || async {
            Err::<(), _>(anyhow!("never recovers"))
        })
        .await
    });

    let flaky_config = Arc::clone(&config);
    let flaky_attempts = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&flaky_attempts);
    let flaky = tokio::spawn(async move {
        retry_with_backoff(&flaky_config, || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(anyhow!("first attempt fails"))
                } else {
                    Ok(())
                }
            }
        })
        .await
    });

    let (failing_result, flaky_result) = tokio::join!(failing, flaky);

    assert!(failing_result?.is_err());
    assert!(flaky_result?.is_ok());
    assert_eq!(flaky_attempts.load(Ordering::SeqCst), 2);

    Ok(())
}
