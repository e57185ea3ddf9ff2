use std::time::Duration;
use rust_decimal_macros::dec;
use usdt_rates::config::DatabaseConfig;
use usdt_rates::error::Error;
use usdt_rates::interfaces::RateSink;
use usdt_rates::storage::{bootstrap, PgConnector, PgRateStore, RetryPolicy, StorageConnector};
use usdt_rates::types::NewRate;

fn unreachable_database() -> DatabaseConfig {
    DatabaseConfig {
        host: "127.0.0.1".to_string(),
        // Nothing listens on the discard port.
        port: 9,
        connect_timeout_secs: 2,
        ..DatabaseConfig::default()
    }
}

#[tokio::test]
async fn unreachable_database_times_out_with_cause() {
    let config = unreachable_database();
    let policy = RetryPolicy {
        initial_backoff: Duration::from_millis(100),
        ..RetryPolicy::from_config(&config)
    };
    let started = std::time::Instant::now();

    let err = bootstrap(&PgConnector::new(&config), &policy).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(4));
    match err {
        Error::ConnectionTimeout { attempts, last_error, .. } => {
            assert!(attempts >= 1);
            assert!(!last_error.is_empty());
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[tokio::test]
async fn dial_is_bounded_by_the_remaining_budget() {
    let connector = PgConnector::new(&unreachable_database());
    let started = std::time::Instant::now();

    // The blocking dial itself must give up, not just the awaiting future.
    let err = connector.connect(Duration::from_millis(300)).await.unwrap_err();

    assert!(started.elapsed() < Duration::from_secs(2), "dial took {:?}", started.elapsed());
    assert!(matches!(err, Error::ConnectionFailed(_)), "got {:?}", err);
}

/// Needs a reachable Postgres, configured through the usual
/// `USDT_RATES__DATABASE__*` variables.
#[tokio::test]
#[ignore]
async fn live_database_appends_rows() {
    let config = usdt_rates::config::AppConfig::load("test").unwrap();
    let pool = bootstrap(
        &PgConnector::new(&config.database),
        &RetryPolicy::from_config(&config.database),
    )
    .await
    .unwrap();
    let store = PgRateStore::new(pool);

    let quote = NewRate::new(dec!(92.41), dec!(92.17));
    let first = store.save_rate(&quote).await.unwrap();
    let second = store.save_rate(&quote).await.unwrap();

    assert_eq!(first.quote(), quote);
    assert!(second.id > first.id);
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
#[ignore]
async fn migrations_are_idempotent() {
    let config = usdt_rates::config::AppConfig::load("test").unwrap();
    let connector = PgConnector::new(&config.database);
    let policy = RetryPolicy::from_config(&config.database);

    bootstrap(&connector, &policy).await.unwrap();
    bootstrap(&connector, &policy).await.unwrap();
}
