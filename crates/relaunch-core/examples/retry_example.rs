//! Example: retrying an unreliable operation
//!
//! This example demonstrates:
//! 1. Simple retry with exponential backoff
//! 2. Classifier-driven retries (permanent errors stop immediately)
//! 3. Loading settings from TOML
//!
//! Run with:
//! ```bash
//! RUST_LOG=relaunch_core=debug cargo run -p relaunch-core --example retry_example
//! ```

use relaunch_core::prelude::*;
use std::error::Error;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// A simulated service that fails the first few calls
struct UnreliableService {
    calls: AtomicU32,
    fail_count: u32,
    failure: &'static str,
}

impl UnreliableService {
    fn new(fail_count: u32, failure: &'static str) -> Self {
        Self {
            calls: AtomicU32::new(0),
            fail_count,
            failure,
        }
    }

    async fn call(&self) -> Result<String, std::io::Error> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.fail_count {
            println!("  Call {}: FAILED ({})", call, self.failure);
            Err(std::io::Error::other(self.failure))
        } else {
            println!("  Call {}: SUCCESS", call);
            Ok("payload".to_string())
        }
    }

    fn total_calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn example_simple_retry() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 1: Exponential backoff ===\n");

    let config = RetryConfig::builder()
        .max_attempts(4)
        .initial_delay(Duration::from_millis(100))
        .enable_jitter(false)
        .build();

    let service = UnreliableService::new(2, "connection reset");
    let start = Instant::now();
    let result = retry_with_backoff(|| service.call(), &config).await?;

    println!("\nResult: {}", result);
    println!("Total calls: {}", service.total_calls());
    println!("Total time: {:?} (expected ~300ms: 100ms + 200ms)", start.elapsed());
    Ok(())
}

async fn example_classifier() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 2: Classifier-driven retries ===\n");

    let config = RetryConfig::builder()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(10))
        .should_retry(RetryPredicate::classifier())
        .build();

    let service = UnreliableService::new(3, "401 Unauthorized");
    let result = retry_with_backoff(|| service.call(), &config).await;
    println!(
        "Permanent error: {:?} after {} call(s)",
        result.err().map(|e| e.to_string()),
        service.total_calls()
    );

    let service = UnreliableService::new(2, "503 Service Unavailable");
    let result = retry_with_backoff(|| service.call(), &config).await?;
    println!("Transient error recovered: {} after {} calls", result, service.total_calls());
    Ok(())
}

fn example_settings() -> Result<(), Box<dyn Error>> {
    println!("\n=== Example 3: Settings from TOML ===\n");

    let settings = RetrySettings::from_toml_str(
        r#"
        maxAttempts = 5
        initialDelay = 250
        maxDelay = 2000
        "#,
    )?;
    let config = RetryConfig::from(settings);
    println!("{:#?}", config.settings());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    example_simple_retry().await?;
    example_classifier().await?;
    example_settings()?;
    Ok(())
}
