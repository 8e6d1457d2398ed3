//! Example: relaunching a flaky shell command
//!
//! The command fails on its first two launches and succeeds on the third.
//! A second command never finishes and is killed at each deadline.
//!
//! Run with:
//! ```bash
//! RUST_LOG=relaunch_core=debug,relaunch_process=debug \
//!     cargo run -p relaunch-process --example retry_process
//! ```

use relaunch_core::config::{RetryConfig, RetryPredicate};
use relaunch_process::{CommandConfig, CommandProcess, ProcessHandle, retry_process};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RetryConfig::builder()
        .max_attempts(5)
        .initial_delay(Duration::from_millis(200))
        .max_delay(Duration::from_secs(2))
        .should_retry(RetryPredicate::classifier())
        .timeout(Duration::from_secs(5))
        .build();

    println!("=== Relaunching a flaky command ===");
    let launches = AtomicU32::new(0);
    let process = retry_process(
        || {
            let launch = launches.fetch_add(1, Ordering::SeqCst) + 1;
            println!("  Launch {launch}");
            Some(CommandProcess::new(
                CommandConfig::new("sh")
                    .with_args(["-c", "[ \"$LAUNCH\" -ge 3 ] && echo ready || exit 1"])
                    .with_env("LAUNCH", launch.to_string()),
            ))
        },
        &config,
    )
    .await?;
    process.output_drained().await;

    println!(
        "Succeeded after {} launches, running: {}, output: {}",
        launches.load(Ordering::SeqCst),
        process.is_running(),
        process.stdout().unwrap_or_default().trim()
    );

    println!("\n=== A command that never finishes ===");
    let short = RetryConfig::builder()
        .max_attempts(2)
        .initial_delay(Duration::from_millis(100))
        .timeout(Duration::from_millis(300))
        .build();
    match retry_process(
        || Some(CommandProcess::new(CommandConfig::new("sleep").with_arg("60"))),
        &short,
    )
    .await
    {
        Ok(_) => println!("Unexpected success"),
        Err(err) => println!("Gave up: {err} ({})", err.as_label()),
    }

    Ok(())
}
