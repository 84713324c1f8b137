//! Manual check of a real repository.
//!
//! Runs one tracker cycle: loads the watermark, lists new pull requests and the
//! latest mainline commit, prints them, and saves the new watermark.
//!
//! # Usage
//!
//! 1. Set `GITHUB_TOKEN` to a token with read access to the repository.
//! 2. Set `TEST_REPO` to the repository to check (e.g., `owner/repo`).
//! 3. Optionally set `WATERMARK_PATH` (default: `last_update.json`).
//! 4. Run: `cargo run --example check_repository`
//!
//! Running it twice in a row should report nothing the second time.

use std::env;

use change_tracker::retry::{RetryConfig, retry_with_backoff};
use change_tracker::{AccessToken, ChangeItem, RepoId, RepositoryRef, Tracker};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,change_tracker=debug".into()),
        )
        .init();

    let token = env::var("GITHUB_TOKEN")
        .map_err(|_| anyhow::anyhow!("GITHUB_TOKEN environment variable not set"))?;

    let test_repo = env::var("TEST_REPO").map_err(|_| {
        anyhow::anyhow!("TEST_REPO environment variable not set (e.g., owner/repo)")
    })?;

    // Accept both "owner/repo" and "https://github.com/owner/repo"
    let test_repo = test_repo
        .strip_prefix("https://github.com/")
        .or_else(|| test_repo.strip_prefix("github.com/"))
        .unwrap_or(&test_repo);

    let repo_id = RepoId::parse(test_repo)
        .ok_or_else(|| anyhow::anyhow!("TEST_REPO must be in owner/repo format"))?;
    let watermark_path =
        env::var("WATERMARK_PATH").unwrap_or_else(|_| "last_update.json".to_string());

    let tracker = Tracker::new(
        RepositoryRef::new(repo_id, AccessToken::new(token)),
        watermark_path,
    );

    println!("\n=== Change check: {} ===\n", tracker.repo().repo);
    let previous = tracker.watermark()?;
    if previous.is_initial() {
        println!("No previous watermark; everything open counts as new.");
    } else {
        println!(
            "Last check: {} ({})",
            previous.time.to_rfc3339(),
            if previous.succeeded { "succeeded" } else { "failed" }
        );
    }

    let report = retry_with_backoff(RetryConfig::DEFAULT, || {
        tracker.check(|changes| {
            for change in changes {
                match change {
                    ChangeItem::PullRequest(pr) => {
                        println!("  [PR]     {} {} ({})", pr.number, pr.title, pr.head_ref)
                    }
                    ChangeItem::Commit(c) => println!("  [COMMIT] {} {}", c.sha.short(), c.summary()),
                }
            }
            Ok::<_, std::io::Error>(format!("{} new changes", changes.len()))
        })
    })
    .into_result()?;

    println!();
    if report.changes.is_empty() {
        println!("Nothing new since {}.", report.previous.time.to_rfc3339());
    }
    println!(
        "Watermark advanced to {} at {}",
        report.current.time.to_rfc3339(),
        tracker.watermark_path().display()
    );

    Ok(())
}
