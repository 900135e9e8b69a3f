use std::path::Path;
use std::time::Duration;

use anyhow::Result;

/// Tail the session log: redraw the last `lines` lines once a second.
/// Runs until interrupted; the terminal stays in cooked mode.
pub async fn run(path: &Path, lines: usize) -> Result<()> {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    loop {
        interval.tick().await;
        let content = tokio::fs::read_to_string(path).await.unwrap_or_default();
        let all: Vec<&str> = content.lines().collect();
        let start = all.len().saturating_sub(lines);
        print!("\x1b[H\x1b[2J");
        for line in &all[start..] {
            println!("{line}");
        }
    }
}
