// Drives the compiled binary through a PTY to exercise the real event loop
// and crossterm input handling.
//
// Notes:
// - Requires a TTY; uses expectrl which allocates a pseudo terminal.
// - Marked Unix-only and ignored by default to avoid CI/platform issues.
// - Run manually via: `cargo test --test integration_min_session -- --ignored`.

#![cfg(unix)]

use std::time::Duration;

use expectrl::{spawn, Eof};

#[test]
#[ignore]
fn start_abandon_and_quit() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let db = dir.path().join("matebuf.db");

    let bin = assert_cmd::cargo::cargo_bin("matebuf");
    let cmd = format!("{} -q 2 --db {}", bin.display(), db.display());

    let mut p = spawn(cmd)?;
    std::thread::sleep(Duration::from_millis(200));

    // Start, then abandon through the confirmation prompt
    p.send("\r")?;
    std::thread::sleep(Duration::from_millis(100));
    p.send("\x1b")?; // ESC
    std::thread::sleep(Duration::from_millis(100));
    p.send("y")?;
    std::thread::sleep(Duration::from_millis(100));

    // ESC on the start screen exits
    p.send("\x1b")?;
    p.expect(Eof)?;

    assert!(db.exists());
    Ok(())
}
