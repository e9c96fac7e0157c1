//! Copy-to-clipboard via the platform's own tooling, so the binary works
//! over SSH and on headless-adjacent setups without linking a display
//! stack.

use std::io::Write;
use std::process::{Command, Stdio};

pub fn copy_to_clipboard(text: &str) -> Result<(), String> {
    for (command, args) in candidates() {
        if pipe_through(command, args, text).is_ok() {
            return Ok(());
        }
    }
    Err(clipboard_missing_hint().to_string())
}

#[cfg(target_os = "macos")]
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[("pbcopy", &[])]
}

#[cfg(target_os = "windows")]
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[("cmd", &["/C", "clip"])]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn candidates() -> &'static [(&'static str, &'static [&'static str])] {
    &[
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
        ("xsel", &["--clipboard", "--input"]),
    ]
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn clipboard_missing_hint() -> &'static str {
    "No clipboard command found (install wl-copy, xclip, or xsel)"
}

#[cfg(any(target_os = "macos", target_os = "windows"))]
fn clipboard_missing_hint() -> &'static str {
    "Clipboard command unavailable"
}

fn pipe_through(command: &str, args: &[&str], input: &str) -> Result<(), ()> {
    let mut child = Command::new(command)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|_| ())?;

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(input.as_bytes());
    }
    match child.wait() {
        Ok(status) if status.success() => Ok(()),
        _ => Err(()),
    }
}
