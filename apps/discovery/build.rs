//! Build script for the discovery service.
//!
//! Embeds the git revision and build timestamp served by `/build-info`.

use chrono::Utc;
use std::process::Command;

fn git_revision() -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|sha| sha.trim().to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rerun-if-changed=../../.git/refs/heads/");
    println!("cargo:rerun-if-env-changed=GIT_SHA");
    println!("cargo:rerun-if-env-changed=BUILD_TIME");

    // CI provides GIT_SHA; local builds fall back to git itself.
    let git_sha = std::env::var("GIT_SHA")
        .ok()
        .or_else(git_revision)
        .unwrap_or_else(|| "unknown".to_string());

    let build_time = std::env::var("BUILD_TIME").unwrap_or_else(|_| Utc::now().to_rfc3339());

    println!("cargo:rustc-env=GIT_SHA={git_sha}");
    println!("cargo:rustc-env=BUILD_TIME={build_time}");
}
