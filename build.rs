use std::env;
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Short commit hash of the checkout, or `unknown` outside a git tree.
fn git_sha() -> String {
    let Ok(output) = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    else {
        return "unknown".to_string();
    };
    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if output.status.success() && !sha.is_empty() {
        sha
    } else {
        "unknown".to_string()
    }
}

/// Honors `SOURCE_DATE_EPOCH` for reproducible builds.
fn build_timestamp() -> String {
    match env::var("SOURCE_DATE_EPOCH") {
        Ok(epoch) if !epoch.trim().is_empty() => epoch.trim().to_string(),
        _ => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or_default()
            .to_string(),
    }
}

fn main() {
    for watched in [".git/HEAD", ".git/refs/heads"] {
        println!("cargo:rerun-if-changed={watched}");
    }
    println!("cargo:rerun-if-env-changed=SOURCE_DATE_EPOCH");
    println!("cargo:rustc-env=GP_GIT_SHA={}", git_sha());
    println!("cargo:rustc-env=GP_BUILD_TS={}", build_timestamp());
}
