use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Short commit hash of the checkout `permc --version` was built from.
fn commit_hash() -> String {
    Command::new("git")
        .args(["rev-parse", "--short=7", "HEAD"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|hash| hash.trim().to_string())
        .filter(|hash| !hash.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=../../.git/HEAD");
    println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit_hash());

    let target = std::env::var("TARGET").unwrap_or_else(|_| UNKNOWN.to_string());
    println!("cargo:rustc-env=TARGET={}", target);
}
