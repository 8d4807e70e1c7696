// build.rs

use std::env;

fn main() {
    // CHATRELAY_VERSION lets packagers stamp a release name; otherwise the
    // crate version is used.
    let version = env::var("CHATRELAY_VERSION")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| env::var("CARGO_PKG_VERSION").ok())
        .unwrap_or_else(|| "dev".to_string());

    println!("cargo:rustc-env=CHATRELAY_BUILD_VERSION={version}");
    println!("cargo:rerun-if-env-changed=CHATRELAY_VERSION");
}
