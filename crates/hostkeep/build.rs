//! Version stamping for `hostkeep --version` and the startup log line.

fn main() {
    let version = match std::env::var("HOSTKEEP_VERSION") {
        Ok(pinned) if !pinned.trim().is_empty() => pinned,
        _ => env!("CARGO_PKG_VERSION").to_string(),
    };
    println!("cargo:rustc-env=HOSTKEEP_VERSION={}", version);

    // Workspace version bumps and a changed pin both rebuild
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=HOSTKEEP_VERSION");
}
