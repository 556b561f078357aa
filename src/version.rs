//! Version and build information for sequester
//!
//! Provides version string and build metadata (commit SHA, build date, rustc version).

/// Get the full version string including build metadata
///
/// Returns format: "sequester {version} ({commit} {date}) rustc {rustc_version}"
pub fn version() -> String {
    format!("sequester {}", version_detail())
}

/// Everything after the binary name: "{version} ({commit} {date}) rustc {rustc_version}"
pub fn version_detail() -> String {
    format!(
        "{} ({} {}) rustc {}",
        package_version(),
        build_commit(),
        build_date(),
        rustc_version()
    )
}

/// Get the package version (e.g., "0.4.0")
pub fn package_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Get the build commit SHA, "unknown" outside a git checkout
pub fn build_commit() -> &'static str {
    option_env!("SEQUESTER_COMMIT_SHA").unwrap_or("unknown")
}

pub fn build_date() -> &'static str {
    option_env!("SEQUESTER_BUILD_DATE").unwrap_or("unknown")
}

pub fn rustc_version() -> &'static str {
    option_env!("SEQUESTER_RUSTC_VERSION").unwrap_or("unknown")
}
