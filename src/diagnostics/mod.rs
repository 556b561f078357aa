//! Structured diagnostics for discovery and analysis.
//!
//! Provides deterministic, sortable diagnostic types for files that were
//! skipped during discovery and for per-file failures in later stages.

pub mod scan_diagnostics;

pub use scan_diagnostics::{DiagnosticStage, ScanDiagnostic, SkipReason};
