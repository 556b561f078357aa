//! Path vetoes applied while deciding: protected locations and file names
//! that suggest infrastructure. Both work on the root-relative path alone.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::error::{QuarantineError, Result};
use crate::policy::DecisionPolicy;
use crate::quarantine::SkipCause;

pub struct SafetyRules {
    protected: GlobSet,
    patterns: Vec<String>,
    critical_names: Vec<String>,
}

impl SafetyRules {
    /// Compile the policy's globs. `*` does not cross `/`.
    pub fn new(policy: &DecisionPolicy) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &policy.protected_globs {
            let glob = GlobBuilder::new(pattern)
                .literal_separator(true)
                .build()
                .map_err(|e| QuarantineError::Config(format!("invalid protected glob '{}': {}", pattern, e)))?;
            builder.add(glob);
        }
        let protected = builder
            .build()
            .map_err(|e| QuarantineError::Config(format!("protected globs: {}", e)))?;

        Ok(Self {
            protected,
            patterns: policy.protected_globs.clone(),
            critical_names: policy
                .critical_name_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .collect(),
        })
    }

    /// Why `rel` (root-relative, `/`-separated) must stay, if it must.
    pub fn check(&self, rel: &str) -> Option<(SkipCause, String)> {
        if let Some(&i) = self.protected.matches(rel).first() {
            return Some((SkipCause::Protected, format!("protected path ({})", self.patterns[i])));
        }

        let name = rel.rsplit('/').next().unwrap_or(rel).to_lowercase();
        self.critical_names
            .iter()
            .find(|keyword| name.contains(keyword.as_str()))
            .map(|keyword| {
                (
                    SkipCause::CriticalName,
                    format!("file name suggests critical functionality ({})", keyword),
                )
            })
    }
}
