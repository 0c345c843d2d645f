//! URL patterns deciding whether a page is handled at all.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::infra::config::Config;

#[derive(Debug, Clone)]
pub struct ActivationMatcher {
    patterns: Vec<String>,
    globs: GlobSet,
}

impl ActivationMatcher {
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.activation.matches)
    }

    pub fn new(patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .with_context(|| format!("invalid activation pattern: {pattern}"))?;
            builder.add(glob);
        }
        let globs = builder
            .build()
            .context("failed to build activation matcher")?;
        Ok(Self {
            patterns: patterns.to_vec(),
            globs,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Pages without a known URL are always handled.
    pub fn is_active_for(&self, url: Option<&str>) -> bool {
        url.is_none_or(|url| self.globs.is_match(url))
    }
}
