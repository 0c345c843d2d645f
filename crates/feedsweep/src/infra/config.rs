//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".feedsweep/config.toml";
const DEFAULT_MAX_HOPS: usize = 15;

/// Layered configuration loaded from defaults, user, workspace, explicit file, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub resolver: Resolver,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub activation: Activation,
    #[serde(default = "Signatures::unset")]
    pub signatures: Signatures,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Resolver {
    #[serde(default)]
    max_hops: Option<usize>,
}

impl Resolver {
    pub fn max_hops(&self) -> usize {
        self.max_hops.unwrap_or(DEFAULT_MAX_HOPS)
    }

    pub fn set_max_hops(&mut self, hops: usize) {
        self.max_hops = Some(hops);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Logging {
    #[serde(default)]
    debug: Option<bool>,
}

impl Logging {
    pub fn debug(&self) -> bool {
        self.debug.unwrap_or(true)
    }

    pub fn set_debug(&mut self, debug: bool) {
        self.debug = Some(debug);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activation {
    #[serde(default)]
    pub matches: Vec<String>,
}

impl Default for Activation {
    fn default() -> Self {
        Self {
            matches: vec!["https://medium.com/*".into()],
        }
    }
}

/// Versioned matcher table as written in configuration. Every entry is a
/// selector string except `section_title`, which is compared to heading text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signatures {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub member_icon: Option<String>,
    #[serde(default)]
    pub member_button: Option<String>,
    #[serde(default)]
    pub interactive_ancestor: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_marker: Option<String>,
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub section_container: Option<String>,
    #[serde(default)]
    pub section_item: Option<String>,
    #[serde(default)]
    pub section_list: Option<String>,
    #[serde(default)]
    pub section_heading_parent: Option<String>,
    #[serde(default)]
    pub broad_wrappers: Option<Vec<String>>,
    #[serde(default)]
    pub block_wrapper: Option<String>,
    #[serde(default)]
    pub interactive_region: Option<String>,
    #[serde(default)]
    pub feed_wrapper: Option<String>,
    #[serde(default)]
    pub boundaries: Option<Vec<String>>,
    #[serde(default)]
    pub title_link: Option<String>,
}

impl Default for Signatures {
    fn default() -> Self {
        let owned = |value: &str| Some(value.to_owned());
        Self {
            version: owned("2025.05"),
            member_icon: owned(r##"svg path[fill="#FFC017"]"##),
            member_button: owned(r#"button[aria-label="Member-only story"]"#),
            interactive_ancestor: owned("button"),
            unit: owned("article"),
            unit_marker: owned(r#"[data-testid="post-preview"]"#),
            heading: owned("h2"),
            section_title: owned("Staff Picks"),
            section_container: owned(".fb.fc.fd.y"),
            section_item: owned(".gc.y"),
            section_list: owned(".dl.y"),
            section_heading_parent: owned(".gb"),
            broad_wrappers: Some(vec![".ed.ee.et.eu.ev".into()]),
            block_wrapper: owned("div"),
            interactive_region: owned(r#"div[role="link"][data-href]"#),
            feed_wrapper: owned("div.pj.n.y"),
            boundaries: Some(vec!["body".into(), "html".into(), "#root".into()]),
            title_link: owned("a[data-href]"),
        }
    }
}

impl Signatures {
    /// A layer that overrides nothing.
    fn unset() -> Self {
        Self {
            version: None,
            member_icon: None,
            member_button: None,
            interactive_ancestor: None,
            unit: None,
            unit_marker: None,
            heading: None,
            section_title: None,
            section_container: None,
            section_item: None,
            section_list: None,
            section_heading_parent: None,
            broad_wrappers: None,
            block_wrapper: None,
            interactive_region: None,
            feed_wrapper: None,
            boundaries: None,
            title_link: None,
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    max_hops: Option<String>,
    debug: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            max_hops: env::var("FEEDSWEEP_MAX_HOPS").ok(),
            debug: env::var("FEEDSWEEP_DEBUG").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(max_hops: &str, debug: &str) -> Self {
        Self {
            max_hops: Some(max_hops.to_owned()),
            debug: Some(debug.to_owned()),
        }
    }
}

impl Config {
    /// Load configuration from defaults, user config, workspace config, an optional explicit
    /// file, and env overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, explicit.map(Path::to_path_buf), env)
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        explicit: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        // An explicitly requested file must exist.
        if let Some(explicit_path) = explicit {
            layers.push(Self::from_file(&explicit_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        apply_env_overrides(merged, env_overrides)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
            .with_context(|| format!("invalid config file: {}", path.display()))
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            resolver: merge_resolver(self.resolver, other.resolver),
            logging: merge_logging(self.logging, other.logging),
            activation: merge_activation(self.activation, other.activation),
            signatures: merge_signatures(self.signatures, other.signatures),
        }
    }
}

fn merge_resolver(base: Resolver, overlay: Resolver) -> Resolver {
    Resolver {
        max_hops: overlay.max_hops.or(base.max_hops),
    }
}

fn merge_logging(mut base: Logging, overlay: Logging) -> Logging {
    if let Some(value) = overlay.debug {
        base.debug = Some(value);
    }
    base
}

fn merge_activation(base: Activation, overlay: Activation) -> Activation {
    let mut matches: BTreeSet<String> = base.matches.into_iter().collect();
    matches.extend(overlay.matches);
    Activation {
        matches: matches.into_iter().collect(),
    }
}

fn merge_signatures(base: Signatures, overlay: Signatures) -> Signatures {
    Signatures {
        version: overlay.version.or(base.version),
        member_icon: overlay.member_icon.or(base.member_icon),
        member_button: overlay.member_button.or(base.member_button),
        interactive_ancestor: overlay.interactive_ancestor.or(base.interactive_ancestor),
        unit: overlay.unit.or(base.unit),
        unit_marker: overlay.unit_marker.or(base.unit_marker),
        heading: overlay.heading.or(base.heading),
        section_title: overlay.section_title.or(base.section_title),
        section_container: overlay.section_container.or(base.section_container),
        section_item: overlay.section_item.or(base.section_item),
        section_list: overlay.section_list.or(base.section_list),
        section_heading_parent: overlay
            .section_heading_parent
            .or(base.section_heading_parent),
        broad_wrappers: overlay.broad_wrappers.or(base.broad_wrappers),
        block_wrapper: overlay.block_wrapper.or(base.block_wrapper),
        interactive_region: overlay.interactive_region.or(base.interactive_region),
        feed_wrapper: overlay.feed_wrapper.or(base.feed_wrapper),
        boundaries: overlay.boundaries.or(base.boundaries),
        title_link: overlay.title_link.or(base.title_link),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("feedsweep/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Result<Config> {
    if let Some(max_hops) = env.max_hops {
        let hops = max_hops
            .trim()
            .parse()
            .with_context(|| format!("FEEDSWEEP_MAX_HOPS is not a number: {max_hops}"))?;
        config.resolver.set_max_hops(hops);
    }
    if let Some(debug) = env.debug {
        let enabled = matches!(
            debug.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );
        config.logging.set_debug(enabled);
    }
    Ok(config)
}
