//! Application configuration for Pagesmith.
//!
//! The config file is `pagesmith.toml`, looked up next to the working
//! directory first and then at `~/.pagesmith/pagesmith.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PagesmithError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagesmith.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagesmith";

// ---------------------------------------------------------------------------
// Config structs (matching pagesmith.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where the documents live.
    #[serde(default)]
    pub input: InputConfig,

    /// Canonical brand and the legacy tokens it replaces.
    #[serde(default)]
    pub brand: BrandConfig,

    /// Call-to-action block settings.
    #[serde(default)]
    pub cta: CtaConfig,

    /// Title/description synthesis settings.
    #[serde(default)]
    pub seo: SeoConfig,

    /// Filename convention settings.
    #[serde(default)]
    pub slug: SlugConfig,

    /// Execution settings.
    #[serde(default)]
    pub run: RunSection,
}

/// `[input]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory scanned recursively for `*.html`.
    #[serde(default = "default_input_dir")]
    pub dir: PathBuf,

    /// Root-level entry pages. Counted in the run but never transformed.
    #[serde(default = "default_entry_pages")]
    pub entry_pages: Vec<PathBuf>,

    /// Directory names skipped during the walk.
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            dir: default_input_dir(),
            entry_pages: default_entry_pages(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

fn default_input_dir() -> PathBuf {
    PathBuf::from("./integracoes")
}
fn default_entry_pages() -> Vec<PathBuf> {
    vec![
        PathBuf::from("./index.html"),
        PathBuf::from("./translated/en/index.html"),
    ]
}
fn default_ignore_dirs() -> Vec<String> {
    vec!["node_modules".into(), "dist".into()]
}

/// `[brand]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandConfig {
    /// Canonical brand name written into titles, CTAs and related links.
    #[serde(default = "default_brand_name")]
    pub name: String,

    /// Canonical site domain.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Legacy brand spellings replaced case-insensitively.
    #[serde(default = "default_legacy_tokens")]
    pub legacy_tokens: Vec<String>,
}

impl Default for BrandConfig {
    fn default() -> Self {
        Self {
            name: default_brand_name(),
            domain: default_domain(),
            legacy_tokens: default_legacy_tokens(),
        }
    }
}

fn default_brand_name() -> String {
    "Automations Cookbook".into()
}
fn default_domain() -> String {
    "automationscookbook.com".into()
}
fn default_legacy_tokens() -> Vec<String> {
    vec![
        "AI Factory".into(),
        "AIfactory".into(),
        "ai-factory".into(),
        "fabrica-n8n".into(),
        "Fábrica de Automações".into(),
    ]
}

/// `[cta]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtaConfig {
    /// Target of the consulting button.
    #[serde(default = "default_consulting_url")]
    pub consulting_url: String,

    /// Link suffixes that identify a downloadable workflow artifact.
    #[serde(default = "default_download_extensions")]
    pub download_extensions: Vec<String>,

    /// Directory prefix for synthesized artifact links.
    #[serde(default = "default_workflow_dir")]
    pub workflow_dir: String,
}

impl Default for CtaConfig {
    fn default() -> Self {
        Self {
            consulting_url: default_consulting_url(),
            download_extensions: default_download_extensions(),
            workflow_dir: default_workflow_dir(),
        }
    }
}

fn default_consulting_url() -> String {
    "https://forms.gle/automations-cookbook-consulting".into()
}
fn default_download_extensions() -> Vec<String> {
    vec![".json".into()]
}
fn default_workflow_dir() -> String {
    "./workflows".into()
}

/// `[seo]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeoConfig {
    /// Description used when the page has no usable intro paragraph.
    #[serde(default = "default_meta_description")]
    pub default_meta_description: String,

    /// An intro paragraph must be longer than this to become the description.
    #[serde(default = "default_meta_min_len")]
    pub meta_min_len: usize,

    /// Hard cap on description length, ellipsis included.
    #[serde(default = "default_meta_max_len")]
    pub meta_max_len: usize,
}

impl Default for SeoConfig {
    fn default() -> Self {
        Self {
            default_meta_description: default_meta_description(),
            meta_min_len: default_meta_min_len(),
            meta_max_len: default_meta_max_len(),
        }
    }
}

fn default_meta_description() -> String {
    "Learn step by step how to build this automation and download the ready-made JSON \
     template from Automations Cookbook, your library of marketing, sales and support workflows."
        .into()
}
fn default_meta_min_len() -> usize {
    50
}
fn default_meta_max_len() -> usize {
    155
}

/// `[slug]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlugConfig {
    /// Platform suffixes allowed after `<a>-para-<b>`.
    #[serde(default = "default_platform_tags")]
    pub platform_tags: Vec<String>,
}

impl Default for SlugConfig {
    fn default() -> Self {
        Self {
            platform_tags: default_platform_tags(),
        }
    }
}

fn default_platform_tags() -> Vec<String> {
    vec!["n8n".into()]
}

/// `[run]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSection {
    /// Compute and report changes without writing any file.
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum documents transformed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

// ---------------------------------------------------------------------------
// Run config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime configuration for one batch run, merged from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub entry_pages: Vec<PathBuf>,
    pub ignore_dirs: Vec<String>,
    pub brand_name: String,
    pub domain: String,
    pub legacy_tokens: Vec<String>,
    pub consulting_url: String,
    pub download_extensions: Vec<String>,
    pub workflow_dir: String,
    pub default_meta_description: String,
    pub meta_min_len: usize,
    pub meta_max_len: usize,
    pub platform_tags: Vec<String>,
    pub dry_run: bool,
    pub concurrency: usize,
}

impl From<&AppConfig> for RunConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            input_dir: config.input.dir.clone(),
            entry_pages: config.input.entry_pages.clone(),
            ignore_dirs: config.input.ignore_dirs.clone(),
            brand_name: config.brand.name.clone(),
            domain: config.brand.domain.clone(),
            legacy_tokens: config.brand.legacy_tokens.clone(),
            consulting_url: config.cta.consulting_url.clone(),
            download_extensions: config.cta.download_extensions.clone(),
            workflow_dir: config.cta.workflow_dir.clone(),
            default_meta_description: config.seo.default_meta_description.clone(),
            meta_min_len: config.seo.meta_min_len,
            meta_max_len: config.seo.meta_max_len,
            platform_tags: config.slug.platform_tags.clone(),
            dry_run: config.run.dry_run,
            concurrency: config.run.concurrency,
        }
    }
}

impl RunConfig {
    /// Config for a scratch corpus at `dir` with no entry pages.
    pub fn for_dir(dir: impl Into<PathBuf>) -> Self {
        let mut config = Self::from(&AppConfig::default());
        config.input_dir = dir.into();
        config.entry_pages.clear();
        config
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Reject configurations that would make a run non-idempotent or unusable.
pub fn validate_config(config: &RunConfig) -> Result<()> {
    let brand = config.brand_name.trim();
    if brand.is_empty() {
        return Err(PagesmithError::config("brand name must not be empty"));
    }

    let brand_lower = brand.to_lowercase();
    for token in &config.legacy_tokens {
        if token.trim().is_empty() {
            return Err(PagesmithError::config("legacy brand tokens must not be empty"));
        }
        // Rewriting a token the brand itself contains would fire on every run.
        if brand_lower.contains(&token.to_lowercase()) {
            return Err(PagesmithError::config(format!(
                "legacy token '{token}' occurs inside the brand name '{brand}'"
            )));
        }
    }

    let url = Url::parse(&config.consulting_url).map_err(|e| {
        PagesmithError::config(format!(
            "invalid consulting URL '{}': {e}",
            config.consulting_url
        ))
    })?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(PagesmithError::config(format!(
            "consulting URL must be http(s), got '{}'",
            url.scheme()
        )));
    }

    if config.meta_max_len <= 3 {
        return Err(PagesmithError::config("meta_max_len must leave room for an ellipsis"));
    }
    if config.concurrency == 0 {
        return Err(PagesmithError::config("concurrency must be at least 1"));
    }
    if config.download_extensions.iter().any(|e| e.is_empty()) {
        return Err(PagesmithError::config("download extensions must not be empty"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagesmith/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PagesmithError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the user config file (`~/.pagesmith/pagesmith.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config. `./pagesmith.toml` wins over the user file;
/// returns defaults if neither exists.
pub fn load_config() -> Result<AppConfig> {
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return load_config_from(&local);
    }

    let path = config_file_path()?;
    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PagesmithError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        PagesmithError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file into `dir`. Returns the path to the created file.
pub fn init_config(dir: &Path) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| PagesmithError::io(dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PagesmithError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PagesmithError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("legacy_tokens"));
        assert!(toml_str.contains("Automations Cookbook"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.seo.meta_max_len, 155);
        assert_eq!(parsed.slug.platform_tags, vec!["n8n".to_string()]);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[input]
dir = "/srv/site/pages"

[brand]
name = "Flow Recipes"
legacy_tokens = ["Old Co"]

[run]
dry_run = true
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.input.dir, PathBuf::from("/srv/site/pages"));
        assert_eq!(config.brand.name, "Flow Recipes");
        assert!(config.run.dry_run);
        assert_eq!(config.run.concurrency, 4);
        assert_eq!(config.cta.download_extensions, vec![".json".to_string()]);
    }

    #[test]
    fn run_config_from_app_config() {
        let app = AppConfig::default();
        let run = RunConfig::from(&app);
        assert_eq!(run.meta_min_len, 50);
        assert!(!run.dry_run);
        assert_eq!(run.entry_pages.len(), 2);
        validate_config(&run).expect("defaults are valid");
    }

    #[test]
    fn rejects_token_inside_brand() {
        let mut run = RunConfig::for_dir("/tmp/x");
        run.legacy_tokens.push("cookbook".into());
        let err = validate_config(&run).unwrap_err();
        assert!(err.to_string().contains("inside the brand name"));
    }

    #[test]
    fn rejects_bad_consulting_url() {
        let mut run = RunConfig::for_dir("/tmp/x");
        run.consulting_url = "mailto:someone@example.com".into();
        assert!(validate_config(&run).is_err());

        run.consulting_url = "not a url".into();
        assert!(validate_config(&run).is_err());
    }

    #[test]
    fn rejects_zero_concurrency() {
        let mut run = RunConfig::for_dir("/tmp/x");
        run.concurrency = 0;
        assert!(validate_config(&run).is_err());
    }

    #[test]
    fn init_writes_loadable_file() {
        let dir = std::env::temp_dir().join(format!("pagesmith-cfg-{}", std::process::id()));
        let path = init_config(&dir).expect("init");
        let loaded = load_config_from(&path).expect("load");
        assert_eq!(loaded.brand.name, "Automations Cookbook");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
