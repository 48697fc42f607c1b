use crate::core::locator::{HtmlSelectors, LocateStrategy};
use crate::core::retriever::SubmitStrategy;
use crate::error::{Result, UupError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_LANG: &str = "en-US";
pub const DEFAULT_EDITIONS: [&str; 2] = ["core", "professional"];
pub const DEFAULT_ARCH: &str = "amd64";

/// Language pack and edition set for a run, read from `opts.json`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RetrievalOptions {
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default = "default_editions")]
    pub editions: Vec<String>,
}

fn default_lang() -> String {
    DEFAULT_LANG.to_string()
}

fn default_editions() -> Vec<String> {
    DEFAULT_EDITIONS.iter().map(|e| e.to_string()).collect()
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            lang: default_lang(),
            editions: default_editions(),
        }
    }
}

impl RetrievalOptions {
    /// Loads options from `path`. A missing file is fatal: the run cannot
    /// guess which language and editions the caller wants.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UupError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let options: RetrievalOptions = serde_json::from_str(&content)?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.lang.trim().is_empty() {
            return Err(UupError::config_error("'lang' must not be empty"));
        }
        if self.editions.is_empty() {
            return Err(UupError::config_error("'editions' must list at least one edition"));
        }
        Ok(())
    }

    /// Editions in the `a;b` form the download endpoints expect.
    pub fn edition_param(&self) -> String {
        self.editions.join(";")
    }
}

/// Upstream endpoints. Each strategy only touches the one it needs.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub api_url: String,
    pub html_url: String,
    pub download_url: String,
    pub get_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            api_url: "https://api.uupdump.net/fetchupd.php".to_string(),
            html_url: "https://uupdump.net/fetchupd.php".to_string(),
            download_url: "https://uupdump.net/download.php".to_string(),
            get_url: "https://uupdump.net/get.php".to_string(),
        }
    }
}

impl Endpoints {
    pub fn locate_url(&self, strategy: LocateStrategy) -> &str {
        match strategy {
            LocateStrategy::Json => &self.api_url,
            LocateStrategy::Html => &self.html_url,
        }
    }

    pub fn retrieve_url(&self, strategy: SubmitStrategy) -> &str {
        match strategy {
            SubmitStrategy::Interactive => &self.download_url,
            SubmitStrategy::Direct => &self.get_url,
        }
    }
}

/// Everything a `check` run needs besides the channel name.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub state_path: PathBuf,
    pub options_path: PathBuf,
    pub download_dir: PathBuf,
    pub work_dir: PathBuf,
    /// Empty means one package without an explicit architecture.
    pub architectures: Vec<String>,
    pub locate_strategy: LocateStrategy,
    pub submit_strategy: SubmitStrategy,
    pub endpoints: Endpoints,
    pub selectors: HtmlSelectors,
    pub max_retries: u32,
    pub retry_delay_secs: u64,
    pub patch_scripts: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("built.json"),
            options_path: PathBuf::from("opts.json"),
            download_dir: PathBuf::from("."),
            work_dir: PathBuf::from("work"),
            architectures: Vec::new(),
            locate_strategy: LocateStrategy::Json,
            submit_strategy: SubmitStrategy::Interactive,
            endpoints: Endpoints::default(),
            selectors: HtmlSelectors::default(),
            max_retries: crate::core::retry::DEFAULT_MAX_RETRIES,
            retry_delay_secs: crate::core::retry::DEFAULT_RETRY_DELAY_SECS,
            patch_scripts: true,
        }
    }
}

impl WatchConfig {
    /// Architecture used for the lookup request.
    pub fn locate_arch(&self) -> &str {
        self.architectures
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_ARCH)
    }

    pub fn is_multi_arch(&self) -> bool {
        self.architectures.len() > 1
    }

    pub fn extract_dir(&self, arch: Option<&str>) -> PathBuf {
        match arch {
            Some(arch) => self.work_dir.join(arch),
            None => self.work_dir.clone(),
        }
    }
}
