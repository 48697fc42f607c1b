//! Requests the conversion package for a located build.
//!
//! Two submission flows exist upstream. [`SubmitStrategy::Interactive`]
//! scrapes the download options page and posts back whatever it pre-selects;
//! [`SubmitStrategy::Direct`] posts a fixed parameter set.

use crate::core::config::RetrievalOptions;
use crate::core::http::HttpClient;
use crate::core::retry::RetryPolicy;
use crate::error::{Result, UupError};
use crate::utils::fs;
use reqwest::Url;
use scraper::{Html, Selector};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;
use tracing::{debug, info};

/// Auxiliary components the options page can pre-select.
pub const AUX_OPTIONS: [&str; 4] = ["esd", "netfx", "cleanup", "updates"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStrategy {
    Interactive,
    Direct,
}

impl FromStr for SubmitStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "interactive" => Ok(SubmitStrategy::Interactive),
            "direct" => Ok(SubmitStrategy::Direct),
            other => Err(format!(
                "unknown submit strategy '{other}' (expected interactive or direct)"
            )),
        }
    }
}

impl fmt::Display for SubmitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitStrategy::Interactive => f.write_str("interactive"),
            SubmitStrategy::Direct => f.write_str("direct"),
        }
    }
}

/// A downloaded package, held in memory until written to disk.
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DownloadArtifact {
    pub fn persist(&self, dir: &Path) -> Result<PathBuf> {
        fs::ensure_dir_exists(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)?;
        info!(path = %path.display(), bytes = self.bytes.len(), "package written");
        Ok(path)
    }
}

pub fn artifact_file_name(update_id: &str, arch: Option<&str>) -> String {
    match arch {
        Some(arch) => format!("update_{update_id}_{arch}.zip"),
        None => format!("update_{update_id}.zip"),
    }
}

pub struct PackageRetriever {
    client: Rc<dyn HttpClient>,
    retry: RetryPolicy,
    strategy: SubmitStrategy,
    endpoint: String,
    multi_arch: bool,
}

impl PackageRetriever {
    pub fn new(
        client: Rc<dyn HttpClient>,
        retry: RetryPolicy,
        strategy: SubmitStrategy,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            retry,
            strategy,
            endpoint: endpoint.into(),
            multi_arch: false,
        }
    }

    /// Marks the run as covering several architectures. This adds the
    /// architecture to file names and enables the extra direct-flow flags.
    pub fn multi_arch(mut self, multi_arch: bool) -> Self {
        self.multi_arch = multi_arch;
        self
    }

    pub fn retrieve(
        &self,
        update_id: &str,
        options: &RetrievalOptions,
        arch: Option<&str>,
    ) -> Result<DownloadArtifact> {
        let bytes = match self.strategy {
            SubmitStrategy::Interactive => self.retrieve_interactive(update_id, options)?,
            SubmitStrategy::Direct => self.retrieve_direct(update_id, options, arch)?,
        };

        if bytes.is_empty() {
            return Err(UupError::parse_error(format!(
                "empty package returned for update {update_id}"
            )));
        }

        let name_arch = if self.multi_arch { arch } else { None };
        Ok(DownloadArtifact {
            file_name: artifact_file_name(update_id, name_arch),
            bytes,
        })
    }

    fn request_url(
        &self,
        update_id: &str,
        options: &RetrievalOptions,
        arch: Option<&str>,
    ) -> Result<Url> {
        let editions = options.edition_param();
        let mut params = vec![
            ("id", update_id),
            ("pack", options.lang.as_str()),
            ("edition", editions.as_str()),
        ];
        if let Some(arch) = arch {
            params.push(("arch", arch));
        }

        Url::parse_with_params(&self.endpoint, &params)
            .map_err(|e| UupError::config_error(format!("Invalid download endpoint: {e}")))
    }

    fn retrieve_interactive(&self, update_id: &str, options: &RetrievalOptions) -> Result<Vec<u8>> {
        let url = self.request_url(update_id, options, None)?;

        debug!(%url, "fetching download options page");
        let page = self.retry.attempt(|| self.client.get(url.as_str()))?;
        let checked = parse_download_options(&String::from_utf8_lossy(&page))?;
        debug!(options = ?checked, "pre-selected download options");

        let form: Vec<(String, String)> = checked
            .into_iter()
            .map(|name| (name, "checked".to_string()))
            .collect();

        self.retry
            .attempt(|| self.client.post_form(url.as_str(), &form))
    }

    fn retrieve_direct(
        &self,
        update_id: &str,
        options: &RetrievalOptions,
        arch: Option<&str>,
    ) -> Result<Vec<u8>> {
        let url = self.request_url(update_id, options, arch)?;
        let form = direct_form(self.multi_arch);

        debug!(%url, "submitting package request");
        self.retry
            .attempt(|| self.client.post_form(url.as_str(), &form))
    }
}

/// Fixed form for the direct flow.
pub fn direct_form(multi_arch: bool) -> Vec<(String, String)> {
    let mut form = vec![
        ("autodl", "2"),
        ("updates", "1"),
        ("cleanup", "1"),
    ];
    if multi_arch {
        form.push(("netfx", "1"));
        form.push(("esd", "1"));
    }
    form.into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Returns the names of the auxiliary options the page pre-selects.
///
/// A page without any pre-selected option or without a submit button is not
/// the options page we expect.
pub fn parse_download_options(html: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);

    let checked_sel = Selector::parse("input.checked")
        .map_err(|e| UupError::parse_error(format!("invalid checkbox selector: {e:?}")))?;
    let submit_sel = Selector::parse("input[type=\"submit\"]")
        .map_err(|e| UupError::parse_error(format!("invalid submit selector: {e:?}")))?;

    let mut checked = Vec::new();
    for input in document.select(&checked_sel) {
        if let Some(name) = input.value().attr("name") {
            if AUX_OPTIONS.contains(&name) && !checked.iter().any(|c| c == name) {
                checked.push(name.to_string());
            }
        }
    }

    if checked.is_empty() {
        return Err(UupError::parse_error(
            "download options page has no pre-selected options",
        ));
    }
    if document.select(&submit_sel).next().is_none() {
        return Err(UupError::parse_error(
            "download options page has no submit button",
        ));
    }

    Ok(checked)
}
