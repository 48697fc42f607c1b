//! Finds the newest build published on a release channel.
//!
//! Upstream exposes the same listing twice: a JSON API and an HTML page. A
//! deployment picks one with [`LocateStrategy`]; both produce a
//! [`BuildRecord`] or fail with `NotFound` when no Windows entry exists.

use crate::core::build::BuildNumber;
use crate::core::http::HttpClient;
use crate::core::retry::RetryPolicy;
use crate::error::{Result, UupError};
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tracing::debug;

/// Title prefix that marks an entry as an OS build rather than e.g. a
/// standalone cumulative update.
pub const PRODUCT_FAMILY: &str = "Windows";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub update_id: String,
    /// Human-readable build string, for reporting only.
    pub build_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocateStrategy {
    Json,
    Html,
}

impl FromStr for LocateStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" | "api" => Ok(LocateStrategy::Json),
            "html" => Ok(LocateStrategy::Html),
            other => Err(format!("unknown locate strategy '{other}' (expected json or html)")),
        }
    }
}

impl fmt::Display for LocateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocateStrategy::Json => f.write_str("json"),
            LocateStrategy::Html => f.write_str("html"),
        }
    }
}

/// CSS selectors describing one row of the HTML build listing.
#[derive(Debug, Clone)]
pub struct HtmlSelectors {
    pub row: String,
    pub name: String,
    pub id: String,
    pub build: String,
}

impl Default for HtmlSelectors {
    fn default() -> Self {
        Self {
            row: "tr.update".to_string(),
            name: ".update-name".to_string(),
            id: ".update-id".to_string(),
            build: ".compilation".to_string(),
        }
    }
}

pub struct UpdateLocator {
    client: Rc<dyn HttpClient>,
    retry: RetryPolicy,
    strategy: LocateStrategy,
    endpoint: String,
    selectors: HtmlSelectors,
}

impl UpdateLocator {
    pub fn new(
        client: Rc<dyn HttpClient>,
        retry: RetryPolicy,
        strategy: LocateStrategy,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            retry,
            strategy,
            endpoint: endpoint.into(),
            selectors: HtmlSelectors::default(),
        }
    }

    pub fn with_selectors(mut self, selectors: HtmlSelectors) -> Self {
        self.selectors = selectors;
        self
    }

    pub fn locate(&self, channel: &str, arch: &str) -> Result<BuildRecord> {
        let url = Url::parse_with_params(&self.endpoint, &[("ring", channel), ("arch", arch)])
            .map_err(|e| UupError::config_error(format!("Invalid locate endpoint: {e}")))?;

        debug!(%url, strategy = %self.strategy, "locating latest build");
        let body = self.retry.attempt(|| self.client.get(url.as_str()))?;

        let found = match self.strategy {
            LocateStrategy::Json => parse_update_list(&body)?,
            LocateStrategy::Html => {
                parse_update_table(&String::from_utf8_lossy(&body), &self.selectors)?
            }
        };

        found.ok_or_else(|| UupError::NotFound {
            channel: channel.to_string(),
        })
    }
}

/// Error code the listing API answers with when a channel has no builds.
const NO_UPDATE_FOUND: &str = "NO_UPDATE_FOUND";

#[derive(Deserialize)]
struct FetchResponse {
    response: Option<FetchBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchBody {
    update_array: Option<Vec<UpdateEntry>>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateEntry {
    update_title: String,
    update_id: String,
    found_build: Option<String>,
}

/// Picks the first Windows entry of a JSON update listing.
pub fn parse_update_list(body: &[u8]) -> Result<Option<BuildRecord>> {
    let parsed: FetchResponse = serde_json::from_slice(body)
        .map_err(|e| UupError::parse_error(format!("update listing is not valid JSON: {e}")))?;

    let response = parsed
        .response
        .ok_or_else(|| UupError::parse_error("update listing has no 'response' object"))?;

    let updates = match (response.update_array, response.error) {
        (Some(updates), _) => updates,
        (None, Some(error)) if error == NO_UPDATE_FOUND => {
            debug!("upstream reports no update for this query");
            return Ok(None);
        }
        (None, Some(error)) => {
            return Err(UupError::parse_error(format!(
                "upstream reported an error: {error}"
            )))
        }
        (None, None) => {
            return Err(UupError::parse_error(
                "update listing has no 'updateArray'",
            ))
        }
    };

    debug!(entries = updates.len(), "update listing parsed");

    Ok(updates
        .into_iter()
        .find(|entry| entry.update_title.starts_with(PRODUCT_FAMILY))
        .map(|entry| BuildRecord {
            update_id: entry.update_id,
            build_number: entry.found_build,
        }))
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| UupError::config_error(format!("invalid selector '{css}': {e:?}")))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Picks the Windows row with the greatest build number from an HTML listing.
///
/// Rows without a parseable build rank below any row that has one. Among
/// equal builds the first row wins.
pub fn parse_update_table(html: &str, selectors: &HtmlSelectors) -> Result<Option<BuildRecord>> {
    let document = Html::parse_document(html);

    let row_sel = selector(&selectors.row)?;
    let name_sel = selector(&selectors.name)?;
    let id_sel = selector(&selectors.id)?;
    let build_sel = selector(&selectors.build)?;

    let mut best: Option<(Option<BuildNumber>, BuildRecord)> = None;
    let mut rows = 0usize;

    for row in document.select(&row_sel) {
        rows += 1;

        let name = row
            .select(&name_sel)
            .next()
            .map(element_text)
            .ok_or_else(|| UupError::parse_error(format!("row {rows} has no name element")))?;
        let update_id = row
            .select(&id_sel)
            .next()
            .map(element_text)
            .ok_or_else(|| {
                UupError::parse_error(format!("row {rows} has no identifier element"))
            })?;

        if !name.starts_with(PRODUCT_FAMILY) {
            continue;
        }
        if update_id.is_empty() {
            return Err(UupError::parse_error(format!(
                "row {rows} ('{name}') has an empty identifier"
            )));
        }

        let build_text = row
            .select(&build_sel)
            .next()
            .map(element_text)
            .filter(|text| !text.is_empty());
        let build = build_text.as_deref().and_then(BuildNumber::parse);

        let is_better = match &best {
            None => true,
            Some((best_build, _)) => build > *best_build,
        };
        if is_better {
            best = Some((
                build,
                BuildRecord {
                    update_id,
                    build_number: build_text,
                },
            ));
        }
    }

    debug!(rows, matched = best.is_some(), "update table parsed");
    Ok(best.map(|(_, record)| record))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::http::tests::{MockHttpClient, Reply};
    use crate::core::retry::tests::instant_policy;
    use pretty_assertions::assert_eq;

    fn table(rows: &[(&str, &str, Option<&str>)]) -> String {
        let mut html = String::from("<html><body><table>");
        for (name, id, build) in rows {
            html.push_str("<tr class=\"update\">");
            html.push_str(&format!("<td class=\"update-name\">{name}</td>"));
            html.push_str(&format!("<td class=\"update-id\">{id}</td>"));
            if let Some(build) = build {
                html.push_str(&format!("<td><span class=\"compilation\">{build}</span></td>"));
            }
            html.push_str("</tr>");
        }
        html.push_str("</table></body></html>");
        html
    }

    #[test]
    fn test_json_skips_non_windows_entries() {
        let body = br#"{"response":{"updateArray":[
            {"updateTitle":"Insider Preview","updateId":"x"},
            {"updateTitle":"Windows 11","updateId":"y"}
        ]}}"#;

        let record = parse_update_list(body).unwrap().unwrap();
        assert_eq!(
            record,
            BuildRecord {
                update_id: "y".to_string(),
                build_number: None,
            }
        );
    }

    #[test]
    fn test_json_keeps_found_build() {
        let body = br#"{"response":{"updateArray":[
            {"updateTitle":"Windows 11, version 24H2 (26100.2314)","updateId":"abc","foundBuild":"26100.2314"}
        ]}}"#;

        let record = parse_update_list(body).unwrap().unwrap();
        assert_eq!(record.build_number.as_deref(), Some("26100.2314"));
    }

    #[test]
    fn test_json_without_match_is_none() {
        let body = br#"{"response":{"updateArray":[{"updateTitle":"Cumulative Update","updateId":"x"}]}}"#;
        assert_eq!(parse_update_list(body).unwrap(), None);
    }

    #[test]
    fn test_json_structural_errors() {
        assert!(matches!(
            parse_update_list(b"<html>not json</html>"),
            Err(UupError::StructuralParse { .. })
        ));
        assert!(matches!(
            parse_update_list(br#"{"response":{}}"#),
            Err(UupError::StructuralParse { .. })
        ));
        assert!(matches!(
            parse_update_list(br#"{"response":{"error":"UNSUPPORTED_QUERY"}}"#),
            Err(UupError::StructuralParse { .. })
        ));
    }

    #[test]
    fn test_json_no_update_found_is_none() {
        let body = br#"{"response":{"error":"NO_UPDATE_FOUND"}}"#;
        assert_eq!(parse_update_list(body).unwrap(), None);
    }

    #[test]
    fn test_html_picks_greatest_build() {
        let html = table(&[
            ("Windows 10, version 2004", "id-1", Some("10.0.19041.1")),
            ("Windows 10, version 2004", "id-2", Some("10.0.19041.2")),
            ("Windows 10, version 22H2", "id-3", Some("10.0.19045.1")),
        ]);

        let record = parse_update_table(&html, &HtmlSelectors::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.update_id, "id-3");
        assert_eq!(record.build_number.as_deref(), Some("10.0.19045.1"));
    }

    #[test]
    fn test_html_first_of_equal_builds_wins() {
        let html = table(&[
            ("Cumulative Update", "cu", Some("26100.9")),
            ("Windows 11", "first", Some("26100.1")),
            ("Windows 11", "second", Some("26100.1")),
        ]);

        let record = parse_update_table(&html, &HtmlSelectors::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.update_id, "first");
    }

    #[test]
    fn test_html_rows_without_build_rank_lowest() {
        let html = table(&[
            ("Windows 11", "no-build", None),
            ("Windows 11", "with-build", Some("22631.1")),
        ]);
        let record = parse_update_table(&html, &HtmlSelectors::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.update_id, "with-build");

        let html = table(&[("Windows 11", "only", None)]);
        let record = parse_update_table(&html, &HtmlSelectors::default())
            .unwrap()
            .unwrap();
        assert_eq!(record.update_id, "only");
        assert_eq!(record.build_number, None);
    }

    #[test]
    fn test_html_missing_identifier_is_structural() {
        let html = r#"<table><tr class="update"><td class="update-name">Windows 11</td></tr></table>"#;
        assert!(matches!(
            parse_update_table(html, &HtmlSelectors::default()),
            Err(UupError::StructuralParse { .. })
        ));
    }

    #[test]
    fn test_locate_html_without_matching_rows_is_not_found() {
        let html = table(&[("Cumulative Update for .NET", "cu", Some("1.0"))]);
        let mock = Rc::new(MockHttpClient::new().on_get(Reply::text(&html)));
        let locator = UpdateLocator::new(
            mock,
            instant_policy(5),
            LocateStrategy::Html,
            "https://uup.example/fetchupd.php",
        );

        match locator.locate("beta", "amd64") {
            Err(UupError::NotFound { channel }) => assert_eq!(channel, "beta"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_locate_retries_rate_limit_then_parses() {
        let body = r#"{"response":{"updateArray":[{"updateTitle":"Windows 11","updateId":"y"}]}}"#;
        let mock = Rc::new(
            MockHttpClient::new()
                .on_get(Reply::Status(429))
                .on_get(Reply::Status(429))
                .on_get(Reply::text(body)),
        );
        let locator = UpdateLocator::new(
            mock.clone(),
            instant_policy(5),
            LocateStrategy::Json,
            "https://api.example/fetchupd.php",
        );

        let record = locator.locate("retail", "arm64").unwrap();
        assert_eq!(record.update_id, "y");

        let calls = mock.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(
            calls[0].url,
            "https://api.example/fetchupd.php?ring=retail&arch=arm64"
        );
    }

    #[test]
    fn test_locate_does_not_retry_parse_errors() {
        let mock = Rc::new(MockHttpClient::new().on_get(Reply::text("{}")));
        let locator = UpdateLocator::new(
            mock.clone(),
            instant_policy(5),
            LocateStrategy::Json,
            "https://api.example/fetchupd.php",
        );

        assert!(matches!(
            locator.locate("retail", "amd64"),
            Err(UupError::StructuralParse { .. })
        ));
        assert_eq!(mock.calls().len(), 1);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("JSON".parse::<LocateStrategy>(), Ok(LocateStrategy::Json));
        assert_eq!("html".parse::<LocateStrategy>(), Ok(LocateStrategy::Html));
        assert!("xml".parse::<LocateStrategy>().is_err());
    }
}
