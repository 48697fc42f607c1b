//! The `check` run: locate, compare, and on a new build retrieve, extract
//! and record it.
//!
//! The stored identifier is written only once every architecture has been
//! retrieved and extracted, so a failed download is retried on the next run.

use crate::core::config::{RetrievalOptions, WatchConfig};
use crate::core::extract::ArchiveExtractor;
use crate::core::http::{HttpClient, ReqwestClient};
use crate::core::locator::{BuildRecord, UpdateLocator};
use crate::core::output::{OutcomeWriter, RunOutcome};
use crate::core::postprocess::ScriptPatch;
use crate::core::retriever::PackageRetriever;
use crate::core::retry::RetryPolicy;
use crate::core::state::StateStore;
use crate::error::{Result, UupError};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    UpToDate,
    Stale,
}

/// A missing stored identifier always counts as stale.
pub fn classify(stored: Option<&str>, located: &str) -> Freshness {
    match stored {
        Some(stored) if stored == located => Freshness::UpToDate,
        _ => Freshness::Stale,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Start,
    Located,
    UpToDate,
    Stale,
    Retrieving,
    Extracting,
    Done,
    Error,
}

pub struct UpdateWatcher {
    config: WatchConfig,
    options: RetrievalOptions,
    locator: UpdateLocator,
    retriever: PackageRetriever,
    extractor: ArchiveExtractor,
    store: StateStore,
    output: OutcomeWriter,
    patch: Option<ScriptPatch>,
    state: RunState,
}

impl UpdateWatcher {
    pub fn new(
        config: WatchConfig,
        options: RetrievalOptions,
        client: Rc<dyn HttpClient>,
        retry: RetryPolicy,
        output: OutcomeWriter,
    ) -> Self {
        let locator = UpdateLocator::new(
            client.clone(),
            retry.clone(),
            config.locate_strategy,
            config.endpoints.locate_url(config.locate_strategy),
        )
        .with_selectors(config.selectors.clone());

        let retriever = PackageRetriever::new(
            client,
            retry,
            config.submit_strategy,
            config.endpoints.retrieve_url(config.submit_strategy),
        )
        .multi_arch(config.is_multi_arch());

        let patch = config.patch_scripts.then(ScriptPatch::default);
        let store = StateStore::new(config.state_path.clone());

        Self {
            config,
            options,
            locator,
            retriever,
            extractor: ArchiveExtractor::new(),
            store,
            output,
            patch,
            state: RunState::Start,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "state transition");
        self.state = next;
    }

    pub fn run(&mut self, channel: &str) -> Result<RunOutcome> {
        self.state = RunState::Start;
        let result = self.run_steps(channel);
        if let Err(e) = &result {
            warn!(channel, error = %e, "run failed");
            self.transition(RunState::Error);
        }
        result
    }

    fn run_steps(&mut self, channel: &str) -> Result<RunOutcome> {
        println!("🔍 Checking updates for channel: {channel}");

        let located = match self.locator.locate(channel, self.config.locate_arch()) {
            Ok(located) => located,
            Err(e @ UupError::NotFound { .. }) => {
                println!("❌ No Windows updates found for channel: {channel}");
                self.output.emit(&RunOutcome::no_update(None))?;
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.transition(RunState::Located);

        let stored = self.store.last_seen(channel)?;
        match classify(stored.as_deref(), &located.update_id) {
            Freshness::UpToDate => {
                self.transition(RunState::UpToDate);
                println!("✅ No new updates for channel: {channel}");
                let outcome = RunOutcome::no_update(Some(located.update_id));
                self.output.emit(&outcome)?;
                Ok(outcome)
            }
            Freshness::Stale => {
                self.transition(RunState::Stale);
                println!("🎉 New update found for channel: {channel}");
                println!("   Old Update ID: {}", stored.as_deref().unwrap_or("none"));
                println!("   New Update ID: {}", located.update_id);
                if let Some(build) = &located.build_number {
                    println!("   Build: {build}");
                }
                self.fetch(channel, located)
            }
        }
    }

    fn fetch(&mut self, channel: &str, located: BuildRecord) -> Result<RunOutcome> {
        let architectures: Vec<Option<String>> = if self.config.architectures.is_empty() {
            vec![None]
        } else {
            self.config.architectures.iter().cloned().map(Some).collect()
        };

        self.transition(RunState::Retrieving);
        let mut archives: Vec<(Option<String>, PathBuf)> = Vec::new();
        for arch in architectures {
            println!(
                "⬇️  Retrieving package {}{}",
                located.update_id,
                arch.as_deref().map(|a| format!(" ({a})")).unwrap_or_default()
            );
            let artifact =
                self.retriever
                    .retrieve(&located.update_id, &self.options, arch.as_deref())?;
            let path = artifact.persist(&self.config.download_dir)?;
            println!("   Downloaded file to {}", path.display());
            archives.push((arch, path));
        }

        self.transition(RunState::Extracting);
        let mut extracted = Vec::new();
        for (arch, archive) in archives {
            let dest = self.config.extract_dir(arch.as_deref());
            self.extractor.extract(&archive, &dest)?;
            if let Err(e) = std::fs::remove_file(&archive) {
                debug!(path = %archive.display(), error = %e, "could not remove package");
            }
            extracted.push(dest);
        }

        if let Some(patch) = &self.patch {
            for dir in &extracted {
                match patch.apply(dir) {
                    Ok(count) => debug!(dir = %dir.display(), count, "post-processing done"),
                    Err(e) => {
                        warn!(dir = %dir.display(), error = %e, "post-processing failed");
                        println!("⚠️  {e}");
                    }
                }
            }
        }

        self.store.record(channel, &located.update_id)?;
        self.transition(RunState::Done);
        info!(channel, update_id = %located.update_id, "new build recorded");

        let outcome = RunOutcome {
            needs_update: true,
            update_id: Some(located.update_id),
            build_number: located.build_number,
        };
        self.output.emit(&outcome)?;
        Ok(outcome)
    }
}

/// Entry point for `uupwatch check`.
pub fn check_channel(channel: &str, config: WatchConfig) -> Result<RunOutcome> {
    let options = RetrievalOptions::load(&config.options_path)?;
    let client: Rc<dyn HttpClient> = Rc::new(ReqwestClient::new()?);
    let retry = RetryPolicy::new(
        config.max_retries,
        Duration::from_secs(config.retry_delay_secs),
    );

    let mut watcher = UpdateWatcher::new(config, options, client, retry, OutcomeWriter::from_env());
    watcher.run(channel)
}
