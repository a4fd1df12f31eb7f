//! One invocation's view of persisted state.
//!
//! A [`Session`] loads the four documents, runs the hook pipeline or a
//! read-only query against them, and writes them back. Load failures degrade
//! to empty state and save failures are logged, so a damaged data directory
//! never blocks the prompt.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::classifier::{insert_before_close, Classifier, DryRunResult};
use crate::config::{Config, PathsConfig};
use crate::error::{AppError, AppResult};
use crate::forest::Forest;
use crate::guide::transcript::last_assistant_message;
use crate::guide::Guide;
use crate::storage::{recover_tmp_files, DocumentStore, JsonFileStore};
use crate::text::clean_prompt;
use crate::tfidf::Corpus;
use crate::transition::TransitionChain;

/// Confirmation printed by [`reset`].
pub const RESET_MESSAGE: &str = "[Focus] Reset complete. All tracking data cleared.\n";

/// Payload the host writes to stdin before each prompt.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookInput {
    /// Raw prompt text.
    #[serde(default)]
    pub prompt: String,
    /// Conversation transcript, when the host provides one.
    #[serde(default)]
    pub transcript_path: Option<PathBuf>,
}

impl HookInput {
    /// Parse stdin. Blank input means there is nothing to do.
    pub fn parse(data: &str) -> AppResult<Option<Self>> {
        if data.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(data)
            .map(Some)
            .map_err(|e| AppError::HookInput {
                message: e.to_string(),
            })
    }
}

/// Loaded state plus the store it came from.
pub struct Session<S: DocumentStore = JsonFileStore> {
    store: S,
    paths: PathsConfig,
    /// Classifier over the loaded forest, corpus and chain.
    pub classifier: Classifier,
    /// Response guide.
    pub guide: Guide,
}

impl Session<JsonFileStore> {
    /// Open the JSON documents under the configured data directory.
    pub fn open(config: &Config) -> Self {
        Self::load(config, JsonFileStore::new())
    }
}

impl<S: DocumentStore> Session<S> {
    /// Recover interrupted saves, then load every document from `store`.
    pub fn load(config: &Config, store: S) -> Self {
        let paths = config.paths.clone();
        recover_tmp_files(&paths.documents());

        let forest: Forest = store.load_or_default(&paths.intent_file());
        let corpus: Corpus = store.load_or_default(&paths.engine_file());
        let chain: TransitionChain = store.load_or_default(&paths.markov_file());
        let mut guide: Guide = store.load_or_default(&paths.guide_file());
        guide.set_max_size(config.gate.guide_size);

        debug!(
            trees = forest.trees.len(),
            nodes = forest.node_count(),
            documents = corpus.total_docs,
            guide_entries = guide.len(),
            "Loaded state"
        );

        Self {
            store,
            paths,
            classifier: Classifier::with_state(forest, corpus, chain, config.gate.clone()),
            guide,
        }
    }

    /// Run the full pipeline for one hook invocation and persist the result.
    ///
    /// Returns `None` when the cleaned prompt is empty; nothing is touched in
    /// that case. Otherwise returns the context block with the guide inserted,
    /// which may be empty if the prompt had no meaningful tokens.
    pub fn run_hook(&mut self, input: &HookInput) -> Option<String> {
        let prompt = clean_prompt(&input.prompt);
        if prompt.is_empty() {
            debug!("Empty prompt, nothing to do");
            return None;
        }

        if let Some(path) = input.transcript_path.as_deref() {
            self.record_response(path);
        }

        let reinforced = self.classifier.reinforce_from_guide(&mut self.guide);
        debug!(reinforced, "Applied guide reinforcement");

        let source = format!("p{}", self.classifier.forest.meta.total_prompts);
        let context = self.classifier.process_prompt(&prompt, &source);
        let context = insert_before_close(&context, &self.guide.render(&self.classifier.forest));

        // Failures are logged per document by `save`; the context is still printed.
        if let Err(e) = self.save() {
            debug!(error = %e, "State not fully persisted");
        }
        Some(context)
    }

    /// Add the last assistant reply from `transcript` to the guide, linked to
    /// the newest leaf of the most recent tree.
    fn record_response(&mut self, transcript: &Path) {
        let Some(summary) = last_assistant_message(transcript) else {
            return;
        };
        let intent_id = self
            .classifier
            .forest
            .latest_leaf_id()
            .unwrap_or_default()
            .to_string();
        self.guide.add(summary, intent_id, Vec::new());
    }

    /// Write all four documents. Every document is attempted; the first
    /// failure is returned after all of them have been logged.
    pub fn save(&self) -> AppResult<()> {
        let results = [
            self.store
                .save(&self.paths.intent_file(), &self.classifier.forest),
            self.store
                .save(&self.paths.engine_file(), &self.classifier.corpus),
            self.store.save(&self.paths.guide_file(), &self.guide),
            self.store
                .save(&self.paths.markov_file(), &self.classifier.chain),
        ];

        let mut first = None;
        for result in results {
            if let Err(e) = result {
                warn!(path = %e.path().display(), error = %e, "Failed to save document");
                first.get_or_insert(e);
            }
        }
        first.map_or(Ok(()), |e| Err(AppError::Storage(e)))
    }

    /// Current context plus guide, without mutating anything.
    pub fn status(&self) -> String {
        insert_before_close(
            &self.classifier.status_block(),
            &self.guide.render(&self.classifier.forest),
        )
    }

    /// Classification trace for `prompt`. Nothing is persisted.
    pub fn dry_run(&mut self, prompt: &str) -> DryRunResult {
        self.classifier.dry_run(&clean_prompt(prompt))
    }

    /// Paths of the documents backing this session.
    pub fn paths(&self) -> &PathsConfig {
        &self.paths
    }
}

/// Delete every persisted document and return the confirmation line.
///
/// Documents that cannot be removed are logged and skipped.
pub fn reset<S: DocumentStore>(store: &S, paths: &PathsConfig) -> String {
    for path in paths.documents() {
        if let Err(e) = store.remove(&path) {
            warn!(path = %path.display(), error = %e, "Failed to remove document");
        }
    }
    info!(data_dir = %paths.data_dir.display(), "State reset");
    RESET_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_blank_input() {
        assert_eq!(HookInput::parse("").unwrap(), None);
        assert_eq!(HookInput::parse("  \n").unwrap(), None);
    }

    #[test]
    fn test_parse_hook_input() {
        let input = HookInput::parse(r#"{"prompt":"hello","transcript_path":"/tmp/t.json"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(input.prompt, "hello");
        assert_eq!(input.transcript_path, Some(PathBuf::from("/tmp/t.json")));

        let bare = HookInput::parse(r#"{"prompt":"hi"}"#).unwrap().unwrap();
        assert!(bare.transcript_path.is_none());
    }

    #[test]
    fn test_parse_invalid_input() {
        let err = HookInput::parse("not json").unwrap_err();
        assert!(matches!(err, AppError::HookInput { .. }));
    }
}
