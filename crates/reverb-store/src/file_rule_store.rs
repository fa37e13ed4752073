use std::path::PathBuf;

use anyhow::{bail, Result};
use async_trait::async_trait;
use reverb_domain::{load_rules_document, AutoReplyRule};
use reverb_engine::RuleStore;

#[derive(Debug, Clone)]
/// Rule store over an operator-authored rules document on disk. The document
/// is re-read per batch, so a webhook batch sees one point-in-time snapshot
/// and concurrent edits become visible on the next batch.
pub struct FileRuleStore {
    path: PathBuf,
}

impl FileRuleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RuleStore for FileRuleStore {
    async fn find_active_by_account_id(&self, account_id: &str) -> Result<Vec<AutoReplyRule>> {
        let document = load_rules_document(&self.path)?;
        if document.account_id != account_id {
            bail!(
                "rules document {} is for account '{}', not '{}'",
                self.path.display(),
                document.account_id,
                account_id
            );
        }
        Ok(document.active_rules())
    }
}
