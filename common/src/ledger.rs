//! 承認台帳
//!
//! `id -> {status, images, reviewedAt, ...}` のJSONオブジェクト1つ。
//! 遷移は pending → approved → uploaded、pending → rejected のみ許可し、
//! 不正な操作では台帳を一切変更しない。

use crate::error::{Error, Result};
use crate::types::{ApprovalEntry, ApprovalStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ステータス別件数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
    pub uploaded: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApprovalLedger {
    entries: BTreeMap<String, ApprovalEntry>,
}

impl ApprovalLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn get(&self, id: &str) -> Option<&ApprovalEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ApprovalEntry)> {
        self.entries.iter()
    }

    /// 未登録の投稿を pending として追加（既存エントリは変更しない）
    ///
    /// 追加した場合は `true`
    pub fn register(&mut self, id: &str, images: Vec<String>, manifest_path: Option<String>) -> bool {
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries.insert(
            id.to_string(),
            ApprovalEntry {
                status: ApprovalStatus::Pending,
                images,
                manifest_path,
                ..Default::default()
            },
        );
        true
    }

    fn transition(&mut self, id: &str, to: ApprovalStatus) -> Result<&mut ApprovalEntry> {
        let entry = self
            .entries
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;

        if !entry.status.can_transition_to(to) {
            return Err(Error::InvalidTransition {
                id: id.to_string(),
                from: entry.status.to_string(),
                to: to.to_string(),
            });
        }

        entry.status = to;
        Ok(entry)
    }

    pub fn approve(&mut self, id: &str, now: &str) -> Result<()> {
        let entry = self.transition(id, ApprovalStatus::Approved)?;
        entry.reviewed_at = Some(now.to_string());
        Ok(())
    }

    pub fn reject(&mut self, id: &str, now: &str) -> Result<()> {
        let entry = self.transition(id, ApprovalStatus::Rejected)?;
        entry.reviewed_at = Some(now.to_string());
        Ok(())
    }

    pub fn mark_uploaded(&mut self, id: &str, account: &str, now: &str) -> Result<()> {
        let entry = self.transition(id, ApprovalStatus::Uploaded)?;
        entry.uploaded_at = Some(now.to_string());
        entry.uploaded_to = Some(account.to_string());
        Ok(())
    }

    pub fn ids_with(&self, status: ApprovalStatus) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.status == status)
            .map(|(id, _)| id.clone())
            .collect()
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.entries.values() {
            match entry.status {
                ApprovalStatus::Pending => counts.pending += 1,
                ApprovalStatus::Approved => counts.approved += 1,
                ApprovalStatus::Rejected => counts.rejected += 1,
                ApprovalStatus::Uploaded => counts.uploaded += 1,
            }
        }
        counts
    }
}
