//! 承認済み投稿のアップロード
//!
//! 配信先は `Uploader` トレイトで差し替える。既定の `OutboxUploader` は
//! `<outbox>/<account>/<id>/` に画像をコピーし、外部ツールからの投稿に回す。

use crate::error::{RemixError, Result};
use crate::review::ReviewStore;
use chrono::Utc;
use fashion_remix_common::ApprovalStatus;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// アップロード結果
#[derive(Debug, Clone, PartialEq)]
pub struct UploadReceipt {
    pub location: String,
    pub files: usize,
}

pub trait Uploader {
    fn name(&self) -> &str;

    fn upload(&self, account: &str, id: &str, images: &[String]) -> Result<UploadReceipt>;
}

pub struct OutboxUploader {
    root: PathBuf,
}

impl OutboxUploader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn post_dir(&self, account: &str, id: &str) -> Result<PathBuf> {
        let account = normalize_account(account)?;
        Ok(self.root.join(account).join(id))
    }
}

impl Uploader for OutboxUploader {
    fn name(&self) -> &str {
        "outbox"
    }

    fn upload(&self, account: &str, id: &str, images: &[String]) -> Result<UploadReceipt> {
        if images.is_empty() {
            return Err(RemixError::Upload(format!("{}: 画像がありません", id)));
        }

        let missing: Vec<&String> = images.iter().filter(|p| !Path::new(p).exists()).collect();
        if !missing.is_empty() {
            return Err(RemixError::Upload(format!(
                "{}: 画像が見つかりません: {:?}",
                id, missing
            )));
        }

        let dir = self.post_dir(account, id)?;
        std::fs::create_dir_all(&dir)?;

        for (i, image) in images.iter().enumerate() {
            let source = Path::new(image);
            let ext = source
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("jpg");
            std::fs::copy(source, dir.join(format!("{:02}.{}", i + 1, ext)))?;
        }

        Ok(UploadReceipt {
            location: dir.display().to_string(),
            files: images.len(),
        })
    }
}

/// `@name` → `name`（ディレクトリ名として使えない場合はエラー）
pub fn normalize_account(account: &str) -> Result<&str> {
    let name = account.trim().trim_start_matches('@');
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(RemixError::Config(format!("アカウント名が不正です: {:?}", account)));
    }
    Ok(name)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadSummary {
    pub uploaded: Vec<String>,
    pub failed: Vec<String>,
}

/// approved の投稿をすべてアップロードし、成功分を uploaded にする
///
/// approved が1件もなければ台帳は書き換えない。
pub fn upload_approved(
    store: &ReviewStore,
    uploader: &dyn Uploader,
    account: &str,
) -> Result<UploadSummary> {
    normalize_account(account)?;
    if !store.exists() {
        return Err(RemixError::FileNotFound(format!(
            "{}（先に `remix review show` を実行してください）",
            store.path().display()
        )));
    }

    let mut ledger = store.load()?;
    let approved = ledger.ids_with(ApprovalStatus::Approved);
    let mut summary = UploadSummary::default();

    if approved.is_empty() {
        println!("⚠️ アップロード対象（approved）がありません");
        println!("  承認: remix review approve --id <post-id>");
        return Ok(summary);
    }

    println!(
        "📤 {}件を {} にアップロード ({})\n",
        approved.len(),
        account,
        uploader.name()
    );

    for id in approved {
        let images = ledger.get(&id).map(|e| e.images.clone()).unwrap_or_default();
        println!("[{}] {}枚", id, images.len());

        match uploader.upload(account, &id, &images) {
            Ok(receipt) => {
                ledger.mark_uploaded(&id, account, &Utc::now().to_rfc3339())?;
                info!("{} → {}", id, receipt.location);
                println!("  ✔ {}", receipt.location);
                summary.uploaded.push(id);
            }
            Err(e) => {
                warn!("アップロード失敗 {}: {}", id, e);
                println!("  ❌ {}", e);
                summary.failed.push(id);
            }
        }
    }

    if !summary.uploaded.is_empty() {
        store.save(&ledger)?;
    }

    println!(
        "\n✅ アップロード完了: {}件（失敗 {}件）",
        summary.uploaded.len(),
        summary.failed.len()
    );
    Ok(summary)
}
