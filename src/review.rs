//! レビュー台帳（`<review>/approvals.json`）のファイル操作
//!
//! 状態遷移そのものは `fashion_remix_common::ledger` が担う。
//! ここでは読み込み→変更→全体書き戻しと、マニフェストからの同期を行う。
//! ロックはしない（後勝ち）。

use crate::error::{RemixError, Result};
use crate::manifest;
use chrono::Utc;
use fashion_remix_common::{ApprovalLedger, ApprovalStatus, ImageStatus, Manifest};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub const LEDGER_FILE_NAME: &str = "approvals.json";

/// マニフェストから見つかったレビュー対象
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub id: String,
    pub manifest_path: PathBuf,
    pub manifest: Manifest,
}

impl ReviewItem {
    /// レビュー・アップロード対象の画像
    ///
    /// 成功した画像のクロップ版（なければ生成画像）、なければ `generated`。
    pub fn images(&self) -> Vec<String> {
        let from_results: Vec<String> = self
            .manifest
            .images
            .iter()
            .filter(|img| img.status == ImageStatus::Success)
            .filter_map(|img| img.cropped_path.clone().or_else(|| img.generated_path.clone()))
            .collect();

        if from_results.is_empty() {
            self.manifest.generated.clone()
        } else {
            from_results
        }
    }
}

pub struct ReviewStore {
    path: PathBuf,
}

impl ReviewStore {
    pub fn new(review_dir: &Path) -> Self {
        Self {
            path: review_dir.join(LEDGER_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// 台帳を読み込み（ファイルがなければ空）
    pub fn load(&self) -> Result<ApprovalLedger> {
        if !self.path.exists() {
            return Ok(ApprovalLedger::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(ApprovalLedger::from_json_str(&content)?)
    }

    pub fn save(&self, ledger: &ApprovalLedger) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, ledger.to_json_string()?)?;
        Ok(())
    }

    /// 1件の状態を変更して保存（失敗時はファイルに触れない）
    fn update(&self, apply: impl FnOnce(&mut ApprovalLedger) -> Result<()>) -> Result<()> {
        if !self.path.exists() {
            return Err(RemixError::FileNotFound(self.path.display().to_string()));
        }
        let mut ledger = self.load()?;
        apply(&mut ledger)?;
        self.save(&ledger)
    }

    pub fn approve(&self, id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.update(|ledger| Ok(ledger.approve(id, &now)?))
    }

    pub fn reject(&self, id: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.update(|ledger| Ok(ledger.reject(id, &now)?))
    }

    /// マニフェストを台帳に同期して保存（新規追加件数を返す）
    pub fn sync(&self, items: &[ReviewItem]) -> Result<usize> {
        let mut ledger = self.load()?;
        let added = sync_items(&mut ledger, items);
        self.save(&ledger)?;
        Ok(added)
    }
}

/// 未登録のマニフェストを pending として追加（既存エントリは変更しない）
pub fn sync_items(ledger: &mut ApprovalLedger, items: &[ReviewItem]) -> usize {
    items
        .iter()
        .filter(|item| {
            ledger.register(
                &item.id,
                item.images(),
                Some(item.manifest_path.display().to_string()),
            )
        })
        .count()
}

/// 生成ディレクトリ直下の `*-manifest.json` を収集（ID順）
pub fn scan_manifests(generated_dir: &Path) -> Result<Vec<ReviewItem>> {
    if !generated_dir.exists() {
        return Err(RemixError::FolderNotFound(generated_dir.display().to_string()));
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(generated_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();
        let Some(id) = manifest::shortcode_from_manifest_path(path) else {
            continue;
        };
        match manifest::load(path) {
            Ok(manifest) => items.push(ReviewItem {
                id,
                manifest_path: path.to_path_buf(),
                manifest,
            }),
            Err(e) => warn!("マニフェストを読み込めません {}: {}", path.display(), e),
        }
    }

    items.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(items)
}

fn field<'a>(value: &'a serde_json::Value, section: &str, key: &str) -> &'a str {
    value
        .get(section)
        .and_then(|s| s.get(key))
        .and_then(|v| v.as_str())
        .unwrap_or("N/A")
}

/// `review show`: マニフェストを一覧表示して台帳に同期
pub fn show(generated_dir: &Path, store: &ReviewStore) -> Result<()> {
    println!("👁️ 生成結果のレビュー");
    println!("  入力: {}\n", generated_dir.display());

    let items = scan_manifests(generated_dir)?;
    if items.is_empty() {
        println!("⚠️ レビュー対象がありません");
        return Ok(());
    }
    println!("{}件の投稿\n", items.len());

    let mut ledger = store.load()?;
    for item in &items {
        let caption: String = item.manifest.caption.chars().take(100).collect();
        println!("{}", "─".repeat(60));
        println!("📄 {}", item.id);
        let original = match item.manifest.original_post.as_str() {
            "" => "N/A",
            url => url,
        };
        println!("  元投稿: {}", original);
        println!("  キャプション: {}", caption);

        if let Some(desc) = item.manifest.descriptions.first() {
            println!("  シーン: {}", field(desc, "scene", "location"));
            println!("  動作: {}", field(desc, "subject", "action"));
        }

        let images = item.images();
        println!("  画像: {}枚", images.len());
        for (i, image) in images.iter().enumerate() {
            println!("    🖼️ [{}] {}", i + 1, image);
        }

        if let Some(entry) = ledger.get(&item.id) {
            println!(
                "  状態: {} ({})",
                entry.status.as_str().to_uppercase(),
                entry.reviewed_at.as_deref().unwrap_or("-")
            );
        }
    }
    println!("{}", "─".repeat(60));

    let added = sync_items(&mut ledger, &items);
    store.save(&ledger)?;

    println!("\n✔ 台帳を保存: {}（新規 {}件）", store.path().display(), added);
    println!("\nコマンド:");
    println!("  remix review approve --id <post-id>");
    println!("  remix review reject --id <post-id>");
    println!("  remix review pending");
    println!("  remix upload --account <account>");
    Ok(())
}

/// `review pending`: 件数と pending 一覧
pub fn print_status(store: &ReviewStore) -> Result<()> {
    let ledger = store.load()?;
    let counts = ledger.counts();

    println!("📊 レビュー状況:");
    println!("  Pending:  {}", counts.pending);
    println!("  Approved: {}", counts.approved);
    println!("  Rejected: {}", counts.rejected);
    println!("  Uploaded: {}", counts.uploaded);

    if ledger.is_empty() {
        println!("\n  レビュー対象はまだありません。先に `remix generate` を実行してください。");
        return Ok(());
    }

    let pending = ledger.ids_with(ApprovalStatus::Pending);
    if !pending.is_empty() {
        println!("\n⏳ Pending:");
        for id in pending {
            let count = ledger.get(&id).map(|e| e.images.len()).unwrap_or(0);
            println!("  • {} ({}枚)", id, count);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fashion_remix_common::ImageResult;

    fn write_manifest(dir: &Path, shortcode: &str, generated: &[&str]) {
        let manifest = Manifest {
            shortcode: shortcode.into(),
            generated: generated.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        };
        std::fs::write(
            manifest::manifest_path(dir, shortcode),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_scan_manifests() {
        let dir = tempfile::tempdir().unwrap();
        write_manifest(dir.path(), "BBB", &["b.jpg"]);
        write_manifest(dir.path(), "AAA", &["a.jpg"]);
        std::fs::write(dir.path().join("AAA_img0.json"), "{}").unwrap();
        std::fs::write(dir.path().join("CCC-manifest.json"), "not json").unwrap();

        let items = scan_manifests(dir.path()).unwrap();
        let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["AAA", "BBB"]);
    }

    #[test]
    fn test_scan_missing_dir() {
        assert!(matches!(
            scan_manifests(Path::new("/nonexistent/generated")),
            Err(RemixError::FolderNotFound(_))
        ));
    }

    #[test]
    fn test_item_images_prefer_cropped_successes() {
        let mut ok = ImageResult::new(0, "u0");
        ok.status = ImageStatus::Success;
        ok.generated_path = Some("p/img1/generated.jpg".into());
        ok.cropped_path = Some("p/img1/generated-cropped.jpg".into());
        let mut blocked = ImageResult::new(1, "u1");
        blocked.status = ImageStatus::Blocked;

        let item = ReviewItem {
            id: "P".into(),
            manifest_path: PathBuf::from("P-manifest.json"),
            manifest: Manifest {
                generated: vec!["p/img1/generated.jpg".into()],
                images: vec![ok, blocked],
                ..Default::default()
            },
        };
        assert_eq!(item.images(), vec!["p/img1/generated-cropped.jpg"]);
    }

    #[test]
    fn test_sync_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let generated = dir.path().join("generated");
        std::fs::create_dir_all(&generated).unwrap();
        write_manifest(&generated, "AAA", &["a.jpg"]);

        let store = ReviewStore::new(&dir.path().join("review"));
        let items = scan_manifests(&generated).unwrap();
        assert_eq!(store.sync(&items).unwrap(), 1);
        store.approve("AAA").unwrap();

        write_manifest(&generated, "BBB", &["b.jpg"]);
        let items = scan_manifests(&generated).unwrap();
        assert_eq!(store.sync(&items).unwrap(), 1);

        let ledger = store.load().unwrap();
        assert_eq!(ledger.get("AAA").unwrap().status, ApprovalStatus::Approved);
        assert_eq!(ledger.get("BBB").unwrap().status, ApprovalStatus::Pending);
        assert_eq!(ledger.get("BBB").unwrap().images, vec!["b.jpg"]);
    }

    #[test]
    fn test_approve_unknown_id_does_not_touch_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReviewStore::new(dir.path());
        let mut ledger = ApprovalLedger::new();
        ledger.register("AAA", vec![], None);
        store.save(&ledger).unwrap();
        let before = std::fs::read_to_string(store.path()).unwrap();

        assert!(store.approve("NOPE").is_err());
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), before);
    }

    #[test]
    fn test_approve_without_ledger_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReviewStore::new(dir.path());
        assert!(matches!(store.reject("AAA"), Err(RemixError::FileNotFound(_))));
        assert!(!store.exists());
    }
}
