//! ログインセッション管理
//!
//! `<sessions>/<name>/session.json` にCookieヘッダ文字列を保存する。
//! スクレイプ時に `--session <name>` で指定して使う。

use crate::error::{RemixError, Result};
use dialoguer::Password;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub name: String,
    /// `Cookie` ヘッダにそのまま付与する値（例: `sessionid=...; csrftoken=...`）
    pub cookie: String,
    pub created_at: String,
}

pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_dir(&self, name: &str) -> Result<PathBuf> {
        validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// セッション一覧（名前順）
    pub fn list(&self) -> Result<Vec<Session>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            match read_session(&path.join(SESSION_FILE_NAME)) {
                Ok(session) => sessions.push(session),
                Err(e) => warn!("セッションを読み込めません {}: {}", path.display(), e),
            }
        }

        sessions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(sessions)
    }

    pub fn load(&self, name: &str) -> Result<Session> {
        let path = self.session_dir(name)?.join(SESSION_FILE_NAME);
        if !path.exists() {
            return Err(RemixError::SessionNotFound(name.to_string()));
        }
        read_session(&path)
    }

    /// 新規作成（既存セッションは上書きしない）
    pub fn create(&self, name: &str, cookie: &str, now: &str) -> Result<Session> {
        let dir = self.session_dir(name)?;
        if dir.exists() {
            return Err(RemixError::SessionExists(name.to_string()));
        }

        let cookie = cookie.trim();
        if cookie.is_empty() {
            return Err(RemixError::Config("Cookieが空です".into()));
        }

        let session = Session {
            name: name.to_string(),
            cookie: cookie.to_string(),
            created_at: now.to_string(),
        };

        std::fs::create_dir_all(&dir)?;
        std::fs::write(
            dir.join(SESSION_FILE_NAME),
            serde_json::to_string_pretty(&session)?,
        )?;
        Ok(session)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let dir = self.session_dir(name)?;
        if !dir.exists() {
            return Err(RemixError::SessionNotFound(name.to_string()));
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}

fn read_session(path: &Path) -> Result<Session> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// ディレクトリ名として安全な名前か
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(RemixError::Config(format!("セッション名が不正です: {:?}", name)))
    }
}

/// Cookieを対話入力（画面には表示しない）
pub fn prompt_cookie() -> Result<String> {
    println!("ブラウザでInstagramにログインし、開発者ツールから Cookie ヘッダをコピーしてください。");
    Password::new()
        .with_prompt("Cookie")
        .interact()
        .map_err(|e| RemixError::Input(e.to_string()))
}
