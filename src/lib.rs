//! fashion-remix
//!
//! Instagram投稿のスクレイプ、Geminiによる説明・再生成、クロップ、
//! レビュー/承認/アップロードまでのパイプライン。

pub mod cli;
pub mod config;
pub mod error;
pub mod gemini;
pub mod imaging;
pub mod manifest;
pub mod pipeline;
pub mod review;
pub mod scraper;
pub mod session;
pub mod upload;
