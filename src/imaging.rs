//! クロップ矩形を実画像に適用する
//!
//! 矩形の計算は `fashion_remix_common::crop`。ここではデコード・切り出し・JPEG保存のみ。

use crate::error::{RemixError, Result};
use fashion_remix_common::{crop_to_ratio, AspectRatio, CropAnchor, CropRect};
use image::{ImageFormat, ImageReader};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// クロップ指定
#[derive(Debug, Clone, Copy)]
pub struct CropSpec {
    pub ratio: AspectRatio,
    pub side_percent: f64,
    pub anchor: CropAnchor,
}

impl Default for CropSpec {
    fn default() -> Self {
        Self {
            ratio: AspectRatio::PORTRAIT,
            side_percent: 4.0,
            anchor: CropAnchor::Top,
        }
    }
}

/// `crop_or_copy` の結果
#[derive(Debug, Clone, PartialEq)]
pub enum CropOutcome {
    Cropped(CropRect),
    /// クロップに失敗し、元画像をそのままコピーした
    Copied { reason: String },
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// 画像を切り出してJPEGで保存
pub fn crop_file(input: &Path, output: &Path, spec: CropSpec) -> Result<CropRect> {
    if !input.exists() {
        return Err(RemixError::FileNotFound(input.display().to_string()));
    }

    let img = ImageReader::open(input)?.with_guessed_format()?.decode()?;
    let rect = crop_to_ratio(img.width(), img.height(), spec.ratio, spec.side_percent, spec.anchor)?;
    let cropped = img.crop_imm(rect.left, rect.top, rect.width, rect.height);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    cropped.to_rgb8().save_with_format(output, ImageFormat::Jpeg)?;
    Ok(rect)
}

/// 切り出しに失敗したら元画像を出力先へコピーする
pub fn crop_or_copy(input: &Path, output: &Path, spec: CropSpec) -> Result<CropOutcome> {
    match crop_file(input, output, spec) {
        Ok(rect) => Ok(CropOutcome::Cropped(rect)),
        Err(e) => {
            warn!("クロップ失敗、元画像をコピー {}: {}", input.display(), e);
            if let Some(parent) = output.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(input, output)?;
            Ok(CropOutcome::Copied { reason: e.to_string() })
        }
    }
}

/// `a.jpg` → `a-cropped.jpg`
pub fn cropped_name(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    format!("{}-cropped.jpg", stem)
}

/// ディレクトリ直下の画像を並列でクロップ
///
/// 出力済み（`-cropped`）のファイルは対象外。結果は入力パス順。
pub fn crop_directory(
    dir: &Path,
    output_dir: &Path,
    spec: CropSpec,
) -> Result<Vec<(PathBuf, Result<CropRect>)>> {
    if !dir.exists() {
        return Err(RemixError::FolderNotFound(dir.display().to_string()));
    }

    let mut inputs: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && is_image_file(p))
        .filter(|p| {
            !p.file_stem()
                .is_some_and(|s| s.to_string_lossy().ends_with("-cropped"))
        })
        .collect();
    inputs.sort();

    std::fs::create_dir_all(output_dir)?;

    Ok(inputs
        .into_par_iter()
        .map(|input| {
            let output = output_dir.join(cropped_name(&input));
            let result = crop_file(&input, &output, spec);
            (input, result)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, RgbImage};

    fn write_png(path: &Path, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_crop_file_portrait() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("gen.png");
        let output = dir.path().join("out").join("gen-cropped.jpg");
        write_png(&input, 100, 200);

        let rect = crop_file(&input, &output, CropSpec::default()).unwrap();
        assert_eq!(rect.left, 4);
        assert_eq!(rect.width, 92);
        assert_eq!(rect.top, 0);
        assert_eq!(rect.height, 115);

        let saved = image::open(&output).unwrap();
        assert_eq!(saved.dimensions(), (92, 115));
    }

    #[test]
    fn test_crop_or_copy_falls_back_to_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("broken.jpg");
        let output = dir.path().join("broken-cropped.jpg");
        std::fs::write(&input, b"not an image").unwrap();

        let outcome = crop_or_copy(&input, &output, CropSpec::default()).unwrap();
        assert!(matches!(outcome, CropOutcome::Copied { .. }));
        assert_eq!(std::fs::read(&output).unwrap(), b"not an image");
    }

    #[test]
    fn test_crop_missing_file() {
        let result = crop_file(
            Path::new("/nonexistent/a.jpg"),
            Path::new("/nonexistent/b.jpg"),
            CropSpec::default(),
        );
        assert!(matches!(result, Err(RemixError::FileNotFound(_))));
    }

    #[test]
    fn test_crop_directory() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("b.png"), 64, 64);
        write_png(&dir.path().join("a.png"), 80, 160);
        write_png(&dir.path().join("old-cropped.png"), 10, 10);
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let out = dir.path().join("cropped");
        let spec = CropSpec {
            ratio: AspectRatio::SQUARE,
            side_percent: 0.0,
            anchor: CropAnchor::Center,
        };
        let results = crop_directory(dir.path(), &out, spec).unwrap();

        let names: Vec<_> = results
            .iter()
            .map(|(p, _)| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);

        let rect = results[0].1.as_ref().unwrap();
        assert_eq!((rect.width, rect.height, rect.top), (80, 80, 40));
        assert!(out.join("a-cropped.jpg").exists());
        assert!(out.join("b-cropped.jpg").exists());
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file(Path::new("a.JPG")));
        assert!(is_image_file(Path::new("a.webp")));
        assert!(!is_image_file(Path::new("a.json")));
        assert!(!is_image_file(Path::new("noext")));
    }
}
