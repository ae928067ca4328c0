//! クロップ矩形の計算
//!
//! 画像処理ライブラリに渡す `extract` 矩形を求める純粋な算術のみ。
//! 実際の切り出しはCLI側（`imaging`）で行う。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 切り出し矩形（ピクセル）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

/// アスペクト比（幅:高さ）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    /// Instagramフィード縦長
    pub const PORTRAIT: AspectRatio = AspectRatio { width: 4, height: 5 };
    pub const SQUARE: AspectRatio = AspectRatio { width: 1, height: 1 };
    /// ストーリーズ/リール
    pub const STORY: AspectRatio = AspectRatio { width: 9, height: 16 };
    pub const LANDSCAPE: AspectRatio = AspectRatio { width: 16, height: 9 };

    pub fn value(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self::PORTRAIT
    }
}

impl FromStr for AspectRatio {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "portrait" | "feed" => return Ok(Self::PORTRAIT),
            "square" => return Ok(Self::SQUARE),
            "story" | "reel" => return Ok(Self::STORY),
            "landscape" => return Ok(Self::LANDSCAPE),
            _ => {}
        }

        let (w, h) = s
            .split_once(':')
            .or_else(|| s.split_once('/'))
            .ok_or_else(|| Error::InvalidRatio(s.to_string()))?;

        let width: u32 = w.trim().parse().map_err(|_| Error::InvalidRatio(s.to_string()))?;
        let height: u32 = h.trim().parse().map_err(|_| Error::InvalidRatio(s.to_string()))?;
        if width == 0 || height == 0 {
            return Err(Error::InvalidRatio(s.to_string()));
        }

        Ok(Self { width, height })
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

/// 縦方向の基準位置
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CropAnchor {
    /// 上を残して下を削る（生成画像のウォーターマーク除去向け）
    #[default]
    Top,
    Center,
}

impl FromStr for CropAnchor {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "top" | "t" => Ok(CropAnchor::Top),
            "center" | "centre" | "c" => Ok(CropAnchor::Center),
            _ => Err(format!("Unknown anchor: {}. Use top or center", s)),
        }
    }
}

impl fmt::Display for CropAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropAnchor::Top => write!(f, "top"),
            CropAnchor::Center => write!(f, "center"),
        }
    }
}

/// 指定比率に切り出す矩形を計算
///
/// 1. 左右から `side_percent`% ずつ削る
/// 2. 残った幅から比率どおりの高さを求める
/// 3. 高さが足りない場合は全高を使い、幅を比率に合わせて中央で詰める
///
/// 結果は常に `left + width <= image_width`、`top + height <= image_height`。
/// 幅と高さは最小1ピクセル。比率どおりだと1ピクセルに満たない極小画像では
/// 比率より境界内に収めることを優先する。
pub fn crop_to_ratio(
    image_width: u32,
    image_height: u32,
    ratio: AspectRatio,
    side_percent: f64,
    anchor: CropAnchor,
) -> Result<CropRect> {
    if image_width == 0 || image_height == 0 {
        return Err(Error::Parse(format!(
            "画像サイズが不正です: {}x{}",
            image_width, image_height
        )));
    }
    if !(0.0..50.0).contains(&side_percent) {
        return Err(Error::Parse(format!("side_percent は0以上50未満: {}", side_percent)));
    }

    let target = ratio.value();
    let side = (image_width as f64 * side_percent / 100.0).round() as u32;
    let side = if side * 2 >= image_width { 0 } else { side };

    let mut width = image_width - side * 2;
    let mut left = side;
    let target_height = (width as f64 / target).round() as u32;

    let height = if target_height <= image_height {
        target_height.max(1)
    } else {
        let fitted_width = ((image_height as f64 * target).round() as u32).clamp(1, width);
        left += (width - fitted_width) / 2;
        width = fitted_width;
        image_height
    };

    let top = match anchor {
        CropAnchor::Top => 0,
        CropAnchor::Center => (image_height - height) / 2,
    };

    Ok(CropRect { left, top, width, height })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_ratio(rect: &CropRect, ratio: AspectRatio) {
        // 丸め誤差は1ピクセル以内
        let expected_width = rect.height as f64 * ratio.value();
        assert!(
            (rect.width as f64 - expected_width).abs() <= 1.0,
            "{:?} is not {}",
            rect,
            ratio
        );
    }

    #[test]
    fn test_portrait_from_top_with_sides() {
        // 1024x1536 の生成画像、左右4%
        let rect = crop_to_ratio(1024, 1536, AspectRatio::PORTRAIT, 4.0, CropAnchor::Top).unwrap();
        assert_eq!(rect.left, 41);
        assert_eq!(rect.width, 1024 - 82);
        assert_eq!(rect.top, 0);
        assert_eq!(rect.height, 1178);
        assert_ratio(&rect, AspectRatio::PORTRAIT);
        assert!(rect.left + rect.width <= 1024);
    }

    #[test]
    fn test_centered_portrait() {
        let rect = crop_to_ratio(1000, 2000, AspectRatio::PORTRAIT, 0.0, CropAnchor::Center).unwrap();
        assert_eq!(rect, CropRect { left: 0, top: 375, width: 1000, height: 1250 });
    }

    #[test]
    fn test_wide_image_shrinks_width() {
        // 横長画像は高さが足りないので幅を詰める
        let rect = crop_to_ratio(2000, 1000, AspectRatio::PORTRAIT, 0.0, CropAnchor::Top).unwrap();
        assert_eq!(rect.height, 1000);
        assert_eq!(rect.width, 800);
        assert_eq!(rect.left, 600);
        assert_ratio(&rect, AspectRatio::PORTRAIT);
    }

    #[test]
    fn test_square_centered() {
        let rect = crop_to_ratio(1080, 1920, AspectRatio::SQUARE, 0.0, CropAnchor::Center).unwrap();
        assert_eq!(rect, CropRect { left: 0, top: 420, width: 1080, height: 1080 });
    }

    #[test]
    fn test_ratio_and_bounds_hold_across_sizes() {
        let ratios = [AspectRatio::PORTRAIT, AspectRatio::SQUARE, AspectRatio::STORY, AspectRatio::LANDSCAPE];
        let sizes = [
            (1024, 1536),
            (1536, 1024),
            (1080, 1080),
            (640, 1138),
            (3000, 2000),
            (17, 31),
            (2, 3),
            (3, 2),
        ];
        for ratio in ratios {
            for (w, h) in sizes {
                for side in [0.0, 1.0, 4.0] {
                    for anchor in [CropAnchor::Top, CropAnchor::Center] {
                        let rect = crop_to_ratio(w, h, ratio, side, anchor).unwrap();
                        assert!(rect.left + rect.width <= w);
                        assert!(rect.top + rect.height <= h);
                        assert!(rect.width > 0 && rect.height > 0);
                        assert_ratio(&rect, ratio);
                    }
                }
            }
        }
    }

    #[test]
    fn test_tiny_image_clamps_to_one_pixel() {
        // 16:3 では高さが0.375ピクセルになるので1ピクセルに切り上げる
        let wide = AspectRatio { width: 16, height: 3 };
        let rect = crop_to_ratio(2, 2, wide, 0.0, CropAnchor::Center).unwrap();
        assert_eq!(rect, CropRect { left: 0, top: 0, width: 2, height: 1 });

        let tall = AspectRatio { width: 1, height: 8 };
        let rect = crop_to_ratio(2, 2, tall, 0.0, CropAnchor::Top).unwrap();
        assert_eq!(rect, CropRect { left: 0, top: 0, width: 1, height: 2 });
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(crop_to_ratio(0, 100, AspectRatio::SQUARE, 0.0, CropAnchor::Top).is_err());
        assert!(crop_to_ratio(100, 100, AspectRatio::SQUARE, 50.0, CropAnchor::Top).is_err());
        assert!(crop_to_ratio(100, 100, AspectRatio::SQUARE, -1.0, CropAnchor::Top).is_err());
    }

    #[test]
    fn test_aspect_ratio_parse() {
        assert_eq!("4:5".parse::<AspectRatio>().unwrap(), AspectRatio::PORTRAIT);
        assert_eq!("9/16".parse::<AspectRatio>().unwrap(), AspectRatio::STORY);
        assert_eq!("square".parse::<AspectRatio>().unwrap(), AspectRatio::SQUARE);
        assert!("0:5".parse::<AspectRatio>().is_err());
        assert!("wide".parse::<AspectRatio>().is_err());
        assert_eq!(AspectRatio::STORY.to_string(), "9:16");
    }

    #[test]
    fn test_anchor_parse() {
        assert_eq!("center".parse::<CropAnchor>().unwrap(), CropAnchor::Center);
        assert_eq!("TOP".parse::<CropAnchor>().unwrap(), CropAnchor::Top);
        assert!("left".parse::<CropAnchor>().is_err());
    }
}
