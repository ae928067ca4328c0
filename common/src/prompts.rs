//! プロンプト生成モジュール
//!
//! パイプラインの各段で使うプロンプトをここに集約する:
//! - DESCRIBE_PROMPT: 構造化説明（JSON）
//! - OUTFIT_PROMPT / SCENE_PROMPT: リポジトリ構築用の抽出
//! - FACE_SWAP_VARIANTS: 顔差し替え（ブロック時に順に試す）
//! - REMIX_DESCRIBE_PROMPT: リミックス用の記述（人物がいなければ NO_MODEL）

use serde_json::Value;

/// 構造化説明プロンプト
pub const DESCRIBE_PROMPT: &str = r#"Analyze this image and provide a detailed description in JSON format with the following structure:

{
  "meta": {
    "quality": "photo quality description",
    "resolution": "estimated resolution",
    "camera": "camera type if detectable",
    "lens": "lens info if detectable",
    "aspect_ratio": "aspect ratio",
    "style": "visual style description"
  },
  "character_lock": {
    "age": "estimated age range",
    "hair": { "color": "hair color", "style": "hair style description" },
    "eyes": "eye color",
    "body": { "type": "body type" }
  },
  "scene": {
    "location": "location/setting",
    "time": "time of day",
    "atmosphere": "mood/atmosphere"
  },
  "camera_perspective": {
    "pov": "point of view",
    "angle": "camera angle",
    "framing": "framing/composition",
    "phone_visibility": "is phone visible"
  },
  "subject": {
    "action": "what the subject is doing",
    "pose": { "hips": "hip position", "upper_body": "upper body posture", "expression": "facial expression" },
    "outfit": {
      "top": { "type": "top type", "color": "top color", "fit": "fit description", "details": "fabric details" },
      "bottom": { "type": "bottom type", "color": "bottom color", "fit": "fit description" }
    }
  },
  "lighting": {
    "type": "lighting type",
    "effect": "lighting effect on scene"
  },
  "negative_prompt": ["list", "of", "things", "to", "avoid"]
}

Be precise and detailed. Return ONLY valid JSON."#;

/// 衣装抽出プロンプト
pub const OUTFIT_PROMPT: &str = r#"Analyze this fashion photo and extract ONLY the outfit details. Return as JSON:

{
  "outfit": {
    "top": {
      "type": "shirt/blouse/sweater/etc",
      "color": "specific color",
      "material": "fabric type",
      "fit": "loose/tight/oversized/etc",
      "details": "patterns, textures, special features"
    },
    "bottom": {
      "type": "pants/skirt/shorts/etc",
      "color": "specific color",
      "material": "fabric type",
      "fit": "loose/tight/etc",
      "details": "patterns, textures"
    },
    "outerwear": {
      "type": "jacket/coat/blazer/etc or null",
      "color": "specific color",
      "material": "fabric type"
    },
    "accessories": ["list of jewelry, bags, belts, etc"],
    "footwear": {
      "type": "shoes/boots/etc or null",
      "color": "specific color",
      "style": "casual/formal/etc"
    },
    "overall_style": "casual/formal/streetwear/etc"
  }
}

Focus only on clothing and accessories. Be very specific about colors, materials, and fit."#;

/// シーン抽出プロンプト
pub const SCENE_PROMPT: &str = r#"Analyze this fashion photo and extract the scene details. Return as JSON:

{
  "scene": {
    "location": {
      "type": "indoor/outdoor",
      "setting": "street/studio/nature/home/cafe/etc",
      "description": "detailed description of the environment",
      "background_elements": ["list of visible elements"]
    },
    "lighting": {
      "type": "natural/artificial/mixed",
      "quality": "soft/harsh/dramatic/etc",
      "direction": "front/side/back/top/etc",
      "time_of_day": "morning/afternoon/golden hour/night/etc",
      "mood": "warm/cool/bright/dark/etc"
    },
    "pose": {
      "body_position": "standing/sitting/walking/etc",
      "orientation": "front/side/back/three-quarter",
      "angle": "eye level/low angle/high angle",
      "expression": "neutral/smiling/serious/etc",
      "gesture": "hands position, what they're doing",
      "overall_vibe": "confident/relaxed/playful/etc"
    },
    "composition": {
      "framing": "full body/mid shot/close up",
      "camera_distance": "wide/medium/close",
      "depth_of_field": "sharp/blurred background"
    }
  }
}

Focus on location, lighting, and pose - NOT the outfit."#;

/// 顔差し替えプロンプト（1枚目: 構図/衣装、2枚目: 顔）
///
/// 安全フィルタでブロックされたら次のバリエーションを試す。
pub const FACE_SWAP_VARIANTS: &[&str] = &[
    "Recreate the first image but with the model of the second image, keeping the outfit and body shape from the first image but with the skin type and tone of the second image.",
    "Create a fashion photo using the outfit, pose and setting shown in the first reference image. For the person wearing it, use the face features, hair style and skin tone shown in the second reference image. Maintain the same outfit, accessories and background from the first image exactly.",
    "Create a fashion lookbook image. Use the clothing style, outfit details and pose from the first image as the main subject. Apply the hairstyle and facial features from the second image as inspiration for the model. Keep the exact same outfit and setting from the first image.",
];

/// リミックス用の記述プロンプト
pub const REMIX_DESCRIBE_PROMPT: &str = "Analyze this fashion photo. Include: outfit details, pose, setting, lighting, camera angle. Format for AI generation. If there is NO person/model in the image, respond with \"NO_MODEL\".";

/// 人物が写っていない画像を示すマーカー
pub const NO_MODEL_MARKER: &str = "NO_MODEL";

const MODEL_KEYWORDS: &[&str] = &["person", "model", "woman", "man", "subject", "outfit", "wearing"];

/// 記述に人物が含まれているか
///
/// 空文字・`NO_MODEL` を含む記述、人物を示す語が一つもない記述は `false`。
pub fn describes_model(description: &str) -> bool {
    if description.trim().is_empty() || description.to_uppercase().contains(NO_MODEL_MARKER) {
        return false;
    }
    let lower = description.to_lowercase();
    MODEL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// リミックス1枚目: 記述＋人物
pub fn build_remix_first_prompt(description: &str) -> String {
    format!(
        "Create fashion photo:\n\n{description}\n\nUse person from reference as model. Smartphone quality, natural lighting, no borders."
    )
}

/// リミックス2枚目以降: 記述＋1枚目のスタイル＋人物
pub fn build_remix_follow_prompt(description: &str) -> String {
    format!(
        "Create fashion photo:\n\n{description}\n\nCRITICAL - Use STYLE from first reference image (lighting, colors, aesthetic) and IDENTITY from second reference (face, hair). Same person across all images."
    )
}

/// 記述＋参照人物から生成するプロンプト
pub fn build_generate_prompt(description: &str) -> String {
    format!(
        r#"Create a fashion photo with these specifications:

{description}

Use the person in the reference image as the model. Maintain their face features, hair, and skin tone. The result should look like the model from the reference image wearing the outfit and pose described above."#
    )
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// ミックス投稿1枚目: 衣装＋シーン＋人物
pub fn build_mix_first_prompt(outfit: &Value, scene: &Value) -> String {
    format!(
        r#"Create a fashion photo:

OUTFIT: {}

SCENE: {}

Style: Smartphone quality, natural lighting, no white borders."#,
        pretty(outfit),
        pretty(scene)
    )
}

/// ミックス投稿2枚目以降: シーン＋1枚目のスタイル＋人物
pub fn build_mix_follow_prompt(scene: &Value) -> String {
    format!(
        r#"Create a fashion photo:

SCENE: {}

Use STYLE from first reference image (same lighting, colors, aesthetic). Use FACE from second reference. Same person as img1."#,
        pretty(scene)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_face_swap_variants_count() {
        assert_eq!(FACE_SWAP_VARIANTS.len(), 3);
        assert!(FACE_SWAP_VARIANTS.iter().all(|p| p.contains("first")));
    }

    #[test]
    fn test_build_generate_prompt() {
        let prompt = build_generate_prompt("red dress, standing on a balcony");
        assert!(prompt.contains("red dress, standing on a balcony"));
        assert!(prompt.contains("reference image"));
    }

    #[test]
    fn test_build_mix_prompts() {
        let outfit = json!({"top": {"type": "blazer", "color": "navy"}});
        let scene = json!({"location": {"setting": "cafe"}});

        let first = build_mix_first_prompt(&outfit, &scene);
        assert!(first.contains("OUTFIT:"));
        assert!(first.contains("blazer"));
        assert!(first.contains("cafe"));

        let follow = build_mix_follow_prompt(&scene);
        assert!(follow.contains("cafe"));
        assert!(!follow.contains("OUTFIT"));
    }

    #[test]
    fn test_describes_model() {
        assert!(describes_model("A woman wearing a beige trench coat"));
        assert!(!describes_model("NO_MODEL"));
        assert!(!describes_model("The image shows no_model, only a handbag"));
        assert!(!describes_model("A flat lay of shoes on a table"));
        assert!(!describes_model("   "));
    }

    #[test]
    fn test_remix_prompts() {
        let first = build_remix_first_prompt("linen shirt, beach");
        assert!(first.contains("linen shirt, beach"));
        assert!(!first.contains("STYLE"));

        let follow = build_remix_follow_prompt("linen shirt, beach");
        assert!(follow.contains("STYLE from first reference"));
    }

    #[test]
    fn test_json_prompts_request_json() {
        assert!(DESCRIBE_PROMPT.contains("Return ONLY valid JSON"));
        assert!(OUTFIT_PROMPT.contains("\"outfit\""));
        assert!(SCENE_PROMPT.contains("\"scene\""));
    }
}
