use fashion_remix::config::Config;
use fashion_remix::gemini::GeminiClient;
use fashion_remix_common::prompts::DESCRIBE_PROMPT;
use image::{ImageFormat, Rgb, RgbImage};
use std::io::Cursor;

#[tokio::test]
async fn gemini_describe_integration() {
    let api_key = match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => key,
        _ => {
            eprintln!("GEMINI_API_KEY not set; skipping integration test");
            return;
        }
    };

    let mut config = Config::default();
    config.apply_env();
    let client = GeminiClient::new(api_key, &config).expect("client build failed");

    let image = RgbImage::from_pixel(64, 80, Rgb([200, 40, 40]));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode failed");

    let description = client
        .describe(&bytes, DESCRIBE_PROMPT)
        .await
        .expect("describe failed");

    assert!(description.is_object(), "unexpected response: {}", description);
}
