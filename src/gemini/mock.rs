//! テスト用の generateContent モックサーバー

use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// 受け付けた順にレスポンスを1つずつ返すローカルサーバー
///
/// 戻り値の JoinHandle は受信したリクエストライン（APIキー付きURL）を返す。
pub(crate) async fn mock_server(
    responses: Vec<(u16, serde_json::Value)>,
) -> (String, tokio::task::JoinHandle<Vec<String>>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut request_lines = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().await.unwrap();

            let mut buf = Vec::new();
            let mut chunk = [0u8; 8192];
            loop {
                let n = stream.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
                let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                let length = head
                    .lines()
                    .filter_map(|l| l.split_once(':'))
                    .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, v)| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    request_lines.push(head.lines().next().unwrap_or("").to_string());
                    break;
                }
            }

            let body = body.to_string();
            let response = format!(
                "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        }
        request_lines
    });

    (format!("http://{}/v1beta", addr), handle)
}

/// テキストだけを返す STOP 応答
pub(crate) fn text_response(text: &str) -> (u16, serde_json::Value) {
    (
        200,
        serde_json::json!({
            "candidates": [{"finishReason": "STOP", "content": {"parts": [{"text": text}]}}]
        }),
    )
}
