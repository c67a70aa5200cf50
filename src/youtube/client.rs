use reqwest::{Client, Response, StatusCode};

use super::{errors::YouTubeError, types::*};
use crate::config;
use crate::util::{mask_api_key, redact_key_param};

/// YouTube Data API v3 クライアント
///
/// APIキーは`key`クエリパラメータとして送信する。
#[derive(Clone)]
pub struct YouTubeClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for YouTubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YouTubeClient")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl YouTubeClient {
    pub fn new(api_key: String) -> Result<Self, YouTubeError> {
        Self::with_base_url(api_key, config::API_BASE)
    }

    /// ベースURLを指定してクライアントを作成（テスト用スタブサーバー向け）
    pub fn with_base_url(api_key: String, base_url: &str) -> Result<Self, YouTubeError> {
        let client = Client::builder()
            .timeout(config::http_timeout())
            .build()
            .map_err(|e| YouTubeError::NetworkError(format!("Failed to build HTTP client: {}", e)))?;

        log::debug!(
            "YouTube client created (base: {}, key: {})",
            base_url,
            mask_api_key(&api_key)
        );

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// チャンネルで配信中のライブ動画を検索（search.list, クォータ100消費）
    pub async fn search_live_videos(
        &self,
        channel_id: &str,
    ) -> Result<Vec<LiveBroadcast>, YouTubeError> {
        log::info!(
            "Searching live broadcasts for channel: {} (quota cost: 100 units)",
            channel_id
        );

        let url = format!("{}/search", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "id,snippet"),
                ("channelId", channel_id),
                ("eventType", "live"),
                ("type", "video"),
                ("key", &self.api_key),
            ])
            .send()
            .await?;

        let response = check_status(response, None).await?;
        let data: SearchResponse = decode(response).await?;

        let broadcasts: Vec<LiveBroadcast> =
            data.items.into_iter().map(LiveBroadcast::from).collect();
        log::info!("Found {} live broadcast(s)", broadcasts.len());
        Ok(broadcasts)
    }

    /// 動画IDからactiveLiveChatIdを取得（videos.list, クォータ1消費）
    pub async fn get_live_chat_id(&self, video_id: &str) -> Result<String, YouTubeError> {
        log::info!(
            "Fetching live chat ID for video: {} (quota cost: 1 unit)",
            video_id
        );

        let url = format!("{}/videos", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "liveStreamingDetails"),
                ("id", video_id),
                ("key", &self.api_key),
            ])
            .send()
            .await?;

        let response = check_status(response, Some(YouTubeError::VideoNotFound)).await?;
        let data: VideoResponse = decode(response).await?;

        let chat_id = data
            .items
            .first()
            .and_then(|item| item.live_streaming_details.as_ref())
            .and_then(|details| details.active_live_chat_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or(YouTubeError::ChatNotFound)?;

        log::info!("Live chat ID retrieved: {}", chat_id);
        Ok(chat_id)
    }

    /// ライブチャットメッセージ取得（liveChatMessages.list, クォータ約5消費）
    ///
    /// ページトークンは送らず、毎回先頭から最大件数まで取得する
    pub async fn get_live_chat_messages(
        &self,
        live_chat_id: &str,
    ) -> Result<LiveChatMessagesResponse, YouTubeError> {
        log::debug!("Fetching live chat messages for chat ID: {}", live_chat_id);

        let url = format!("{}/liveChat/messages", self.base_url);
        let max_results = config::MAX_CHAT_RESULTS.to_string();

        let response = self
            .client
            .get(&url)
            .query(&[
                ("liveChatId", live_chat_id),
                ("part", "id,snippet,authorDetails"),
                ("maxResults", &max_results),
                ("key", &self.api_key),
            ])
            .send()
            .await?;

        let response = check_status(response, Some(YouTubeError::ChatNotFound)).await?;
        let data: LiveChatMessagesResponse = decode(response).await?;

        log::debug!(
            "Fetched {} chat items (suggested interval: {:?}ms)",
            data.items.len(),
            data.polling_interval_millis
        );
        Ok(data)
    }
}

/// ステータスコードをエラーに振り分ける
///
/// 成功時はレスポンスをそのまま返す。`not_found`は404時に返すエラーで、
/// Noneなら他の想定外ステータスと同じく`HttpStatus`になる。
async fn check_status(
    response: Response,
    not_found: Option<YouTubeError>,
) -> Result<Response, YouTubeError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = redact_key_param(response.url().as_str());

    if let (StatusCode::NOT_FOUND, Some(not_found)) = (status, not_found) {
        log::warn!("Resource not found ({})", url);
        return Err(not_found);
    }

    match status {
        StatusCode::UNAUTHORIZED => {
            log::error!("Unauthorized - API key invalid ({})", url);
            Err(YouTubeError::InvalidApiKey)
        }
        StatusCode::BAD_REQUEST => {
            let error_text = response.text().await.unwrap_or_default();
            if error_text.contains("keyInvalid") {
                log::error!("API key is invalid ({})", url);
                Err(YouTubeError::InvalidApiKey)
            } else {
                log::error!("YouTube API bad request ({}): {}", url, error_text);
                Err(YouTubeError::HttpStatus {
                    status: status.as_u16(),
                    body: error_text,
                })
            }
        }
        StatusCode::FORBIDDEN => {
            let error_text = response.text().await.unwrap_or_default();
            if error_text.contains("quotaExceeded") {
                log::error!("Quota exceeded - daily limit reached");
                Err(YouTubeError::QuotaExceeded)
            } else if error_text.contains("rateLimitExceeded") {
                log::warn!("Rate limit exceeded");
                Err(YouTubeError::RateLimitExceeded)
            } else {
                log::error!("API key invalid or insufficient permissions ({})", url);
                Err(YouTubeError::InvalidApiKey)
            }
        }
        status => {
            let error_text = response.text().await.unwrap_or_default();
            log::error!(
                "Unexpected API response - status: {}, url: {}, body: {}",
                status,
                url,
                error_text
            );
            Err(YouTubeError::HttpStatus {
                status: status.as_u16(),
                body: error_text,
            })
        }
    }
}

/// レスポンスボディをJSONとしてデコード
async fn decode<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, YouTubeError> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| YouTubeError::ParseError(e.to_string()))
}
