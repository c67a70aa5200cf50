use thiserror::Error;

#[derive(Error, Debug)]
pub enum YouTubeError {
    /// 通信エラー（URLはAPIキーを含むため保持しない）
    #[error("HTTP request failed: {0}")]
    HttpError(#[source] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API key is invalid or missing")]
    InvalidApiKey,

    #[error("Cannot find live.")]
    NoLiveBroadcast,

    /// 複数の配信候補から選択されないまま解決が打ち切られた
    #[error("Multiple live broadcasts found ({candidates}) and none was selected")]
    AmbiguousLiveBroadcast { candidates: usize },

    #[error("Live id is invalid.")]
    InvalidLiveId,

    #[error("Video not found or not a live stream")]
    VideoNotFound,

    #[error("Can not find chat.")]
    ChatNotFound,

    #[error("Chat id is invalid.")]
    InvalidChatId,

    #[error("Quota exceeded - please try again tomorrow")]
    QuotaExceeded,

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Poller is already running")]
    PollerAlreadyRunning,
}

impl From<reqwest::Error> for YouTubeError {
    fn from(e: reqwest::Error) -> Self {
        // リクエストURLには`key=`クエリが載っているので落としておく
        YouTubeError::HttpError(e.without_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(YouTubeError::NoLiveBroadcast.to_string(), "Cannot find live.");
        assert_eq!(YouTubeError::ChatNotFound.to_string(), "Can not find chat.");
        assert_eq!(
            YouTubeError::AmbiguousLiveBroadcast { candidates: 3 }.to_string(),
            "Multiple live broadcasts found (3) and none was selected"
        );
        assert_eq!(
            YouTubeError::HttpStatus {
                status: 500,
                body: "oops".to_string()
            }
            .to_string(),
            "Unexpected HTTP status 500: oops"
        );
    }
}
