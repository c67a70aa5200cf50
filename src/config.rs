// =============================================================================
// 共通設定・定数モジュール
// =============================================================================
// ライブチャット取得で使用する共通の設定値・定数を定義
// =============================================================================

use std::time::Duration;

/// YouTube Data API v3 のベースURL
pub const API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// HTTPリクエストのデフォルトタイムアウト（秒）
///
/// 検索・動画詳細・チャット取得の全リクエストで使用。
/// 応答が無いままポーリングが詰まらないようにする。
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// liveChatMessages.list で1回に取得する最大件数
///
/// ページネーションは行わないため、これを超えた分は取得できない
pub const MAX_CHAT_RESULTS: u32 = 2000;

/// ポーリング間隔のデフォルト（ミリ秒）
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// HTTPリクエストのデフォルトタイムアウト（Duration）
///
/// HTTPクライアント構築時に直接使用可能
pub fn http_timeout() -> Duration {
    Duration::from_secs(HTTP_TIMEOUT_SECS)
}
