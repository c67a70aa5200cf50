/// APIキーをマスキングしてログ出力用の文字列を生成
///
/// 最初の4文字と最後の4文字のみを残す。8文字以下のキーは全体を隠す。
///
/// # Examples
/// ```
/// use yt_live_chat::util::mask_api_key;
///
/// assert_eq!(mask_api_key("AIzaSyABC123def456GHI789"), "AIza***I789");
/// ```
pub fn mask_api_key(api_key: &str) -> String {
    let chars: Vec<char> = api_key.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }

    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}***{}", prefix, suffix)
}

/// URL中の `key=` クエリパラメータをマスキング
///
/// APIキーはヘッダーではなくクエリで送るため、URLをログに出す前に必ず通す。
///
/// # Examples
/// ```
/// use yt_live_chat::util::redact_key_param;
///
/// assert_eq!(
///     redact_key_param("https://host/search?part=id&key=AIzaSyABC123def456GHI789"),
///     "https://host/search?part=id&key=AIza***I789"
/// );
/// ```
pub fn redact_key_param(url: &str) -> String {
    let Some((base, query)) = url.split_once('?') else {
        return url.to_string();
    };

    let query = query
        .split('&')
        .map(|pair| match pair.strip_prefix("key=") {
            Some(key) => format!("key={}", mask_api_key(key)),
            None => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", base, query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_api_key() {
        assert_eq!(mask_api_key("AIzaSyABC123def456GHI789"), "AIza***I789");

        // 短いキー・空文字列は全体をマスク
        assert_eq!(mask_api_key("short"), "***");
        assert_eq!(mask_api_key(""), "***");
        assert_eq!(mask_api_key("12345678"), "***");

        // 9文字からマスキング開始
        assert_eq!(mask_api_key("123456789"), "1234***6789");
    }

    #[test]
    fn test_redact_key_param() {
        assert_eq!(
            redact_key_param("https://h/v?id=1&key=123456789&part=x"),
            "https://h/v?id=1&key=1234***6789&part=x"
        );

        // keyが無いURL・クエリが無いURLはそのまま
        assert_eq!(redact_key_param("https://h/v?id=1"), "https://h/v?id=1");
        assert_eq!(redact_key_param("https://h/v"), "https://h/v");

        // channelIdのような似た名前は対象外
        assert_eq!(
            redact_key_param("https://h/v?monkey=abc"),
            "https://h/v?monkey=abc"
        );
    }
}
