use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::ChatMessage;

/// ポーリング状態を管理する構造体
///
/// 既読判定はタイムスタンプのみで行う。ウォーターマークより厳密に新しい
/// メッセージだけを通し、通したメッセージの時刻でウォーターマークを進める。
/// ウォーターマークはプロセス内で単調増加し、リセット操作は持たない。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollingState {
    /// 最後に通過させたメッセージの時刻（未取得ならNone）
    pub watermark: Option<DateTime<Utc>>,
    /// 次回の取得でバックログを抑制するか
    pub suppress_backlog: bool,
    /// 取得完了回数
    pub poll_count: u64,
    /// 通知したメッセージ数
    pub emitted_count: u64,
}

impl PollingState {
    /// 新しいポーリング状態を作成
    pub fn new() -> Self {
        Self::default()
    }

    /// 開始時に呼び出す
    ///
    /// ウォーターマークは保持したまま、次の1回分だけバックログ抑制を設定する
    pub fn arm(&mut self, suppress_backlog: bool) {
        self.suppress_backlog = suppress_backlog;
    }

    /// 1回分の取得結果を処理し、通知すべきメッセージを返す
    ///
    /// 取得順に判定するため、同一バッチ内で時刻が前後している場合は
    /// 後ろの古いメッセージは捨てられる。
    /// バックログ抑制は結果の件数に関わらず（空でも）この呼び出しで解除される。
    pub fn ingest(&mut self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        let suppress = self.suppress_backlog;
        let mut fresh = Vec::new();

        for message in messages {
            if self.is_newer(&message.published_at) {
                self.watermark = Some(message.published_at);
                if !suppress {
                    fresh.push(message);
                }
            }
        }

        if suppress {
            log::debug!("Backlog suppressed (watermark: {:?})", self.watermark);
        }

        self.finish_poll();
        self.emitted_count += fresh.len() as u64;
        fresh
    }

    /// 取得失敗時に呼び出す
    ///
    /// 何も処理していないので、バックログ抑制は次に成功した取得まで持ち越す
    pub fn record_failure(&mut self) {
        self.poll_count += 1;
    }

    fn finish_poll(&mut self) {
        self.suppress_backlog = false;
        self.poll_count += 1;
    }

    fn is_newer(&self, published_at: &DateTime<Utc>) -> bool {
        match self.watermark {
            Some(watermark) => *published_at > watermark,
            None => true,
        }
    }
}
