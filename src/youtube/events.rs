//! リスナーが通知するイベント

use std::sync::Arc;
use tokio::sync::oneshot;

use super::errors::YouTubeError;
use super::types::{ChatMessage, LiveBroadcast};

/// イベント受け取り用コールバック
pub type EventCallback = Arc<dyn Fn(ChatEvent) + Send + Sync + 'static>;

/// ライブチャットイベント
#[derive(Debug)]
pub enum ChatEvent {
    /// チャットIDの解決完了
    Ready { live_id: String, chat_id: String },

    /// 新しいメッセージを受信
    Message(ChatMessage),

    /// エラー発生（ポーリングは継続する）
    Error(YouTubeError),

    /// 配信が複数見つかった
    ///
    /// `selector`で1つ選ぶまで解決は止まる
    MultiLive {
        candidates: Vec<LiveBroadcast>,
        selector: LiveSelector,
    },

    /// ポーリング開始
    Started { chat_id: String },

    /// ポーリング停止
    Stopped,
}

/// 複数配信からの選択を返すためのハンドル
///
/// 選ばずにドロップすると解決は`AmbiguousLiveBroadcast`で終了する。
#[derive(Debug)]
pub struct LiveSelector {
    candidates: Vec<LiveBroadcast>,
    reply: oneshot::Sender<LiveBroadcast>,
}

impl LiveSelector {
    pub(crate) fn new(candidates: Vec<LiveBroadcast>) -> (Self, oneshot::Receiver<LiveBroadcast>) {
        let (reply, rx) = oneshot::channel();
        (Self { candidates, reply }, rx)
    }

    /// 候補一覧
    pub fn candidates(&self) -> &[LiveBroadcast] {
        &self.candidates
    }

    /// インデックスで選択
    ///
    /// 範囲外の場合は選択せずに自身を返す
    pub fn select(self, index: usize) -> Result<(), Self> {
        match self.candidates.get(index).cloned() {
            Some(broadcast) => {
                self.choose(broadcast);
                Ok(())
            }
            None => Err(self),
        }
    }

    /// 配信を指定して選択
    pub fn choose(self, broadcast: LiveBroadcast) {
        if self.reply.send(broadcast).is_err() {
            log::debug!("Live selection arrived after resolution was dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn broadcast(id: &str) -> LiveBroadcast {
        LiveBroadcast {
            video_id: id.to_string(),
            title: String::new(),
            channel_title: String::new(),
        }
    }

    #[tokio::test]
    async fn test_selector_select_index() {
        let (selector, rx) = LiveSelector::new(vec![broadcast("a"), broadcast("b")]);
        assert_eq!(selector.candidates().len(), 2);

        assert!(selector.select(1).is_ok());
        assert_eq!(rx.await.unwrap().video_id, "b");
    }

    #[tokio::test]
    async fn test_selector_out_of_range_returns_self() {
        let (selector, rx) = LiveSelector::new(vec![broadcast("a")]);

        let selector = selector.select(3).unwrap_err();
        selector.choose(broadcast("a"));
        assert_eq!(rx.await.unwrap().video_id, "a");
    }

    #[tokio::test]
    async fn test_selector_dropped() {
        let (selector, rx) = LiveSelector::new(vec![broadcast("a")]);
        drop(selector);
        assert!(rx.await.is_err());
    }
}
