//! 配信・チャットID解決
//!
//! チャンネルID → 配信中の動画ID → activeLiveChatId の順に解決する。
//! 配信が複数見つかった場合は候補一覧と再開操作を持つ`PendingSelection`を返し、
//! 呼び出し側が選んだ候補で解決を続ける。

use super::client::YouTubeClient;
use super::errors::YouTubeError;
use super::types::LiveBroadcast;

/// 解決結果
#[derive(Debug)]
pub enum Resolution {
    /// チャットIDまで解決済み
    Ready(ResolvedChat),
    /// 配信が複数あり、選択待ち
    Ambiguous(PendingSelection),
}

/// 解決済みの配信とチャットID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChat {
    pub live_id: String,
    pub chat_id: String,
}

/// 配信IDからチャットIDへの解決器
#[derive(Debug, Clone)]
pub struct LiveResolver {
    client: YouTubeClient,
}

impl LiveResolver {
    pub fn new(client: YouTubeClient) -> Self {
        Self { client }
    }

    /// チャンネルIDから解決を開始
    ///
    /// - 配信0件: `NoLiveBroadcast`（チャットIDの取得は行わない）
    /// - 配信1件: そのままチャットIDを取得
    /// - 配信複数: `Resolution::Ambiguous`
    pub async fn resolve(&self, channel_id: &str) -> Result<Resolution, YouTubeError> {
        let mut candidates = self.client.search_live_videos(channel_id).await?;

        match candidates.len() {
            0 => {
                log::warn!("No live broadcast found for channel: {}", channel_id);
                Err(YouTubeError::NoLiveBroadcast)
            }
            1 => {
                let broadcast = candidates.remove(0);
                self.resolve_chat(&broadcast.video_id).await.map(Resolution::Ready)
            }
            n => {
                log::info!("{} live broadcasts found for channel {}, awaiting selection", n, channel_id);
                Ok(Resolution::Ambiguous(PendingSelection {
                    resolver: self.clone(),
                    candidates,
                }))
            }
        }
    }

    /// 動画IDからチャットIDを取得
    pub async fn resolve_chat(&self, live_id: &str) -> Result<ResolvedChat, YouTubeError> {
        if live_id.is_empty() {
            return Err(YouTubeError::InvalidLiveId);
        }

        let chat_id = self.client.get_live_chat_id(live_id).await?;
        Ok(ResolvedChat {
            live_id: live_id.to_string(),
            chat_id,
        })
    }
}

/// 複数配信からの選択待ち状態
///
/// `select`または`resume`を呼ぶまで解決は進まない。
#[derive(Debug)]
pub struct PendingSelection {
    resolver: LiveResolver,
    candidates: Vec<LiveBroadcast>,
}

impl PendingSelection {
    /// 候補一覧（検索結果の順）
    pub fn candidates(&self) -> &[LiveBroadcast] {
        &self.candidates
    }

    /// 候補のインデックスを指定して解決を再開
    pub async fn select(self, index: usize) -> Result<ResolvedChat, YouTubeError> {
        let broadcast = self
            .candidates
            .get(index)
            .ok_or(YouTubeError::InvalidLiveId)?;
        self.resolver.resolve_chat(&broadcast.video_id).await
    }

    /// 指定した配信で解決を再開
    ///
    /// 候補一覧に含まれない配信を渡してもその動画IDで解決する
    pub async fn resume(self, broadcast: &LiveBroadcast) -> Result<ResolvedChat, YouTubeError> {
        self.resolver.resolve_chat(&broadcast.video_id).await
    }
}
