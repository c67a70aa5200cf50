//! ライブチャットリスナー
//!
//! チャンネルIDとAPIキーから配信を探し、チャットを定期取得してイベントで通知する。
//!
//! ## イベントの流れ
//! 1. `connect()` → `Ready` / `Error` / `MultiLive`
//! 2. `listen()` → `Started`、以後 `Message` / `Error`
//! 3. `stop()` → `Stopped`、`resume()` で同じウォーターマークから再開

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::client::YouTubeClient;
use super::errors::YouTubeError;
use super::events::{ChatEvent, EventCallback, LiveSelector};
use super::poller::ChatPoller;
use super::resolver::{LiveResolver, PendingSelection, Resolution, ResolvedChat};
use super::state::PollingState;

/// 1チャンネル分のライブチャットリスナー
pub struct LiveChat {
    channel_id: String,
    client: YouTubeClient,
    resolver: LiveResolver,
    on_event: EventCallback,
    session: Mutex<Option<ResolvedChat>>,
    poller: Mutex<Option<Arc<ChatPoller>>>,
}

impl LiveChat {
    /// 新しいリスナーを作成
    ///
    /// この時点では通信しない。`connect()`で配信を探す。
    pub fn new<F>(channel_id: String, api_key: String, on_event: F) -> Result<Self, YouTubeError>
    where
        F: Fn(ChatEvent) + Send + Sync + 'static,
    {
        let client = YouTubeClient::new(api_key)?;
        Ok(Self::with_client(channel_id, client, Arc::new(on_event)))
    }

    /// 既存のクライアントでリスナーを作成
    pub fn with_client(channel_id: String, client: YouTubeClient, on_event: EventCallback) -> Self {
        Self {
            channel_id,
            resolver: LiveResolver::new(client.clone()),
            client,
            on_event,
            session: Mutex::new(None),
            poller: Mutex::new(None),
        }
    }

    /// 配信とチャットIDを解決する
    ///
    /// 成功時は`Ready`、失敗時は`Error`を通知する。配信が複数ある場合は
    /// `MultiLive`を通知し、`LiveSelector`で選ばれるまで待つ。
    /// 失敗しても必ず完了し、その場合はNoneを返す。
    pub async fn connect(&self) -> Option<ResolvedChat> {
        let result = match self.resolver.resolve(&self.channel_id).await {
            Ok(Resolution::Ready(resolved)) => Ok(resolved),
            Ok(Resolution::Ambiguous(pending)) => self.await_selection(pending).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(resolved) => {
                self.replace_session(resolved.clone());
                log::info!(
                    "Live chat ready (channel: {}, live: {}, chat: {})",
                    self.channel_id,
                    resolved.live_id,
                    resolved.chat_id
                );
                (self.on_event)(ChatEvent::Ready {
                    live_id: resolved.live_id.clone(),
                    chat_id: resolved.chat_id.clone(),
                });
                Some(resolved)
            }
            Err(e) => {
                log::warn!("Failed to resolve live chat for {}: {}", self.channel_id, e);
                (self.on_event)(ChatEvent::Error(e));
                None
            }
        }
    }

    async fn await_selection(&self, pending: PendingSelection) -> Result<ResolvedChat, YouTubeError> {
        let candidates = pending.candidates().to_vec();
        let count = candidates.len();
        let (selector, choice) = LiveSelector::new(candidates.clone());

        (self.on_event)(ChatEvent::MultiLive {
            candidates,
            selector,
        });

        match choice.await {
            Ok(broadcast) => {
                log::info!("Live broadcast selected: {}", broadcast.video_id);
                pending.resume(&broadcast).await
            }
            Err(_) => Err(YouTubeError::AmbiguousLiveBroadcast { candidates: count }),
        }
    }

    /// 解決済みのセッションを差し替える
    ///
    /// 別のチャットに切り替わった場合は旧ポーラーを止めて破棄する
    fn replace_session(&self, resolved: ResolvedChat) {
        let stale = {
            let mut poller = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
            let switched = poller
                .as_ref()
                .is_some_and(|current| current.live_chat_id() != resolved.chat_id);
            if switched {
                poller.take()
            } else {
                None
            }
        };

        // コールバックがロックを取り直せるよう、解放してから止める
        if let Some(stale) = stale {
            stale.stop();
        }

        *self.session.lock().unwrap_or_else(PoisonError::into_inner) = Some(resolved);
    }

    /// チャットの定期取得を開始
    ///
    /// 未接続の場合は`InvalidChatId`を通知してfalseを返す。
    pub fn listen(&self, interval: Duration, ignore_backlog: bool) -> bool {
        let Some(session) = self.session() else {
            (self.on_event)(ChatEvent::Error(YouTubeError::InvalidChatId));
            return false;
        };

        let poller = {
            let mut slot = self.poller.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(slot.get_or_insert_with(|| {
                Arc::new(ChatPoller::new(
                    self.client.clone(),
                    session.chat_id.clone(),
                    Arc::clone(&self.on_event),
                ))
            }))
        };

        match poller.start(interval, ignore_backlog) {
            Ok(()) => true,
            Err(e) => {
                (self.on_event)(ChatEvent::Error(e));
                false
            }
        }
    }

    /// 定期取得を停止
    pub fn stop(&self) {
        if let Some(poller) = self.current_poller() {
            poller.stop();
        }
    }

    /// 停止した取得を前回と同じ間隔で再開
    ///
    /// ウォーターマークは維持し、バックログ抑制は行わない。
    /// 一度も`listen()`していない場合はfalseを返す。
    pub fn resume(&self) -> bool {
        let Some(poller) = self.current_poller() else {
            log::warn!("resume() called before listen()");
            return false;
        };
        let Some(interval) = poller.last_interval() else {
            return false;
        };

        match poller.start(interval, false) {
            Ok(()) => true,
            Err(e) => {
                (self.on_event)(ChatEvent::Error(e));
                false
            }
        }
    }

    /// 定期取得中かどうか
    pub fn is_active(&self) -> bool {
        self.current_poller().is_some_and(|p| p.is_running())
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// 解決済みの動画ID
    pub fn live_id(&self) -> Option<String> {
        self.session().map(|s| s.live_id)
    }

    /// 解決済みのチャットID
    pub fn chat_id(&self) -> Option<String> {
        self.session().map(|s| s.chat_id)
    }

    /// ポーリング状態のスナップショット
    pub fn polling_state(&self) -> Option<PollingState> {
        self.current_poller().map(|p| p.state())
    }

    fn session(&self) -> Option<ResolvedChat> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn current_poller(&self) -> Option<Arc<ChatPoller>> {
        self.poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    type Log = Arc<Mutex<Vec<String>>>;

    /// MultiLive時に選ぶ候補（Noneならセレクタを捨てる）
    fn listener(server: &mockito::ServerGuard, pick: Option<usize>) -> (LiveChat, Log) {
        let log: Log = Arc::default();
        let sink = Arc::clone(&log);
        let client = YouTubeClient::with_base_url("test-key".to_string(), &server.url()).unwrap();

        let on_event: EventCallback = Arc::new(move |event: ChatEvent| {
            let entry = match event {
                ChatEvent::Ready { live_id, chat_id } => format!("ready:{}:{}", live_id, chat_id),
                ChatEvent::Message(m) => format!("message:{}", m.id),
                ChatEvent::Error(e) => format!("error:{}", e),
                ChatEvent::MultiLive { candidates, selector } => {
                    if let Some(index) = pick {
                        assert!(selector.select(index).is_ok());
                    }
                    format!("multilive:{}", candidates.len())
                }
                ChatEvent::Started { chat_id } => format!("started:{}", chat_id),
                ChatEvent::Stopped => "stopped".to_string(),
            };
            sink.lock().unwrap().push(entry);
        });

        (LiveChat::with_client("UCchannel".to_string(), client, on_event), log)
    }

    async fn mock_search(server: &mut mockito::ServerGuard, video_ids: &[&str]) {
        let items: Vec<String> = video_ids
            .iter()
            .map(|id| format!(r#"{{"id":{{"videoId":"{}"}}}}"#, id))
            .collect();
        server
            .mock("GET", "/search")
            .match_query(Matcher::UrlEncoded("channelId".into(), "UCchannel".into()))
            .with_status(200)
            .with_body(format!(r#"{{"items":[{}]}}"#, items.join(",")))
            .create_async()
            .await;
    }

    async fn mock_video(server: &mut mockito::ServerGuard, video_id: &str, chat_id: &str) {
        server
            .mock("GET", "/videos")
            .match_query(Matcher::UrlEncoded("id".into(), video_id.into()))
            .with_status(200)
            .with_body(format!(
                r#"{{"items":[{{"liveStreamingDetails":{{"activeLiveChatId":"{}"}}}}]}}"#,
                chat_id
            ))
            .create_async()
            .await;
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    fn polls(chat: &LiveChat) -> u64 {
        chat.polling_state().map_or(0, |state| state.poll_count)
    }

    /// 取得回数が`count`に達するまで待つ（5秒で打ち切り）
    async fn wait_for_polls(chat: &LiveChat, count: u64) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while polls(chat) < count {
            assert!(tokio::time::Instant::now() < deadline, "poller did not reach {} fetches", count);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_connect_single_live() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &["vid-1"]).await;
        mock_video(&mut server, "vid-1", "chat-1").await;

        let (chat, log) = listener(&server, None);
        let resolved = chat.connect().await.unwrap();

        assert_eq!(resolved.chat_id, "chat-1");
        assert_eq!(chat.live_id().as_deref(), Some("vid-1"));
        assert_eq!(chat.chat_id().as_deref(), Some("chat-1"));
        assert_eq!(entries(&log), vec!["ready:vid-1:chat-1"]);
    }

    #[tokio::test]
    async fn test_connect_without_live_emits_error() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &[]).await;

        let (chat, log) = listener(&server, None);
        assert!(chat.connect().await.is_none());

        assert_eq!(entries(&log), vec!["error:Cannot find live."]);
        assert!(chat.chat_id().is_none());
    }

    #[tokio::test]
    async fn test_connect_chat_not_found() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &["vid-1"]).await;
        server
            .mock("GET", "/videos")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create_async()
            .await;

        let (chat, log) = listener(&server, None);
        assert!(chat.connect().await.is_none());
        assert_eq!(entries(&log), vec!["error:Can not find chat."]);
    }

    #[tokio::test]
    async fn test_multilive_selection_resumes_resolution() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &["vid-1", "vid-2"]).await;
        mock_video(&mut server, "vid-2", "chat-2").await;

        let (chat, log) = listener(&server, Some(1));
        let resolved = chat.connect().await.unwrap();

        assert_eq!(resolved.live_id, "vid-2");
        assert_eq!(entries(&log), vec!["multilive:2", "ready:vid-2:chat-2"]);
    }

    #[tokio::test]
    async fn test_multilive_selection_from_another_task() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &["vid-1", "vid-2"]).await;
        mock_video(&mut server, "vid-1", "chat-1").await;

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<LiveSelector>();
        let client = YouTubeClient::with_base_url("test-key".to_string(), &server.url()).unwrap();
        let chat = LiveChat::with_client(
            "UCchannel".to_string(),
            client,
            Arc::new(move |event: ChatEvent| {
                if let ChatEvent::MultiLive { selector, .. } = event {
                    tx.send(selector).unwrap();
                }
            }),
        );

        let picker = tokio::spawn(async move {
            let mut rx = rx;
            let selector = rx.recv().await.unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
            assert!(selector.select(0).is_ok());
        });

        let resolved = chat.connect().await.unwrap();
        picker.await.unwrap();
        assert_eq!(resolved.chat_id, "chat-1");
    }

    #[tokio::test]
    async fn test_multilive_dropped_selector() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &["vid-1", "vid-2", "vid-3"]).await;

        let (chat, log) = listener(&server, None);
        assert!(chat.connect().await.is_none());

        assert_eq!(
            entries(&log),
            vec![
                "multilive:3".to_string(),
                "error:Multiple live broadcasts found (3) and none was selected".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_listen_before_connect() {
        let server = mockito::Server::new_async().await;
        let (chat, log) = listener(&server, None);

        assert!(!chat.listen(Duration::from_millis(20), false));
        assert!(!chat.resume());
        assert_eq!(entries(&log), vec!["error:Chat id is invalid."]);
    }

    #[tokio::test]
    async fn test_listen_stop_resume() {
        let mut server = mockito::Server::new_async().await;
        mock_search(&mut server, &["vid-1"]).await;
        mock_video(&mut server, "vid-1", "chat-1").await;
        server
            .mock("GET", "/liveChat/messages")
            .match_query(Matcher::UrlEncoded("liveChatId".into(), "chat-1".into()))
            .with_status(200)
            .with_body(
                r#"{"items":[
                    {"id":"m1","snippet":{"publishedAt":"2024-05-01T03:00:01Z","displayMessage":"one"}},
                    {"id":"m2","snippet":{"publishedAt":"2024-05-01T03:00:02Z","displayMessage":"two"}}
                ]}"#,
            )
            .create_async()
            .await;

        let (chat, log) = listener(&server, None);
        chat.connect().await.unwrap();

        assert!(chat.listen(Duration::from_millis(20), false));
        assert!(chat.is_active());
        wait_for_polls(&chat, 2).await;
        chat.stop();
        assert!(!chat.is_active());
        let before = polls(&chat);

        assert!(chat.resume());
        wait_for_polls(&chat, before + 3).await;
        chat.stop();

        let messages: Vec<String> = entries(&log)
            .into_iter()
            .filter(|e| e.starts_with("message:"))
            .collect();
        assert_eq!(messages, vec!["message:m1", "message:m2"]);

        let state = chat.polling_state().unwrap();
        assert_eq!(state.emitted_count, 2);
        assert!(state.poll_count >= 5);
    }
}
