use super::{
    client::YouTubeClient,
    errors::YouTubeError,
    events::{ChatEvent, EventCallback},
    state::PollingState,
    types::ChatMessage,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;

/// tokio::time::interval はゼロ間隔でpanicするため下限を設ける
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// 1回の start〜stop に対応する実行ハンドル
///
/// startごとに作り直すので、停止済みの回の取得が新しい回に混ざらない
struct RunHandle {
    running: Arc<AtomicBool>,
    stop_signal: Arc<Notify>,
    interval: Duration,
}

impl RunHandle {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) -> bool {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        // 待機中のループをすぐに抜けさせる
        self.stop_signal.notify_one();
        was_running
    }
}

/// YouTubeコメントポーリングマネージャー
///
/// 固定間隔でチャットを取得し、未読のメッセージだけを`ChatEvent::Message`で通知する。
/// 既読判定は`PollingState`のウォーターマークで行う。
pub struct ChatPoller {
    client: YouTubeClient,
    live_chat_id: String,
    state: Arc<Mutex<PollingState>>,
    run: Mutex<Option<RunHandle>>,
    on_event: EventCallback,
}

impl ChatPoller {
    /// 新しいポーラーを作成
    pub fn new(client: YouTubeClient, live_chat_id: String, on_event: EventCallback) -> Self {
        Self {
            client,
            live_chat_id,
            state: Arc::new(Mutex::new(PollingState::new())),
            run: Mutex::new(None),
            on_event,
        }
    }

    /// ポーリングを開始
    ///
    /// 直ちに1回取得し、以後`interval`ごとに取得する。
    /// 前回の停止時点のウォーターマークから再開する。tokioランタイム内で呼ぶこと。
    ///
    /// # 引数
    /// - `interval`: 取得間隔
    /// - `ignore_backlog`: 最初の1回で取得したメッセージを通知しない
    pub fn start(&self, interval: Duration, ignore_backlog: bool) -> Result<(), YouTubeError> {
        let mut run = self.run.lock().unwrap_or_else(PoisonError::into_inner);

        // 既に実行中の場合はエラー
        if run.as_ref().is_some_and(RunHandle::is_running) {
            return Err(YouTubeError::PollerAlreadyRunning);
        }

        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .arm(ignore_backlog);

        let interval = interval.max(MIN_INTERVAL);
        let handle = RunHandle {
            running: Arc::new(AtomicBool::new(true)),
            stop_signal: Arc::new(Notify::new()),
            interval,
        };

        let client = self.client.clone();
        let live_chat_id = self.live_chat_id.clone();
        let state = Arc::clone(&self.state);
        let running = Arc::clone(&handle.running);
        let stop_signal = Arc::clone(&handle.stop_signal);
        let on_event = Arc::clone(&self.on_event);

        *run = Some(handle);
        drop(run);

        log::info!(
            "Polling started for chat {} (interval: {:?}, ignore backlog: {})",
            self.live_chat_id,
            interval,
            ignore_backlog
        );
        // 最初のMessageより先に届くよう、ループ起動前に通知する
        (self.on_event)(ChatEvent::Started {
            chat_id: self.live_chat_id.clone(),
        });

        tokio::spawn(async move {
            Self::polling_loop(client, live_chat_id, state, running, stop_signal, interval, on_event)
                .await;
        });

        Ok(())
    }

    /// ポーリングを停止
    ///
    /// 以降の取得予定だけを取り消す。実行中の取得は完了まで進み、結果も通知される。
    pub fn stop(&self) {
        let was_running = self
            .run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RunHandle::stop);

        if was_running {
            log::info!("Polling stopped for chat {}", self.live_chat_id);
            (self.on_event)(ChatEvent::Stopped);
        }
    }

    /// ポーリング中かどうかを確認
    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(RunHandle::is_running)
    }

    /// 最後に開始したときの取得間隔
    pub fn last_interval(&self) -> Option<Duration> {
        self.run
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|run| run.interval)
    }

    /// 対象のライブチャットID
    pub fn live_chat_id(&self) -> &str {
        &self.live_chat_id
    }

    /// 現在の状態を取得
    pub fn state(&self) -> PollingState {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// 1回だけ取得して未読分を通知する
    ///
    /// 通知した件数を返す。ループ実行中に呼ぶと取得が重なるが、
    /// ウォーターマークの更新はロック内で行うので同じメッセージは二度通知されない。
    pub async fn poll_once(&self) -> usize {
        Self::poll(&self.client, &self.live_chat_id, &self.state, &self.on_event).await
    }

    /// ポーリングループ（内部実装）
    async fn polling_loop(
        client: YouTubeClient,
        live_chat_id: String,
        state: Arc<Mutex<PollingState>>,
        running: Arc<AtomicBool>,
        stop_signal: Arc<Notify>,
        interval: Duration,
        on_event: EventCallback,
    ) {
        // 最初のtickは即時。取得が間隔より長引いた場合は次の取得を後ろにずらす
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_signal.notified() => {}
            }

            if !running.load(Ordering::SeqCst) {
                break;
            }

            Self::poll(&client, &live_chat_id, &state, &on_event).await;
        }

        log::debug!("Polling loop ended for chat {}", live_chat_id);
    }

    async fn poll(
        client: &YouTubeClient,
        live_chat_id: &str,
        state: &Mutex<PollingState>,
        on_event: &EventCallback,
    ) -> usize {
        match client.get_live_chat_messages(live_chat_id).await {
            Ok(response) => {
                let messages: Vec<ChatMessage> = response
                    .items
                    .into_iter()
                    .filter_map(|item| item.into_chat_message())
                    .collect();

                let fresh = state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .ingest(messages);

                let count = fresh.len();
                if count > 0 {
                    log::debug!("{} new chat message(s)", count);
                }
                for message in fresh {
                    on_event(ChatEvent::Message(message));
                }
                count
            }
            Err(e) => {
                log::warn!("Polling error (will retry on next tick): {}", e);
                state
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .record_failure();
                on_event(ChatEvent::Error(e));
                0
            }
        }
    }
}

impl Drop for ChatPoller {
    /// ドロップ時に以降の取得予定を止める
    fn drop(&mut self) {
        if let Some(run) = self
            .run
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            run.stop();
        }
    }
}
