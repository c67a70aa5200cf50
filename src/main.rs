//! YouTubeライブチャットを端末に流すCLI

use anyhow::{Context, Result};
use clap::Parser;
use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use yt_live_chat::config::DEFAULT_POLL_INTERVAL_MS;
use yt_live_chat::util::mask_api_key;
use yt_live_chat::{ChatEvent, ChatMessage, LiveBroadcast, LiveChat, LiveSelector, MessageType};

#[derive(Parser, Debug)]
#[command(name = "yt-live-chat")]
#[command(version, about = "Print YouTube live chat messages of a channel")]
struct Args {
    /// Channel ID to watch (UC...)
    #[arg(short, long, env = "YOUTUBE_CHANNEL_ID")]
    channel_id: String,

    /// YouTube Data API key
    #[arg(short = 'k', long, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Polling interval in milliseconds
    #[arg(short, long, default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    interval_ms: u64,

    /// Do not print messages that were already in the chat when polling started
    #[arg(long)]
    ignore_backlog: bool,

    /// Broadcast index to use when the channel has several live streams
    #[arg(long)]
    pick: Option<usize>,

    /// Print each message as a JSON line
    #[arg(long)]
    json: bool,

    /// Log filter (trace, debug, info, warn, error or an EnvFilter directive)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .envがあれば環境変数に読み込む（APIキー等）
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // ログ初期化（logクレートのレコードもここに流れる）
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&args.log_level).context("invalid --log-level")?)
        .with_writer(std::io::stderr)
        .init();

    log::info!(
        "Watching channel {} (key: {})",
        args.channel_id,
        mask_api_key(&args.api_key)
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let chat = Arc::new(LiveChat::new(
        args.channel_id.clone(),
        args.api_key.clone(),
        move |event| {
            // 受信側が終了していれば捨てる
            let _ = tx.send(event);
        },
    )?);

    let interval = Duration::from_millis(args.interval_ms);
    let ignore_backlog = args.ignore_backlog;
    let connector = Arc::clone(&chat);
    let mut connect_task = tokio::spawn(async move {
        if connector.connect().await.is_some() {
            connector.listen(interval, ignore_backlog)
        } else {
            false
        }
    });

    let mut connecting = true;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("Interrupted, stopping");
                break;
            }
            listening = &mut connect_task, if connecting => {
                connecting = false;
                if !matches!(listening, Ok(true)) {
                    // 接続失敗のErrorイベントを出力してから終了する
                    while let Ok(event) = rx.try_recv() {
                        handle_event(event, &args);
                    }
                    anyhow::bail!("could not start listening to {}", args.channel_id);
                }
            }
            Some(event) = rx.recv() => {
                handle_event(event, &args);
            }
        }
    }

    chat.stop();
    Ok(())
}

fn handle_event(event: ChatEvent, args: &Args) {
    match event {
        ChatEvent::Ready { live_id, chat_id } => {
            log::info!("Ready (live: {}, chat: {})", live_id, chat_id);
        }
        ChatEvent::Message(message) => print_message(&message, args.json),
        ChatEvent::Error(e) => log::error!("{}", e),
        ChatEvent::MultiLive {
            candidates,
            selector,
        } => choose_broadcast(&candidates, selector, args.pick),
        ChatEvent::Started { chat_id } => log::info!("Listening to chat {}", chat_id),
        ChatEvent::Stopped => log::info!("Stopped listening"),
    }
}

/// 複数配信から1つ選ぶ（--pick が無ければ標準入力で尋ねる）
///
/// 入力待ちの間もイベントループとCtrl-Cを止めないよう、読み取りは別スレッドで行う
fn choose_broadcast(candidates: &[LiveBroadcast], selector: LiveSelector, pick: Option<usize>) {
    eprintln!("Several live broadcasts are running:");
    for (i, broadcast) in candidates.iter().enumerate() {
        eprintln!("  [{}] {} ({})", i, broadcast.title, broadcast.video_id);
    }

    if let Some(index) = pick {
        apply_selection(selector, Some(index));
        return;
    }

    eprint!("Select a broadcast: ");
    // ランタイム終了時に読み取りを待たないよう素のスレッドで読む
    std::thread::spawn(move || {
        let mut line = String::new();
        let index = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .ok()
            .and_then(|_| line.trim().parse::<usize>().ok());
        apply_selection(selector, index);
    });
}

fn apply_selection(selector: LiveSelector, index: Option<usize>) {
    match index {
        Some(index) => {
            if selector.select(index).is_err() {
                log::error!("No broadcast at index {}", index);
            }
        }
        // セレクタを捨てると解決はエラーで終わる
        None => log::error!("No broadcast selected"),
    }
}

fn print_message(message: &ChatMessage, json: bool) {
    if json {
        match serde_json::to_string(message) {
            Ok(line) => println!("{}", line),
            Err(e) => log::warn!("Failed to serialize message {}: {}", message.id, e),
        }
        return;
    }

    let time = message.published_at.format("%H:%M:%S");
    match &message.message_type {
        MessageType::SuperChat { amount, .. } => {
            println!("{} [{}] {}: {}", time, amount, message.author_name, message.message)
        }
        _ => println!("{} {}: {}", time, message.author_name, message.message),
    }
}
