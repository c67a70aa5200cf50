//! YouTubeライブチャットリスナー
//!
//! チャンネルIDから配信中のライブを探し、チャットを定期取得して
//! 新着メッセージだけをイベントで通知する。
//!
//! ```no_run
//! use std::time::Duration;
//! use yt_live_chat::{ChatEvent, LiveChat};
//!
//! # async fn run() -> Result<(), yt_live_chat::YouTubeError> {
//! let chat = LiveChat::new("UC...".to_string(), "API_KEY".to_string(), |event| match event {
//!     ChatEvent::Message(m) => println!("{}: {}", m.author_name, m.message),
//!     ChatEvent::Error(e) => eprintln!("{}", e),
//!     _ => {}
//! })?;
//!
//! if chat.connect().await.is_some() {
//!     chat.listen(Duration::from_secs(1), true);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod util; // doctestのためpubにする
pub mod youtube;

pub use youtube::{
    ChatEvent, ChatMessage, ChatPoller, LiveBroadcast, LiveChat, LiveSelector, MessageType,
    PollingState, YouTubeClient, YouTubeError,
};
