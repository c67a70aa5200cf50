//! YouTube Data API v3 を使ったライブチャット取得

pub mod client;
pub mod errors;
pub mod events;
pub mod live_chat;
pub mod poller;
pub mod resolver;
pub mod state;
pub mod types;

pub use client::YouTubeClient;
pub use errors::YouTubeError;
pub use events::{ChatEvent, EventCallback, LiveSelector};
pub use live_chat::LiveChat;
pub use poller::ChatPoller;
pub use resolver::{LiveResolver, PendingSelection, Resolution, ResolvedChat};
pub use state::PollingState;
pub use types::{ChatMessage, LiveBroadcast, MessageType};
