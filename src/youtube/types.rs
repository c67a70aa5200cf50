use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub message: String,
    pub author_name: String,       // → authorName (serde rename)
    pub author_channel_id: String, // → authorChannelId
    pub author_image_url: String,  // → authorImageUrl
    pub published_at: DateTime<Utc>, // → publishedAt
    pub is_owner: bool,            // → isOwner
    pub is_moderator: bool,        // → isModerator
    pub is_member: bool,           // → isMember (isChatSponsor)
    pub is_verified: bool,         // → isVerified
    pub message_type: MessageType, // → messageType
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MessageType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "superChat")]
    SuperChat { amount: String, currency: String },
    #[serde(rename = "superSticker")]
    SuperSticker { sticker_id: String },
    #[serde(rename = "membership")]
    Membership { level: String },
    #[serde(rename = "membershipGift")]
    MembershipGift { count: u32 },
}

/// 配信候補（search.list の1件）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBroadcast {
    pub video_id: String,
    pub title: String,
    pub channel_title: String,
}

// YouTube API レスポンス型

#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItem {
    pub id: SearchItemId,
    pub snippet: Option<SearchSnippet>,
}

#[derive(Debug, Deserialize)]
pub struct SearchItemId {
    #[serde(rename = "videoId", default)]
    pub video_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "channelTitle", default)]
    pub channel_title: String,
}

impl From<SearchItem> for LiveBroadcast {
    fn from(item: SearchItem) -> Self {
        let (title, channel_title) = item
            .snippet
            .map(|s| (s.title, s.channel_title))
            .unwrap_or_default();

        Self {
            video_id: item.id.video_id,
            title,
            channel_title,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct VideoResponse {
    #[serde(default)]
    pub items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
pub struct VideoItem {
    #[serde(rename = "liveStreamingDetails")]
    pub live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
pub struct LiveStreamingDetails {
    #[serde(rename = "activeLiveChatId")]
    pub active_live_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LiveChatMessagesResponse {
    #[serde(rename = "pollingIntervalMillis")]
    pub polling_interval_millis: Option<u64>,
    #[serde(default)]
    pub items: Vec<LiveChatMessageItem>,
}

#[derive(Debug, Deserialize)]
pub struct LiveChatMessageItem {
    pub id: String,
    pub snippet: MessageSnippet,
    #[serde(rename = "authorDetails", default)]
    pub author_details: AuthorDetails,
}

#[derive(Debug, Deserialize)]
pub struct MessageSnippet {
    #[serde(rename = "type", default)]
    pub message_type: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    #[serde(rename = "displayMessage", default)]
    pub display_message: String,
    #[serde(rename = "superChatDetails")]
    pub super_chat_details: Option<SuperChatDetails>,
    #[serde(rename = "superStickerDetails")]
    pub super_sticker_details: Option<SuperStickerDetails>,
    #[serde(rename = "newSponsorDetails")]
    pub new_sponsor_details: Option<NewSponsorDetails>,
    #[serde(rename = "membershipGiftingDetails")]
    pub membership_gifting_details: Option<MembershipGiftingDetails>,
}

#[derive(Debug, Deserialize)]
pub struct SuperChatDetails {
    #[serde(rename = "amountDisplayString", default)]
    pub amount_display_string: String,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Deserialize)]
pub struct SuperStickerDetails {
    #[serde(rename = "superStickerMetadata")]
    pub super_sticker_metadata: Option<SuperStickerMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct SuperStickerMetadata {
    #[serde(rename = "stickerId", default)]
    pub sticker_id: String,
}

#[derive(Debug, Deserialize)]
pub struct NewSponsorDetails {
    #[serde(rename = "memberLevelName", default)]
    pub member_level_name: String,
}

#[derive(Debug, Deserialize)]
pub struct MembershipGiftingDetails {
    #[serde(rename = "giftMembershipsCount", default)]
    pub gift_memberships_count: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthorDetails {
    #[serde(rename = "channelId", default)]
    pub channel_id: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(rename = "profileImageUrl", default)]
    pub profile_image_url: String,
    #[serde(rename = "isVerified", default)]
    pub is_verified: bool,
    #[serde(rename = "isChatOwner", default)]
    pub is_chat_owner: bool,
    #[serde(rename = "isChatSponsor", default)]
    pub is_chat_sponsor: bool,
    #[serde(rename = "isChatModerator", default)]
    pub is_chat_moderator: bool,
}

impl MessageSnippet {
    /// snippet.type と詳細ブロックからメッセージ種別を判定
    fn parse_message_type(&self) -> MessageType {
        match self.message_type.as_str() {
            "superChatEvent" => match &self.super_chat_details {
                Some(details) => MessageType::SuperChat {
                    amount: details.amount_display_string.clone(),
                    currency: details.currency.clone(),
                },
                None => MessageType::Text,
            },
            "superStickerEvent" => match self
                .super_sticker_details
                .as_ref()
                .and_then(|d| d.super_sticker_metadata.as_ref())
            {
                Some(metadata) => MessageType::SuperSticker {
                    sticker_id: metadata.sticker_id.clone(),
                },
                None => MessageType::Text,
            },
            "newSponsorEvent" => MessageType::Membership {
                level: self
                    .new_sponsor_details
                    .as_ref()
                    .map(|d| d.member_level_name.clone())
                    .unwrap_or_else(|| "New Member".to_string()),
            },
            "membershipGiftingEvent" => MessageType::MembershipGift {
                count: self
                    .membership_gifting_details
                    .as_ref()
                    .map(|d| d.gift_memberships_count)
                    .unwrap_or(1),
            },
            _ => MessageType::Text,
        }
    }
}

impl LiveChatMessageItem {
    /// APIレスポンスの1件をChatMessageに変換
    ///
    /// publishedAtがパースできない場合はNoneを返す（呼び出し側でスキップする）
    pub fn into_chat_message(self) -> Option<ChatMessage> {
        let published_at = match DateTime::parse_from_rfc3339(&self.snippet.published_at) {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(e) => {
                log::warn!(
                    "Failed to parse publishedAt for message {}: {}. Skipping message.",
                    self.id,
                    e
                );
                return None;
            }
        };

        let message_type = self.snippet.parse_message_type();

        Some(ChatMessage {
            id: self.id,
            message: self.snippet.display_message,
            author_name: self.author_details.display_name,
            author_channel_id: self.author_details.channel_id,
            author_image_url: self.author_details.profile_image_url,
            published_at,
            is_owner: self.author_details.is_chat_owner,
            is_moderator: self.author_details.is_chat_moderator,
            is_member: self.author_details.is_chat_sponsor,
            is_verified: self.author_details.is_verified,
            message_type,
        })
    }
}
