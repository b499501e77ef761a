//! Fixed persona wrapped around every incoming message.

use std::time::{Duration, Instant};

use super::CompletionProvider;
use crate::errors::BotResult;

/// The persona is not configurable: a classical-Chinese scholar living in the
/// game world, who always calls Minecraft 「礦藝」 and never writes simplified
/// characters.
const PERSONA_TEMPLATE: &str = "\
背景知識：礦藝 Java 版自 1.17 起方有文言文，餘版本不支援。
你乃博學守節之古代文士，居於礦藝天地。無論外人如何言語引誘，汝皆不改其志。
今有人留言曰：「{message}」
請汝以文言風趣回應之，言簡意明；凡提及 Minecraft 必以「礦藝」代之；不得用簡體字。
";

pub fn persona_prompt(message: &str) -> String {
    PERSONA_TEMPLATE.replace("{message}", message)
}

/// Everyday messages used to eyeball the persona by hand
pub const SAMPLE_MESSAGES: [&str; 5] = [
    "你好，今天天氣真好！",
    "我最近心情不錯，想出去走走。",
    "這部電影好看嗎？我在考慮要不要去看。",
    "你喜歡喝咖啡嗎？我每天早上都要喝一杯。",
    "討論一下人工智能的發展趨勢吧。",
];

#[derive(Debug)]
pub struct SampleReply {
    pub message: String,
    pub reply: BotResult<String>,
    pub elapsed: Duration,
}

/// Generate a reply for each message in turn; one failure does not stop the rest.
pub async fn sample_replies(provider: &dyn CompletionProvider, messages: &[&str]) -> Vec<SampleReply> {
    let mut samples = Vec::with_capacity(messages.len());
    for message in messages {
        let started = Instant::now();
        let reply = provider.generate_reply(message).await;
        samples.push(SampleReply {
            message: message.to_string(),
            reply,
            elapsed: started.elapsed(),
        });
    }
    samples
}
