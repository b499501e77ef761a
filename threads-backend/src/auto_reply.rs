//! Batch auto-reply: scan the reply list of one or more of the caller's posts
//! and answer every commenter not yet addressed.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::ai::CompletionProvider;
use crate::config::defaults;
use crate::errors::{BotError, BotResult};
use crate::pacing::Pacer;
use crate::threads::types::{format_timestamp, NO_TEXT};
use crate::threads::{Reply, ThreadsReader, TwoStepPublisher, DEFAULT_REPLIES_LIMIT};

/// How a commenter is judged "already addressed"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupStrategy {
    /// Once the caller has replied anywhere in the thread, every other
    /// commenter counts as addressed.
    #[default]
    AnyReplyInThread,
    /// A commenter counts as addressed only when one of the caller's replies
    /// was made directly to one of that commenter's replies.
    DirectReplyTarget,
}

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub max_replies: Option<usize>,
    pub days: Option<u32>,
    pub dry_run: bool,
    pub verbose: bool,
    pub dedup: DedupStrategy,
}

/// Pauses between outbound replies and between posts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacing {
    pub between_replies: Duration,
    pub between_posts: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            between_replies: Duration::from_secs(defaults::REPLY_PACING_SECS),
            between_posts: Duration::from_secs(defaults::POST_PACING_SECS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommenterSummary {
    pub username: String,
    pub name: String,
    pub text: String,
    pub timestamp: String,
}

/// Replies split by author
#[derive(Debug, Default)]
pub struct ReplyPartition<'a> {
    pub my_replies: Vec<&'a Reply>,
    /// author id → latest summary, for every author including the caller
    pub commenters: HashMap<String, CommenterSummary>,
}

pub fn partition_replies<'a>(replies: &'a [Reply], self_id: &str) -> ReplyPartition<'a> {
    let mut partition = ReplyPartition::default();
    for reply in replies {
        let Some(author_id) = reply.author_id() else {
            continue;
        };
        partition.commenters.insert(
            author_id.to_string(),
            CommenterSummary {
                username: reply.username().to_string(),
                name: reply.display_name().to_string(),
                text: reply.text_or_placeholder().to_string(),
                timestamp: reply.timestamp.clone().unwrap_or_default(),
            },
        );
        if author_id == self_id {
            partition.my_replies.push(reply);
        }
    }
    partition
}

/// Author ids judged already addressed. Never contains `self_id`.
pub fn addressed_commenters(
    partition: &ReplyPartition<'_>,
    replies: &[Reply],
    self_id: &str,
    strategy: DedupStrategy,
) -> HashSet<String> {
    if partition.my_replies.is_empty() {
        return HashSet::new();
    }

    match strategy {
        DedupStrategy::AnyReplyInThread => partition
            .commenters
            .keys()
            .filter(|id| id.as_str() != self_id)
            .cloned()
            .collect(),
        DedupStrategy::DirectReplyTarget => {
            let targets: HashSet<&str> = partition
                .my_replies
                .iter()
                .filter_map(|r| r.replied_to.as_ref().map(|t| t.id.as_str()))
                .collect();
            replies
                .iter()
                .filter(|r| targets.contains(r.id.as_str()))
                .filter_map(|r| r.author_id())
                .filter(|id| *id != self_id)
                .map(str::to_string)
                .collect()
        }
    }
}

/// One reply the batch run will answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub reply_id: String,
    pub user_id: Option<String>,
    pub username: String,
    pub name: String,
    pub text: String,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingSelection {
    pub pending: Vec<PendingReply>,
    pub skipped_old: usize,
    /// Number of candidates before truncation, when truncation happened
    pub truncated_from: Option<usize>,
}

/// Replies to answer, in original list order. Applies the recency window
/// (unparseable timestamps are kept) and then the count limit.
pub fn select_pending(
    replies: &[Reply],
    self_id: &str,
    addressed: &HashSet<String>,
    now: DateTime<Utc>,
    days: Option<u32>,
    max_replies: Option<usize>,
) -> PendingSelection {
    let date_limit = days.map(|d| now - chrono::Duration::days(i64::from(d)));
    let mut selection = PendingSelection::default();

    for reply in replies {
        let user_id = reply.author_id();
        if user_id == Some(self_id) || user_id.map_or(false, |id| addressed.contains(id)) {
            continue;
        }

        if let (Some(limit), Some(at)) = (date_limit, reply.parsed_timestamp()) {
            if at < limit {
                selection.skipped_old += 1;
                continue;
            }
        }

        selection.pending.push(PendingReply {
            reply_id: reply.id.clone(),
            user_id: user_id.map(str::to_string),
            username: reply.username().to_string(),
            name: reply.display_name().to_string(),
            text: reply.text_or_placeholder().to_string(),
            timestamp: reply.timestamp.clone(),
        });
    }

    if let Some(max) = max_replies {
        if selection.pending.len() > max {
            selection.truncated_from = Some(selection.pending.len());
            selection.pending.truncate(max);
        }
    }
    selection
}

/// Outcome of one post
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostReport {
    pub post_id: String,
    pub total_replies: usize,
    pub my_replies: usize,
    pub addressed: usize,
    pub skipped_old: usize,
    pub pending: usize,
    pub replied: usize,
    /// Generated but not sent (dry run)
    pub drafted: usize,
    pub failed: usize,
    pub cancelled: bool,
}

/// Outcome of a multi-post run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub posts: Vec<PostReport>,
    /// Posts whose reads failed, with the reason
    pub aborted_posts: Vec<(String, String)>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn replied(&self) -> usize {
        self.posts.iter().map(|p| p.replied).sum()
    }

    pub fn failed(&self) -> usize {
        self.posts.iter().map(|p| p.failed).sum()
    }
}

/// Drives completion and publishing over the pending replies of posts.
pub struct AutoReplier {
    reader: Arc<dyn ThreadsReader>,
    completion: Arc<dyn CompletionProvider>,
    publisher: TwoStepPublisher,
    pacer: Pacer,
    pacing: Pacing,
}

impl AutoReplier {
    pub fn new(
        reader: Arc<dyn ThreadsReader>,
        completion: Arc<dyn CompletionProvider>,
        publisher: TwoStepPublisher,
        pacer: Pacer,
    ) -> Self {
        Self {
            reader,
            completion,
            publisher,
            pacer,
            pacing: Pacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Cancelling this token stops the run at the next boundary.
    pub fn cancel_token(&self) -> CancellationToken {
        self.pacer.cancel_token()
    }

    /// Answer pending commenters under one post. Read failures abort the post.
    pub async fn reply_to_post(&self, post_id: &str, opts: &ScanOptions) -> BotResult<PostReport> {
        log::info!("[AUTO_REPLY] Processing post {}", post_id);
        let mut report = PostReport {
            post_id: post_id.to_string(),
            ..Default::default()
        };

        let self_id = self.reader.get_self_id().await.map_err(|e| {
            log::error!("[AUTO_REPLY] Cannot resolve own account id: {}", e);
            BotError::AccountNotFound
        })?;

        let post = self.reader.get_post_details(post_id).await.map_err(|e| {
            log::error!("[AUTO_REPLY] Failed to fetch post {}: {}", post_id, e);
            e
        })?;
        log::info!("[AUTO_REPLY] Post text: {}", post.text.as_deref().unwrap_or(NO_TEXT));

        let replies = self
            .reader
            .list_replies(post_id, DEFAULT_REPLIES_LIMIT)
            .await
            .map_err(|e| {
                log::error!("[AUTO_REPLY] Failed to fetch replies of {}: {}", post_id, e);
                e
            })?
            .data;

        report.total_replies = replies.len();
        if replies.is_empty() {
            log::info!("[AUTO_REPLY] Post {} has no replies", post_id);
            return Ok(report);
        }
        log::info!("[AUTO_REPLY] Found {} replies", replies.len());

        let partition = partition_replies(&replies, &self_id);
        let addressed = addressed_commenters(&partition, &replies, &self_id, opts.dedup);
        report.my_replies = partition.my_replies.len();
        report.addressed = addressed.len();

        if opts.verbose {
            for (idx, mine) in partition.my_replies.iter().enumerate() {
                log::info!(
                    "[AUTO_REPLY] Own reply {}: {} ({})",
                    idx + 1,
                    preview(mine.text_or_placeholder(), 50),
                    format_timestamp(mine.timestamp.as_deref().unwrap_or_default())
                );
            }
            for user_id in &addressed {
                if let Some(c) = partition.commenters.get(user_id) {
                    log::info!("[AUTO_REPLY] Treated as answered: {} (@{})", c.name, c.username);
                }
            }
        }
        log::info!("[AUTO_REPLY] {} commenters already answered", addressed.len());

        let selection = select_pending(
            &replies,
            &self_id,
            &addressed,
            self.pacer.now(),
            opts.days,
            opts.max_replies,
        );
        report.skipped_old = selection.skipped_old;
        report.pending = selection.pending.len();
        if let Some(total) = selection.truncated_from {
            log::warn!(
                "[AUTO_REPLY] {} replies qualify, answering only the first {}",
                total,
                selection.pending.len()
            );
        }
        log::info!("[AUTO_REPLY] {} replies need an answer", selection.pending.len());

        let total = selection.pending.len();
        for (idx, pending) in selection.pending.iter().enumerate() {
            if self.pacer.checkpoint().is_err() {
                report.cancelled = true;
                break;
            }

            log::info!(
                "[AUTO_REPLY] ({}/{}) {} (@{}) at {}: {}",
                idx + 1,
                total,
                pending.name,
                pending.username,
                format_timestamp(pending.timestamp.as_deref().unwrap_or_default()),
                pending.text
            );

            let reply_text = match self.completion.generate_reply(&pending.text).await {
                Ok(text) => text,
                Err(e) => {
                    log::error!("[AUTO_REPLY] Generation failed for {}: {}", pending.reply_id, e);
                    report.failed += 1;
                    continue;
                }
            };
            log::info!("[AUTO_REPLY] Generated reply: {}", reply_text);

            if opts.dry_run {
                log::info!("[AUTO_REPLY] Dry run: reply not sent");
                report.drafted += 1;
                continue;
            }

            match self
                .publisher
                .reply_two_step(&self_id, &pending.reply_id, &reply_text)
                .await
            {
                Ok(published) => {
                    log::info!("[AUTO_REPLY] Reply sent as {}", published.id);
                    report.replied += 1;
                }
                Err(e) if e.is_cancelled() => {
                    report.failed += 1;
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    log::error!("[AUTO_REPLY] Sending reply to {} failed: {}", pending.reply_id, e);
                    report.failed += 1;
                }
            }

            if idx + 1 < total {
                log::info!(
                    "[AUTO_REPLY] Waiting {}s before the next reply",
                    self.pacing.between_replies.as_secs()
                );
                if self.pacer.pause(self.pacing.between_replies).await.is_err() {
                    report.cancelled = true;
                    break;
                }
            }
        }

        log::info!(
            "[AUTO_REPLY] Post {} done: {} replied, {} drafted, {} failed",
            post_id,
            report.replied,
            report.drafted,
            report.failed
        );
        Ok(report)
    }

    /// Answer pending commenters under the caller's `count` most recent posts.
    /// A post whose reads fail is recorded and skipped.
    pub async fn reply_to_recent_posts(&self, count: u32, opts: &ScanOptions) -> BotResult<RunReport> {
        log::info!("[AUTO_REPLY] Fetching the {} most recent posts", count);
        let posts = self.reader.list_recent_posts(count).await?.data;
        let mut run = RunReport::default();

        if posts.is_empty() {
            log::info!("[AUTO_REPLY] No posts found");
            return Ok(run);
        }
        log::info!("[AUTO_REPLY] Found {} posts", posts.len());

        let total = posts.len();
        for (idx, post) in posts.iter().enumerate() {
            if self.pacer.checkpoint().is_err() {
                run.cancelled = true;
                break;
            }

            log::info!(
                "[AUTO_REPLY] ==== Post {}/{}: {} ({}) {}",
                idx + 1,
                total,
                post.id,
                format_timestamp(post.timestamp.as_deref().unwrap_or_default()),
                post.text.as_deref().unwrap_or(NO_TEXT)
            );

            match self.reply_to_post(&post.id, opts).await {
                Ok(report) => {
                    let cancelled = report.cancelled;
                    run.posts.push(report);
                    if cancelled {
                        run.cancelled = true;
                        break;
                    }
                }
                Err(e) => {
                    log::error!("[AUTO_REPLY] Skipping post {}: {}", post.id, e);
                    run.aborted_posts.push((post.id.clone(), e.to_string()));
                }
            }

            if idx + 1 < total && !opts.dry_run {
                log::info!(
                    "[AUTO_REPLY] Waiting {}s before the next post",
                    self.pacing.between_posts.as_secs()
                );
                if self.pacer.pause(self.pacing.between_posts).await.is_err() {
                    run.cancelled = true;
                    break;
                }
            }
        }

        Ok(run)
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    if text.chars().count() > max_chars {
        out.push_str("...");
    }
    out
}
