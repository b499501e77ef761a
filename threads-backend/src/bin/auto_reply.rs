use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;

use threads_backend::ai::OpenAIClient;
use threads_backend::auto_reply::{AutoReplier, DedupStrategy, PostReport, RunReport, ScanOptions};
use threads_backend::config::{OpenAiConfig, ThreadsConfig};
use threads_backend::errors::BotResult;
use threads_backend::pacing::Pacer;
use threads_backend::threads::{ThreadsClient, TwoStepPublisher};

#[derive(Debug, Parser)]
#[command(
    name = "auto_reply",
    about = "Answer commenters under your Threads posts in the persona's voice",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Process the replies under one post
    Post {
        #[arg(help = "Id of the post to process")]
        post_id: String,
        #[command(flatten)]
        scan: ScanArgs,
    },
    /// Process the replies under your most recent posts
    Posts {
        #[arg(short, long, default_value_t = 5, help = "Number of recent posts to process")]
        count: u32,
        #[command(flatten)]
        scan: ScanArgs,
    },
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(short = 'n', long = "num", help = "Answer at most this many replies per post")]
    max_replies: Option<usize>,

    #[arg(long, help = "Only answer replies from the last N days")]
    days: Option<u32>,

    #[arg(short, long, help = "Generate replies without sending them")]
    dry_run: bool,

    #[arg(short, long, overrides_with = "quiet", help = "Show dedup details (default)")]
    verbose: bool,

    #[arg(short, long, overrides_with = "verbose", help = "Hide dedup details")]
    quiet: bool,

    #[arg(
        long,
        help = "Treat a commenter as answered only when one of your replies targets them directly"
    )]
    strict_dedup: bool,
}

impl ScanArgs {
    fn options(&self) -> ScanOptions {
        ScanOptions {
            max_replies: self.max_replies,
            days: self.days,
            dry_run: self.dry_run,
            verbose: self.verbose || !self.quiet,
            dedup: if self.strict_dedup {
                DedupStrategy::DirectReplyTarget
            } else {
                DedupStrategy::AnyReplyInThread
            },
        }
    }
}

fn build_replier() -> BotResult<AutoReplier> {
    let threads_config = ThreadsConfig::from_env()?;
    let openai_config = OpenAiConfig::from_env()?;

    let threads = Arc::new(ThreadsClient::new(&threads_config));
    let completion = Arc::new(OpenAIClient::new(&openai_config)?);
    let pacer = Pacer::wall_clock();
    let publisher = TwoStepPublisher::new(threads.clone(), threads_config.readiness, pacer.clone());

    Ok(AutoReplier::new(threads, completion, publisher, pacer))
}

fn print_post_report(report: &PostReport) {
    println!(
        "Post {}: {} replies, {} mine, {} already answered, {} too old, {} pending",
        report.post_id,
        report.total_replies,
        report.my_replies,
        report.addressed,
        report.skipped_old,
        report.pending
    );
    println!(
        "  replied {}, drafted {}, failed {}{}",
        report.replied,
        report.drafted,
        report.failed,
        if report.cancelled { " (cancelled)" } else { "" }
    );
}

fn print_run_report(run: &RunReport) {
    for report in &run.posts {
        print_post_report(report);
    }
    for (post_id, reason) in &run.aborted_posts {
        println!("Post {}: skipped, {}", post_id, reason);
    }
    println!(
        "Total: {} replied, {} failed across {} posts{}",
        run.replied(),
        run.failed(),
        run.posts.len() + run.aborted_posts.len(),
        if run.cancelled { " (cancelled)" } else { "" }
    );
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let replier = match build_replier() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let token = replier.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("[AUTO_REPLY] Interrupted, stopping after the current step");
            token.cancel();
        }
    });

    let outcome = match cli.command {
        Command::Post { post_id, scan } => {
            let opts = scan.options();
            if opts.dry_run {
                println!("Dry run: nothing will be sent");
            }
            replier.reply_to_post(&post_id, &opts).await.map(|report| print_post_report(&report))
        }
        Command::Posts { count, scan } => {
            let opts = scan.options();
            if opts.dry_run {
                println!("Dry run: nothing will be sent");
            }
            replier
                .reply_to_recent_posts(count, &opts)
                .await
                .map(|run| print_run_report(&run))
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
