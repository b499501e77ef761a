use clap::{Parser, Subcommand};
use dotenv::dotenv;

use threads_backend::config::ThreadsConfig;
use threads_backend::errors::BotResult;
use threads_backend::threads::types::{format_timestamp, NO_TEXT};
use threads_backend::threads::{Post, ThreadsClient, ThreadsReader};

#[derive(Debug, Parser)]
#[command(name = "list_posts", about = "List and inspect your Threads posts", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List your most recent posts
    List {
        #[arg(short, long, default_value_t = 10, help = "Number of posts to show")]
        count: u32,
        #[arg(short, long, help = "Print the raw JSON")]
        json: bool,
    },
    /// Show one post
    Show {
        post_id: String,
        #[arg(short, long, help = "Print the raw JSON")]
        json: bool,
    },
}

fn print_post(post: &Post) {
    println!("ID: {}", post.id);
    println!("Time: {}", format_timestamp(post.timestamp.as_deref().unwrap_or_default()));
    println!("Text: {}", post.text.as_deref().unwrap_or(NO_TEXT));
    println!("Media type: {}", post.media_type_label());
    if let Some(link) = &post.permalink {
        println!("Link: {}", link);
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
}

async fn run(command: Command) -> BotResult<()> {
    let client = ThreadsClient::new(&ThreadsConfig::from_env()?);

    match command {
        Command::List { count, json } => {
            println!("Fetching the {} most recent posts...\n", count);
            let page = client.list_recent_posts(count).await?;
            if json {
                println!("{}", to_pretty_json(&page));
                return Ok(());
            }
            if page.data.is_empty() {
                println!("No posts found");
                return Ok(());
            }
            println!("Found {} posts:\n", page.data.len());
            for (idx, post) in page.data.iter().enumerate() {
                println!("---- Post {} ----", idx + 1);
                print_post(post);
                println!();
            }
        }
        Command::Show { post_id, json } => {
            println!("Fetching post {}...\n", post_id);
            let post = client.get_post_details(&post_id).await?;
            if json {
                println!("{}", to_pretty_json(&post));
            } else {
                println!("---- Post details ----");
                print_post(&post);
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    if let Err(e) = run(cli.command).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
