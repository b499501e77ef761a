use clap::Parser;
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};

use threads_backend::ai::{sample_replies, OpenAIClient, SampleReply, SAMPLE_MESSAGES};
use threads_backend::config::OpenAiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "test_persona",
    about = "Try the persona completion directly, without the server",
    version
)]
struct Cli {
    #[arg(long, help = "Skip the built-in sample messages")]
    no_samples: bool,

    #[arg(long, help = "Exit after the samples instead of prompting for input")]
    no_interactive: bool,
}

fn print_sample(sample: &SampleReply) {
    println!("Message: {}", sample.message);
    match &sample.reply {
        Ok(reply) => println!("Reply:   {}", reply),
        Err(e) => eprintln!("Error:   {}", e),
    }
    println!("Took {:.2}s", sample.elapsed.as_secs_f64());
    println!("------------------------------");
}

async fn interactive(client: &OpenAIClient) {
    println!("\nType a message to rewrite in the persona's voice ('exit' or 'quit' to stop)");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        println!("\nMessage:");
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                println!("\nInterrupted");
                break;
            }
        };
        let input = match line {
            Ok(Some(input)) => input,
            Ok(None) => break,
            Err(e) => {
                eprintln!("Failed to read input: {}", e);
                break;
            }
        };

        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            break;
        }
        if trimmed.is_empty() {
            println!("Please enter a message");
            continue;
        }

        let samples = sample_replies(client, &[input.as_str()]).await;
        for sample in &samples {
            print_sample(sample);
            if sample.reply.is_err() {
                println!("Check that the API key is valid and has quota left");
            }
        }
    }
    println!("Done");
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    let client = match OpenAiConfig::from_env().and_then(|config| OpenAIClient::new(&config)) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!("Set OPENAI_API_KEY in the environment or in .env");
            std::process::exit(1);
        }
    };

    if !cli.no_samples {
        println!("==== Persona sample run: {} messages ====", SAMPLE_MESSAGES.len());
        for sample in sample_replies(&client, &SAMPLE_MESSAGES).await {
            print_sample(&sample);
        }
    }

    if !cli.no_interactive {
        interactive(&client).await;
    }
}
