use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use muse::Provider;
use muse::core::config;
use muse::core::ProviderClient;
use muse::inference::{
    CompletionOptions, ImageGeneration, ImageRequest, ImageResult, ImageSource,
    ImageUnderstanding, ProviderError,
};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};

#[derive(Parser)]
#[command(name = "muse", about = "Prompt OpenAI and Gemini from the terminal")]
struct Args {
    /// AI provider to use (overrides config and MUSE_PROVIDER)
    #[arg(short, long, value_enum)]
    provider: Option<Provider>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a prompt and print the reply
    Chat {
        prompt: String,
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        temperature: Option<f32>,
        #[arg(long)]
        max_tokens: Option<u32>,
    },
    /// Generate or describe images (OpenAI only)
    #[command(subcommand)]
    Image(ImageCommand),
}

#[derive(Subcommand)]
enum ImageCommand {
    /// Generate images from a prompt and print their URLs
    Generate {
        prompt: String,
        #[arg(short = 'n', long)]
        count: Option<u32>,
        /// Image size as WxH
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Describe an image from a URL or a local file
    Describe {
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        url: Option<String>,
        #[arg(long)]
        file: Option<PathBuf>,
        /// Question to ask about the image
        #[arg(short, long)]
        prompt: Option<String>,
        #[arg(long)]
        max_tokens: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    dotenv::dotenv().ok();

    // Initialize file logger - writes to muse.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();

    if let Ok(log_file) = File::create("muse.log") {
        let _ = WriteLogger::init(LevelFilter::Debug, log_config, log_file);
    }

    let file_config = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let resolved = match config::resolve(&file_config, args.provider) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    log::info!("Muse starting up with provider: {}", resolved.provider);

    let client = ProviderClient::from_config(&resolved);

    match run(&client, args.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err((message, e)) => {
            log::error!("{message}: {e}");
            eprintln!("{message}");
            eprintln!("  cause: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Executes one command. On failure returns a user-facing message plus the cause.
async fn run(client: &ProviderClient, command: Command) -> Result<(), (String, ProviderError)> {
    match command {
        Command::Chat {
            prompt,
            model,
            temperature,
            max_tokens,
        } => {
            let options = CompletionOptions {
                model,
                temperature,
                max_tokens,
            };
            let completion = client
                .request_completion(&prompt, &options)
                .await
                .map_err(|e| {
                    let message =
                        user_message(&e, "Sorry, I encountered an error processing your request.");
                    (message, e)
                })?;
            println!("{}", completion.text);
        }
        Command::Image(ImageCommand::Generate {
            prompt,
            count,
            size,
        }) => {
            let request = ImageRequest::Generation(ImageGeneration {
                prompt,
                count,
                size,
            });
            let result = client
                .request_image(&request)
                .await
                .map_err(|e| (user_message(&e, "Failed to generate image."), e))?;
            print_image_result(&result);
        }
        Command::Image(ImageCommand::Describe {
            url,
            file,
            prompt,
            max_tokens,
        }) => {
            let image = match (url, file) {
                (Some(url), _) => ImageSource::Url(url),
                (None, Some(path)) => ImageSource::from_path(path)
                    .map_err(|e| ("Could not load the image.".to_string(), e))?,
                (None, None) => {
                    let e = ProviderError::InvalidRequest("no image given".to_string());
                    return Err(("Please select an image to analyze.".to_string(), e));
                }
            };
            let request = ImageRequest::Understanding(ImageUnderstanding {
                image,
                prompt,
                max_tokens,
            });
            let result = client
                .request_image(&request)
                .await
                .map_err(|e| (user_message(&e, "Failed to analyze image."), e))?;
            print_image_result(&result);
        }
    }
    Ok(())
}

fn user_message(e: &ProviderError, action: &str) -> String {
    match e {
        ProviderError::CredentialMissing(provider) => format!(
            "{action} No API key set for {}. Add one to ~/.muse/config.toml or the environment.",
            provider.label()
        ),
        ProviderError::UnsupportedOperation { .. } => {
            format!("{action} This isn't available with the selected provider.")
        }
        ProviderError::InvalidRequest(_) | ProviderError::UnsupportedProvider(_) => {
            action.to_string()
        }
        ProviderError::Transport(_) => {
            format!("{action} Please check your API key and try again.")
        }
    }
}

fn print_image_result(result: &ImageResult) {
    log::info!("Image result from {}", result.provider());
    match result {
        ImageResult::Generated { images, .. } => {
            if images.is_empty() {
                println!("No image was generated");
            }
            for url in images {
                println!("{url}");
            }
        }
        ImageResult::Described { description, .. } => println!("{description}"),
    }
}
