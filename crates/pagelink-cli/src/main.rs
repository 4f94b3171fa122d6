use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "pagelink")]
#[command(about = "PAGELINK - connect social pages, keep them linked to the backend and publish to them", long_about = None)]
struct Cli {
    /// Directory holding config.toml and secret.json
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the backend connection status and linked pages
    Status,
    /// Log in to the platform and link the managed pages
    Connect {
        /// External id of the page to select afterwards
        #[arg(long)]
        page: Option<String>,
    },
    /// Publish (or schedule) a post on a linked page
    Publish(commands::publish::PublishArgs),
    /// Draft post text or an image with the backend
    Draft(commands::draft::DraftArgs),
    /// Show the post history of a page
    History {
        #[arg(long)]
        page: Option<String>,
    },
    /// Show or toggle the message auto-reply rule of a page
    AutoReply {
        #[arg(long)]
        page: Option<String>,
        #[arg(long)]
        toggle: bool,
    },
    /// Unlink the platform account and log out
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.json);

    let ctx = commands::Context::open(cli.config_dir.as_deref()).await?;

    let result = match cli.command {
        Commands::Status => commands::status::run(&ctx).await,
        Commands::Connect { page } => commands::connect::run(&ctx, page.as_deref()).await,
        Commands::Publish(args) => commands::publish::run(&ctx, args).await,
        Commands::Draft(args) => commands::draft::run(&ctx, args).await,
        Commands::History { page } => commands::history::run(&ctx, page.as_deref()).await,
        Commands::AutoReply { page, toggle } => {
            commands::auto_reply::run(&ctx, page.as_deref(), toggle).await
        }
        Commands::Disconnect => commands::disconnect::run(&ctx).await,
    };

    ctx.close().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagelink_core::publish::ComposeMode;

    #[test]
    fn test_publish_arguments() {
        let cli = Cli::try_parse_from([
            "pagelink",
            "publish",
            "--mode",
            "generated",
            "--prompt",
            "weekend special",
            "--schedule",
            "2026-11-01T09:00:00+01:00",
            "--page",
            "p1",
        ])
        .unwrap();

        let Commands::Publish(args) = cli.command else {
            panic!("expected publish");
        };
        assert_eq!(args.mode, ComposeMode::Generated);
        assert_eq!(args.page.as_deref(), Some("p1"));
        assert_eq!(
            args.schedule.map(|at| at.to_rfc3339()).as_deref(),
            Some("2026-11-01T08:00:00+00:00")
        );
    }

    #[test]
    fn test_photo_and_video_conflict() {
        let parsed = Cli::try_parse_from([
            "pagelink", "publish", "--photo", "a.jpg", "--video", "b.mp4",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["pagelink", "status", "--verbose", "--json"]).unwrap();
        assert!(cli.verbose);
        assert!(cli.json);
    }
}
