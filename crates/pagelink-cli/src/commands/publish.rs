use super::Context;
use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use clap::Args;
use pagelink_core::publish::{ComposeMode, GeneratedDraft, ManualDraft, UploadSlot};
use pagelink_infrastructure::load_upload;
use std::path::PathBuf;

#[derive(Args)]
pub struct PublishArgs {
    /// Compose form to publish from: generated or manual
    #[arg(long, default_value = "manual")]
    pub mode: ComposeMode,

    /// Post text
    #[arg(long)]
    pub text: Option<String>,

    /// Let the backend write the text from this prompt (generated mode)
    #[arg(long)]
    pub prompt: Option<String>,

    /// Let the backend create an image from this prompt (generated mode)
    #[arg(long)]
    pub image_prompt: Option<String>,

    #[arg(long, conflicts_with = "video")]
    pub photo: Option<PathBuf>,

    #[arg(long)]
    pub video: Option<PathBuf>,

    /// External id of the target page
    #[arg(long)]
    pub page: Option<String>,

    /// Publish later, at this RFC 3339 timestamp
    #[arg(long, value_parser = parse_schedule)]
    pub schedule: Option<DateTime<Utc>>,
}

fn parse_schedule(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

async fn read_upload(args: &PublishArgs) -> Result<UploadSlot> {
    if let Some(path) = &args.photo {
        let slot = load_upload(path).await?;
        if !matches!(slot, UploadSlot::Photo(_)) {
            bail!("{} is not an image", path.display());
        }
        return Ok(slot);
    }
    if let Some(path) = &args.video {
        let slot = load_upload(path).await?;
        if !matches!(slot, UploadSlot::Video(_)) {
            bail!("{} is not a video", path.display());
        }
        return Ok(slot);
    }
    Ok(UploadSlot::Empty)
}

pub async fn run(ctx: &Context, args: PublishArgs) -> Result<()> {
    let page = ctx.restore_selected(args.page.as_deref()).await?;
    let upload = read_upload(&args).await?;

    ctx.session.compose().update_forms(|forms| match args.mode {
        ComposeMode::Generated => {
            forms.generated = GeneratedDraft {
                content: args.text.clone(),
                content_prompt: args.prompt.clone(),
                image_prompt: args.image_prompt.clone(),
                upload,
                ..Default::default()
            }
        }
        ComposeMode::Manual => {
            forms.manual = ManualDraft {
                text: args.text.clone().unwrap_or_default(),
                upload,
            }
        }
    });

    let receipt = ctx.session.publish(args.mode, args.schedule).await?;
    match receipt.scheduled {
        Some(scheduled) => println!(
            "Scheduled post {} on {} for {}",
            receipt.post.id,
            page.name,
            scheduled.scheduled_for.to_rfc3339()
        ),
        None => println!(
            "Published post {} to {} ({})",
            receipt.post.id,
            page.name,
            receipt.post.status.as_deref().unwrap_or("accepted")
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_is_normalized_to_utc() {
        let at = parse_schedule("2026-11-01T09:30:00-05:00").unwrap();
        assert_eq!(at.to_rfc3339(), "2026-11-01T14:30:00+00:00");
    }

    #[test]
    fn test_schedule_rejects_plain_dates() {
        assert!(parse_schedule("2026-11-01").is_err());
    }
}
