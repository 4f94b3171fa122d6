use super::Context;
use anyhow::{Result, bail};
use clap::Args;
use pagelink_core::backend::ImagePlacement;

#[derive(Args)]
pub struct DraftArgs {
    /// Prompt for post text
    #[arg(long)]
    pub prompt: Option<String>,

    /// Prompt for an image
    #[arg(long)]
    pub image_prompt: Option<String>,

    /// Generate the image in story format instead of feed format
    #[arg(long)]
    pub story: bool,
}

pub async fn run(ctx: &Context, args: DraftArgs) -> Result<()> {
    if args.prompt.is_none() && args.image_prompt.is_none() {
        bail!("Nothing to draft: pass --prompt and/or --image-prompt");
    }

    if let Some(prompt) = &args.prompt {
        let text = ctx.session.generate_text(prompt).await?;
        println!("{}", text);
    }
    if let Some(prompt) = &args.image_prompt {
        let placement = if args.story {
            ImagePlacement::Story
        } else {
            ImagePlacement::Feed
        };
        let image = ctx.session.generate_image(prompt, placement).await?;
        println!("Image: {} ({})", image.url, image.filename);
    }
    Ok(())
}
