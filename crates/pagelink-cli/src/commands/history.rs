use super::Context;
use anyhow::Result;
use pagelink_core::post::{PostRecord, PostStatus};
use pagelink_core::publish::ComposeMode;

const PREVIEW_CHARS: usize = 60;

pub async fn run(ctx: &Context, page: Option<&str>) -> Result<()> {
    let page = ctx.restore_selected(page).await?;
    let state = ctx.session.snapshot();
    let history = &state.history;

    println!("{} ({} post(s))", page.name, history.total);
    if !page.is_reconciled() {
        println!("{}", state.status_message);
        return Ok(());
    }
    if history.degraded {
        println!("No post could be classified; both lists show the same recent posts.");
    }

    for mode in [ComposeMode::Generated, ComposeMode::Manual] {
        println!();
        println!("{}:", mode);
        let bucket = history.bucket(mode);
        if bucket.is_empty() {
            println!("  (none)");
        }
        for post in bucket {
            println!("  {}", describe(post));
        }
    }
    Ok(())
}

fn describe(post: &PostRecord) -> String {
    let when = post
        .effective_timestamp
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "undated".to_string());
    let mut preview: String = post.content.chars().take(PREVIEW_CHARS).collect();
    if post.content.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }
    format!("{} [{}] {}", when, status_label(&post.status), preview)
}

fn status_label(status: &PostStatus) -> &str {
    match status {
        PostStatus::Published => "published",
        PostStatus::Scheduled => "scheduled",
        PostStatus::Pending => "pending",
        PostStatus::Draft => "draft",
        PostStatus::Failed => "failed",
        PostStatus::Other(raw) => raw,
    }
}
