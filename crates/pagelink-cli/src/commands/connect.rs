use super::{Context, print_pages};
use anyhow::Result;

pub async fn run(ctx: &Context, page: Option<&str>) -> Result<()> {
    let report = ctx.session.connect().await?;
    println!("{}", ctx.session.status_message());

    if !report.ambiguous.is_empty() {
        println!(
            "Linked to several backend accounts, left unresolved: {}",
            report.ambiguous.join(", ")
        );
    }
    if !report.is_complete() {
        println!("Waiting for the backend to link the remaining pages...");
        ctx.settle().await;
    }
    if let Some(page) = page {
        ctx.session.select_page(page).await?;
    }

    print_pages(&ctx.session.snapshot());
    Ok(())
}
