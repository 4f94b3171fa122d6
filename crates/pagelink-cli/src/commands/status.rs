use super::{Context, print_pages};
use anyhow::Result;

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.session.mount().await?;
    let state = ctx.session.snapshot();
    println!("{}", state.status_message);
    print_pages(&state);
    Ok(())
}
