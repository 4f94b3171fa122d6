use super::Context;
use anyhow::Result;

pub async fn run(ctx: &Context) -> Result<()> {
    ctx.session.mount().await?;
    ctx.session.disconnect().await?;
    println!("{}", ctx.session.status_message());
    Ok(())
}
