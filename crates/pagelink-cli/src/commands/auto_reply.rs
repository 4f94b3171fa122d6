use super::Context;
use anyhow::Result;
use pagelink_core::automation::AutomationRule;

pub async fn run(ctx: &Context, page: Option<&str>, toggle: bool) -> Result<()> {
    let page = ctx.restore_selected(page).await?;

    if toggle {
        ctx.session.toggle_message_auto_reply().await?;
        println!("{}", ctx.session.status_message());
        return Ok(());
    }

    let state = ctx.session.snapshot();
    println!("{}", page.name);
    println!("  comments: {}", describe(state.automation.comment_reply.as_ref()));
    println!("  messages: {}", describe(state.automation.message_reply.as_ref()));
    if !state.automation.toggle_enabled {
        println!("  (message auto-reply cannot be toggled for this page)");
    }
    Ok(())
}

fn describe(rule: Option<&AutomationRule>) -> String {
    match rule {
        Some(rule) => format!(
            "{} - \"{}\"",
            if rule.is_active { "on" } else { "off" },
            rule.template
        ),
        None => "no rule".to_string(),
    }
}
