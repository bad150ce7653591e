//! Conversation commands: list, show, delete.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;
use uuid::Uuid;

use grandma_types::chat::MessageRole;

use crate::state::AppState;

pub async fn list_conversations(state: &AppState, page: u32, page_size: u32, json: bool) -> Result<()> {
    let page = state.conversation_service.list(page, page_size).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    if page.conversations.is_empty() {
        println!();
        println!(
            "  {} No conversations yet. Start one with: {}",
            style("i").blue().bold(),
            style("grandma chat \"hello\"").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Title").fg(Color::White),
        Cell::new("ID").fg(Color::White),
        Cell::new("Last Active").fg(Color::White),
    ]);

    for conversation in &page.conversations {
        table.add_row(vec![
            Cell::new(&conversation.title).fg(Color::Cyan),
            Cell::new(conversation.id.to_string()).fg(Color::DarkGrey),
            Cell::new(format_relative_time(&conversation.updated_at)).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!(
        "  {} of {} conversation(s), page {}",
        style(page.conversations.len()).bold(),
        page.total,
        page.page
    );
    println!();
    Ok(())
}

pub async fn show_conversation(state: &AppState, id: &Uuid, json: bool) -> Result<()> {
    let detail = state.conversation_service.get_detail(id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
        return Ok(());
    }

    println!();
    println!("  {}", style(&detail.conversation.title).cyan().bold());
    println!(
        "  {}",
        style(format!(
            "{} · created {}",
            detail.conversation.id,
            detail.conversation.created_at.format("%Y-%m-%d %H:%M")
        ))
        .dim()
    );

    for document in &detail.documents {
        println!();
        let speaker = match document.role {
            MessageRole::User => style("you").green().bold(),
            MessageRole::Assistant => style(document.model.as_str()).magenta().bold(),
            MessageRole::System => style("system").dim(),
        };
        println!("  {speaker}");
        for line in document.content.lines() {
            println!("    {line}");
        }
    }
    println!();
    Ok(())
}

pub async fn delete_conversation(state: &AppState, id: &Uuid, force: bool, json: bool) -> Result<()> {
    let detail = state.conversation_service.get_detail(id).await?;

    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete '{}' and its {} message(s)?",
                style(&detail.conversation.title).red().bold(),
                detail.documents.len()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    let removed = state.conversation_service.delete(id).await?;

    if json {
        println!(
            "{}",
            serde_json::json!({"deleted": true, "id": id, "documents_deleted": removed})
        );
    } else {
        println!(
            "  {} Conversation '{}' deleted.",
            style("✓").red().bold(),
            detail.conversation.title
        );
    }
    Ok(())
}

fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let diff = chrono::Utc::now() - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    #[test]
    fn test_format_relative_time() {
        assert_eq!(format_relative_time(&Utc::now()), "just now");
        assert_eq!(format_relative_time(&(Utc::now() - Duration::minutes(5))), "5m ago");
        assert_eq!(format_relative_time(&(Utc::now() - Duration::hours(3))), "3h ago");
        assert_eq!(format_relative_time(&(Utc::now() - Duration::days(2))), "2d ago");
        let old = Utc::now() - Duration::days(90);
        assert_eq!(format_relative_time(&old), old.format("%Y-%m-%d").to_string());
    }
}
