use gitbrain_core::model::Message;
use gitbrain_migrate::{MigrationReport, MigrationResult};

use super::OutputFormat;

pub fn format_message_list(messages: &[Message], fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(messages).unwrap_or_default(),
        OutputFormat::Text => format_message_list_text(messages),
    }
}

fn format_message_list_text(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "No messages.".to_string();
    }

    let mut out = String::new();
    for m in messages {
        let id = m.id().to_string();
        let short_id = &id[..8.min(id.len())];
        let kind = m
            .kind()
            .map(|k| k.to_string())
            .unwrap_or_else(|| "?".to_string());
        let time = m.timestamp().format("%Y-%m-%d %H:%M:%S");
        out.push_str(&format!(
            "\u{25c6} {short_id} {kind:<9} from {} [p{}]  {time}\n",
            m.from(),
            m.priority().level()
        ));
        if let Some(line) = headline(m) {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out
}

/// The most descriptive text field of a message, if any.
fn headline(message: &Message) -> Option<&str> {
    ["title", "subject", "feedback", "justification", "status"]
        .into_iter()
        .find_map(|field| message.content().get(field).and_then(|v| v.as_str()))
}

pub fn format_migration_result(result: &MigrationResult, what: &str, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
        OutputFormat::Text => {
            let mut out = format!(
                "{what}: {} migrated, {} failed in {:.2}s\n",
                result.items_migrated,
                result.items_failed,
                result.duration.as_secs_f64()
            );
            for failure in &result.errors {
                out.push_str(&format!(
                    "  ! {} ({}, {} retries): {}\n",
                    failure.item, failure.phase, failure.retry_count, failure.error
                ));
            }
            out
        }
    }
}

pub fn format_report(report: &MigrationReport, fmt: OutputFormat) -> String {
    match fmt {
        OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
        OutputFormat::Text => report.to_string(),
    }
}
