//! Terminal REPL that drives one conversation locally.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::classifier::IntentClassifier;
use crate::conversation::{RecruiterAssistant, Templates, flag_label};

/// First name used when none is entered.
pub const DEFAULT_CLI_NAME: &str = "John";

const RULE: &str = "============================================================";

/// Run a chat session over `input`/`output` until the dialogue completes,
/// the user quits, or input ends. Returns the assistant for inspection.
pub async fn run_chat<R, W>(
    input: R,
    mut output: W,
    classifier: Arc<dyn IntentClassifier>,
    templates: Arc<Templates>,
) -> std::io::Result<RecruiterAssistant>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();

    write_out(&mut output, &format!("{RULE}\n🤖 Recruiter Assistant CLI\n{RULE}\n")).await?;
    write_out(&mut output, "\nEnter your first name: ").await?;
    let first_name = lines
        .next_line()
        .await?
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .unwrap_or_else(|| DEFAULT_CLI_NAME.to_string());

    let mut assistant = RecruiterAssistant::new(first_name, classifier, templates);
    assistant.start();
    write_out(&mut output, &format!("\n🤖 AI: {}\n", assistant.last_message())).await?;

    while !assistant.is_completed() {
        write_out(&mut output, "\n👤 You: ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        if line.is_empty() {
            write_out(&mut output, "⚠️  Please provide a response.\n").await?;
            continue;
        }
        if matches!(line.to_lowercase().as_str(), "quit" | "exit" | "bye") {
            write_out(&mut output, "\n👋 Goodbye!\n").await?;
            break;
        }

        for message in assistant.process_user_input(line).await {
            write_out(&mut output, &format!("\n🤖 AI: {message}\n")).await?;
        }
    }

    write_out(&mut output, &summary(&assistant)).await?;
    output.flush().await?;
    Ok(assistant)
}

async fn write_out<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> std::io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

fn summary(assistant: &RecruiterAssistant) -> String {
    let data = assistant.collected_data();
    let a = &data.answers;
    let text = |v: &Option<String>| v.clone().unwrap_or_else(|| "Not answered".to_string());
    let heading = if assistant.is_completed() {
        "✅ CONVERSATION COMPLETED"
    } else {
        "⏸  CONVERSATION ENDED"
    };

    let mut out = format!("\n{RULE}\n{heading}\n{RULE}\n");
    out.push_str("\n📊 Collected Information:\n");
    out.push_str(&format!("  👤 Name: {}\n", data.first_name));
    out.push_str(&format!("  📅 Meeting Booked: {}\n", flag_label(data.meeting_booked)));
    out.push_str(&format!("  ✓ Permission Given: {}\n", flag_label(data.permission_given)));

    out.push_str("\n  🌍 Location:\n");
    out.push_str(&format!("     - In Morocco: {}\n", flag_label(a.in_morocco)));
    if let Some(city) = &a.current_city {
        out.push_str(&format!("     - Current City: {city}\n"));
    }
    if let Some(plan) = &a.plan_to_move {
        out.push_str(&format!("     - Plan to Move: {plan}\n"));
    }
    out.push_str(&format!("     - Preferred Cities: {}\n", text(&a.preferred_cities)));

    out.push_str("\n  💼 Experience:\n");
    out.push_str(&format!(
        "     - Has Call Center Experience: {}\n",
        flag_label(a.has_call_center_experience)
    ));
    if let Some(details) = &a.experience_details {
        out.push_str(&format!("     - Experience Details: {details}\n"));
    }
    if let Some(why) = &a.why_call_center {
        out.push_str(&format!("     - Why Call Center: {why}\n"));
    }

    out.push_str("\n  💰 Compensation:\n");
    out.push_str(&format!("     - Salary Expectation: {}\n", text(&a.salary_expectation)));
    out.push_str("\n  📋 Other:\n");
    out.push_str(&format!(
        "     - Previous Applications: {}\n",
        text(&a.previous_applications)
    ));

    out.push_str("\n📝 Conversation Log:\n");
    for entry in assistant.state().log() {
        out.push_str(&format!("  - {entry}\n"));
    }
    out.push_str(&format!("\n{RULE}\n"));
    out
}
