//! Terminal fill loop
//!
//! Renders a session on a [`Console`] and feeds the respondent's lines back
//! into it. Chat mode prints the transcript; wizard mode prints one step
//! card per field and understands `:back`; single-page mode asks every
//! field, then re-asks only the ones that failed validation. In every mode
//! `:ajuda <pergunta>` talks to the form's help chat when it is enabled.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use tokio::io::{AsyncBufRead, AsyncWrite};

use chatflow_core::presentation::{question_text, COMPLETED_MESSAGE, COMPLETED_TITLE};
use chatflow_core::{
    Ack, ChatTranscript, Completion, FillMode, FillSession, FormCustomization, FormSource,
    HelpChat, InputKind, Phase, ResponseSink, Sender, SinglePageForm, StepView, Transition,
    UuidIds,
};

use crate::console::Console;

/// Command that steps back one field in wizard mode
pub const BACK_COMMAND: &str = ":back";

/// Command that sends the rest of the line to the help chat
pub const HELP_COMMAND: &str = ":ajuda";

/// Map a typed answer onto a choice option
///
/// Accepts the 1-based option number or the option text (case-insensitive).
pub fn resolve_choice(options: &[String], input: &str) -> Option<String> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).cloned();
    }
    let wanted = input.to_lowercase();
    options.iter().find(|o| o.to_lowercase() == wanted).cloned()
}

fn closed_input() -> anyhow::Error {
    anyhow!("Input closed before the form was finished")
}

/// Answer `line` through the help chat if it is a help command
///
/// Returns `false` when the line is an ordinary answer.
async fn answer_help<R, W>(
    console: &mut Console<R, W>,
    help: &mut Option<HelpChat>,
    line: &str,
) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let Some(question) = line.trim().strip_prefix(HELP_COMMAND) else {
        return Ok(false);
    };
    let question = match question.trim() {
        "" => "ajuda",
        q => q,
    };

    match help.as_mut().and_then(|chat| chat.ask(question)) {
        Some(reply) => {
            let text = format!("💬 {}", reply.content);
            console.say(&text).await?;
        }
        None => console.say("Chat de ajuda desativado para este formulário").await?,
    }
    Ok(true)
}

/// Run a chat or wizard session until every field is answered
pub async fn run_steps<R, W, S>(
    console: &mut Console<R, W>,
    session: &mut FillSession<S>,
    help: &mut Option<HelpChat>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: ResponseSink + ?Sized,
{
    let chat = session.state().mode() == FillMode::Chat;
    let mut transcript = ChatTranscript::new(session.title(), Arc::new(UuidIds));
    let mut printed = 0;

    if !chat {
        console.say(&format!("== {} ==", session.title())).await?;
    }

    let started = session.start();
    transcript.observe(&started, session.state());

    while let Phase::Active(_) = session.phase() {
        let Some(view) = StepView::from_state(session.state()) else {
            break;
        };

        if chat {
            for message in &transcript.messages()[printed..] {
                if message.sender == Sender::Bot {
                    console.say(&format!("🤖 {}", message.content)).await?;
                }
            }
            printed = transcript.messages().len();
        } else {
            render_step(console, &view).await?;
        }
        if let InputKind::Choice(options) = &view.input {
            for (i, option) in options.iter().enumerate() {
                console.say(&format!("  {}. {option}", i + 1)).await?;
            }
        }

        let Some(line) = console.ask(">").await? else {
            return Err(closed_input());
        };
        if answer_help(console, help, &line).await? {
            continue;
        }

        let transition = if line.trim() == BACK_COMMAND && view.can_retreat {
            session.retreat()
        } else if line.is_empty() && !view.draft.is_empty() && view.error.is_none() {
            // Enter keeps the answer restored by `:back`
            session.submit_current(None)
        } else if let InputKind::Choice(options) = &view.input {
            match resolve_choice(options, &line) {
                Some(choice) => session.submit_current(Some(&choice)),
                None if line.trim().is_empty() => session.submit_current(Some("")),
                None => {
                    console.say("⚠ Escolha uma das opções").await?;
                    continue;
                }
            }
        } else {
            session.record_draft(line);
            session.submit_current(None)
        };

        match &transition {
            Transition::Rejected { error, .. } => console.say(&format!("⚠ {error}")).await?,
            Transition::Ignored(reason) => tracing::debug!(%reason, "Input ignored"),
            _ => {}
        }
        transcript.observe(&transition, session.state());
    }

    if chat {
        for message in &transcript.messages()[printed..] {
            if message.sender == Sender::Bot {
                console.say(&format!("🤖 {}", message.content)).await?;
            }
        }
    }
    Ok(())
}

async fn render_step<R, W>(console: &mut Console<R, W>, view: &StepView) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let percent = (view.progress * 100.0).round();
    console.say("").await?;
    console.say(&format!("{} ({percent}%)", view.header())).await?;
    console.say(&view.question).await?;
    if let Some(placeholder) = &view.placeholder {
        console.say(&format!("  ex.: {placeholder}")).await?;
    }
    if let Some(counter) = &view.char_counter {
        console.say(&format!("  {counter}")).await?;
    }
    if !view.draft.is_empty() {
        console.say(&format!("  atual: {}", view.draft)).await?;
    }
    if view.can_retreat {
        console.say(&format!("  ({BACK_COMMAND} para voltar)")).await?;
    }
    Ok(())
}

/// Ask every field of a single-page form until it validates
///
/// Returns a session over the validated answers, ready for delivery.
pub async fn run_single_page<R, W, S>(
    console: &mut Console<R, W>,
    form_id: &str,
    source: &FormSource,
    sink: Arc<S>,
    help: &mut Option<HelpChat>,
) -> Result<FillSession<S>>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: ResponseSink + ?Sized,
{
    let mut form = SinglePageForm::new(&source.fields);
    console.say(&format!("== {} ==", source.title)).await?;

    let mut pending: Vec<String> = form.fields().iter().map(|f| f.id.clone()).collect();
    loop {
        for field_id in &pending {
            let Some(field) = form.fields().iter().find(|f| &f.id == field_id).cloned() else {
                continue;
            };
            if let Some(error) = form.error(field_id) {
                console.say(&format!("⚠ {error}")).await?;
            }
            let question = question_text(&field);
            if !field.options.is_empty() {
                console.say(&question).await?;
                for (i, option) in field.options.iter().enumerate() {
                    console.say(&format!("  {}. {option}", i + 1)).await?;
                }
            }
            let prompt = if field.options.is_empty() {
                format!("{question}:")
            } else {
                ">".to_string()
            };

            let line = loop {
                let line = console.ask(&prompt).await?.ok_or_else(closed_input)?;
                if !answer_help(console, help, &line).await? {
                    break line;
                }
            };
            let value = if field.options.is_empty() {
                line
            } else {
                resolve_choice(&field.options, &line).unwrap_or_default()
            };
            form.set_value(field_id, value);
        }

        let failing = match form.submit() {
            Ok(_) => break,
            Err(errors) => errors.clone(),
        };
        console
            .say(&format!("{} campo(s) com erro, corrija abaixo", failing.len()))
            .await?;
        pending = form
            .fields()
            .iter()
            .filter(|f| failing.contains_key(&f.id))
            .map(|f| f.id.clone())
            .collect();
    }

    Ok(FillSession::from_state(
        form_id,
        source.title.clone(),
        form.into_state(),
        sink,
    ))
}

/// Deliver the answers, offering a retry after recoverable failures
pub async fn deliver<R, W, S>(
    console: &mut Console<R, W>,
    session: &mut FillSession<S>,
) -> Result<Ack>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: ResponseSink + ?Sized,
{
    loop {
        match session.complete().await {
            Ok(Completion::Submitted(ack) | Completion::AlreadySubmitted(ack)) => {
                console.say("").await?;
                console.say(&format!("✅ {COMPLETED_TITLE}")).await?;
                console.say(COMPLETED_MESSAGE).await?;
                return Ok(ack);
            }
            Ok(Completion::NotReady(reason)) => bail!("Form not finished: {reason}"),
            Err(e) if e.is_retryable() => {
                console.say(&format!("❌ Falha ao enviar: {e}")).await?;
                let answer = console.ask("Tentar novamente? [S/n]").await?;
                let retry = answer.is_some_and(|a| {
                    let a = a.trim().to_lowercase();
                    a.is_empty() || a == "s" || a == "sim" || a == "y" || a == "yes"
                });
                if !retry {
                    bail!("Submission abandoned after {} attempt(s): {e}", session.attempts());
                }
            }
            Err(e) => return Err(e.into()),
        }
    }
}

/// Build a session for `mode`, run it, and deliver the answers
pub async fn fill<R, W, S>(
    console: &mut Console<R, W>,
    form_id: &str,
    source: &FormSource,
    customization: &FormCustomization,
    mode: FillMode,
    sink: Arc<S>,
    submit_timeout: Duration,
) -> Result<Ack>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: ResponseSink + ?Sized,
{
    let mut help = HelpChat::new(&source.title, customization, Arc::new(UuidIds));
    if help.is_some() {
        console
            .say(&format!("(dúvidas? digite {HELP_COMMAND} <pergunta>)"))
            .await?;
    }

    let session = match mode {
        FillMode::SinglePage => {
            run_single_page(console, form_id, source, sink, &mut help).await?
        }
        FillMode::Chat | FillMode::Wizard => {
            let mut session = FillSession::new(form_id, source, mode, sink);
            run_steps(console, &mut session, &mut help).await?;
            session
        }
    };
    let mut session = session.with_submit_timeout(submit_timeout);

    tracing::info!(session_id = %session.id(), form_id, %mode, "All fields answered");
    deliver(console, &mut session).await
}
