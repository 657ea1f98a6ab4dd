//! `backlog generate`: one full session from prompt to commit.

use crate::app::AppContext;
use anyhow::{Context, Result, bail};
use backlog_application::dto::{
    CancelRequest, StartGenerationRequest, SubmitPromptRequest, SubmitReviewRequest,
    SubmitReviewResponse,
};
use backlog_application::{AuditDispatcher, GenerationUseCase};
use backlog_core::audit::Actor;
use backlog_core::generation::{GenerationCandidate, ReviewDecision};
use backlog_core::hierarchy::ItemKind;
use backlog_interaction::OpenAiContentGenerator;
use clap::Args;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};

#[derive(Args)]
pub struct GenerateArgs {
    #[arg(long)]
    pub parent_type: ItemKind,
    #[arg(long)]
    pub parent_id: String,
    /// Kind of item to generate; must be the parent's direct child kind
    #[arg(long)]
    pub target: ItemKind,
    #[arg(short = 'n', long, default_value_t = 3)]
    pub quantity: u32,
    /// Extra guidance passed to the generator
    #[arg(long)]
    pub context: Option<String>,
    /// 1-based candidate numbers to keep; the rest are discarded
    #[arg(long, value_delimiter = ',', conflicts_with_all = ["keep_all", "discard_all"])]
    pub keep: Vec<usize>,
    #[arg(long, conflicts_with = "discard_all")]
    pub keep_all: bool,
    #[arg(long)]
    pub discard_all: bool,
    /// Owner the session is tracked under
    #[arg(long, default_value = "cli")]
    pub owner: String,
    #[arg(long, env = "USER", default_value = "cli-user")]
    pub user: String,
    #[arg(long, default_value = "cli")]
    pub page_source: String,
    /// Print the commit result as JSON
    #[arg(long)]
    pub json: bool,
}

impl GenerateArgs {
    fn has_selection(&self) -> bool {
        !self.keep.is_empty() || self.keep_all || self.discard_all
    }
}

enum Answer {
    Keep,
    Discard,
    Edit,
    Quit,
}

pub async fn run(app: &AppContext, args: GenerateArgs) -> Result<()> {
    let config = app.config()?;
    let repository = app.repository().await?;
    let generator = OpenAiContentGenerator::try_from_settings(&config.generator)
        .context("Failed to configure the content generator")?;
    let (audit, drain) =
        AuditDispatcher::spawn(app.audit_sink(&config)?, config.audit.channel_capacity);
    let usecase = GenerationUseCase::new(repository, Arc::new(generator), audit, &config);

    let result = drive_session(&usecase, &args).await;

    // Closing the last sender lets the drain task flush and exit.
    drop(usecase);
    if let Err(e) = drain.await {
        tracing::warn!("[generate] Audit drain task failed: {}", e);
    }

    if let Some(response) = result? {
        report(&response, args.json)?;
    }
    Ok(())
}

/// Returns `None` when the session was cancelled.
async fn drive_session(
    usecase: &GenerationUseCase,
    args: &GenerateArgs,
) -> Result<Option<SubmitReviewResponse>> {
    let actor = Actor::new(args.user.clone());
    let owner = args.owner.as_str();

    let session_id = usecase
        .start_session(
            owner,
            &actor,
            StartGenerationRequest {
                parent_type: args.parent_type,
                parent_id: args.parent_id.clone(),
                target_type: args.target,
                page_source: args.page_source.clone(),
            },
        )
        .await?
        .session_id;
    eprintln!("Session {} started", session_id);

    let prompt = SubmitPromptRequest {
        session_id: session_id.clone(),
        quantity: args.quantity,
        additional_context: args.context.clone(),
    };
    let generated = tokio::select! {
        result = usecase.submit_prompt(owner, &actor, prompt) => result?,
        _ = tokio::signal::ctrl_c() => {
            let response = usecase
                .cancel(owner, &actor, CancelRequest { session_id: session_id.clone() })
                .await?;
            if response.pending {
                eprintln!("Cancel requested; waiting for the generator to return");
            } else {
                eprintln!("Session {}", response.status);
            }
            return Ok(None);
        }
    };

    if let Some(usage) = generated.metadata.token_usage {
        eprintln!(
            "Generated {} candidate(s) in {}ms ({} tokens)",
            generated.candidates.len(),
            generated.metadata.elapsed_ms,
            usage.total_tokens
        );
    }
    for (index, candidate) in generated.candidates.iter().enumerate() {
        print_candidate(index + 1, candidate);
    }

    let decisions = if args.has_selection() {
        decisions_from_selection(&generated.candidates, args)?
    } else {
        match review_interactively(&generated.candidates).await? {
            Some(decisions) => decisions,
            None => {
                let response = usecase
                    .cancel(owner, &actor, CancelRequest { session_id })
                    .await?;
                eprintln!("Session {}", response.status);
                return Ok(None);
            }
        }
    };

    let response = usecase
        .submit_review(
            owner,
            &actor,
            SubmitReviewRequest {
                session_id,
                decisions,
            },
        )
        .await?;
    Ok(Some(response))
}

fn decisions_from_selection(
    candidates: &[GenerationCandidate],
    args: &GenerateArgs,
) -> Result<Vec<ReviewDecision>> {
    if let Some(out_of_range) = args
        .keep
        .iter()
        .find(|n| **n == 0 || **n > candidates.len())
    {
        bail!(
            "--keep {} is out of range (1..={})",
            out_of_range,
            candidates.len()
        );
    }

    Ok(candidates
        .iter()
        .enumerate()
        .map(|(index, candidate)| {
            let kept = args.keep_all || args.keep.contains(&(index + 1));
            if kept {
                ReviewDecision::kept(candidate.candidate_id.clone())
            } else {
                ReviewDecision::discarded(candidate.candidate_id.clone())
            }
        })
        .collect())
}

/// Asks about each candidate on stdin. `None` means the user quit.
async fn review_interactively(
    candidates: &[GenerationCandidate],
) -> Result<Option<Vec<ReviewDecision>>> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut decisions = Vec::with_capacity(candidates.len());

    for (index, candidate) in candidates.iter().enumerate() {
        let decision = loop {
            let line = ask(
                &mut lines,
                &format!("#{} [k]eep / [d]iscard / [e]dit title / [q]uit: ", index + 1),
            )
            .await?;
            match parse_answer(&line) {
                Some(Answer::Keep) => break ReviewDecision::kept(candidate.candidate_id.clone()),
                Some(Answer::Discard) => {
                    break ReviewDecision::discarded(candidate.candidate_id.clone());
                }
                Some(Answer::Edit) => {
                    let title = ask(&mut lines, "New title: ").await?;
                    if title.trim().is_empty() {
                        eprintln!("Title cannot be empty");
                        continue;
                    }
                    let mut edited = candidate.clone();
                    edited.title = title.trim().to_string();
                    break ReviewDecision::kept_with_edit(candidate.candidate_id.clone(), edited);
                }
                Some(Answer::Quit) => return Ok(None),
                None => eprintln!("Please answer k, d, e or q"),
            }
        };
        decisions.push(decision);
    }

    Ok(Some(decisions))
}

async fn ask(lines: &mut Lines<BufReader<Stdin>>, prompt: &str) -> Result<String> {
    let mut stderr = tokio::io::stderr();
    stderr.write_all(prompt.as_bytes()).await?;
    stderr.flush().await?;
    match lines.next_line().await? {
        Some(line) => Ok(line),
        None => bail!("stdin closed before the review was finished"),
    }
}

fn parse_answer(line: &str) -> Option<Answer> {
    match line.trim().to_lowercase().as_str() {
        "k" | "keep" | "y" | "yes" => Some(Answer::Keep),
        "d" | "discard" | "n" | "no" => Some(Answer::Discard),
        "e" | "edit" => Some(Answer::Edit),
        "q" | "quit" => Some(Answer::Quit),
        _ => None,
    }
}

fn print_candidate(number: usize, candidate: &GenerationCandidate) {
    println!("\n#{} {} [{:?}]", number, candidate.title, candidate.priority);
    if !candidate.description.is_empty() {
        println!("   {}", candidate.description);
    }
    for criterion in &candidate.acceptance_criteria {
        println!("   - {}", criterion);
    }
    if let Some(points) = candidate.story_points {
        println!("   story points: {}", points);
    }
    if let Some(effort) = &candidate.estimated_effort {
        println!("   estimated effort: {}", effort);
    }
}

fn report(response: &SubmitReviewResponse, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!(
        "\nSaved {} item(s), {} failed ({:?})",
        response.success_count, response.error_count, response.outcome
    );
    for item in &response.persisted_items {
        match &item.item_id {
            Some(id) if item.is_success() => println!("  saved   {} {}", id, item.title),
            _ => println!("  failed  {}", item.title),
        }
    }
    Ok(())
}
