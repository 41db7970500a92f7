use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use umbra::graph::{ConfigError, GraphConfig};
use umbra::ollama::OllamaClientBuilder;
use umbra::pipeline::spawn_visualization;
use umbra::utils::{get_database_path, open_database};
use umbra::{
    Database, EnrichmentOutcome, ListNotesOptions, Note, NoteCategory, NoteEnricher, NoteId,
    NoteKind, NoteService, RenderedGraph,
};

/// umbra - notes laid out as a knowledge graph
#[derive(Parser)]
#[command(name = "umbra")]
#[command(about = "Capture notes, enrich them with AI, and explore them as a similarity graph")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Add a new note
    Add(AddCommand),
    /// List notes, newest first
    List(ListCommand),
    /// Show a single note
    Show(ShowCommand),
    /// Enrich notes with a summary, tags and an embedding
    Enrich(EnrichCommand),
    /// Delete every note
    Clear(ClearCommand),
    /// Build and lay out the similarity graph of enriched notes
    Graph(GraphCommand),
}

/// Note category accepted on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Text,
    Voice,
    Image,
}

impl From<KindArg> for NoteCategory {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Text => NoteCategory::Text,
            KindArg::Voice => NoteCategory::Voice,
            KindArg::Image => NoteCategory::Image,
        }
    }
}

/// Add a new note
#[derive(Parser)]
struct AddCommand {
    /// The content of the note (the transcript for voice notes)
    #[arg(value_name = "CONTENT", default_value = "")]
    content: String,

    /// Title of the note
    #[arg(short, long)]
    title: Option<String>,

    /// Note category
    #[arg(short, long, value_enum, default_value = "text")]
    kind: KindArg,

    /// Audio or image file for voice and image notes
    #[arg(short, long, value_name = "PATH")]
    media: Option<PathBuf>,
}

/// List notes
#[derive(Parser)]
struct ListCommand {
    /// Maximum number of notes to show
    #[arg(short, long)]
    limit: Option<usize>,

    /// Only show notes of this category
    #[arg(short, long, value_enum)]
    kind: Option<KindArg>,
}

/// Show a single note
#[derive(Parser)]
struct ShowCommand {
    /// Note ID
    id: String,

    /// Print the note as JSON
    #[arg(long)]
    json: bool,
}

/// Enrich notes
#[derive(Parser)]
struct EnrichCommand {
    /// Note ID; all unprocessed notes when omitted
    id: Option<String>,

    /// Re-enrich notes that were already processed
    #[arg(long)]
    all: bool,
}

/// Delete every note
#[derive(Parser)]
struct ClearCommand {
    /// Confirm deletion
    #[arg(long)]
    yes: bool,
}

/// Build the similarity graph
#[derive(Parser)]
struct GraphCommand {
    /// Minimum cosine similarity for an edge (exclusive)
    #[arg(long)]
    threshold: Option<f64>,

    /// Number of simulation steps
    #[arg(long)]
    ticks: Option<usize>,

    /// Canvas width; the layout is centred on the canvas
    #[arg(long, default_value_t = 800.0)]
    width: f64,

    /// Canvas height
    #[arg(long, default_value_t = 600.0)]
    height: f64,

    /// Seed for initial positions, for reproducible layouts
    #[arg(long)]
    seed: Option<u64>,

    /// Print the graph as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    // .env is optional
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Add(cmd) => handle_add(cmd),
        Commands::List(cmd) => open_service().and_then(|s| execute_list(cmd, &s)),
        Commands::Show(cmd) => open_service().and_then(|s| execute_show(cmd, &s)),
        Commands::Enrich(cmd) => handle_enrich(cmd),
        Commands::Clear(cmd) => handle_clear(cmd),
        Commands::Graph(cmd) => open_service().and_then(|s| execute_graph(cmd, &s)),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include validation failures like empty content, unknown ids
/// and invalid graph settings. Internal errors include database failures and
/// I/O errors.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        if cause.is::<ConfigError>() {
            return true;
        }
        let msg = cause.to_string();
        msg.contains("cannot be empty") || msg.contains("does not exist") || msg.contains("--yes")
    })
}

fn open_service() -> Result<NoteService> {
    let db_path = get_database_path()?;
    Ok(NoteService::new(open_database(&db_path)?))
}

/// Handles the add command by creating a new note.
fn handle_add(cmd: &AddCommand) -> Result<()> {
    // Validate before touching the database
    if cmd.content.trim().is_empty() && cmd.media.is_none() {
        anyhow::bail!("Note content cannot be empty");
    }

    let db_path = get_database_path()?;
    execute_add(cmd, open_database(&db_path)?)
}

/// Executes the add command logic with a provided database.
///
/// Separated from `handle_add` to allow testing with in-memory databases.
fn execute_add(cmd: &AddCommand, db: Database) -> Result<()> {
    let service = NoteService::new(db);
    let kind = NoteKind::with_media(cmd.kind.into(), cmd.media.clone());

    let note = service
        .create_note(cmd.title.as_deref(), &cmd.content, kind)
        .context("Failed to create note")?;

    println!("Note created (id: {})", note.id());
    Ok(())
}

fn execute_list(cmd: &ListCommand, service: &NoteService) -> Result<()> {
    let notes = service.list_notes(ListNotesOptions {
        limit: cmd.limit,
        category: cmd.kind.map(NoteCategory::from),
        ..Default::default()
    })?;

    if notes.is_empty() {
        println!("No notes found.");
        return Ok(());
    }

    for note in &notes {
        println!("{}", format_note_line(note));
    }
    Ok(())
}

/// One-line summary used by `list`.
fn format_note_line(note: &Note) -> String {
    let status = match (note.enrichment(), note.embedding()) {
        (Some(_), Some(_)) => "enriched",
        (Some(_), None) => "enriched, no embedding",
        (None, _) => "pending",
    };
    format!(
        "{}  [{}] {} ({})",
        note.id(),
        note.category(),
        note.title(),
        status
    )
}

fn execute_show(cmd: &ShowCommand, service: &NoteService) -> Result<()> {
    let id = NoteId::new(cmd.id.as_str());
    let note = service
        .get_note(&id)?
        .with_context(|| format!("Note with id {} does not exist", id))?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&note)?);
        return Ok(());
    }

    println!("{} [{}]", note.title(), note.category());
    println!("id: {}", note.id());
    if let Some(path) = note.kind().media_path() {
        println!("media: {}", path.display());
    }
    if !note.content().is_empty() {
        println!("\n{}", note.content());
    }
    if let Some(enrichment) = note.enrichment() {
        println!("\nsummary: {}", enrichment.summary);
        if !enrichment.tags.is_empty() {
            println!("tags: {}", enrichment.tags.join(", "));
        }
        if let Some(transcription) = &enrichment.transcription {
            println!("transcription: {transcription}");
        }
    }
    if let Some(embedding) = note.embedding() {
        println!("embedding: {} dimensions", embedding.dimension());
    }
    Ok(())
}

fn handle_enrich(cmd: &EnrichCommand) -> Result<()> {
    let service = open_service()?;
    let client = OllamaClientBuilder::new()
        .build()
        .context("Failed to configure AI client")?;
    let model = client.model().to_string();
    let embed_model = client.embed_model().to_string();
    let enricher = NoteEnricher::new(Arc::new(client), model, embed_model);
    execute_enrich(cmd, &service, &enricher)
}

/// Enriches the selected notes and stores every successful result.
///
/// Failures are reported per note and do not stop the batch.
fn execute_enrich(
    cmd: &EnrichCommand,
    service: &NoteService,
    enricher: &NoteEnricher,
) -> Result<()> {
    let notes = match &cmd.id {
        Some(id) => {
            let id = NoteId::new(id.as_str());
            let note = service
                .get_note(&id)?
                .with_context(|| format!("Note with id {} does not exist", id))?;
            vec![note]
        }
        None => service
            .list_notes(ListNotesOptions::default())?
            .into_iter()
            .filter(|note| cmd.all || note.enrichment().is_none())
            .collect(),
    };

    if notes.is_empty() {
        println!("Nothing to enrich.");
        return Ok(());
    }

    let mut enriched = 0;
    for note in &notes {
        match enricher.enrich(note) {
            EnrichmentOutcome::Enriched {
                enrichment,
                embedding,
            } => {
                service.apply_enrichment(note.id(), &enrichment, embedding.as_ref())?;
                enriched += 1;
                println!("{}: {}", note.id(), enrichment.summary);
            }
            EnrichmentOutcome::Failed { reason } => {
                eprintln!("{}: enrichment failed: {}", note.id(), reason);
            }
        }
    }

    info!(enriched, total = notes.len(), "enrichment finished");
    println!("Enriched {} of {} notes", enriched, notes.len());
    Ok(())
}

fn handle_clear(cmd: &ClearCommand) -> Result<()> {
    if !cmd.yes {
        anyhow::bail!("Refusing to delete all notes without --yes");
    }
    let removed = open_service()?.clear_notes()?;
    println!("Deleted {removed} notes");
    Ok(())
}

/// Resolves graph settings: environment first, then command-line flags.
fn graph_config(cmd: &GraphCommand) -> Result<GraphConfig, ConfigError> {
    let mut config = GraphConfig::from_env();
    if let Some(threshold) = cmd.threshold {
        config.threshold = threshold;
    }
    if let Some(ticks) = cmd.ticks {
        config.layout.ticks = ticks;
    }
    if cmd.seed.is_some() {
        config.seed = cmd.seed;
    }
    config.layout = config.layout.for_canvas(cmd.width, cmd.height);
    config.validate()?;
    Ok(config)
}

fn execute_graph(cmd: &GraphCommand, service: &NoteService) -> Result<()> {
    let config = graph_config(cmd)?;
    let notes = service.notes_with_embeddings()?;

    let graph = spawn_visualization(notes, config)?.wait()?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        print!("{}", format_graph(&graph));
    }
    Ok(())
}

/// Plain-text rendering of a laid-out graph.
fn format_graph(graph: &RenderedGraph) -> String {
    if graph.is_empty() {
        return "No processed notes found. Enrich some notes first.\n".to_string();
    }

    let mut out = format!(
        "{} nodes, {} edges\n",
        graph.nodes.len(),
        graph.edges.len()
    );
    for node in &graph.nodes {
        out.push_str(&format!(
            "  {:>8.1} {:>8.1}  [{}] {}\n",
            node.x, node.y, node.category, node.label
        ));
    }
    for edge in &graph.edges {
        out.push_str(&format!(
            "  {} -- {}  ({:.3})\n",
            edge.source.label, edge.target.label, edge.weight
        ));
    }
    out
}
