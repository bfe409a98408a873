use std::sync::Arc;

use clap::Parser;
use projectqa::{
    BertEmbedder,
    Document,
    Responder,
    T5Generator,
    cli::{AskArgs, Cli, Command, DocumentsArgs, ServeArgs},
    config::Settings,
    document,
    error::{self, Error},
    records::{self, ProjectRecord},
    server,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if let Ok(env) = std::env::var("PROJECTQA_LOG") {
        EnvFilter::new(env)
    } else if quiet {
        EnvFilter::new("warn")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn main() -> error::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Command::Serve(args) => cmd_serve(&args)?,
        Command::Ask(args) => cmd_ask(&args)?,
        Command::Documents(args) => cmd_documents(&args)?,
    }

    Ok(())
}

/// Load records and both models, then index the records. Any failure here
/// is fatal: the service never starts half-initialized.
fn build_responder(settings: &Settings) -> error::Result<Responder> {
    let records = records::load(settings.records.as_deref())?;
    tracing::info!(records = records.len(), "loaded project records");

    let embedder = BertEmbedder::load(&settings.embedding_model)?;
    let generator = T5Generator::load(
        &settings.generation_model,
        settings.decoding.clone(),
    )?;

    let responder = Responder::build(
        records,
        Box::new(embedder),
        Box::new(generator),
        settings.responder.clone(),
    )?;
    tracing::info!(
        documents = responder.document_count(),
        embedding_model = responder.embedding_model(),
        generation_model = responder.generation_model(),
        "index ready"
    );
    Ok(responder)
}

fn cmd_serve(args: &ServeArgs) -> error::Result<()> {
    let settings = args.model.settings()?;
    let server_settings = args.server_settings();

    let responder = Arc::new(build_responder(&settings)?);
    let router = server::create_router(responder, &server_settings.cors)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(router, server_settings.bind))
}

fn cmd_ask(args: &AskArgs) -> error::Result<()> {
    if args.question.trim().is_empty() {
        return Err(Error::EmptyQuestion);
    }

    let settings = args.model.settings()?;
    let responder = build_responder(&settings)?;
    let answer = responder.respond(&args.question)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&answer)?);
        return Ok(());
    }

    println!("{}", answer.answer.trim());
    if !answer.sources.is_empty() {
        println!("\nSources:");
        for source in &answer.sources {
            println!("---");
            println!("{source}");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct DocumentEntry<'a> {
    id: String,
    project_name: &'a str,
    at_risk: Option<bool>,
    body: &'a str,
}

fn cmd_documents(args: &DocumentsArgs) -> error::Result<()> {
    let records = records::load(args.records.as_deref())?;
    let documents = document::project_all(&records);

    let entries: Vec<DocumentEntry<'_>> = records
        .iter()
        .zip(&documents)
        .map(|(record, doc)| entry(record, doc))
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    for (i, e) in entries.iter().enumerate() {
        if i > 0 {
            println!();
        }
        let risk = match e.at_risk {
            Some(true) => "at risk",
            Some(false) => "on track",
            None => "unknown",
        };
        println!("--- {} {} ({risk}) ---", e.id, e.project_name);
        println!("{}", e.body);
    }
    Ok(())
}

fn entry<'a>(record: &ProjectRecord, doc: &'a Document) -> DocumentEntry<'a> {
    DocumentEntry {
        id: doc.id().to_string(),
        project_name: &doc.project_name,
        at_risk: record.is_at_risk(),
        body: &doc.body,
    }
}
