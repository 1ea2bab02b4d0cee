use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use sift_core::wrappers;
use sift_core::{DocumentId, DocumentStatus, ExecutionPolicy, SearchServer};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: DocumentId,
    text: String,
    #[serde(default)]
    status: DocumentStatus,
    #[serde(default)]
    ratings: Vec<i32>,
}

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Load documents into an in-memory TF-IDF index and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct IndexArgs {
    /// Input path (JSON/JSONL file or a directory of them)
    #[arg(long, env = "SIFT_INPUT")]
    input: String,
    /// Space-separated stop words
    #[arg(long, env = "SIFT_STOP_WORDS", default_value = "")]
    stop_words: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the top documents for each query
    Search {
        #[command(flatten)]
        index: IndexArgs,
        /// Query text; may be repeated
        #[arg(long = "query", required = true, allow_hyphen_values = true)]
        queries: Vec<String>,
        /// Only rank documents with this status
        #[arg(long, default_value_t = DocumentStatus::Actual)]
        status: DocumentStatus,
        /// Rank on the rayon thread pool
        #[arg(long, default_value_t = false)]
        parallel: bool,
        /// Remove these document ids before querying
        #[arg(long = "remove")]
        remove: Vec<DocumentId>,
    },
    /// Match a query against every document
    Match {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long, allow_hyphen_values = true)]
        query: String,
    },
    /// Print the word frequencies of one document
    Words {
        #[command(flatten)]
        index: IndexArgs,
        #[arg(long)]
        id: DocumentId,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { index, queries, status, parallel, remove } => {
            let mut server = build_server(&index)?;
            let policy = if parallel { ExecutionPolicy::Parallel } else { ExecutionPolicy::Sequential };
            for document_id in remove {
                server.remove_document_with_policy(policy, document_id);
            }
            for query in &queries {
                println!("Search result for the query: {query}");
                for document in wrappers::find_top_documents(&server, policy, query, status) {
                    println!("{document}");
                }
            }
            Ok(())
        }
        Commands::Match { index, query } => {
            let server = build_server(&index)?;
            println!("Matching documents on query: {query}");
            for result in wrappers::match_documents(&server, &query) {
                println!("{result}");
            }
            Ok(())
        }
        Commands::Words { index, id } => {
            let server = build_server(&index)?;
            let freqs = server.get_word_frequencies(id);
            if freqs.is_empty() {
                tracing::warn!(document_id = id, "document has no indexed words");
            }
            for (word, freq) in freqs {
                println!("{word}\t{freq:.6}");
            }
            Ok(())
        }
    }
}

fn build_server(args: &IndexArgs) -> Result<SearchServer> {
    let mut server = SearchServer::new(&args.stop_words).context("invalid stop words")?;
    let docs = load_documents(Path::new(&args.input))?;
    let total = docs.len();
    let mut added = 0usize;
    for doc in docs {
        if wrappers::add_document(&mut server, doc.id, &doc.text, doc.status, &doc.ratings) {
            added += 1;
        }
    }
    tracing::info!(added, skipped = total - added, input = %args.input, "documents loaded");
    Ok(server)
}

fn load_documents(input_path: &Path) -> Result<Vec<InputDoc>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input_path.is_dir() {
        for entry in WalkDir::new(input_path).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input_path.is_file() {
        files.push(input_path.to_path_buf());
    } else {
        anyhow::bail!("input path {} does not exist", input_path.display());
    }

    let mut docs = Vec::new();
    for file in files {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
    }
    Ok(docs)
}

fn read_jsonl(file: &Path, docs: &mut Vec<InputDoc>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        match serde_json::from_str::<InputDoc>(&line) {
            Ok(doc) => docs.push(doc),
            Err(err) => tracing::warn!(file = %file.display(), line = line_no + 1, error = %err, "skipping malformed document"),
        }
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<InputDoc>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    let values = match json {
        serde_json::Value::Array(arr) => arr,
        serde_json::Value::Object(_) => vec![json],
        _ => Vec::new(),
    };
    for v in values {
        match serde_json::from_value::<InputDoc>(v) {
            Ok(doc) => docs.push(doc),
            Err(err) => tracing::warn!(file = %file.display(), error = %err, "skipping malformed document"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn loads_jsonl_json_and_directories() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.jsonl"),
            "{\"id\": 0, \"text\": \"white cat and fashionable collar\", \"ratings\": [8, -3]}\n\n\
             {\"id\": 1, \"text\": \"fluffy cat fluffy tail\", \"status\": \"banned\"}\n\
             not json\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.json"), r#"[{"id": 2, "text": "groomed dog"}]"#).unwrap();
        fs::write(dir.path().join("c.json"), r#"{"id": 3, "text": "parrot"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        let ids: Vec<DocumentId> = docs.iter().map(|d| d.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(docs[0].ratings, vec![8, -3]);
        assert_eq!(docs[1].status, DocumentStatus::Banned);
        assert_eq!(docs[2].status, DocumentStatus::Actual);
        assert!(docs[3].ratings.is_empty());
    }

    #[test]
    fn build_server_skips_invalid_documents() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("docs.jsonl");
        fs::write(
            &file,
            "{\"id\": 0, \"text\": \"cat\"}\n{\"id\": 0, \"text\": \"dog\"}\n{\"id\": -4, \"text\": \"bird\"}\n{\"id\": 5, \"text\": \"fish and chips\"}\n",
        )
        .unwrap();
        let args = IndexArgs { input: file.to_string_lossy().to_string(), stop_words: "and".into() };
        let server = build_server(&args).unwrap();
        assert_eq!(server.iter().collect::<Vec<_>>(), vec![0, 5]);
        assert_eq!(server.get_word_frequencies(5).len(), 2);
    }

    #[test]
    fn missing_input_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(load_documents(&dir.path().join("absent.jsonl")).is_err());
    }

    #[test]
    fn cli_parses_search_arguments() {
        let cli = Cli::try_parse_from([
            "sift", "search", "--input", "docs.jsonl", "--query", "-fluffy cat", "--query", "dog",
            "--status", "banned", "--parallel", "--remove", "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Search { queries, status, parallel, remove, .. } => {
                assert_eq!(queries, vec!["-fluffy cat", "dog"]);
                assert_eq!(status, DocumentStatus::Banned);
                assert!(parallel);
                assert_eq!(remove, vec![3]);
            }
            _ => panic!("expected search"),
        }
    }
}
