//! Load a PDF page by page and split it into token windows.
//!
//! ```sh
//! RUST_LOG=tokslab=debug cargo run --example load_and_split --features pdf -- paper.pdf [password]
//! ```

use std::fs::File;

use tokslab::{ChunkConfig, DocumentLoader, PdfLoader, TokenSplitter, PAGE_KEY};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: load_and_split <file.pdf> [password]");
        std::process::exit(2);
    };

    let file = File::open(&path)?;
    let size = file.metadata()?.len();
    let mut loader = PdfLoader::new(file, size);
    if let Some(password) = args.next() {
        loader.set_password(password);
    }

    let config = ChunkConfig::new(256, 32).with_model("gpt-4");
    let splitter = TokenSplitter::new(config)?;
    let chunks = loader.load_and_split(&splitter)?;

    println!("{path}: {} chunks", chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        let page = chunk
            .metadata
            .get(PAGE_KEY)
            .map(ToString::to_string)
            .unwrap_or_default();
        let preview: String = chunk.content.chars().take(72).collect();
        println!("[{i:>4}] page {page:>3} | {}", preview.replace('\n', " "));
    }

    Ok(())
}
