// src/main.rs

use std::error::Error as _;

use makedag::{cli, logging, run};

#[tokio::main]
async fn main() {
    if let Err(err) = run_main().await {
        let mut last = err.to_string();
        eprintln!("makedag error: {last}");
        let mut source = err.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !last.contains(&text) {
                eprintln!("  caused by: {text}");
            }
            last = text;
            source = cause.source();
        }
        std::process::exit(1);
    }
}

async fn run_main() -> makedag::errors::Result<()> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
