use cnab::{
    file_to_transactions, group_by_store, report,
    store::aggregator::find_store,
    submission::{validate_batch, SubmissionRequest},
    upload::{self, UploadPolicy},
    Transaction,
};

use anyhow::{anyhow, Context};
use log::{error, info};
use std::env;
use std::io::stdout;
use tokio::sync::mpsc;

#[derive(Debug, PartialEq)]
enum View {
    Items,
    Stores,
    Detail(String),
    Json,
    Check,
}

#[derive(Debug)]
struct Config {
    view: View,
    policy: UploadPolicy,
    files: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = parse_args();
    let transactions = read_transactions(&config).await?;
    render(&config.view, &transactions)
}

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {} [--by-store | --detail <document> | --json | --check] [--max-size <bytes>] <file.txt>...",
        program
    );
    eprintln!("  --by-store       Group transactions by store document");
    eprintln!("  --detail <doc>   List the transactions of one store");
    eprintln!("  --json           Print the submission request body");
    eprintln!("  --check          Validate the batch as it would be submitted");
    eprintln!("  --max-size <n>   Maximum file size in bytes (default: $CNAB_MAX_FILE_SIZE or 5MB)");
    std::process::exit(1);
}

fn parse_args() -> Config {
    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "cnab".to_string());

    let mut view = View::Items;
    let mut policy = UploadPolicy::from_env();
    let mut files = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--by-store" => view = View::Stores,
            "--json" => view = View::Json,
            "--check" => view = View::Check,
            "--detail" => match args.next() {
                Some(document) => view = View::Detail(document),
                None => usage(&program),
            },
            "--max-size" => match args.next().and_then(|n| n.parse().ok()) {
                Some(max_file_size) => policy = UploadPolicy::new(max_file_size),
                None => usage(&program),
            },
            flag if flag.starts_with("--") => usage(&program),
            _ => files.push(arg),
        }
    }

    if files.is_empty() {
        usage(&program);
    }

    Config {
        view,
        policy,
        files,
    }
}

/// Files are read concurrently; their texts are parsed one at a time, in
/// argument order.
async fn read_transactions(config: &Config) -> anyhow::Result<Vec<Transaction>> {
    let (tx_channel, mut rx) = mpsc::channel::<(String, String)>(config.files.len());

    let parser = tokio::spawn(async move {
        let mut transactions = Vec::new();

        while let Some((path, text)) = rx.recv().await {
            let before = transactions.len();
            transactions.extend(file_to_transactions(&text));
            info!(
                "Parsed {} transactions from {}",
                transactions.len() - before,
                path
            );
        }

        transactions
    });

    let readers: Vec<_> = config
        .files
        .iter()
        .cloned()
        .map(|path| {
            let policy = config.policy;
            tokio::spawn(async move {
                let text = upload::read_file(&path, &policy).await;
                (path, text)
            })
        })
        .collect();

    for reader in readers {
        match reader.await? {
            (path, Ok(text)) => tx_channel
                .send((path, text))
                .await
                .map_err(|_| anyhow!("Parser stopped before all files were read"))?,
            (_, Err(e)) => error!("Skipping file: {}", e),
        }
    }
    drop(tx_channel);

    Ok(parser.await?)
}

fn render(view: &View, transactions: &[Transaction]) -> anyhow::Result<()> {
    match view {
        View::Items => report::write_items(transactions, stdout())?,
        View::Stores => report::write_stores(&group_by_store(transactions), stdout())?,
        View::Detail(document) => {
            let stores = group_by_store(transactions);
            let store = find_store(&stores, document)
                .with_context(|| format!("No store with document '{}'", document))?;
            report::write_store_detail(store, stdout())?;
        }
        View::Json => {
            serde_json::to_writer_pretty(stdout(), &SubmissionRequest::from(transactions))?;
            println!();
        }
        View::Check => {
            let request = SubmissionRequest::from(transactions);
            match validate_batch(&request.transactions) {
                Ok(records) => println!("{} transactions ready to submit", records.len()),
                Err(errors) => {
                    serde_json::to_writer_pretty(stdout(), &errors)?;
                    println!();
                    return Err(anyhow!(
                        "{} of {} transactions are invalid",
                        errors.invalid_records(),
                        transactions.len()
                    ));
                }
            }
        }
    }

    Ok(())
}
