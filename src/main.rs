use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use votes_ledger::config::LedgerConfig;
use votes_ledger::identity::{Address, AddressError, Keypair, LoginChallenge, LoginError, Signer};
use votes_ledger::ledger::{
    Candidate, CodecError, ElectionId, LedgerCodec, NewCandidate, NewElection, SystemClock,
    Timestamp,
};
use votes_ledger::service::{LedgerService, ServiceError, VotingContract};
use votes_ledger::storage::{LedgerStore, StoreError};

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Login(#[from] LoginError),
    #[error("{0}")]
    Usage(String),
}

#[derive(Parser, Debug)]
#[command(name = "votes", version, about = "Administer and vote in an election ledger")]
struct Cli {
    /// Directory holding the ledger database
    #[arg(long, env = "VOTES_DATA_DIR", default_value = "votes-data", global = true)]
    data_dir: PathBuf,

    /// Act as a stored account
    #[arg(long = "as", value_name = "LABEL", global = true, conflicts_with = "address")]
    account: Option<String>,

    /// Act as a raw wallet address
    #[arg(long, value_name = "0x…", global = true)]
    address: Option<String>,

    /// Maximum candidates per election
    #[arg(long, env = "VOTES_MAX_CANDIDATES", global = true)]
    max_candidates: Option<usize>,

    /// Maximum allowed voters per election
    #[arg(long, env = "VOTES_MAX_VOTERS", global = true)]
    max_voters: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new ledger, owned by a new (or existing) account
    Init {
        #[arg(long, default_value = "owner")]
        owner: String,
    },
    /// Manage local wallet accounts
    #[command(subcommand)]
    Account(AccountCommand),
    /// Prove control of an account by signing a login challenge
    Login {
        label: String,
        #[arg(long, default_value = "votes.local")]
        domain: String,
    },
    /// Create an election (owner only)
    Create {
        name: String,
        #[arg(long, value_name = "MINUTES")]
        duration: u64,
        /// Candidate as NAME or NAME=IMAGE_URL; repeatable
        #[arg(long = "candidate", required = true)]
        candidates: Vec<String>,
        /// Allowed voter as address or account label; repeatable
        #[arg(long = "voter")]
        voters: Vec<String>,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "")]
        image: String,
    },
    /// Cast a vote
    Vote { id: u64, candidate: String },
    /// Show an election
    Detail { id: u64 },
    /// List candidates with their votes
    Candidates { id: u64 },
    /// Votes of one candidate
    Votes { id: u64, candidate: String },
    /// List live elections
    List,
    /// Current winner (empty on a tie)
    Winner { id: u64 },
    /// Candidates, totals and winner in one view
    Results { id: u64 },
    /// Replace the candidate list (owner only; resets votes)
    SetCandidates {
        id: u64,
        #[arg(long = "candidate", required = true)]
        candidates: Vec<String>,
    },
    /// Replace the allowed voters (owner only)
    SetVoters {
        id: u64,
        #[arg(long = "voter")]
        voters: Vec<String>,
    },
    /// Delete an election (owner only)
    Delete { id: u64 },
    /// Print the ledger snapshot
    Export {
        #[arg(long, value_enum, default_value_t = SnapshotFormat::Base64)]
        format: SnapshotFormat,
    },
    /// Replace the stored ledger with a snapshot
    Import {
        snapshot: String,
        #[arg(long, value_enum, default_value_t = SnapshotFormat::Base64)]
        format: SnapshotFormat,
    },
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    /// Generate and store a keypair
    New { label: String },
    /// List stored accounts
    List,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SnapshotFormat {
    Hex,
    Base64,
}

fn format_time(ts: Timestamp) -> String {
    i64::try_from(ts)
        .ok()
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

fn parse_candidate(arg: &str) -> NewCandidate {
    match arg.split_once('=') {
        Some((name, image)) => NewCandidate::with_image(name, image),
        None => NewCandidate::new(arg),
    }
}

fn print_candidates(candidates: &[Candidate]) {
    for candidate in candidates {
        if candidate.image_url().is_empty() {
            println!("  {:<24} {:>6}", candidate.name(), candidate.votes());
        } else {
            println!(
                "  {:<24} {:>6}  {}",
                candidate.name(),
                candidate.votes(),
                candidate.image_url()
            );
        }
    }
}

fn create_account(store: &LedgerStore, label: &str) -> Result<Keypair, CliError> {
    if store.load_account(label)?.is_some() {
        return Err(CliError::Usage(format!("account '{}' already exists", label)));
    }
    let keypair = Keypair::generate();
    store.save_account(label, &keypair)?;
    store.flush()?;
    Ok(keypair)
}

/// Resolve an address argument: a literal 0x address or a stored account label
fn resolve_address(store: &LedgerStore, arg: &str) -> Result<Address, CliError> {
    if arg.starts_with("0x") || arg.starts_with("0X") {
        return Ok(Address::parse(arg)?);
    }
    store
        .load_account(arg)?
        .map(|kp| kp.address())
        .ok_or_else(|| CliError::Usage(format!("unknown account '{}'", arg)))
}

fn missing_caller() -> CliError {
    CliError::Usage("this command needs a caller: pass --as <LABEL> or --address <0x…>".to_string())
}

fn resolve_caller(cli: &Cli, store: &LedgerStore) -> Result<Address, CliError> {
    match (&cli.account, &cli.address) {
        (Some(label), _) => resolve_address(store, label),
        (None, Some(address)) => Ok(Address::parse(address)?),
        (None, None) => Err(missing_caller()),
    }
}

fn resolve_voters(store: &LedgerStore, args: &[String]) -> Result<Vec<Address>, CliError> {
    args.iter().map(|arg| resolve_address(store, arg)).collect()
}

fn build_config(cli: &Cli) -> LedgerConfig {
    let mut config = LedgerConfig::new().with_data_dir(&cli.data_dir);
    if let Some(max) = cli.max_candidates {
        config = config.with_max_candidates(max);
    }
    if let Some(max) = cli.max_voters {
        config = config.with_max_voters(max);
    }
    config
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = build_config(&cli);
    let store = LedgerStore::open(&config.data_dir)?;

    match &cli.command {
        Command::Init { owner } => {
            let owner_address = match store.load_account(owner)? {
                Some(kp) => kp.address(),
                None => create_account(&store, owner)?.address(),
            };
            LedgerService::init(store, &config, owner_address, SystemClock)?;
            println!("ledger initialised, owner {} ({})", owner, owner_address);
            return Ok(());
        }
        Command::Account(AccountCommand::New { label }) => {
            let keypair = create_account(&store, label)?;
            println!("{} {}", label, keypair.address());
            return Ok(());
        }
        Command::Account(AccountCommand::List) => {
            for label in store.account_labels()? {
                if let Some(kp) = store.load_account(&label)? {
                    println!("{:<16} {}", label, kp.address());
                }
            }
            return Ok(());
        }
        Command::Login { label, domain } => {
            let keypair = store
                .load_account(label)?
                .ok_or_else(|| CliError::Usage(format!("unknown account '{}'", label)))?;
            let challenge = LoginChallenge::issue(domain, 300);
            let signature = Signer::sign(&keypair, challenge.message().as_bytes());
            let address = challenge.verify(&signature, Some(&keypair.address()), Utc::now())?;
            println!("{}", challenge.message());
            println!("signature: {}", signature.to_hex());
            println!("signed in as {}", address);
            return Ok(());
        }
        Command::Import { snapshot, format } => {
            let ledger = match format {
                SnapshotFormat::Hex => LedgerCodec::decode_hex(snapshot)?,
                SnapshotFormat::Base64 => LedgerCodec::decode_base64(snapshot)?,
            };
            store.save_ledger(&ledger)?;
            store.flush()?;
            info!(version = ledger.version(), owner = %ledger.owner(), "snapshot imported");
            println!("imported ledger at version {}", ledger.version());
            return Ok(());
        }
        _ => {}
    }

    // Resolve identities before the store moves into the service
    let needs_caller = matches!(
        cli.command,
        Command::Create { .. }
            | Command::Vote { .. }
            | Command::SetCandidates { .. }
            | Command::SetVoters { .. }
            | Command::Delete { .. }
    );
    let caller = if needs_caller {
        Some(resolve_caller(&cli, &store)?)
    } else {
        None
    };
    let require_caller = || caller.ok_or_else(missing_caller);
    let voters = match &cli.command {
        Command::Create { voters, .. } | Command::SetVoters { voters, .. } => {
            resolve_voters(&store, voters)?
        }
        _ => Vec::new(),
    };

    let service = LedgerService::open(store, &config, SystemClock)?;

    match cli.command {
        Command::Create {
            name,
            duration,
            candidates,
            description,
            image,
            ..
        } => {
            let caller = require_caller()?;
            let mut params = NewElection::new(&name, duration)
                .voters(voters)
                .description(&description)
                .image_url(&image);
            params.candidates = candidates.iter().map(|c| parse_candidate(c)).collect();
            let id = service.create_election(&caller, params).await?;
            println!("created election {}", id);
        }
        Command::Vote { id, candidate } => {
            let caller = require_caller()?;
            service.vote(&caller, ElectionId::new(id), &candidate).await?;
            println!("vote recorded for '{}' in election {}", candidate, id);
        }
        Command::Detail { id } => {
            let detail = service.detail_election(ElectionId::new(id)).await?;
            println!("election {}: {} [{}]", detail.id, detail.name, detail.status);
            if !detail.description.is_empty() {
                println!("  {}", detail.description);
            }
            if !detail.image_url.is_empty() {
                println!("  image: {}", detail.image_url);
            }
            println!("  created: {}", format_time(detail.created_at));
            println!("  ends:    {}", format_time(detail.end_time));
            println!("candidates:");
            print_candidates(&detail.candidates);
            println!("allowed voters:");
            for voter in &detail.allowed_voters {
                println!("  {}", voter);
            }
        }
        Command::Candidates { id } => {
            print_candidates(&service.get_candidates(ElectionId::new(id)).await?);
        }
        Command::Votes { id, candidate } => {
            println!("{}", service.get_votes(ElectionId::new(id), &candidate).await?);
        }
        Command::List => {
            for summary in service.get_all_election_names().await {
                println!("{:>4}  {}  {}", summary.id, summary.name, summary.image_url);
            }
        }
        Command::Winner { id } => {
            let winner = service.get_election_winner(ElectionId::new(id)).await?;
            if winner.is_decided() {
                println!("{} ({} votes)", winner.name, winner.votes);
            } else {
                println!("no winner");
            }
        }
        Command::Results { id } => {
            let results = service.results(ElectionId::new(id)).await?;
            let state = if results.is_final() { "final" } else { "provisional" };
            println!("election {} ({}), {} votes", results.id, state, results.total_votes);
            print_candidates(&results.candidates);
            if results.winner.is_decided() {
                println!("winner: {} ({} votes)", results.winner.name, results.winner.votes);
            } else {
                println!("winner: none");
            }
        }
        Command::SetCandidates { id, candidates } => {
            let caller = require_caller()?;
            let list = candidates.iter().map(|c| parse_candidate(c)).collect();
            service.set_candidates(&caller, ElectionId::new(id), list).await?;
            println!("candidates of election {} replaced", id);
        }
        Command::SetVoters { id, .. } => {
            let caller = require_caller()?;
            service.set_allowed_voters(&caller, ElectionId::new(id), voters).await?;
            println!("allowed voters of election {} replaced", id);
        }
        Command::Delete { id } => {
            let caller = require_caller()?;
            service.delete_election(&caller, ElectionId::new(id)).await?;
            println!("election {} deleted", id);
        }
        Command::Export { format } => {
            let ledger = service.snapshot().await;
            let encoded = match format {
                SnapshotFormat::Hex => LedgerCodec::encode_hex(&ledger)?,
                SnapshotFormat::Base64 => LedgerCodec::encode_base64(&ledger)?,
            };
            println!("{}", encoded);
        }
        Command::Init { .. }
        | Command::Account(_)
        | Command::Login { .. }
        | Command::Import { .. } => {}
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(1);
    }
}
