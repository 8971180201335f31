//! Link Disposisi Sanitizer - CLI Interface
//! Author: kartik4091
//! Created: 2025-06-06
//!
//! Command-line front end: sanitize locally, upload to the shared Drive
//! folder, list what is already there, and manage the OAuth login.

use std::path::PathBuf;
use std::process;

use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use linkstrip::drive::FileLister;
use linkstrip::utils::{init_logging, LogLevel};
use linkstrip::{
    AppConfig, BatchItem, BatchProcessor, BatchReport, DocumentSanitizer, DriveClient, Error, FileSink,
    ListingFormatter, LocalSink, OAuthFlow, ReportFormat, ReportFormatter, Result, TokenSet, TokenStore,
    UploadSession,
};
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let matches = build_cli().get_matches();

    // Initialize logging based on verbosity
    let log_level = matches.get_one::<LogLevel>("verbose").copied().unwrap_or_default();
    if let Err(e) = init_logging(log_level) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!("🚀 linkstrip v{} - Starting...", env!("CARGO_PKG_VERSION"));

    match run(&matches).await {
        Ok(true) => info!("🎉 Done"),
        Ok(false) => {
            warn!("⚠️ Finished with failures");
            process::exit(1);
        }
        Err(e) => {
            error!("❌ {}", e);
            process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but some documents failed
async fn run(matches: &ArgMatches) -> Result<bool> {
    let config = load_config(matches)?;
    let format = matches.get_one::<ReportFormat>("format").copied().unwrap_or_default();

    match matches.subcommand() {
        Some(("sanitize", sub)) => cmd_sanitize(&config, sub, format).await,
        Some(("upload", sub)) => cmd_upload(&config, sub, format).await,
        Some(("list", _)) => cmd_list(&config, format).await.map(|_| true),
        Some(("login", _)) => cmd_login(&config).map(|_| true),
        Some(("authorize", sub)) => cmd_authorize(&config, sub).await.map(|_| true),
        Some(("logout", _)) => cmd_logout(&config).await.map(|_| true),
        _ => Err(Error::ConfigError("No command given; see --help".into())),
    }
}

fn load_config(matches: &ArgMatches) -> Result<AppConfig> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            info!("📋 Loading configuration from {}", path.display());
            AppConfig::load(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(phrase) = matches.get_one::<String>("phrase") {
        config.sanitizer.target_phrase = phrase.clone();
    }
    if let Some(folder) = matches.get_one::<String>("folder") {
        config.drive.folder_id = folder.clone();
    }
    config.validate()?;
    debug!("Effective configuration: {:?}", config.sanitizer);
    Ok(config)
}

async fn cmd_sanitize(config: &AppConfig, matches: &ArgMatches, format: ReportFormat) -> Result<bool> {
    let output_dir = matches
        .get_one::<PathBuf>("output-dir")
        .ok_or_else(|| Error::ConfigError("--output-dir is required".into()))?;
    tokio::fs::create_dir_all(output_dir).await?;

    let sink = LocalSink::new(output_dir.clone()).overwrite(matches.get_flag("force"));
    info!("📁 Writing sanitized files to {}", sink.dir().display());

    let report = process_inputs(config, sink, "", matches).await;
    print_report(config, &report, format)?;
    Ok(!report.has_failures())
}

async fn cmd_upload(config: &AppConfig, matches: &ArgMatches, format: ReportFormat) -> Result<bool> {
    let folder_id = config.drive.require_folder()?.to_string();
    let token = authorized_token(config).await?;
    let client = DriveClient::new(&config.drive, token.access_token)?;

    info!("☁️ Uploading to Drive folder {}", folder_id);
    let report = process_inputs(config, client.clone(), &folder_id, matches).await;
    print_report(config, &report, format)?;

    // the listing is informational; a failure here does not fail the upload
    match client.list_recent(&folder_id, config.drive.list_page_size).await {
        Ok(files) => {
            let listing = ListingFormatter::new(config.display.utc_offset_hours)?;
            println!("{}", listing.format(&files, format)?);
        }
        Err(e) => warn!("⚠️ Could not list the destination folder: {}", e),
    }

    Ok(!report.has_failures())
}

async fn cmd_list(config: &AppConfig, format: ReportFormat) -> Result<()> {
    let folder_id = config.drive.require_folder()?;
    let token = authorized_token(config).await?;
    let client = DriveClient::new(&config.drive, token.access_token)?;

    let files = client.list_recent(folder_id, config.drive.list_page_size).await?;
    let listing = ListingFormatter::new(config.display.utc_offset_hours)?;
    println!("{}", listing.format(&files, format)?);
    Ok(())
}

fn cmd_login(config: &AppConfig) -> Result<()> {
    let flow = OAuthFlow::new(config.oauth.clone())?;
    let state = uuid::Uuid::new_v4().simple().to_string();
    println!("👉 Open this URL in a browser and sign in:\n\n{}\n", flow.authorization_url(&state));
    println!("Then run `linkstrip authorize <redirect-url-or-code>`.");
    Ok(())
}

async fn cmd_authorize(config: &AppConfig, matches: &ArgMatches) -> Result<()> {
    let input = matches
        .get_one::<String>("code")
        .ok_or_else(|| Error::ConfigError("An authorization code or redirect URL is required".into()))?;
    let code = OAuthFlow::code_from_redirect(input)?;

    let flow = OAuthFlow::new(config.oauth.clone())?;
    let token = flow.exchange_code(&code).await?;
    let store = TokenStore::new(config.oauth.token_path.clone());
    store.save(&token).await?;
    info!("🔐 Authorized; token saved to {}", store.path().display());
    Ok(())
}

async fn cmd_logout(config: &AppConfig) -> Result<()> {
    let store = TokenStore::new(config.oauth.token_path.clone());
    store.clear().await?;
    info!("👋 Stored token removed");
    Ok(())
}

async fn authorized_token(config: &AppConfig) -> Result<TokenSet> {
    let flow = OAuthFlow::new(config.oauth.clone())?;
    let store = TokenStore::new(config.oauth.token_path.clone());
    flow.valid_token(&store).await
}

/// Reads every input path and runs the batch; unreadable files fail in place
async fn process_inputs<S: FileSink>(config: &AppConfig, sink: S, folder_id: &str, matches: &ArgMatches) -> BatchReport {
    let mut items = Vec::new();
    for path in matches.get_many::<PathBuf>("inputs").into_iter().flatten() {
        items.push(BatchItem::read(path).await);
    }

    let processor = BatchProcessor::new(DocumentSanitizer::new(config.sanitizer.clone()), sink, folder_id);
    let mut session = UploadSession::new();
    processor.process_items(&mut session, items).await
}

fn print_report(config: &AppConfig, report: &BatchReport, format: ReportFormat) -> Result<()> {
    let formatter = ReportFormatter::new(config.sanitizer.target_phrase.clone());
    println!("{}", formatter.format(report, format)?);
    Ok(())
}

fn inputs_arg() -> Arg {
    Arg::new("inputs")
        .value_name("PDF")
        .help("PDF files to sanitize")
        .num_args(1..)
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

fn build_cli() -> Command {
    Command::new("linkstrip")
        .version(env!("CARGO_PKG_VERSION"))
        .author("kartik4091")
        .about("Removes the \"Link Disposisi\" label and its link from PDF documents")
        .long_about("Finds a printed label on every page of a PDF, erases it from the page content \
                    together with any annotation lying over it, and stores the result locally or \
                    in a shared Google Drive folder.")
        .subcommand_required(true)
        .arg_required_else_help(true)

        // Configuration
        .arg(Arg::new("config")
            .short('c')
            .long("config")
            .value_name("FILE")
            .global(true)
            .value_parser(value_parser!(PathBuf))
            .help("Configuration file (JSON/YAML)"))

        .arg(Arg::new("phrase")
            .short('p')
            .long("phrase")
            .value_name("TEXT")
            .global(true)
            .help("Label to remove (overrides the configuration)"))

        .arg(Arg::new("folder")
            .long("folder")
            .value_name("ID")
            .global(true)
            .help("Destination Drive folder id (overrides the configuration)"))

        // Output options
        .arg(Arg::new("format")
            .short('f')
            .long("format")
            .global(true)
            .value_parser(value_parser!(ReportFormat))
            .default_value("text")
            .help("Report format"))

        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .global(true)
            .value_parser(value_parser!(LogLevel))
            .default_value("info")
            .help("Logging level"))

        .subcommand(Command::new("sanitize")
            .about("Sanitize PDFs into a local directory")
            .arg(inputs_arg())
            .arg(Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory for sanitized files"))
            .arg(Arg::new("force")
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Overwrite existing files")))

        .subcommand(Command::new("upload")
            .about("Sanitize PDFs and upload them to the Drive folder")
            .arg(inputs_arg()))

        .subcommand(Command::new("list")
            .about("List the newest files in the Drive folder"))

        .subcommand(Command::new("login")
            .about("Print the URL that starts the Google sign-in"))

        .subcommand(Command::new("authorize")
            .about("Finish sign-in with the code or the full redirect URL")
            .arg(Arg::new("code")
                .value_name("CODE_OR_URL")
                .required(true)))

        .subcommand(Command::new("logout")
            .about("Forget the stored token"))
}
