mod terminal;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use fabricator::config::{Credential, CredentialFile, FabricatorConfig, UploadStrategy};
use fabricator::core::{ArtifactId, KmiVersion, PatchForm, PatcherVariant, RunId};
use fabricator::github::{HttpActionsTransport, WorkflowClient};
use fabricator::monitor::{MonitorOutcome, RunMonitor, RunRenderer};
use fabricator::routes::Route;
use fabricator::submission::{SubmissionFlow, SubmissionObserver};
use fabricator::upload::{AnonymousHost, ImageHost, StagedUpload};
use fabricator::utils::format_bytes;

use terminal::{ConsoleObserver, PendingRoute, TerminalRenderer};

type Client = WorkflowClient<HttpActionsTransport>;

#[derive(Parser)]
#[command(name = "lkm-fabricator", version, about = "Patch Android boot images with GitHub Actions")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Args)]
struct GlobalArgs {
    /// JSON configuration file
    #[arg(long, global = true, env = "LKM_CONFIG")]
    config: Option<PathBuf>,

    /// Repository hosting the patch workflows, as owner/name
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Git ref to dispatch on
    #[arg(long = "ref", global = true)]
    git_ref: Option<String>,

    /// GitHub token (overrides environment and token file)
    #[arg(long, global = true)]
    token: Option<String>,

    /// File the token is stored in
    #[arg(long, global = true, env = "LKM_TOKEN_FILE")]
    token_file: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long, global = true)]
    poll_interval_ms: Option<u64>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Cmd {
    /// Upload or reference a boot image and start a patch run
    Patch(PatchArgs),
    /// Follow a run until it finishes
    Monitor {
        run_id: RunId,
        #[command(flatten)]
        download: DownloadArgs,
    },
    /// Download artifacts of a run
    Download {
        run_id: RunId,
        /// Only this artifact
        #[arg(long)]
        artifact: Option<ArtifactId>,
        /// Target directory
        #[arg(long, short, default_value = ".")]
        output: PathBuf,
    },
    /// Open a view by path, e.g. /LKM-Fabricator/monitor/123
    Open { path: String },
    /// Manage the stored GitHub token
    Token {
        #[command(subcommand)]
        cmd: TokenCmd,
    },
}

#[derive(Args)]
struct PatchArgs {
    /// Local boot image (.img)
    #[arg(long, conflicts_with = "url", required_unless_present = "url")]
    file: Option<PathBuf>,

    /// URL of a boot image
    #[arg(long)]
    url: Option<String>,

    /// Patcher: kernelsu, kernelsu-next, sukisu, apatch or magisk
    #[arg(long, short, default_value_t = PatcherVariant::default())]
    patcher: PatcherVariant,

    /// KMI version, e.g. android14-6.1 (not needed for magisk)
    #[arg(long)]
    kmi: Option<KmiVersion>,

    /// How a local file reaches the workflow: anonymous-host, release or inline
    #[arg(long)]
    strategy: Option<UploadStrategy>,

    /// Return after dispatching instead of following the run
    #[arg(long)]
    no_follow: bool,

    /// Keep the staging release after the run finishes
    #[arg(long)]
    keep_staging: bool,

    #[command(flatten)]
    download: DownloadArgs,
}

#[derive(Args)]
struct DownloadArgs {
    /// Download artifacts into this directory once the run completes
    #[arg(long)]
    download_to: Option<PathBuf>,
}

#[derive(Subcommand)]
enum TokenCmd {
    /// Store a token
    Set { token: String },
    /// Remove the stored token
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.global.log_json)?;

    let token_file = CredentialFile::new(
        cli.global
            .token_file
            .clone()
            .unwrap_or_else(default_token_path),
    );
    if let Cmd::Token { cmd } = &cli.cmd {
        return run_token(cmd, &token_file);
    }

    let config = resolve_config(&cli.global, &token_file)?;
    match cli.cmd {
        Cmd::Patch(args) => run_patch(args, &config).await,
        Cmd::Monitor { run_id, download } => {
            let client = build_client(&config)?;
            follow(&client, &config, run_id, download.download_to.as_deref(), None).await
        }
        Cmd::Download {
            run_id,
            artifact,
            output,
        } => {
            let client = build_client(&config)?;
            download_artifacts(&client, run_id, artifact, &output).await
        }
        Cmd::Open { path } => run_open(&path, &config).await,
        Cmd::Token { .. } => Ok(()),
    }
}

fn init_tracing(json: bool) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive("info".parse()?);
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn default_token_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    base.join("lkm-fabricator").join("token")
}

/// Defaults, then the config file, then the environment, then the token file
/// if nothing else supplied a token, then flags.
fn resolve_config(args: &GlobalArgs, token_file: &CredentialFile) -> Result<FabricatorConfig> {
    let mut config = match &args.config {
        Some(path) => FabricatorConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => FabricatorConfig::new(),
    }
    .with_env();

    if config.token.is_none() {
        config.token = token_file.load()?;
    }
    if let Some(repo) = &args.repo {
        let Some((owner, name)) = repo.split_once('/') else {
            bail!("--repo must look like owner/name, got '{repo}'");
        };
        config = config.with_repository(owner, name);
    }
    if let Some(git_ref) = &args.git_ref {
        config.git_ref = git_ref.clone();
    }
    if let Some(token) = &args.token {
        config = config.with_token(Credential::new(token.as_str()));
    }
    if let Some(ms) = args.poll_interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }
    Ok(config)
}

fn build_client(config: &FabricatorConfig) -> Result<Arc<Client>> {
    let transport = Arc::new(HttpActionsTransport::new(config)?);
    Ok(Arc::new(WorkflowClient::new(transport, config)))
}

fn run_token(cmd: &TokenCmd, file: &CredentialFile) -> Result<()> {
    match cmd {
        TokenCmd::Set { token } => {
            file.save(&Credential::new(token.as_str()))?;
            println!("Token stored in {}", file.path().display());
        }
        TokenCmd::Clear => {
            if file.clear()? {
                println!("Token removed from {}", file.path().display());
            } else {
                println!("No stored token");
            }
        }
    }
    Ok(())
}

async fn run_patch(args: PatchArgs, config: &FabricatorConfig) -> Result<()> {
    let mut form = match (args.file, args.url) {
        (Some(file), _) => PatchForm::from_file(file, args.patcher),
        (None, Some(url)) => PatchForm::from_url(url, args.patcher),
        (None, None) => bail!("either --file or --url is required"),
    };
    form.kmi_version = args.kmi;
    form.credential = config.token.clone();

    let client = build_client(config)?;
    let host: Arc<dyn ImageHost> = Arc::new(AnonymousHost::new(&config.upload, &config.user_agent)?);
    let mut flow = SubmissionFlow::new(Arc::clone(&client), host, config);
    if let Some(strategy) = args.strategy {
        flow = flow.with_strategy(strategy);
    }

    let observer: Arc<dyn SubmissionObserver> = Arc::new(ConsoleObserver::new());
    let navigator = PendingRoute::new(config.base_path.clone());
    let submission = flow.submit(form, observer, &navigator).await?;
    println!("Run #{} started", submission.run_id);

    if args.no_follow {
        if let Some(staged) = &submission.staged {
            println!(
                "Staging release {} kept; delete it once the run is done",
                staged.release.tag_name
            );
        }
        return Ok(());
    }

    let Some(Route::Monitor { run_id }) = navigator.take() else {
        return Ok(());
    };
    let staged = submission.staged.filter(|_| !args.keep_staging);
    follow(
        &client,
        config,
        run_id,
        args.download.download_to.as_deref(),
        staged.as_ref(),
    )
    .await
}

async fn follow(
    client: &Arc<Client>,
    config: &FabricatorConfig,
    run_id: RunId,
    download_to: Option<&Path>,
    staged: Option<&StagedUpload>,
) -> Result<()> {
    let renderer: Arc<dyn RunRenderer> = Arc::new(TerminalRenderer::new());
    let handle = RunMonitor::new(Arc::clone(client), renderer, config).spawn(run_id);
    let outcome = tokio::select! {
        outcome = handle.finished() => outcome,
        _ = tokio::signal::ctrl_c() => MonitorOutcome::TornDown,
    };

    if let Some(staged) = staged {
        if matches!(outcome, MonitorOutcome::Completed(_)) {
            if let Err(err) = client.discard_staged(staged).await {
                warn!(error = %err, "Could not delete staging release");
            }
        } else {
            info!(tag = %staged.release.tag_name, "Keeping staging release, run did not finish");
        }
    }

    match outcome {
        MonitorOutcome::Completed(run) => {
            if let Some(dir) = download_to {
                download_artifacts(client, run.id, None, dir).await?;
            }
            if run.conclusion.is_some_and(|c| c.is_failure()) {
                bail!("run #{} failed", run.id);
            }
            Ok(())
        }
        MonitorOutcome::Errored(message) => bail!(message),
        MonitorOutcome::TornDown => Ok(()),
    }
}

async fn download_artifacts(
    client: &Client,
    run_id: RunId,
    only: Option<ArtifactId>,
    dir: &Path,
) -> Result<()> {
    let artifacts = client.get_artifacts(run_id).await?;
    let selected: Vec<_> = artifacts
        .into_iter()
        .filter(|a| only.map_or(true, |id| a.id == id))
        .collect();
    if selected.is_empty() {
        bail!("run #{run_id} has no matching artifacts");
    }

    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for artifact in selected {
        let bytes = client.download_artifact(artifact.id).await?;
        let path = dir.join(artifact.archive_file_name());
        tokio::fs::write(&path, &bytes)
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "Saved {} ({}) to {}",
            artifact.name,
            format_bytes(bytes.len() as u64),
            path.display()
        );
    }
    Ok(())
}

async fn run_open(path: &str, config: &FabricatorConfig) -> Result<()> {
    match Route::parse(path, &config.base_path) {
        Route::Submit => {
            println!("{}", Route::Submit.title());
            println!();
            for variant in PatcherVariant::ALL {
                let kmi = if variant.requires_kmi() { "KMI required" } else { "no KMI" };
                println!(
                    "  {:<14} {:<14} {} ({kmi})",
                    variant.as_str(),
                    variant.display_name(),
                    variant.description()
                );
            }
            println!();
            let versions: Vec<_> = KmiVersion::ALL.iter().map(KmiVersion::as_str).collect();
            println!("KMI versions: {}", versions.join(", "));
            println!("Start a run with: lkm-fabricator patch --url <image-url> --patcher <name> --kmi <version>");
            Ok(())
        }
        Route::Monitor { run_id } => {
            let client = build_client(config)?;
            follow(&client, config, run_id, None, None).await
        }
        route @ Route::NotFound { .. } => {
            bail!("{}: {path}", route.title());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_patch_args_parse() {
        let cli = Cli::try_parse_from([
            "lkm-fabricator",
            "patch",
            "--url",
            "https://x/boot.img",
            "--patcher",
            "kernelsu-next",
            "--kmi",
            "android15-6.6",
        ])
        .unwrap();
        let Cmd::Patch(args) = cli.cmd else {
            panic!("expected patch command");
        };
        assert_eq!(args.patcher, PatcherVariant::KernelsuNext);
        assert_eq!(args.kmi, Some(KmiVersion::Android15_6_6));
        assert!(args.file.is_none());
    }

    #[test]
    fn test_patch_requires_a_source() {
        assert!(Cli::try_parse_from(["lkm-fabricator", "patch"]).is_err());
        assert!(Cli::try_parse_from([
            "lkm-fabricator",
            "patch",
            "--file",
            "boot.img",
            "--url",
            "https://x/boot.img"
        ])
        .is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = std::env::temp_dir().join(format!("lkm-cli-test-{}", std::process::id()));
        let token_file = CredentialFile::new(dir.join("token"));
        let cli = Cli::try_parse_from([
            "lkm-fabricator",
            "--repo",
            "octo/patcher",
            "--ref",
            "dev",
            "--token",
            "ghp_flag",
            "monitor",
            "12",
        ])
        .unwrap();

        let config = resolve_config(&cli.global, &token_file).unwrap();

        assert_eq!(config.repository(), "octo/patcher");
        assert_eq!(config.git_ref, "dev");
        assert_eq!(config.token, Some(Credential::new("ghp_flag")));
    }
}
