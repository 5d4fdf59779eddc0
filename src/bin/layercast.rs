use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "layercast", version)]
struct Cli {
    /// JSON config file (canvas, assets root, presets, upload).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory web-root paths like `/arrow.png` resolve under.
    #[arg(long, global = true)]
    assets: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available triggers and their overlays.
    Presets,
    /// Compose and write a PNG file.
    Compose(ComposeArgs),
    /// Compose and print a `data:image/png;base64,...` URL.
    DataUrl(SourceArgs),
    /// Compose, upload once, and print the stored URL with share links.
    Publish(PublishArgs),
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Base image: URL, data URL, local file, or assets path. Blank means the placeholder.
    #[arg(long)]
    base: Option<String>,

    /// Preset trigger id.
    #[arg(long)]
    trigger: Option<String>,
}

#[derive(Args, Debug)]
struct ComposeArgs {
    #[command(flatten)]
    src: SourceArgs,

    /// Output PNG path.
    #[arg(long, default_value = "combined-image.png")]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct PublishArgs {
    #[command(flatten)]
    src: SourceArgs,

    /// Object store endpoint; overrides config and LAYERCAST_UPLOAD_ENDPOINT.
    #[arg(long, conflicts_with = "dir")]
    endpoint: Option<Url>,

    /// Store into a local directory instead of an HTTP endpoint.
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Public URL prefix reported for objects written with `--dir`.
    #[arg(long, requires = "dir")]
    public_base: Option<Url>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.cmd {
        Command::Presets => cmd_presets(&config),
        Command::Compose(args) => {
            let studio = make_studio(config, &args.src)?;
            let path = studio.download(args.out).await?;
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        Command::DataUrl(args) => {
            let studio = make_studio(config, &args)?;
            println!("{}", studio.data_url().await?);
            Ok(())
        }
        Command::Publish(args) => cmd_publish(config, args).await,
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_env("LAYERCAST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<layercast::StudioConfig> {
    let config = match &cli.config {
        Some(path) => layercast::StudioConfig::from_json_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => layercast::StudioConfig::default(),
    };
    let mut config = config.apply_env()?;
    if let Some(root) = &cli.assets {
        config.assets_root = root.clone();
    }
    Ok(config)
}

fn make_studio(
    config: layercast::StudioConfig,
    src: &SourceArgs,
) -> anyhow::Result<layercast::Studio> {
    let mut studio = layercast::Studio::new(config)?;
    if let Some(trigger) = &src.trigger {
        studio.select(trigger)?;
    }
    match src.base.as_deref() {
        Some(base) if Path::new(base).is_file() => studio.set_base_file(base)?,
        Some(base) => studio.set_base_input(base)?,
        None => {}
    }
    Ok(studio)
}

fn cmd_presets(config: &layercast::StudioConfig) -> anyhow::Result<()> {
    let default = config.default_trigger();
    for preset in config.presets.iter() {
        let marker = if preset.id == default { "*" } else { " " };
        println!("{marker} {}", preset.id);
        for overlay in &preset.overlays {
            let placement = match overlay.placement() {
                layercast::Placement::FullCover => "full-cover".to_string(),
                layercast::Placement::Centered { width, height } => {
                    format!("centered {width}x{height}")
                }
            };
            println!(
                "    {} opacity={} {placement}",
                overlay.source(),
                overlay.opacity()
            );
        }
    }
    Ok(())
}

async fn cmd_publish(mut config: layercast::StudioConfig, args: PublishArgs) -> anyhow::Result<()> {
    if let Some(endpoint) = args.endpoint.clone() {
        config.upload.endpoint = Some(endpoint);
    }
    let http = config.http_store()?;
    let studio = make_studio(config, &args.src)?;

    let published = if let Some(dir) = args.dir {
        let mut store = layercast::DirObjectStore::new(dir);
        if let Some(base) = args.public_base {
            store = store.with_public_base(base);
        }
        studio.publish(&store).await?
    } else if let Some(store) = http {
        studio.publish(&store).await?
    } else {
        anyhow::bail!(
            "no object store configured: pass --dir or --endpoint, or set {}",
            layercast::ENV_UPLOAD_ENDPOINT
        );
    };

    println!("{}", serde_json::to_string_pretty(&published)?);
    Ok(())
}
