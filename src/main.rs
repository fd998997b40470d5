use anyhow::Context as _;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};
use webtpl::{Context, Renderer, RendererOptions};

const DEFAULT_SETTINGS: &str = "settings.toml";
const SETTINGS_SECTION: &str = "Renderer";

#[derive(Parser)]
#[command(name = "webtpl")]
#[command(about = "Render a site template with data from a TOML file", long_about = None)]
struct Args {
    /// Template name, relative to the templates directory
    template: String,

    /// TOML file whose top-level table becomes the render context
    data: PathBuf,

    /// Where to save the rendered page (printed to stdout when omitted)
    output: Option<PathBuf>,

    /// Settings file with a [Renderer] section (defaults to ./settings.toml if present)
    #[arg(long)]
    settings: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let options = match &args.settings {
        Some(path) => RendererOptions::from_toml_file(path, Some(SETTINGS_SECTION))?,
        None if PathBuf::from(DEFAULT_SETTINGS).is_file() => {
            RendererOptions::from_toml_file(DEFAULT_SETTINGS, Some(SETTINGS_SECTION))?
        }
        None => RendererOptions::default(),
    };
    info!("Templates read from {}", options.templates_path.display());

    let data_text = std::fs::read_to_string(&args.data)
        .with_context(|| format!("failed to read data file {}", args.data.display()))?;
    let data: toml::Table = toml::from_str(&data_text)
        .with_context(|| format!("invalid TOML in {}", args.data.display()))?;
    let mut ctx = Context::from_serialize(&data)?;

    let renderer = Renderer::new(options);
    match &args.output {
        Some(path) => {
            renderer.render_file_to(&args.template, &mut ctx, path)?;
        }
        None => println!("{}", renderer.render_file(&args.template, &mut ctx)?),
    }
    Ok(())
}
