mod commands;
mod session;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "kiln",
    about = "Build, version and release families of dependent Docker images"
)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
pub struct GlobalArgs {
    /// Config file (JSON, or TOML when it ends in .toml)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,
    /// Directory searched for Dockerfile.template files (overrides rootDir)
    #[arg(long, global = true)]
    pub root_dir: Option<PathBuf>,
    /// Extra template property, overriding the config (KEY=VALUE)
    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE", global = true)]
    pub properties: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template file with the configured properties
    #[command(visible_alias = "prepare")]
    FillTemplate {
        /// Template to render (falls back to Dockerfile.template next to it)
        #[arg(long, short = 'i')]
        input: PathBuf,
        /// Rendered output file
        #[arg(long, short = 'o')]
        output: PathBuf,
    },
    /// Build an image, then every image depending on it
    Build(PassArgs),
    /// Push an image and its dependants, tagging each released version in git
    Push(PassArgs),
    /// Print the discovered image hierarchy
    #[command(visible_aliases = ["hierarchy", "ss"])]
    ShowStructure,
    /// Write the latest released version of every image as JSON
    #[command(visible_alias = "dump")]
    DumpLatestVersions {
        /// Output file
        #[arg(long, short = 'f', default_value = "docker-images.json")]
        file: PathBuf,
        /// Skip images whose directory matches this regex
        #[arg(long, short = 'e', value_name = "REGEX")]
        exclude_dirs: Option<String>,
    },
    /// Copy the images built on top of one image under new names
    #[command(visible_alias = "cph")]
    CopyImagesHierarchy {
        /// Image whose dependants are copied
        #[arg(long)]
        base_image: String,
        /// Copy all descendants, not only direct dependants
        #[arg(long, short = 'r')]
        recursive: bool,
        /// Rewrite target directories that already exist instead of failing
        #[arg(long)]
        skip_existing_dirs: bool,
        /// Rename rule applied to directories and recipes (FROM=TO)
        #[arg(long = "replace", value_name = "FROM=TO")]
        replacements: Vec<String>,
    },
}

#[derive(Args)]
pub struct PassArgs {
    /// The image's Dockerfile.template (or its directory)
    #[arg(long, short = 'd')]
    pub dockerfile: PathBuf,
    /// Version component to bump: major, minor or patch
    #[arg(long, short = 's', default_value = "patch")]
    pub scope: String,
    /// Do not trigger builds of dependant images
    #[arg(long)]
    pub skip_dependants: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut session = session::Session::init(&cli.global).await?;

    match cli.command {
        Commands::FillTemplate { input, output } => {
            commands::fill_template(&session, &input, &output)?
        }
        Commands::Build(args) => commands::build(&mut session, &args).await?,
        Commands::Push(args) => commands::push(&mut session, &args).await?,
        Commands::ShowStructure => commands::show_structure(&session),
        Commands::DumpLatestVersions { file, exclude_dirs } => {
            commands::dump_latest_versions(&session, &file, exclude_dirs.as_deref())?
        }
        Commands::CopyImagesHierarchy {
            base_image,
            recursive,
            skip_existing_dirs,
            replacements,
        } => commands::copy_images_hierarchy(
            &session,
            &base_image,
            recursive,
            skip_existing_dirs,
            &replacements,
        )?,
    }

    Ok(())
}
