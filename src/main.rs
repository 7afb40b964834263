use clap::{Parser, Subcommand};
use futures::executor::block_on;
use futures::future::join_all;
use simple_srcset::config::{self, CONFIG_FILENAME};
use simple_srcset::generate::Generator;
use simple_srcset::output;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "simple-srcset")]
#[command(about = "Responsive image derivatives and blurred placeholders")]
#[command(long_about = "\
Responsive image derivatives and blurred placeholders

For each source image, writes resized copies at a set of widths in the
source's own format plus alternate encodings, and prints the srcset,
aspect ratio and placeholder attributes a page needs to reference them.

Derivative filenames carry a hash of the width and quality and a
fingerprint of the source bytes:

  dawn.jpg  →  dist/dawn.1a2b3c4d.<sha256>.jpg
               dist/dawn.1a2b3c4d.<sha256>.webp
               ...

Existing derivatives are reused, so rebuilding is cheap. Editing a source
changes its fingerprint and therefore every derivative name.

Run 'simple-srcset gen-config' to generate a documented simple-srcset.toml.")]
#[command(version)]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = CONFIG_FILENAME, global = true)]
    config: PathBuf,

    /// Directory sources are resolved against
    #[arg(long, default_value = ".", global = true)]
    input_dir: PathBuf,

    /// Directory derivatives are written to
    #[arg(long, default_value = "dist", global = true)]
    output_dir: PathBuf,

    /// Debug logging for this crate (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate derivatives and print attributes for each source
    Attrs {
        /// Source images, relative to --input-dir
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Print a JSON object keyed by source instead of text
        #[arg(long)]
        json: bool,

        /// Do not produce a placeholder
        #[arg(long)]
        no_placeholder: bool,

        /// Compute names and dimensions without writing any file
        #[arg(long)]
        skip_generation: bool,

        /// Override output.url_prefix from the config
        #[arg(long)]
        url_prefix: Option<String>,
    },
    /// Print a stock simple-srcset.toml with all options documented
    GenConfig,
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "warn,simple_srcset=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .try_init();
}

fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Attrs {
            sources,
            json,
            no_placeholder,
            skip_generation,
            url_prefix,
        } => {
            let mut site_config = config::load_config(&cli.config)?;
            if no_placeholder {
                site_config.placeholder.enabled = false;
            }
            if let Some(prefix) = url_prefix {
                site_config.output.url_prefix = prefix;
            }

            let threads = config::effective_threads(&site_config.processing);
            let generator = Generator::with_threads(threads)?;

            let requests: Vec<_> = sources
                .iter()
                .map(|src| {
                    let mut request =
                        site_config.attribute_request(src, &cli.input_dir, &cli.output_dir);
                    request.skip_generation = skip_generation;
                    request
                })
                .collect();
            let results = block_on(join_all(
                requests.iter().map(|r| generator.generate_attributes(r)),
            ));
            let outcomes: Vec<output::SourceOutcome> = sources.into_iter().zip(results).collect();

            if json {
                output::print_attributes_json(&outcomes)?;
            } else {
                output::print_attributes(&outcomes, generator.stats());
            }

            let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
            if failed > 0 {
                eprintln!("{failed} of {} sources failed", outcomes.len());
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(ExitCode::SUCCESS)
}
