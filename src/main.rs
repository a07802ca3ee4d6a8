use std::path::PathBuf;
use std::process::ExitCode;

use argh::FromArgs;
use retex::replace::{self, DEFAULT_COMPANION_EXT, DEFAULT_RAW_DIR, ReplaceOptions};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(FromArgs, Debug)]
/// Replace textures in a .wismt/.wimdo pair
struct Cli {
    /// input container (.wismt); the .wimdo next to it is read as well
    #[argh(positional)]
    input: PathBuf,

    /// directory of <id>.<name>.dds files
    #[argh(positional)]
    texture_dir: PathBuf,

    /// output container; the companion is written next to it
    #[argh(positional)]
    output: PathBuf,

    /// subdirectory of the texture directory holding <slot>.<name> uncompressed slot payloads [default: raw]
    #[argh(option, default = "DEFAULT_RAW_DIR.to_owned()")]
    raw_dir: String,

    /// extension of the companion metadata file [default: wimdo]
    #[argh(option, default = "DEFAULT_COMPANION_EXT.to_owned()")]
    companion_ext: String,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli: Cli = argh::from_env();
    let opts = ReplaceOptions {
        raw_dir: cli.raw_dir,
        companion_ext: cli.companion_ext,
        ..ReplaceOptions::new(cli.input, cli.texture_dir, cli.output)
    };

    match replace::run(&opts) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}
