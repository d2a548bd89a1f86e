use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "barywire-view")]
#[command(about = "Barycentric wireframe viewer")]
pub struct CliArgs {
    #[command(subcommand)]
    pub mode: Option<Mode>,
}

#[derive(Subcommand)]
pub enum Mode {
    /// Runs a scene config for a fixed number of frames without a window.
    Headless(HeadlessArgs),
}

#[derive(Args)]
pub struct HeadlessArgs {
    #[arg(long)]
    pub config: PathBuf,
    /// Overrides the frame count from the config.
    #[arg(long)]
    pub frames: Option<u32>,
    /// Compile variants on a real GPU device instead of validating with naga.
    #[arg(long)]
    pub gpu: bool,
}
