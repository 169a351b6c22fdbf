// cli.rs - Command-line interface configuration
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone, Default)]
#[command(name = "edge-viewer")]
#[command(about = "Live edge-detection viewer", long_about = None)]
pub struct Cli {
    /// JSON config file; flags given on the command line override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Capture width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Capture height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Capture frames per second
    #[arg(long)]
    pub fps: Option<u32>,

    /// Extra bytes at the end of each captured row
    #[arg(long = "row-padding")]
    pub row_padding: Option<u32>,

    /// Sobel magnitude above which a pixel counts as an edge
    #[arg(long)]
    pub threshold: Option<u16>,

    /// Start with edge detection off
    #[arg(long)]
    pub raw: bool,

    /// Disable the on-screen overlay
    #[arg(long = "no-ui", default_value = "false")]
    pub no_ui: bool,
}
