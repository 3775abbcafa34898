use clap::Parser;
use std::path::PathBuf;

use crate::files::NameFilter;

pub const HELP_KEYS: &str = "\
Key Bindings:
  Esc              : Quit
  Right / Space    : Next image (Shift: +10)
  Left             : Previous image (Shift: -10)
  Home / End       : First / last image
  Tab / Shift+Tab  : Next / previous comparison folder
  Delete           : Move to _deleted, show next
  Backspace        : Move to _deleted, show previous
  A .. Z           : Move to _A .. _Z, show next
  Ctrl+Z           : Undo last move
  Up / Down        : Zoom in / out (x1.2)
  Wheel            : Zoom in / out (x1.05)
  F1               : Reset zoom to 1:1
  F2               : Keep current displayed width (auto zoom)
  F3               : Cancel auto zoom
  F4               : Toggle fingerprints
  F5               : Rescan folders
  F9               : Toggle background
  F11              : Toggle fullscreen
  [ / ]            : Rotate 90 CCW / CW
  Click            : Focus view
  Drag             : Pan view
";

#[derive(Parser)]
#[command(name = "hv", about = "Browse, compare and sort images", after_help = HELP_KEYS)]
pub struct Cli {
    /// Image to start from, or a directory
    pub path: PathBuf,

    /// Extra folder to compare against (repeatable)
    #[arg(short, long = "compare", value_name = "DIR")]
    pub compare: Vec<PathBuf>,

    /// Number of views shown side by side (1-4)
    #[arg(short = 'n', long, default_value = "1", value_parser = clap::value_parser!(u8).range(1..=4))]
    pub views: u8,

    /// Show content and perceptual fingerprints
    #[arg(short = 'F', long)]
    pub fingerprint: bool,

    /// Only show files whose name contains this (repeatable)
    #[arg(short, long, value_name = "NAME")]
    pub include: Vec<String>,

    /// Hide files whose name contains this (repeatable)
    #[arg(short = 'x', long, value_name = "NAME")]
    pub exclude: Vec<String>,

    /// Memory budget for decoded images (e.g. 512MB, 2GB). Default: 10% of RAM.
    #[arg(short, long)]
    pub memory: Option<String>,
}

impl Cli {
    pub fn name_filter(&self) -> NameFilter {
        NameFilter {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
        }
    }

    pub fn memory_budget(&self) -> u64 {
        match &self.memory {
            Some(s) => parse_memory_budget(s),
            None => default_memory_budget(),
        }
    }
}

pub fn parse_memory_budget(s: &str) -> u64 {
    let s = s.trim().to_uppercase();
    let (num, unit) = if let Some(num) = s.strip_suffix("GB") {
        (num, 1024 * 1024 * 1024)
    } else if let Some(num) = s.strip_suffix("MB") {
        (num, 1024 * 1024)
    } else {
        (s.as_str(), 1024 * 1024)
    };
    (num.trim().parse::<f64>().unwrap_or(512.0) * unit as f64) as u64
}

pub fn default_memory_budget() -> u64 {
    let mut sys = sysinfo::System::new();
    sys.refresh_memory();
    sys.total_memory() / 10
}
