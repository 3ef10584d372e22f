use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "mistwar")]
#[command(about = "Live World vs. World objective tracker and map builder.")]
#[command(version)]
pub struct Cli {
    /// Build (or load) the map images of every WvW map
    #[arg(short = 'd', long)]
    pub download_maps: bool,

    /// Rebuild map images even if they exist on disk
    #[arg(short = 'r', long)]
    pub rebuild: bool,

    /// Poll the match every tick and print objective changes
    #[arg(short = 'w', long)]
    pub watch: bool,

    /// Poll once and list the objectives of a map
    #[arg(short = 'o', long, value_name = "MAP")]
    pub objectives: Option<String>,

    /// Character whose guild is highlighted (overrides config)
    #[arg(short = 'c', long)]
    pub character: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Choose color theme
    #[arg(short = 'T', long)]
    pub theme: Option<String>,

    /// Generate config sample
    #[arg(long)]
    pub generate_config: bool,

    /// Edit configuration file
    #[arg(long)]
    pub edit_config: bool,

    /// Show status
    #[arg(long)]
    pub status: bool,
}

/// Resolve a map given by id or by a short name.
pub fn parse_map(value: &str) -> Option<i32> {
    if let Ok(id) = value.trim().parse::<i32>() {
        return Some(id);
    }
    match value.trim().to_ascii_lowercase().as_str() {
        "ebg" | "eternal" | "eternal-battlegrounds" => Some(38),
        "green" | "green-alpine" => Some(95),
        "blue" | "blue-alpine" => Some(96),
        "red" | "desert" | "red-desert" => Some(1099),
        _ => None,
    }
}
