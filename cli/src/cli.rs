use std::path::PathBuf;

/// Unit crop map CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "ucmap", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Build a unit crop map from crop, soil and meteo layers
    Build(BuildArgs),

    /// Recompute ID_CASE on an existing unit map and drop incomplete polygons
    Repair(RepairArgs),

    /// Write the distinct computation units of a unit map
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct BuildArgs {
    /// JSON run configuration; flags below override its values
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Crop polygons shapefile
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub crop: Option<PathBuf>,

    /// Soil polygons shapefile
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub soil: Option<PathBuf>,

    /// Meteo grid shapefile
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub meteo: Option<PathBuf>,

    /// Output unit map shapefile
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Crop identifier field, defaults to ID_CROP
    #[arg(long)]
    pub id_crop: Option<String>,

    /// Soil identifier field, defaults to ID_SOIL
    #[arg(long)]
    pub id_soil: Option<String>,

    /// Meteo identifier field, defaults to ID_METEO
    #[arg(long)]
    pub id_meteo: Option<String>,

    /// Raster cell size in layer units
    #[arg(long)]
    pub cell_size: Option<f64>,

    /// Also write the unit list to this SQLite database
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub db: Option<PathBuf>,

    /// Also write the unit list to this CSV file
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub csv: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct RepairArgs {
    /// Unit map shapefile, rewritten in place
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub ucm: PathBuf,

    /// Crop identifier field
    #[arg(long, default_value = "ID_CROP")]
    pub id_crop: String,

    /// Soil identifier field
    #[arg(long, default_value = "ID_SOIL")]
    pub id_soil: String,

    /// Meteo identifier field
    #[arg(long, default_value = "ID_METEO")]
    pub id_meteo: String,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Unit map shapefile
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub ucm: PathBuf,

    /// SQLite database receiving the computational_units table
    #[arg(long, value_hint = clap::ValueHint::FilePath, required_unless_present = "csv")]
    pub db: Option<PathBuf>,

    /// CSV file receiving the unit list
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    pub csv: Option<PathBuf>,
}
