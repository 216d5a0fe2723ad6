pub mod intents;
pub mod run;
pub mod serve;

pub use intents::cmd_intents;
pub use run::{cmd_run, RunArgs};
pub use serve::{cmd_serve, ServeArgs};

use std::path::PathBuf;

use clap::Args;

use crate::config::AppConfig;

/// Flags shared by every command that touches a browser or a recipe.
#[derive(Args, Clone, Debug)]
pub struct CommonArgs {
    /// Site recipe YAML; the built-in crop insurance portal when omitted
    #[arg(long, value_name = "FILE")]
    pub recipe: Option<PathBuf>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Directory for diagnostic and requested screenshots
    #[arg(long, default_value = "screenshots", value_name = "DIR")]
    pub screenshots_dir: PathBuf,
}

impl CommonArgs {
    pub fn to_config(&self) -> AppConfig {
        AppConfig {
            headless: !self.headed,
            screenshots_dir: self.screenshots_dir.clone(),
            recipe_path: self.recipe.clone(),
        }
    }
}
