use clap::Args;

use super::CommonArgs;
use crate::server;

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Port for the agent API
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    #[command(flatten)]
    pub common: CommonArgs,
}

pub async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.common.to_config();
    let recipe = config.load_recipe()?;
    server::serve(recipe, config, args.port).await
}
