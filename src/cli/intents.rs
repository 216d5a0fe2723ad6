use formpilot_recipes::Sitemap;

use super::CommonArgs;

/// Print the active recipe's intent catalog and page table.
pub async fn cmd_intents(common: CommonArgs) -> anyhow::Result<()> {
    let config = common.to_config();
    let recipe = config.load_recipe()?;

    println!("{} ({})\n", recipe.site_name, recipe.base_url);
    for (id, spec) in &recipe.intents {
        println!("  {id:24} {}", spec.description);
        if !spec.params.is_empty() {
            println!("  {:24} params: {}", "", spec.params.join(", "));
        }
    }
    println!("\n{}", Sitemap::new(recipe.as_ref().clone()).describe_site());
    Ok(())
}
