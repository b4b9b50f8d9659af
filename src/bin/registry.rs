use anyhow::Result;

fn main() -> Result<()> {
    yamlparser::cli::registry::run()
}
