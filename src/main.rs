use anyhow::Result;

fn main() -> Result<()> {
    yamlparser::cli::run()
}
