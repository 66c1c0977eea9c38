use clap::Parser;
use url_shortener::cli::{Cli, Commands};
use url_shortener::config::{
    DEFAULT_CONFIG_PATH, StaticConfig, get_config, init_config_from, update_config,
};
use url_shortener::errors::ShortenerError;
use url_shortener::runtime::run_server;
use url_shortener::system::logging::init_logging;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Some(Commands::GenerateConfig { output_path, force }) = &cli.command {
        return generate_config(output_path.as_deref(), *force);
    }

    init_config_from(cli.config.as_deref());

    let mut override_err = None;
    update_config(|config| {
        if let Err(e) = cli.apply_overrides(config) {
            override_err = Some(e);
        }
    });
    if let Some(e) = override_err {
        return Err(e);
    }

    let config = get_config();
    let _guard = init_logging(&config.logging)?;

    if let Err(e) = run_server().await {
        match e.downcast_ref::<ShortenerError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("{:#}", e),
        }
        std::process::exit(1);
    }

    Ok(())
}

fn generate_config(output_path: Option<&str>, force: bool) -> anyhow::Result<()> {
    let Some(path) = output_path else {
        println!("{}", StaticConfig::generate_sample_config());
        return Ok(());
    };

    if std::path::Path::new(path).exists() && !force {
        anyhow::bail!("{} already exists, use --force to overwrite", path);
    }

    StaticConfig::default()
        .save_to_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path, e))?;
    println!("Sample configuration written to {}", path);
    if path != DEFAULT_CONFIG_PATH {
        println!("Load it with: url-shortener -c {}", path);
    }
    Ok(())
}
