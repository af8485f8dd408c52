use clap::Parser;
use cli::{Args, Commands};
use error::{CliError, CliResult};
use logging::setup_logging;
use reposync_config::{
    config::{self, config_path, generate_default_config, get_config, set_config_path, Config},
    error::ConfigError,
};
use reposync_dl::http_client::{configure_http_client, current_client_config};
use reposync_utils::path::resolve_path;
use tracing::{debug, info};
use ureq::{
    http::{HeaderMap, HeaderName, HeaderValue},
    Proxy,
};
use utils::{set_color, set_progress};

mod cli;
mod error;
mod logging;
mod progress;
mod sync;
mod utils;

/// Parses `Name: value` pairs given with `--header`.
fn parse_headers(headers: &[String]) -> CliResult<HeaderMap> {
    let mut map = HeaderMap::new();
    for header in headers {
        let invalid = || CliError::InvalidHeader(header.clone());
        let (key, value) = header.split_once(':').ok_or_else(invalid)?;
        let key = HeaderName::from_bytes(key.trim().as_bytes()).map_err(|_| invalid())?;
        let value = HeaderValue::from_str(value.trim()).map_err(|_| invalid())?;
        map.append(key, value);
    }
    Ok(map)
}

/// Applies the config file's HTTP settings, then the command line overrides.
fn configure_http(args: &Args, config: &Config) -> CliResult<()> {
    let proxy = args
        .proxy
        .as_deref()
        .map(|proxy| {
            Proxy::new(proxy).map_err(|err| {
                CliError::InvalidProxy {
                    proxy: proxy.to_string(),
                    reason: err.to_string(),
                }
            })
        })
        .transpose()?;
    let headers = args.header.as_deref().map(parse_headers).transpose()?;
    let user_agent = args.user_agent.clone().or_else(|| config.user_agent.clone());
    let timeout = config.timeout()?;

    configure_http_client(|client| {
        if proxy.is_some() {
            client.proxy = proxy;
        }
        if user_agent.is_some() {
            client.user_agent = user_agent;
        }
        if headers.is_some() {
            client.headers = headers;
        }
        client.timeout = timeout;
    });

    let client = current_client_config();
    debug!(
        "HTTP client: user agent {:?}, timeout {:?}, proxy {}",
        client.user_agent,
        client.timeout,
        if client.proxy.is_some() { "set" } else { "none" }
    );
    Ok(())
}

fn handle_cli() -> CliResult<()> {
    let args = Args::parse();

    setup_logging(&args)?;

    if args.no_color {
        set_color(false);
    }
    if args.no_progress || args.json || args.quiet {
        set_progress(false);
    }

    if let Some(ref path) = args.config {
        let path = resolve_path(path).map_err(ConfigError::from)?;
        debug!("using config file {}", path.display());
        set_config_path(path);
    }

    match args.command {
        Commands::DefConfig => {
            generate_default_config()?;
        }
        Commands::Config => {
            let config = Config::new()?;
            if !config_path().exists() {
                debug!(
                    "{} does not exist, showing the defaults",
                    config_path().display()
                );
            }
            let content = toml::to_string_pretty(&config).map_err(ConfigError::from)?;
            info!("{}", content.trim_end());
        }
        Commands::Sync { ref repositories } => {
            config::init()?;
            let config = get_config();
            configure_http(&args, &config)?;
            sync::sync_repositories(&config, repositories)?;
        }
    }

    Ok(())
}

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    if let Err(err) = handle_cli() {
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(1);
    }
}
