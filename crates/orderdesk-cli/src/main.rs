// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use orderdesk_app::{Session, SessionConfig, Transport, page_key};
use orderdesk_db::Store;
use orderdesk_tui::{ConsolePage, demo_page};
use runtime::DemoTransport;
use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ORDERDESK_LOG";
const DEFAULT_PAGE_PATH: &str = "/admin/orders/order/";
const DEMO_LATENCY: Duration = Duration::from_millis(400);

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `orderdesk --print-example-config` to generate a v1 template",
            options.config_path.display()
        )
    })?;

    let db_path = if options.demo {
        PathBuf::from(":memory:")
    } else {
        config.db_path()?
    };
    if options.print_db_path {
        println!("{}", db_path.display());
        return Ok(());
    }

    init_logging(&config)?;

    let store = Store::open(&db_path).with_context(|| {
        format!(
            "open database {} -- if this path is wrong, set [storage].db_path or {}",
            db_path.display(),
            orderdesk_db::DB_PATH_ENV
        )
    })?;
    store.bootstrap()?;

    if options.forget_layout {
        let message = if forget_layout(&store, &options.page)? {
            "forgot the section layout of"
        } else {
            "no section layout saved for"
        };
        println!("{message} {}", options.page);
        return Ok(());
    }
    if options.list_layouts {
        print!("{}", layout_listing(&store)?);
        return Ok(());
    }

    let session_config = config.session_config();
    let page = console_page(&config, &options, &session_config).with_context(|| {
        format!(
            "describe the page under [page] in {}",
            options.config_path.display()
        )
    })?;

    let transport: Arc<dyn Transport + Send + Sync> = if options.demo {
        Arc::new(
            DemoTransport::new(&session_config.status_field, DEMO_LATENCY).with_page_orders(&page),
        )
    } else {
        let client = orderdesk_http::Client::with_paths(
            config.base_url(),
            config.timeout()?,
            config.update_path(),
            config.lookup_path(),
            config.lookup_param(),
        )
        .with_context(|| {
            format!(
                "invalid [server] config in {}; fix base_url/update_path/lookup_path values",
                options.config_path.display()
            )
        })?;
        Arc::new(client)
    };

    if options.check_only {
        return Ok(());
    }

    info!(
        page = %options.page,
        demo = options.demo,
        db = %db_path.display(),
        "starting orderdesk"
    );
    let mut session = Session::new(Some(page), store, &session_config);
    orderdesk_tui::run_app(&mut session, transport)
}

/// The demo page, or the change-list described by `[page]`.
fn console_page(
    config: &Config,
    options: &CliOptions,
    fields: &SessionConfig,
) -> Result<ConsolePage> {
    if options.demo {
        return Ok(demo_page(&options.page, fields));
    }
    let token = config.page_token()?;
    let rows = config.page_rows()?;
    let page = ConsolePage::new(&options.page, fields)
        .with_token(&token)
        .with_catalog(&config.catalog())
        .with_rows(&rows)
        .with_sections(&config.page_sections());
    Ok(match config.time_zone() {
        Some(zone) => page.with_time_zone(zone),
        None => page,
    })
}

fn forget_layout(store: &Store, page: &str) -> Result<bool> {
    let removed = store.remove_state(&page_key(page))?;
    info!(page, removed, "forgot section layout");
    Ok(removed)
}

/// One line per remembered page: key, open sections, last write.
fn layout_listing(store: &Store) -> Result<String> {
    let mut out = String::new();
    for entry in store.list_state()? {
        out.push_str(&format!("{}\t{}\t{}\n", entry.key, entry.value, entry.updated_at));
    }
    Ok(out)
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(config.log_level()))
        .with_context(|| format!("invalid log level {:?} in [log].level", config.log_level()))?;
    let log_path = config.log_file()?;
    let file = open_log_file(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_target(true)
        .with_writer(Mutex::new(file))
        .try_init()
        .map_err(|error| anyhow::anyhow!("install log subscriber: {error}"))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| {
            format!(
                "open log file {}; set [log].file to a writable path",
                path.display()
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    page: String,
    print_config_path: bool,
    print_db_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    forget_layout: bool,
    list_layouts: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        page: DEFAULT_PAGE_PATH.to_owned(),
        print_config_path: false,
        print_db_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        forget_layout: false,
        list_layouts: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--page" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--page requires a page path"))?;
                let value = value.as_ref().trim();
                if value.is_empty() {
                    anyhow::bail!("--page requires a non-empty page path");
                }
                options.page = value.to_owned();
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-path" => {
                options.print_db_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--forget-layout" => {
                options.forget_layout = true;
            }
            "--list-layouts" => {
                options.list_layouts = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("orderdesk");
    println!("  --config <path>          Use a specific config path");
    println!("  --page <path>            Page path that keys remembered sections");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-path             Print resolved database path");
    println!("  --print-example-config   Print a v1 config template");
    println!("  --demo                   Run against an in-process order server (in-memory)");
    println!("  --check                  Validate config + DB + server + page settings");
    println!("  --forget-layout          Drop the remembered sections of --page");
    println!("  --list-layouts           Print every remembered section layout");
    println!("  --help                   Show this help");
}
