// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use mikapi_app::AppState;
use mikapi_db::{RestBackend, SqliteBackend, Store, TableBackend};
use mikapi_testkit::TabFaker;
use mikapi_tui::UiOptions;
use runtime::StoreRuntime;
use std::env;
use std::path::PathBuf;

const DEMO_SEED: u64 = 3;
const DEMO_TABS: usize = 6;

type DynStore = Store<Box<dyn TableBackend>>;

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
            "load config {}; run `mikapi --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    let _log_guard = logging::init(&log_path, config.log_level())
        .with_context(|| format!("start logging to {}", log_path.display()))?;
    tracing::info!(demo = options.demo, config = %options.config_path.display(), "starting");

    let store = open_store(&config, options.demo)?;
    if options.check_only {
        store
            .ping()
            .context("store check failed -- verify the URL, key, and table names")?;
        tracing::info!("store check passed");
        return Ok(());
    }

    let mut state = AppState::with_start_page(config.start_page());
    let mut runtime = StoreRuntime::new(&store);
    let ui_options = UiOptions {
        currency: config.currency().to_owned(),
    };
    let result = mikapi_tui::run_app(&mut state, &mut runtime, &ui_options);
    tracing::info!("exiting");
    result
}

fn open_store(config: &Config, demo: bool) -> Result<DynStore> {
    let tables = config.table_names();
    if demo {
        let sqlite = SqliteBackend::open_memory()?;
        sqlite.bootstrap(&tables)?;
        let backend: Box<dyn TableBackend> = Box::new(sqlite);
        let store = Store::new(backend, tables)?;
        seed_demo(&store, DEMO_SEED, DEMO_TABS).context("seed demo tabs")?;
        return Ok(store);
    }

    let credentials = config.credentials()?;
    let rest = RestBackend::new(&credentials.url, &credentials.key, config.timeout()?)
        .with_context(|| format!("configure store client for {}", credentials.url))?;
    let backend: Box<dyn TableBackend> = Box::new(rest);
    Store::new(backend, tables)
}

fn seed_demo<B: TableBackend>(store: &Store<B>, seed: u64, count: usize) -> Result<()> {
    let mut faker = TabFaker::new(seed);
    for tab in faker.tabs(count) {
        let Some(customer) = store.create_customer(&tab.name)? else {
            continue;
        };
        for order in &tab.orders {
            store.upsert_order(customer.id, &customer.name, order)?;
        }
        if let Some(memo) = &tab.memo {
            store.update_customer(customer.id, &customer.name, memo)?;
        }
        if tab.settled {
            store.mark_settled(customer.id)?;
        }
    }
    tracing::debug!(seed, count, "seeded demo tabs");
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
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
            "--print-config-path" => {
                options.print_config_path = true;
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
    println!("mikapi - cafe tab ledger");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with seeded demo tabs (in-memory)");
    println!("  --check                  Validate config and reach the store, then exit");
    println!("  --help                   Show this help");
    println!();
    println!("  {}, {}: store URL and key", config::URL_ENV, config::KEY_ENV);
    println!("  {}: log filter, for example mikapi_db=debug", logging::LOG_ENV);
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Config, DEMO_SEED, DEMO_TABS, open_store, parse_cli_args, seed_demo};
    use anyhow::Result;
    use mikapi_db::{SqliteBackend, Store, TableNames};
    use mikapi_testkit::TabFaker;
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/mikapi-config.toml")
    }

    #[test]
    fn parse_cli_args_defaults_to_provided_config_path() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                demo: false,
                print_example: false,
                check_only: false,
                show_help: false,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--print-path"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_check_and_demo_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check", "--demo"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.demo);
        assert!(!options.show_help);
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_help_flag_for_long_and_short_variants() -> Result<()> {
        let long = parse_cli_args(vec!["--help"], default_options_path())?;
        assert!(long.show_help);

        let short = parse_cli_args(vec!["-h"], default_options_path())?;
        assert!(short.show_help);
        Ok(())
    }

    #[test]
    fn seed_demo_fills_both_lists() -> Result<()> {
        let tables = TableNames::default();
        let backend = SqliteBackend::open_memory()?;
        backend.bootstrap(&tables)?;
        let store = Store::new(backend, tables)?;

        seed_demo(&store, DEMO_SEED, DEMO_TABS)?;

        let open = store.list_customers(false)?;
        let settled = store.settlement_summaries()?;
        assert!(!open.is_empty());
        assert!(!settled.is_empty());
        let expected = TabFaker::new(DEMO_SEED).tabs(DEMO_TABS).len();
        assert_eq!(open.len() + settled.len(), expected);
        for summary in &settled {
            assert!(!summary.orders.is_empty());
            assert!(summary.total > 0);
        }
        Ok(())
    }

    #[test]
    fn demo_store_needs_no_credentials() -> Result<()> {
        let store = open_store(&Config::default(), true)?;
        store.ping()?;
        assert!(!store.list_customers(false)?.is_empty());
        Ok(())
    }
}
