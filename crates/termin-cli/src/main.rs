// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result, anyhow};
use config::Config;
use runtime::Backend;
use std::env;
use std::path::PathBuf;
use termin_app::Controller;
use tracing::info;

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
            "load config {}; run `termin --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = config.log_path()?;
    logging::init_logging(config.log_level(), &log_path).with_context(|| {
        format!(
            "initialize logging at {}; set [logging].path or TERMIN_LOG_PATH",
            log_path.display()
        )
    })?;

    let backend = Backend::connect(&config, options.demo)?;
    if options.check_only {
        let summary = runtime::check(&backend).with_context(|| {
            format!(
                "check {} -- verify [server].base_url in {}",
                backend.describe(),
                options.config_path.display()
            )
        })?;
        println!("ok: {summary}");
        return Ok(());
    }

    if let Some(dataset) = &options.print_page {
        print!("{}", runtime::print_page(backend, config.page_size(), dataset)?);
        return Ok(());
    }

    info!(backend = %backend.describe(), page_size = config.page_size(), "starting ui");
    let mut controller = Controller::new(backend, config.page_size());
    termin_tui::run_app(&mut controller)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    print_page: Option<String>,
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
        print_page: None,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--print-page" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow!("--print-page requires a dataset, for example 202405")
                })?;
                options.print_page = Some(value.as_ref().to_owned());
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
                return Err(anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("termin: review imported report files per period");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --print-page <dataset>   Print page 1 of a dataset as HTML and exit");
    println!("  --demo                   Use seeded in-memory data instead of the server");
    println!("  --check                  Validate config and server reachability");
    println!("  --help                   Show this help");
}
