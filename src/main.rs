use std::process::ExitCode;

use clap::Parser;
use landuse_mcp::{CliArgs, ErrorFormat};

fn main() -> ExitCode {
    // stdout carries the MCP transport.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = CliArgs::parse();

    let err_hook: Option<miette::ErrorHook> = match args.get_error_format() {
        ErrorFormat::Human => None,
        ErrorFormat::Plain => Some(Box::new(|_| {
            Box::new(miette::NarratableReportHandler::new())
        })),
        ErrorFormat::Json => Some(Box::new(|_| Box::new(miette::JSONReportHandler::new()))),
    };
    if let Some(err_hook) = err_hook {
        if miette::set_hook(err_hook).is_err() {
            log::warn!("error report hook already installed");
        }
    }

    match args.exec() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = miette::Report::new(err);
            eprintln!("{report:?}");
            ExitCode::FAILURE
        }
    }
}
