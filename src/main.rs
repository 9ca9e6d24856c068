#[cfg(not(feature = "cli"))]
compile_error!("The `ibspace` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use std::fs::File;
use std::io::Write;
use std::process;

use ibs::cli;
use ibs::cli::app::{Cli, ColorMode, Commands};
use ibs::cli::space::SpaceOptions;
use ibs::IbsError;

fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, IbsError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| IbsError::Io(format!("cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Summary {
            file,
            page_size,
            json,
        } => cli::space::summary(
            &SpaceOptions {
                file,
                page_size,
                json,
            },
            &mut writer,
        ),

        Commands::Extents {
            file,
            page_size,
            json,
        } => cli::space::extents(
            &SpaceOptions {
                file,
                page_size,
                json,
            },
            &mut writer,
        ),

        Commands::Inodes {
            file,
            page_size,
            json,
        } => cli::space::inodes(
            &SpaceOptions {
                file,
                page_size,
                json,
            },
            &mut writer,
        ),

        Commands::Indexes {
            file,
            page_size,
            json,
        } => cli::space::indexes(
            &SpaceOptions {
                file,
                page_size,
                json,
            },
            &mut writer,
        ),

        Commands::List {
            file,
            list,
            page_size,
            json,
        } => cli::space::list(
            &SpaceOptions {
                file,
                page_size,
                json,
            },
            &list,
            &mut writer,
        ),

        Commands::Dump {
            file,
            page,
            page_size,
        } => cli::page::dump(&file, page, page_size, &mut writer),

        Commands::Account {
            file,
            page,
            page_size,
            json,
        } => cli::page::account(&file, page, page_size, json, &mut writer),

        Commands::Recurse {
            file,
            page,
            describer,
            dot,
            page_size,
        } => cli::index::recurse(&file, page, &describer, dot, page_size, &mut writer),

        Commands::Level {
            file,
            page,
            level,
            describer,
            page_size,
        } => cli::index::level(&file, page, level, &describer, page_size, &mut writer),

        Commands::Log { file, json } => cli::log::blocks(&file, json, &mut writer),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
