extern crate log;
extern crate pretty_env_logger;

use std::path::{Path, PathBuf};
use std::process::exit;

use clap::{arg, command, value_parser, ArgMatches, Command};

use crate::config::GradingConfig;
use crate::debug::{write_sheet_debug_image, ImageDebugWriter};
use crate::export::export_report_bubbles;
use crate::interpret::{grade, GradeReport};

mod calibration;
mod classify;
mod config;
mod debug;
mod export;
mod features;
mod geometry;
mod hough;
mod image_utils;
mod interpret;
mod rows;
mod score;
#[cfg(test)]
mod test_utils;
mod types;

fn main() {
    pretty_env_logger::init_custom_env("LOG");

    let matches = cli().get_matches();
    let template_path = required_path(&matches, "template_path");
    let key_path = required_path(&matches, "key_path");
    let student_path = required_path(&matches, "student_path");

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    let template = read_image_bytes(&template_path);
    let key = read_image_bytes(&key_path);
    let student = read_image_bytes(&student_path);

    let report = match grade(&template, &key, &student, &config) {
        Ok(report) => report,
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(1);
        }
    };

    write_debug_images(
        &report,
        [&template_path, &key_path, &student_path],
        &config,
        matches.get_flag("debug"),
    );

    if let Some(export_dir) = matches.get_one::<PathBuf>("export_dir") {
        match export_report_bubbles(export_dir, &report) {
            Ok(paths) => {
                for path in paths {
                    log::info!("exported {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("Error exporting bubbles: {}", e);
                exit(1);
            }
        }
    }

    if matches.get_flag("json") {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error serializing report: {}", e);
                exit(1);
            }
        }
    } else {
        print_report(&report, &config);
    }
}

fn cli() -> Command {
    command!()
        .arg(
            arg!(-c --config <PATH> "Path to a grading config JSON file")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(-q --questions <COUNT> "Number of questions on the sheet")
                .required(false)
                .value_parser(value_parser!(u32)),
        )
        .arg(
            arg!(-o --options <COUNT> "Options per question")
                .required(false)
                .value_parser(value_parser!(u32)),
        )
        .arg(arg!(-p --parallel "Spread the template calibration search over all cores"))
        .arg(arg!(-d --debug "Write annotated images next to the inputs"))
        .arg(arg!(--json "Print the full report as JSON"))
        .arg(
            arg!(--"export-dir" <DIR> "Write per-sheet bubble pixel counts as JSON into DIR")
                .id("export_dir")
                .required(false)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(template_path: <TEMPLATE_IMAGE> "Path to the blank template sheet")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(key_path: <KEY_IMAGE> "Path to the filled answer key sheet")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(student_path: <STUDENT_IMAGE> "Path to the student's sheet")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}

fn required_path(matches: &ArgMatches, id: &str) -> PathBuf {
    match matches.get_one::<PathBuf>(id) {
        Some(path) => path.clone(),
        None => {
            eprintln!("Error: {} is required", id);
            exit(1);
        }
    }
}

/// Starts from the config file (or defaults) and applies command line
/// overrides.
fn load_config(matches: &ArgMatches) -> Result<GradingConfig, config::ConfigError> {
    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => GradingConfig::load(path)?,
        None => GradingConfig::default(),
    };

    if let Some(questions) = matches.get_one::<u32>("questions") {
        config.questions = *questions;
    }
    if let Some(options) = matches.get_one::<u32>("options") {
        config.options = *options;
    }
    if matches.get_flag("parallel") {
        config.parallel_search = true;
    }

    config.validate()?;
    Ok(config)
}

fn read_image_bytes(path: &Path) -> Vec<u8> {
    match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Error reading {}: {}", path.display(), e);
            exit(1);
        }
    }
}

fn write_debug_images(
    report: &GradeReport,
    paths: [&PathBuf; 3],
    config: &GradingConfig,
    debug: bool,
) {
    for (sheet, path) in report.sheets().into_iter().zip(paths) {
        let writer = if debug {
            ImageDebugWriter::new(path.clone(), sheet.image.clone())
        } else {
            ImageDebugWriter::disabled()
        };
        match write_sheet_debug_image(&writer, sheet, config.options as usize) {
            Ok(Some(debug_path)) => log::info!("wrote {}", debug_path.display()),
            Ok(None) => {}
            Err(e) => eprintln!("Error writing debug image for {} sheet: {}", sheet.kind, e),
        }
    }
}

fn print_report(report: &GradeReport, config: &GradingConfig) {
    println!(
        "Total Score: {} / {}",
        report.score.total, config.questions
    );

    let key_answers = report.key.answers.as_deref().unwrap_or_default();
    let student_answers = report.student.answers.as_deref().unwrap_or_default();
    for (i, ((correct, key), student)) in report
        .score
        .per_question
        .iter()
        .zip(key_answers)
        .zip(student_answers)
        .enumerate()
    {
        println!(
            "Q{}: {} (key {}, student {})",
            i + 1,
            if *correct == 1 { "correct" } else { "incorrect" },
            key,
            student
        );
    }
}
