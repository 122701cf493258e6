#![cfg(not(tarpaulin_include))]

use risk_dashboard::config::Config;
use risk_dashboard::dashboard::DashboardView;
use risk_dashboard::downloader::{self, PDF_FILENAME, XLSX_FILENAME};
use risk_dashboard::filter::FilterSelection;
use risk_dashboard::graph;
use risk_dashboard::i18n::Locale;
use risk_dashboard::{loader, saving};
use log::info;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "Usage: risk-cli <input.xlsx> [--lang fa|en] [--level L]... [--type T]... \
[--keyword K] [--out DIR] [--db FILE] [--no-db]";

struct Options {
    input: PathBuf,
    locale: Locale,
    levels: Vec<String>,
    types: Vec<String>,
    keyword: Option<String>,
    out_dir: PathBuf,
    db_path: PathBuf,
    persist: bool,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut input = None;
    let mut options = Options {
        input: PathBuf::new(),
        locale: Locale::default(),
        levels: Vec::new(),
        types: Vec::new(),
        keyword: None,
        out_dir: PathBuf::from("."),
        db_path: Config::from_env().db_path,
        persist: true,
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("missing value for {}", flag))
        };
        match arg.as_str() {
            "--lang" => options.locale = value("--lang")?.parse()?,
            "--level" => options.levels.push(value("--level")?),
            "--type" => options.types.push(value("--type")?),
            "--keyword" => options.keyword = Some(value("--keyword")?),
            "--out" => options.out_dir = PathBuf::from(value("--out")?),
            "--db" => options.db_path = PathBuf::from(value("--db")?),
            "--no-db" => options.persist = false,
            flag if flag.starts_with("--") => return Err(format!("unknown option {}", flag)),
            path => {
                if input.replace(PathBuf::from(path)).is_some() {
                    return Err("only one input file can be given".to_string());
                }
            }
        }
    }

    options.input = input.ok_or_else(|| "no input file".to_string())?;
    Ok(options)
}

/// Headless run of the dashboard pipeline
///
/// Loads a workbook, applies the same filters the web sidebar offers, prints
/// the summary and writes every export next to each other in `--out`.
fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("{}", USAGE);
            return Ok(ExitCode::FAILURE);
        }
    };

    let texts = options.locale.texts();
    let table = match loader::load_path(&options.input) {
        Ok(table) => table,
        Err(e) => {
            eprintln!("{} ({})", texts.load_failed, e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut selection = FilterSelection::default();
    if !options.levels.is_empty() {
        selection = selection.with_levels(options.levels);
    }
    if !options.types.is_empty() {
        selection = selection.with_types(options.types);
    }
    if let Some(keyword) = options.keyword {
        selection = selection.with_keyword(keyword);
    }

    let view = DashboardView::build(&table, &selection, texts);
    println!("{}: {}", texts.total, view.summary.total);
    println!("{}: {}", texts.high, view.summary.high_count);
    println!("{}: {}", texts.percent_high, view.summary.percent_display());

    fs::create_dir_all(&options.out_dir)?;
    let config = Config::default();

    fs::write(options.out_dir.join(XLSX_FILENAME), downloader::to_xlsx(&view.filtered)?)?;
    let date_line = format!(
        "{}: {}",
        texts.report_date,
        chrono::Local::now().format("%Y-%m-%d")
    );
    fs::write(
        options.out_dir.join(PDF_FILENAME),
        downloader::to_pdf(&view.filtered, texts.report_title, &date_line)?,
    )?;

    if let Some(pie) = &view.pie {
        fs::write(options.out_dir.join("pie.png"), graph::render_png(pie, &config.pie)?)?;
    }
    if let Some(bar) = &view.bar {
        fs::write(options.out_dir.join("bar.png"), graph::render_png(bar, &config.bar)?)?;
    }
    info!("exports written to {}", options.out_dir.display());

    if options.persist {
        let name = saving::persist(&view.filtered, &options.db_path)?;
        println!("{} {}", texts.saved_to_db, name);
    }

    Ok(ExitCode::SUCCESS)
}
