//! Logger initialisation and export of iteration traces (tables and CSV).
use crate::numerical::iteration::{IterationRecord, TraceRow};
use chrono::Local;
use csv::Writer;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::io;
use std::path::Path;
use tabled::{builder::Builder, settings::Style};

/// `log_YYYY-MM-DD_HH-MM-SS.txt` in the working directory
pub fn stamped_log_name() -> String {
    let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("log_{}.txt", date_and_time)
}

/// Terminal logger plus an optional file logger. Returns false when a global logger
/// was already installed (the first one wins) or nothing was requested.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> bool {
    if level == LevelFilter::Off {
        return false;
    }
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(filename) = log_file {
        match File::create(filename) {
            Ok(file) => loggers.push(WriteLogger::new(level, Config::default(), file)),
            Err(e) => eprintln!("cannot create log file {}: {}", filename, e),
        }
    }
    CombinedLogger::init(loggers).is_ok()
}

fn trace_headers<S: TraceRow>(trace: &[IterationRecord<S>]) -> Vec<String> {
    let mut headers = vec!["iteration".to_string()];
    if let Some(first) = trace.first() {
        headers.extend(first.state.headers());
    }
    headers.push("error".to_string());
    headers
}

fn trace_record<S: TraceRow>(record: &IterationRecord<S>) -> Vec<String> {
    let mut row = vec![record.iteration.to_string()];
    row.extend(record.state.values().iter().map(|v| v.to_string()));
    row.push(if record.error.is_nan() {
        String::new()
    } else {
        record.error.to_string()
    });
    row
}

/// Pretty table of a trace, one line per recorded iteration
pub fn trace_table<S: TraceRow>(trace: &[IterationRecord<S>]) -> String {
    let mut builder = Builder::default();
    builder.push_record(trace_headers(trace));
    for record in trace {
        builder.push_record(trace_record(record));
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

pub fn save_trace_to_csv<S: TraceRow, P: AsRef<Path>>(
    trace: &[IterationRecord<S>],
    filename: P,
) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);
    writer.write_record(trace_headers(trace))?;
    for record in trace {
        writer.write_record(trace_record(record))?;
    }
    writer.flush()?;
    Ok(())
}
