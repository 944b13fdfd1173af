//! Command line front end for tabl
//!
//! `tabl sort` orders a delimited file by one or more columns, `tabl export`
//! projects columns, and `tabl csv2tab` converts comma separated input to
//! tab-delimited output.

use clap::{Arg, ArgAction, ArgMatches, Command};
use env_logger::Env;
use std::fs::File;
use std::io::{self, Write};
use std::process;

use tabl::{
    args::{InputArgs, SortArgs},
    bufread::STDIN_NAME,
    column::parse_column_list,
    error::{TablContext, TablResult},
    writer::{csv_to_tab, export},
    ExternalSorter, RecordParser, UnparsablePolicy, EXIT_SUCCESS,
};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("tabl: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn run() -> TablResult<i32> {
    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("sort", sub)) => run_sort(&parse_sort_args(sub)?),
        Some(("export", sub)) => {
            let input = parse_input_args(sub);
            let columns = sub
                .get_one::<String>("columns")
                .map(String::as_str)
                .unwrap_or_default();
            run_export(&input, columns, sub.get_one::<String>("output"))
        }
        Some(("csv2tab", sub)) => {
            let mut input = parse_input_args(sub);
            input.csv = true;
            run_csv_to_tab(&input, sub.get_one::<String>("output"))
        }
        _ => Ok(EXIT_SUCCESS),
    }
}

fn run_sort(args: &SortArgs) -> TablResult<i32> {
    let file_config = args.input.file_config()?;
    let config = args.sort_config()?;
    let parser = RecordParser::open(&args.input.file, file_config)?;

    let out = open_output(args.output.as_ref())?;
    let stats = ExternalSorter::new(config).sort(parser, out)?;
    log::info!("sorted {} records using {} runs", stats.records, stats.runs);
    Ok(EXIT_SUCCESS)
}

fn run_export(input: &InputArgs, columns: &str, output: Option<&String>) -> TablResult<i32> {
    let columns = parse_column_list(columns)?;
    let mut parser = RecordParser::open(&input.file, input.file_config()?)?;
    export(&mut parser, &columns, input.show_comments, open_output(output)?)?;
    Ok(EXIT_SUCCESS)
}

fn run_csv_to_tab(input: &InputArgs, output: Option<&String>) -> TablResult<i32> {
    let mut parser = RecordParser::open(&input.file, input.file_config()?)?;
    csv_to_tab(&mut parser, input.show_comments, open_output(output)?)?;
    Ok(EXIT_SUCCESS)
}

/// `-o FILE` or standard output
fn open_output(output: Option<&String>) -> TablResult<Box<dyn Write>> {
    Ok(match output {
        Some(path) => Box::new(File::create(path).with_file_context(path)?),
        None => Box::new(io::stdout().lock()),
    })
}

fn input_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("file")
                .help("Input file, '-' for stdin (gzip is detected automatically)")
                .value_name("FILE")
                .default_value(STDIN_NAME),
        )
        .arg(
            Arg::new("csv")
                .long("csv")
                .help("Input is comma separated with double quotes")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-header")
                .long("no-header")
                .help("The file has no header; columns are named col1, col2, ...")
                .conflicts_with("header-comment")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("header-comment")
                .long("header-comment")
                .help("The header is the last comment line before the data")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("show-comments")
                .short('H')
                .long("show-comments")
                .help("Copy comment lines to the output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("buffer-size")
                .short('B')
                .long("buffer-size")
                .help("Size in bytes of each read buffer")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("Write result to FILE instead of standard output")
                .value_name("FILE"),
        )
}

fn sort_command() -> Command {
    Command::new("sort")
        .about("Sort a table by one or more columns")
        .arg(
            Arg::new("key")
                .short('k')
                .long("key")
                .help("Sort by COLS; suffix :n for numeric, :r for reverse")
                .long_help("Sort by COLS, a comma separated list of 1-based indices, ranges (2-4) or column names. A :n suffix compares as numbers, :r reverses the order, :nr does both. Repeat -k to add tie-breaking keys.\n\nExamples:\n  -k 1        sort by the first column\n  -k score:nr highest score first\n  -k 2 -k 1   by column 2, then column 1")
                .value_name("COLS")
                .required(true)
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("sort-buffer")
                .short('S')
                .long("sort-buffer")
                .help("Number of records sorted in memory per temporary run")
                .value_name("N")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("temporary-directory")
                .short('T')
                .long("temporary-directory")
                .help("Use DIR for temporaries, not $TMPDIR or /tmp")
                .value_name("DIR"),
        )
        .arg(
            Arg::new("unparsable")
                .long("unparsable")
                .help("Placement of non-numeric values in numeric keys")
                .value_name("POLICY")
                .value_parser(["low", "high", "error"])
                .default_value("low"),
        )
}

fn build_cli() -> Command {
    Command::new("tabl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Sort, project and convert delimited text tables")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(input_args(sort_command()))
        .subcommand(input_args(
            Command::new("export")
                .about("Write selected columns")
                .arg(
                    Arg::new("columns")
                        .help("Columns to write, e.g. 1,3-5,name")
                        .value_name("COLS")
                        .required(true),
                ),
        ))
        .subcommand(input_args(
            Command::new("csv2tab").about("Convert a CSV file to tab-delimited text"),
        ))
}

fn parse_input_args(matches: &ArgMatches) -> InputArgs {
    InputArgs {
        file: matches
            .get_one::<String>("file")
            .cloned()
            .unwrap_or_else(|| STDIN_NAME.to_string()),
        csv: matches.get_flag("csv"),
        no_header: matches.get_flag("no-header"),
        header_comment: matches.get_flag("header-comment"),
        show_comments: matches.get_flag("show-comments"),
        buffer_size: matches.get_one::<usize>("buffer-size").copied(),
    }
}

fn parse_sort_args(matches: &ArgMatches) -> TablResult<SortArgs> {
    let unparsable = match matches.get_one::<String>("unparsable") {
        Some(policy) => policy.parse::<UnparsablePolicy>()?,
        None => UnparsablePolicy::default(),
    };

    Ok(SortArgs {
        input: parse_input_args(matches),
        keys: matches
            .get_many::<String>("key")
            .unwrap_or_default()
            .cloned()
            .collect(),
        sort_buffer_size: matches.get_one::<usize>("sort-buffer").copied(),
        temp_dir: matches.get_one::<String>("temporary-directory").cloned(),
        unparsable,
        output: matches.get_one::<String>("output").cloned(),
    })
}
