use std::path;
use std::process;

use bytesize::ByteSize;
use clap::ArgEnum;
use env_logger;
use log;

use ext_merge_sort::buffer::mem::MemoryLimitedBufferBuilder;
use ext_merge_sort::generator;
use ext_merge_sort::{ChunkBufferBuilder, ExternalSorterBuilder, LimitedBufferBuilder, Line, SortError};

fn main() {
    let arg_parser = build_arg_parser();

    match arg_parser.subcommand() {
        Some(("sort", args)) => run_sort(args),
        Some(("generate", args)) => run_generate(args),
        _ => unreachable!("subcommand is required"),
    }
}

fn run_sort(args: &clap::ArgMatches) {
    let log_level: LogLevel = args.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let input = path::Path::new(args.value_of("input").expect("value is required"));
    let output = path::Path::new(args.value_of("output").expect("value is required"));
    let chunk_size: usize = args.value_of_t_or_exit("chunk_size");

    let options = SorterOptions {
        tmp_dir: args.value_of("tmp_dir").map(path::Path::new),
        rw_buf_size: args.value_of("rw_buf_size").map(parse_size),
        keep_tmp_dir: args.is_present("keep_tmp"),
    };

    let result = match args.value_of("chunk_memory").map(parse_size) {
        Some(chunk_memory) => {
            log::info!("chunk memory limit: {}", ByteSize(chunk_memory as u64));
            options.sort(MemoryLimitedBufferBuilder::new(chunk_memory as u64), input, output)
        }
        None => {
            log::info!("chunk size: {} lines", chunk_size);
            options.sort(LimitedBufferBuilder::new(chunk_size, true), input, output)
        }
    };

    if let Err(err) = result {
        log::error!("data sorting error: {}", err);
        process::exit(1);
    }
}

struct SorterOptions<'a> {
    tmp_dir: Option<&'a path::Path>,
    rw_buf_size: Option<usize>,
    keep_tmp_dir: bool,
}

impl SorterOptions<'_> {
    fn sort<B>(&self, buffer_builder: B, input: &path::Path, output: &path::Path) -> Result<(), SortError>
    where
        B: ChunkBufferBuilder<Line>,
    {
        let mut sorter_builder = ExternalSorterBuilder::new()
            .with_buffer(buffer_builder)
            .with_keep_tmp_dir(self.keep_tmp_dir);

        if let Some(tmp_dir) = self.tmp_dir {
            sorter_builder = sorter_builder.with_tmp_dir(tmp_dir);
        }

        if let Some(rw_buf_size) = self.rw_buf_size {
            sorter_builder = sorter_builder.with_rw_buf_size(rw_buf_size);
        }

        let summary = sorter_builder.build().sort(input, output)?;
        log::info!("{} sorted into {} ({} lines)", input.display(), output.display(), summary.lines);

        return Ok(());
    }
}

fn run_generate(args: &clap::ArgMatches) {
    let log_level: LogLevel = args.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let output = path::Path::new(args.value_of("output").expect("value is required"));
    let lines: u64 = args.value_of_t_or_exit("lines");
    let max_length: usize = args.value_of_t_or_exit("rowlen");

    log::info!("generating {} lines into {}", lines, output.display());
    if let Err(err) = generator::generate_file(output, lines, max_length) {
        log::error!("file generation error: {}", err);
        process::exit(1);
    }
    log::info!("file {} generated", output.display());
}

fn parse_size(value: &str) -> usize {
    value.parse::<ByteSize>().expect("value is pre-validated").as_u64() as usize
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn log_level_arg() -> clap::Arg<'static> {
    clap::Arg::new("log_level")
        .short('l')
        .long("loglevel")
        .help("logging level")
        .takes_value(true)
        .default_value("info")
        .possible_values(LogLevel::possible_values())
}

fn size_validator(value: &str) -> Result<(), String> {
    match value.parse::<ByteSize>() {
        Ok(_) => Ok(()),
        Err(err) => Err(format!("size format incorrect: {}", err)),
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("ext-merge-sort")
        .about("external merge sort of text files")
        .setting(clap::AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            clap::App::new("sort")
                .about("sort lines of a file")
                .arg(
                    clap::Arg::new("input")
                        .short('i')
                        .long("input")
                        .help("file to be sorted")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("result file")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("chunk_size")
                        .short('c')
                        .long("chunk-size")
                        .help("number of lines in a chunk")
                        .takes_value(true)
                        .default_value("1000"),
                )
                .arg(
                    clap::Arg::new("chunk_memory")
                        .short('m')
                        .long("chunk-memory")
                        .help("chunk memory limit, overrides chunk size")
                        .takes_value(true)
                        .validator(size_validator),
                )
                .arg(
                    clap::Arg::new("tmp_dir")
                        .short('d')
                        .long("tmp-dir")
                        .help("directory to be used to store temporary data")
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("rw_buf_size")
                        .short('b')
                        .long("rw-buf-size")
                        .help("temporary files read/write buffer size")
                        .takes_value(true)
                        .validator(size_validator),
                )
                .arg(
                    clap::Arg::new("keep_tmp")
                        .short('k')
                        .long("keep-tmp")
                        .help("keep temporary data if sorting fails"),
                )
                .arg(log_level_arg()),
        )
        .subcommand(
            clap::App::new("generate")
                .about("generate a file of random lines")
                .arg(
                    clap::Arg::new("output")
                        .short('o')
                        .long("output")
                        .help("file to be generated")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    clap::Arg::new("lines")
                        .short('n')
                        .long("lines")
                        .help("number of lines")
                        .takes_value(true)
                        .default_value("10000"),
                )
                .arg(
                    clap::Arg::new("rowlen")
                        .short('r')
                        .long("rowlen")
                        .help("maximum line length")
                        .takes_value(true)
                        .default_value("256"),
                )
                .arg(log_level_arg()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
