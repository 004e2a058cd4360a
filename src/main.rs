
extern crate clap;
#[macro_use] extern crate log;
extern crate fern;
extern crate chrono;
extern crate term_grid;

use clap::{Arg, ArgMatches, App};
use term_grid::{Grid, GridOptions, Direction, Filling, Cell};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use stasm::assembler;

fn main() {
    let args = process_arguments();
    initialize_logging(args.occurrences_of("verbose"));

    debug!("Arguments:\n\tVerbosity: {}\n\tOutfile: {}\n\tInfile: {}",
        match args.occurrences_of("verbose") {
            0 => log::LevelFilter::Error.to_string(),
            1 => log::LevelFilter::Warn.to_string(),
            2 => log::LevelFilter::Info.to_string(),
            3 | _ => log::LevelFilter::Debug.to_string(),
        },
        args.value_of("output").unwrap_or("None"),
        args.value_of("INPUT").unwrap()
    );

    let ipath = Path::new(args.value_of("INPUT").unwrap());

    // Pass 1 and pass 2, producing the populated assembly unit.
    let unit = match assembler::parse_file(ipath) {
        Err(err) => {
            error!("fatal: unable to assemble `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        }
        Ok(unit) => unit,
    };
    info!("parsed {} instruction(s), {} symbol(s), {} data entr(ies)",
        unit.instructions.len(), unit.symbols.len(), unit.data.len());

    if args.is_present("print-debug") {
        print_listing(&unit);
    }

    // Serialize the unit into the object byte stream.
    let object = match assembler::emitter::emit_object(&unit) {
        Err(err) => {
            error!("fatal: unable to emit object for `{}`: {}", ipath.display(), err);
            std::process::exit(1);
        }
        Ok(bytes) => bytes,
    };
    info!("emitted {} object byte(s)", object.len());

    let opath = if let Some(filename) = args.value_of("output") {
        PathBuf::from(filename)
    } else {
        Path::new(ipath.file_stem().unwrap_or_else(|| ipath.as_os_str())).with_extension("o")
    };

    let mut ofile = match File::create(&opath) {
        Err(err) => {
            error!("fatal: unable to open output file `{}`: {}", opath.display(), err);
            std::process::exit(1);
        },
        Ok(file) => file,
    };

    if let Err(err) = ofile.write_all(&object) {
        error!("fatal: unable to write to output file `{}`: {}", opath.display(), err);
        std::process::exit(1);
    }
}

/// Prints an instruction listing: index, source form, and the encoded
/// bytes (global references show their zero placeholders).
fn print_listing(unit: &assembler::ast::AssemblyUnit) {
    let mut grid = Grid::new(GridOptions {
        filling:     Filling::Spaces(1),
        direction:   Direction::LeftToRight,
    });

    for (idx, ins) in unit.instructions.iter().enumerate() {
        let encoded = match ins.encode(&unit.symbols) {
            Ok((bytes, _)) => bytes
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<String>>()
                .join(" "),
            Err(_) => "<unresolved>".to_string(),
        };
        grid.add(Cell::from(format!("0x{:04X}:", idx)));
        grid.add(Cell::from(format!("{}", ins)));
        grid.add(Cell::from("=>".to_string()));
        grid.add(Cell::from(encoded));
    }

    println!("{}", grid.fit_into_columns(4));
}

fn process_arguments() -> ArgMatches<'static> {
    App::new(option_env!("CARGO_PKG_NAME").unwrap())
        .version(option_env!("CARGO_PKG_VERSION").unwrap())
        .about(option_env!("CARGO_PKG_DESCRIPTION").unwrap())
        .arg(Arg::with_name("INPUT")
            .help("Sets the input file to use")
            .required(true)
            .multiple(false)
            .index(1))
        .arg(Arg::with_name("verbose")
            .short("v")
            .multiple(true)
            .takes_value(false)
            .help("Sets the level of verbosity"))
        .arg(Arg::with_name("output")
            .short("o")
            .takes_value(true)
            .help("write output to an outfile"))
        .arg(Arg::with_name("print-debug")
            .short("d")
            .alias("show")
            .alias("s")
            .takes_value(false)
            .help("prints the instruction listing alongside the assembly to STDOUT"))
        .get_matches()
}

fn initialize_logging(verbosity: u64) {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(match verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 | _ => log::LevelFilter::Debug,
        })
        .chain(std::io::stdout())
        .apply().ok();
}
