use clap::{value_t, App, Arg, ArgMatches};
use lindenmayer::raster::{ImageFileSink, PpmSink, RasterSink};
use lindenmayer::{
    Backend, Curve, MessagePassing, Palette, RenderConfig, RenderError, Renderer, SharedMemory,
    Transfer,
};
use std::io;
use std::str::FromStr;
use tracing_subscriber::EnvFilter;

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const CURVE: &str = "curve";
const ITERATIONS: &str = "iterations";
const SCALE: &str = "scale";
const COLORING: &str = "coloring";
const UNITS: &str = "units";
const BACKEND: &str = "backend";
const BOOTSTRAP: &str = "bootstrap";
const VERBOSE: &str = "verbose";

const SEQUENTIAL: &str = "sequential";
const THREADS: &str = "threads";
const BATCH: &str = "batch";
const STREAMING: &str = "streaming";

fn args<'a>() -> ArgMatches<'a> {
    let curves = Curve::ALL
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{} = {}", i, c))
        .collect::<Vec<_>>()
        .join(", ");
    let curve_help = format!("Curve to draw, by name or number ({})", curves);

    App::new("lindenmayer")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("L-system fractal curve renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file; .ppm and .pnm are written as binary PPM, '-' writes PPM to stdout"),
        )
        .arg(
            Arg::with_name(CURVE)
                .required(false)
                .long(CURVE)
                .short("c")
                .takes_value(true)
                .default_value("dragon")
                .validator(|s| Curve::from_str(&s).map(|_| ()))
                .help(&curve_help),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("n")
                .takes_value(true)
                .default_value("10")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        32,
                        "Could not parse iteration count",
                        "Iteration count must be between 0 and 32",
                    )
                })
                .help("Rounds of rewriting"),
        )
        .arg(
            Arg::with_name(SCALE)
                .required(false)
                .long(SCALE)
                .short("s")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        64,
                        "Could not parse scale",
                        "Scale must be between 1 and 64",
                    )
                })
                .help("Pixels per step of the turtle"),
        )
        .arg(
            Arg::with_name(COLORING)
                .required(false)
                .long(COLORING)
                .short("k")
                .takes_value(true)
                .default_value("hsv")
                .validator(|s| Palette::from_str(&s).map(|_| ()))
                .help("Coloring: hsv (0) or christmas (1)"),
        )
        .arg(
            Arg::with_name(UNITS)
                .required(false)
                .long(UNITS)
                .short("u")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        4096,
                        "Could not parse unit count",
                        "Unit count must be between 1 and 4096",
                    )
                })
                .help("Number of pieces to split the curve into [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(BACKEND)
                .required(false)
                .long(BACKEND)
                .short("b")
                .takes_value(true)
                .possible_values(&[SEQUENTIAL, THREADS, BATCH, STREAMING])
                .default_value(THREADS)
                .help("How the pieces are drawn and merged"),
        )
        .arg(
            Arg::with_name(BOOTSTRAP)
                .required(false)
                .long(BOOTSTRAP)
                .takes_value(true)
                .default_value("3")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        32,
                        "Could not parse bootstrap depth",
                        "Bootstrap depth must be between 0 and 32",
                    )
                })
                .help("Rounds of rewriting done before splitting"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .short("v")
                .multiple(true)
                .help("Log progress to stderr; repeat for more"),
        )
        .get_matches()
}

fn init_logging(verbosity: u64) {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        _ => EnvFilter::new("debug"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(matches: &ArgMatches) -> Result<(), RenderError> {
    let curve = value_t!(matches, CURVE, Curve).unwrap_or_else(|e| e.exit());
    let palette = value_t!(matches, COLORING, Palette).unwrap_or_else(|e| e.exit());
    let config = RenderConfig {
        depth: value_t!(matches, ITERATIONS, usize).unwrap_or_else(|e| e.exit()),
        scale: value_t!(matches, SCALE, u32).unwrap_or_else(|e| e.exit()),
        units: match matches.value_of(UNITS) {
            Some(_) => value_t!(matches, UNITS, usize).unwrap_or_else(|e| e.exit()),
            None => num_cpus::get(),
        },
        bootstrap_depth: value_t!(matches, BOOTSTRAP, usize).unwrap_or_else(|e| e.exit()),
    };

    let renderer = Renderer::new(curve.grammar()?, config)?;
    let rendered = match matches.value_of(BACKEND).unwrap_or(THREADS) {
        SEQUENTIAL => renderer.render_sequential(&palette)?,
        mode => {
            let backend: Box<dyn Backend> = match mode {
                BATCH => Box::new(MessagePassing {
                    transfer: Transfer::Batch,
                }),
                STREAMING => Box::new(MessagePassing {
                    transfer: Transfer::Streaming,
                }),
                _ => Box::new(SharedMemory { threads: 0 }),
            };
            renderer.render(backend.as_ref(), &palette)?
        }
    };

    match matches.value_of(OUTPUT).unwrap_or("-") {
        "-" => {
            let stdout = io::stdout();
            let mut sink = PpmSink(io::BufWriter::new(stdout.lock()));
            sink.consume(&rendered.raster)
        }
        path => ImageFileSink::new(path).consume(&rendered.raster),
    }
}

fn main() {
    let matches = args();
    init_logging(matches.occurrences_of(VERBOSE));
    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
