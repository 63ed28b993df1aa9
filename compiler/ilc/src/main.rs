//! The `ilc` binary.

use ilc::{compile_file, emit, parse_build_options, summary, DriverError};

fn print_usage() {
    eprintln!("Usage: ilc <input.json> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -o <path>           Output file (default: stdout)");
    eprintln!("  --module=<name>     Module name (default: input file stem)");
    eprintln!("  --opt=<level>       Optimization: 0, 1, 2, 3 (also -O<level>)");
    eprintln!("  -v, --verbose       Verbose output");
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let options = match parse_build_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {err}");
            if matches!(err, DriverError::Usage(_)) {
                eprintln!();
                print_usage();
            }
            std::process::exit(2);
        }
    };
    ilc_codegen::init_tracing(options.verbose);

    let result = compile_file(&options).and_then(|compiled| {
        for skipped in &compiled.report.skipped {
            eprintln!("warning: skipped `{}`: {}", skipped.name, skipped.reason);
        }
        let text = emit(&compiled, &options)?;
        Ok((summary(&compiled.report), text))
    });
    match result {
        Ok((line, text)) => {
            if let Some(text) = text {
                print!("{text}");
            }
            if options.verbose {
                eprintln!("{line}");
            }
        }
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}
