//! Command-line options.

use std::path::PathBuf;

use ilc_ssa::OptLevel;

use crate::DriverError;

/// Options for one `ilc` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    /// Serialized assembly to translate.
    pub input: PathBuf,
    /// Where to write the IR (-o). Stdout when absent.
    pub output: Option<PathBuf>,
    /// Module name (--module=<name>). Defaults to the input file stem.
    pub module: Option<String>,
    /// Optimization level (--opt=<level>, -O<level>).
    pub opt_level: OptLevel,
    /// Verbose output (-v, --verbose)
    pub verbose: bool,
}

impl BuildOptions {
    /// The module name: `--module` if given, else the input's file stem.
    pub fn module_name(&self) -> String {
        if let Some(module) = &self.module {
            return module.clone();
        }
        self.input
            .file_stem()
            .map_or_else(|| "module".to_owned(), |stem| stem.to_string_lossy().into_owned())
    }
}

/// Parse the arguments following the program name.
pub fn parse_build_options(args: &[String]) -> Result<BuildOptions, DriverError> {
    let mut input = None;
    let mut output = None;
    let mut module = None;
    let mut opt_level = OptLevel::default();
    let mut verbose = false;

    let mut i = 0;
    while i < args.len() {
        let arg = args[i].as_str();
        if arg == "-o" {
            let Some(path) = args.get(i + 1) else {
                return Err(DriverError::Usage("`-o` needs a path".to_owned()));
            };
            output = Some(PathBuf::from(path));
            i += 2;
            continue;
        }
        if let Some(name) = arg.strip_prefix("--module=") {
            module = Some(name.to_owned());
        } else if let Some(level) = arg.strip_prefix("--opt=").or_else(|| arg.strip_prefix("-O")) {
            opt_level = level.parse()?;
        } else if arg == "-v" || arg == "--verbose" {
            verbose = true;
        } else if arg.starts_with('-') {
            return Err(DriverError::Usage(format!("unknown option `{arg}`")));
        } else if input.is_none() {
            input = Some(PathBuf::from(arg));
        } else {
            return Err(DriverError::Usage(format!("unexpected argument `{arg}`")));
        }
        i += 1;
    }

    let Some(input) = input else {
        return Err(DriverError::Usage("missing input file".to_owned()));
    };
    Ok(BuildOptions {
        input,
        output,
        module,
        opt_level,
        verbose,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
