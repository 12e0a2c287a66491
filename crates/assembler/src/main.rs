//! CLI entry point for the tpasm binary.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use assembler::assembler::{
    assemble_file, AssembleError, AssembleResult, AssemblerConfig,
};
use isa_core::Width;
#[cfg(test)]
use pretty_assertions as _;
#[cfg(test)]
use tempfile as _;

const USAGE_TEXT: &str = "\
Usage: tpasm <input> [options]

Options:
  -o, --output <file>  Output file path (default: input stem + .bin)
  -m, --mode <bits>    Default operand width: 16, 32, or 64 (default: 32)
  -v, --verbose        Print listing to stderr
  -h, --help           Show this help message

Examples:
  tpasm program.asm
  tpasm program.asm -o program.bin --mode 64
";

#[derive(Debug, PartialEq, Eq)]
struct BuildArgs {
    input: PathBuf,
    output: Option<PathBuf>,
    mode: Width,
    verbose: bool,
}

#[derive(Debug)]
enum ParsedArgs {
    Build(BuildArgs),
    Help,
}

#[allow(clippy::while_let_on_iterator)]
fn parse_args(mut args: impl Iterator<Item = OsString>) -> Result<ParsedArgs, String> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut mode = Width::Dword;
    let mut verbose = false;

    while let Some(arg) = args.next() {
        if arg == "--help" || arg == "-h" {
            return Ok(ParsedArgs::Help);
        }

        if arg == "--verbose" || arg == "-v" {
            verbose = true;
            continue;
        }

        if arg == "-o" || arg == "--output" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for -o".to_string())?;
            output = Some(PathBuf::from(value));
            continue;
        }

        if arg == "-m" || arg == "--mode" {
            let value = args
                .next()
                .ok_or_else(|| "missing value for --mode".to_string())?;
            mode = parse_mode(&value.to_string_lossy())?;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if input.is_some() {
            return Err("multiple input paths provided".to_string());
        }
        input = Some(PathBuf::from(arg));
    }

    let input = input.ok_or_else(|| "missing input path".to_string())?;
    Ok(ParsedArgs::Build(BuildArgs {
        input,
        output,
        mode,
        verbose,
    }))
}

fn parse_mode(value: &str) -> Result<Width, String> {
    match value {
        "16" => Ok(Width::Word),
        "32" => Ok(Width::Dword),
        "64" => Ok(Width::Qword),
        other => Err(format!("invalid mode: {other} (expected 16, 32, or 64)")),
    }
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("out");
    let parent = input.parent().unwrap_or_else(|| Path::new(""));
    parent.join(format!("{stem}.bin"))
}

fn report_assemble_error(e: &AssembleError) {
    if let Some(location) = &e.location {
        eprintln!("{}:{}: error: {}", location.file, location.line, e);
        if !location.text.is_empty() {
            eprintln!("  {}", location.text);
        }
    } else {
        eprintln!("error: {e}");
    }
}

fn print_listing(result: &AssembleResult) {
    for entry in &result.listing {
        let hex_bytes: String = entry
            .bytes
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(" ");

        eprintln!("{:08X}: {:<24} {}", entry.offset, hex_bytes, entry.source);
    }
}

fn run_build(args: BuildArgs) -> Result<(), i32> {
    let config = AssemblerConfig::with_mode(args.mode);

    let result = match assemble_file(&args.input, &config) {
        Ok(result) => result,
        Err(e) => {
            report_assemble_error(&e);
            return Err(1);
        }
    };

    let output_path = args
        .output
        .unwrap_or_else(|| default_output_path(&args.input));

    if let Err(e) = fs::write(&output_path, &result.binary) {
        eprintln!("error: failed to write output: {e}");
        return Err(1);
    }

    if args.verbose {
        print_listing(&result);
    }

    println!(
        "Assembled {} ({} bytes) -> {}",
        args.input.display(),
        result.binary.len(),
        output_path.display()
    );

    Ok(())
}

fn main() {
    let exit_code = match parse_args(env::args_os().skip(1)) {
        Ok(ParsedArgs::Help) => {
            println!("{USAGE_TEXT}");
            0
        }
        Ok(ParsedArgs::Build(args)) => match run_build(args) {
            Ok(()) => 0,
            Err(code) => code,
        },
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{USAGE_TEXT}");
            1
        }
    };

    std::process::exit(exit_code);
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn parses_full_build_invocation() {
        let result = parse_args(
            [
                OsString::from("program.asm"),
                OsString::from("-o"),
                OsString::from("out.bin"),
                OsString::from("--mode"),
                OsString::from("64"),
                OsString::from("--verbose"),
            ]
            .into_iter(),
        )
        .expect("valid args should parse");

        let ParsedArgs::Build(args) = result else {
            panic!("expected build args");
        };
        assert_eq!(
            args,
            BuildArgs {
                input: PathBuf::from("program.asm"),
                output: Some(PathBuf::from("out.bin")),
                mode: Width::Qword,
                verbose: true,
            }
        );
    }

    #[test]
    fn mode_defaults_to_32() {
        let result = parse_args([OsString::from("program.asm")].into_iter()).unwrap();
        let ParsedArgs::Build(args) = result else {
            panic!("expected build args");
        };
        assert_eq!(args.mode, Width::Dword);
        assert!(!args.verbose);
    }

    #[test]
    fn parses_help_flag() {
        let result = parse_args([OsString::from("--help")].into_iter()).unwrap();
        assert!(matches!(result, ParsedArgs::Help));
    }

    #[test]
    fn rejects_invalid_mode() {
        let error = parse_args(
            [
                OsString::from("program.asm"),
                OsString::from("--mode"),
                OsString::from("48"),
            ]
            .into_iter(),
        )
        .expect_err("invalid mode should fail");
        assert!(error.contains("invalid mode"));
    }

    #[test]
    fn rejects_unknown_option() {
        let error = parse_args([OsString::from("--frobnicate")].into_iter())
            .expect_err("unknown option should fail");
        assert!(error.contains("unknown option"));
    }

    #[test]
    fn rejects_missing_input() {
        let error = parse_args(std::iter::empty()).expect_err("missing input should fail");
        assert!(error.contains("missing input"));
    }

    #[test]
    fn rejects_multiple_inputs() {
        let error = parse_args([OsString::from("a.asm"), OsString::from("b.asm")].into_iter())
            .expect_err("two inputs should fail");
        assert!(error.contains("multiple input"));
    }

    #[test]
    fn default_output_path_replaces_extension() {
        assert_eq!(
            default_output_path(&PathBuf::from("program.asm")),
            PathBuf::from("program.bin")
        );
        assert_eq!(
            default_output_path(&PathBuf::from("src/program.asm")),
            PathBuf::from("src/program.bin")
        );
        assert_eq!(
            default_output_path(&PathBuf::from("program")),
            PathBuf::from("program.bin")
        );
    }
}
