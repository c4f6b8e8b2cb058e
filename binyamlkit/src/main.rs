//! yamlkit command-line tool for checking and reformatting YAML streams.
//!
//! Usage: yamlkit [OPTIONS] [FILE]
//!
//! Options:
//!   --check                Check that every document loads (exit 0 if valid, 1 if invalid)
//!   --lenient              Keep the raw content of nodes with unknown tags
//!   --meta-key <KEY>       Record key positions under KEY in every mapping
//!   --indent <N>           Spaces per nesting level [default: 2]
//!   --flow-level <N>       Nesting level where flow style starts [default: -1]
//!   --sort-keys            Sort mapping keys
//!   --no-refs              Duplicate shared nodes instead of using anchors
//!   --no-compat-mode       Do not quote YAML 1.1 booleans and base-60 numbers
//!   --condense-flow        Drop optional spaces in flow collections
//!   --line-width <N>       Preferred line width, -1 for unlimited [default: 80]
//!   --skip-invalid         Leave out values no type can represent
//!   -o, --output <FILE>    Write output to specified file
//!   -h, --help             Print help
//!   -V, --version          Print version

use libyamlkit::{dump_document, load_all_documents, DumpOptions, LoadOptions, SortKeys};
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Parsed command line.
#[derive(Debug)]
struct Cli {
    input_path: Option<String>,
    output_file: Option<String>,
    check_only: bool,
    load: LoadOptions,
    dump: DumpOptions,
}

enum Command {
    Run(Cli),
    Help,
    Version,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = match parse_args(&args) {
        Ok(Command::Run(cli)) => cli,
        Ok(Command::Help) => {
            print_help();
            return;
        }
        Ok(Command::Version) => {
            println!("yamlkit {}", env!("CARGO_PKG_VERSION"));
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let input = match &cli.input_path {
        Some(path) => match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                eprintln!("Error reading {}: {}", path, e);
                process::exit(1);
            }
        },
        None => {
            let mut buffer = String::new();
            if let Err(e) = io::stdin().read_to_string(&mut buffer) {
                eprintln!("Error reading stdin: {}", e);
                process::exit(1);
            }
            buffer
        }
    };

    process::exit(process_input(&input, &cli));
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let mut cli = Cli {
        input_path: None,
        output_file: None,
        check_only: false,
        load: LoadOptions::new(),
        dump: DumpOptions::new(),
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(Command::Help),
            "-V" | "--version" => return Ok(Command::Version),
            "--check" => cli.check_only = true,
            "--lenient" => cli.load = cli.load.with_lenient(true),
            "--sort-keys" => cli.dump = cli.dump.with_sort_keys(SortKeys::Lexicographic),
            "--no-refs" => cli.dump = cli.dump.with_no_refs(true),
            "--no-compat-mode" => cli.dump = cli.dump.with_no_compat_mode(true),
            "--condense-flow" => cli.dump = cli.dump.with_condense_flow(true),
            "--skip-invalid" => cli.dump = cli.dump.with_skip_invalid(true),
            "--meta-key" => {
                i += 1;
                let key = value_of(args, i, "--meta-key")?;
                cli.load = cli.load.with_meta_key(key);
            }
            "--indent" => {
                i += 1;
                let indent: usize = number_of(args, i, "--indent")?;
                if indent == 0 {
                    return Err("--indent must be at least 1".to_string());
                }
                cli.dump = cli.dump.with_indent(indent);
            }
            "--flow-level" => {
                i += 1;
                cli.dump = cli.dump.with_flow_level(number_of(args, i, "--flow-level")?);
            }
            "--line-width" => {
                i += 1;
                cli.dump = cli.dump.with_line_width(number_of(args, i, "--line-width")?);
            }
            "-o" | "--output" => {
                i += 1;
                cli.output_file = Some(value_of(args, i, "--output")?.to_string());
            }
            "-" => {
                // Explicit stdin
            }
            arg if arg.starts_with('-') => {
                return Err(format!("Unknown option: {}", arg));
            }
            path => {
                if cli.input_path.is_some() {
                    return Err("Multiple input paths not supported".to_string());
                }
                cli.input_path = Some(path.to_string());
            }
        }
        i += 1;
    }

    if let Some(path) = &cli.input_path {
        let filename = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());
        cli.load = cli.load.with_filename(filename);
    }
    Ok(Command::Run(cli))
}

fn value_of<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires an argument", flag))
}

fn number_of<T: std::str::FromStr>(args: &[String], i: usize, flag: &str) -> Result<T, String> {
    let text = value_of(args, i, flag)?;
    text.parse()
        .map_err(|_| format!("{} expects a number, got {:?}", flag, text))
}

/// Load every document and either report success or write the re-dumped
/// stream. Returns the exit code.
fn process_input(input: &str, cli: &Cli) -> i32 {
    let documents = match load_all_documents(input, &cli.load) {
        Ok(documents) => documents,
        Err(e) => {
            match &cli.input_path {
                Some(path) => eprintln!("{}: {}", path, e),
                None => eprintln!("Parse error: {}", e),
            }
            return 1;
        }
    };
    debug!(count = documents.len(), "documents loaded");

    if cli.check_only {
        if let Some(path) = &cli.input_path {
            println!("{}: ok", path);
        }
        return 0;
    }

    let mut output = String::new();
    for (index, doc) in documents.iter().enumerate() {
        if index > 0 {
            output.push_str("---\n");
        }
        match dump_document(doc, &cli.dump) {
            Ok(text) => output.push_str(&text),
            Err(e) => {
                eprintln!("Error: Cannot dump document {}: {}", index + 1, e);
                return 1;
            }
        }
    }
    write_text_output(&output, cli.output_file.as_deref());
    0
}

fn write_text_output(output: &str, output_file: Option<&str>) {
    if let Some(path) = output_file {
        if let Err(e) = fs::write(path, output) {
            eprintln!("Error writing {}: {}", path, e);
            process::exit(1);
        }
    } else {
        print!("{}", output);
    }
}

fn print_help() {
    println!(
        "yamlkit - YAML checking and reformatting tool

USAGE:
    yamlkit [OPTIONS] [FILE]

ARGS:
    [FILE]    Input file (reads from stdin if not provided)

OPTIONS:
    --check                Check that every document loads (exit 0 if valid, 1 if invalid)
    --lenient              Keep the raw content of nodes with unknown tags
    --meta-key <KEY>       Record key positions under KEY in every mapping

    --indent <N>           Spaces per nesting level [default: 2]
    --flow-level <N>       Nesting level where flow style starts [default: -1]
    --sort-keys            Sort mapping keys
    --no-refs              Duplicate shared nodes instead of using anchors
    --no-compat-mode       Do not quote YAML 1.1 booleans and base-60 numbers
    --condense-flow        Drop optional spaces in flow collections
    --line-width <N>       Preferred line width, -1 for unlimited [default: 80]
    --skip-invalid         Leave out values no type can represent

    -o, --output <FILE>    Write output to specified file
    -h, --help             Print help
    -V, --version          Print version

ENVIRONMENT:
    RUST_LOG               Log filter for diagnostics on stderr [default: warn]

EXAMPLES:
    # Reformat a file
    yamlkit config.yaml

    # Validate a stream
    yamlkit --check deploy.yaml

    # Sorted keys, flow style below the top level
    yamlkit --sort-keys --flow-level 1 config.yaml -o config.out.yaml
"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(list: &[&str]) -> Cli {
        match parse_args(&args(list)) {
            Ok(Command::Run(cli)) => cli,
            _ => panic!("expected a run command for {:?}", list),
        }
    }

    #[test]
    fn test_parse_flags() {
        let cli = run(&[
            "--indent", "4", "--flow-level", "1", "--line-width", "-1", "--sort-keys", "--no-refs",
            "--meta-key", "__pos__", "--lenient", "in.yaml",
        ]);
        assert_eq!(cli.dump.indent, 4);
        assert_eq!(cli.dump.flow_level, 1);
        assert_eq!(cli.dump.line_width, -1);
        assert!(cli.dump.no_refs);
        assert!(matches!(cli.dump.sort_keys, SortKeys::Lexicographic));
        assert_eq!(cli.load.meta_key.as_deref(), Some("__pos__"));
        assert!(cli.load.lenient);
        assert_eq!(cli.input_path.as_deref(), Some("in.yaml"));
        assert_eq!(cli.load.filename.as_deref(), Some("in.yaml"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["--indent"])).is_err());
        assert!(parse_args(&args(&["--indent", "0"])).is_err());
        assert!(parse_args(&args(&["--flow-level", "x"])).is_err());
        assert!(parse_args(&args(&["--bogus"])).is_err());
        assert!(parse_args(&args(&["a.yaml", "b.yaml"])).is_err());
        assert!(matches!(parse_args(&args(&["-V"])), Ok(Command::Version)));
    }

    #[test]
    fn test_process_input_rejects_bad_yaml() {
        let cli = run(&["--check"]);
        assert_eq!(process_input("a: 1\n", &cli), 0);
        assert_eq!(process_input("a: [1\n", &cli), 1);
    }
}
