use estree_wat::sexpr::pattern::{collect, head_equals};
use estree_wat::syntax::{estree, NodeKind};
use estree_wat::{assemble, compile_module, hoist, Diagnostic, Node, SExpr};
use std::env;
use std::fmt;
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    match parse_invocation()? {
        Invocation::Help => {
            print_help();
            Ok(())
        }
        Invocation::Version => {
            print_version();
            Ok(())
        }
        Invocation::Run(options) => execute(options),
    }
}

fn execute(options: CliOptions) -> Result<(), CliError> {
    let functions = load_functions(&options)?;
    if options.verbose {
        eprintln!(
            "read {} top-level declarations from {}",
            functions.len(),
            options.input.label()
        );
    }
    let module = compile_module(&functions).map_err(|err| options.compilation_error(err))?;
    if options.verbose {
        report(&module, &functions);
    }
    write_module(&options, &module)
}

fn report(module: &SExpr, functions: &[Node]) {
    let funcs = module
        .children()
        .iter()
        .filter(|form| form.head() == Some("func"));
    for (function, func) in functions.iter().zip(funcs) {
        if let NodeKind::FunctionDeclaration { name, .. } = &function.kind {
            eprintln!(
                "compiled `{name}`: {} locals hoisted, {} branches resolved",
                hoist::local_declarations(func).len(),
                collect(func, &head_equals("br")).len()
            );
        }
    }
}

fn parse_invocation() -> Result<Invocation, CliError> {
    let mut args = env::args().skip(1);
    let mut output = OutputTarget::Stdout;
    let mut emit = EmitFormat::Wat;
    let mut source = None;
    let mut verbose = false;
    let mut input = None;
    let mut allow_flags = true;

    while let Some(arg) = args.next() {
        if allow_flags {
            match arg.as_str() {
                "-h" | "--help" => return Ok(Invocation::Help),
                "-V" | "--version" => return Ok(Invocation::Version),
                "-v" | "--verbose" => {
                    verbose = true;
                    continue;
                }
                "-o" | "--output" => {
                    let value = args.next().ok_or(CliError::MissingValue("--output"))?;
                    if value == "-" {
                        output = OutputTarget::Stdout;
                    } else {
                        output = OutputTarget::File(PathBuf::from(value));
                    }
                    continue;
                }
                "--emit" => {
                    let value = args.next().ok_or(CliError::MissingValue("--emit"))?;
                    emit = match value.as_str() {
                        "wat" => EmitFormat::Wat,
                        "wasm" => EmitFormat::Wasm,
                        _ => return Err(CliError::InvalidValue("--emit", value)),
                    };
                    continue;
                }
                "--source" => {
                    let value = args.next().ok_or(CliError::MissingValue("--source"))?;
                    source = Some(PathBuf::from(value));
                    continue;
                }
                "--" => {
                    allow_flags = false;
                    continue;
                }
                _ => {}
            }

            if arg.starts_with('-') && arg != "-" {
                return Err(CliError::UnexpectedArgument(arg));
            }
        }

        if input.is_none() {
            input = Some(InputSource::from_arg(arg));
        } else {
            return Err(CliError::UnexpectedArgument(arg));
        }
    }

    let source = match source {
        Some(path) => {
            Some(fs::read_to_string(&path).map_err(|err| CliError::io(Some(path), err))?)
        }
        None => None,
    };

    Ok(Invocation::Run(CliOptions {
        input: input.ok_or(CliError::MissingInput)?,
        output,
        emit,
        source,
        verbose,
    }))
}

fn load_functions(options: &CliOptions) -> Result<Vec<Node>, CliError> {
    let json = match &options.input {
        InputSource::File(path) => {
            fs::read_to_string(path).map_err(|err| CliError::io(Some(path.clone()), err))?
        }
        InputSource::Stdin => {
            let mut json = String::new();
            io::stdin()
                .read_to_string(&mut json)
                .map_err(|err| CliError::io(None, err))?;
            json
        }
    };
    estree::read_program(&json).map_err(|err| options.compilation_error(err))
}

fn write_module(options: &CliOptions, module: &SExpr) -> Result<(), CliError> {
    let text = module.to_string();
    let bytes = match options.emit {
        EmitFormat::Wat => format!("{text}\n").into_bytes(),
        EmitFormat::Wasm => assemble(&text).map_err(|err| options.compilation_error(err))?,
    };
    match &options.output {
        OutputTarget::Stdout => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(&bytes)
                .and_then(|()| stdout.flush())
                .map_err(|err| CliError::io(None, err))
        }
        OutputTarget::File(path) => {
            fs::write(path, bytes).map_err(|err| CliError::io(Some(path.clone()), err))
        }
    }
}

fn print_help() {
    println!(
        "estree-wat v{version}

Usage:
  estree-wat [OPTIONS] <FILE | ->

FILE holds the ESTree JSON of one or more function declarations, as produced
by acorn. Each function is compiled on its own and exported by name.

Options:
  -o, --output <FILE>   Write the module to <FILE>
      --emit <FORMAT>   Output format: wat (default) or wasm
      --source <FILE>   Original source text, used to point at errors
  -v, --verbose         Report each compiled function on stderr
  -h, --help            Show this help message
  -V, --version         Show version information

If FILE is '-', the tree is read from stdin. The module is written to stdout \
when no output file is provided.",
        version = env!("CARGO_PKG_VERSION"),
    );
}

fn print_version() {
    println!("estree-wat {}", env!("CARGO_PKG_VERSION"));
}

#[derive(Debug)]
enum Invocation {
    Help,
    Version,
    Run(CliOptions),
}

#[derive(Debug)]
struct CliOptions {
    input: InputSource,
    output: OutputTarget,
    emit: EmitFormat,
    source: Option<String>,
    verbose: bool,
}

impl CliOptions {
    fn compilation_error(&self, diagnostic: Diagnostic) -> CliError {
        CliError::Compilation {
            diagnostic,
            source_code: self.source.clone(),
            filename: self.input.label(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum EmitFormat {
    Wat,
    Wasm,
}

#[derive(Debug)]
enum InputSource {
    File(PathBuf),
    Stdin,
}

impl InputSource {
    fn from_arg(arg: String) -> Self {
        if arg == "-" {
            InputSource::Stdin
        } else {
            InputSource::File(PathBuf::from(arg))
        }
    }

    fn label(&self) -> String {
        match self {
            InputSource::File(path) => path.display().to_string(),
            InputSource::Stdin => "<stdin>".to_string(),
        }
    }
}

#[derive(Debug)]
enum OutputTarget {
    Stdout,
    File(PathBuf),
}

#[derive(Debug)]
enum CliError {
    MissingInput,
    MissingValue(&'static str),
    InvalidValue(&'static str, String),
    UnexpectedArgument(String),
    Io {
        path: Option<PathBuf>,
        source: io::Error,
    },
    Compilation {
        diagnostic: Diagnostic,
        source_code: Option<String>,
        filename: String,
    },
}

impl CliError {
    fn io(path: Option<PathBuf>, source: io::Error) -> Self {
        CliError::Io { path, source }
    }
}

const USAGE_HINT: &str = "Run `estree-wat --help` for usage.";

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::MissingInput => write!(
                f,
                "No ESTree document given; pass a JSON file or `-` for stdin. {USAGE_HINT}"
            ),
            CliError::MissingValue(flag) => write!(f, "{flag} expects a value. {USAGE_HINT}"),
            CliError::InvalidValue(flag, value) => {
                write!(f, "{flag} does not accept `{value}`. {USAGE_HINT}")
            }
            CliError::UnexpectedArgument(arg) => {
                write!(f, "Unexpected argument `{arg}`. {USAGE_HINT}")
            }
            CliError::Io { path: Some(path), source } => {
                write!(f, "Cannot access {}: {source}", path.display())
            }
            CliError::Io { path: None, source } => write!(f, "Cannot use standard streams: {source}"),
            CliError::Compilation {
                diagnostic,
                source_code,
                filename,
            } => match source_code {
                Some(source_code) => write!(
                    f,
                    "Compilation failed for {filename}:\n{}",
                    diagnostic.render_with_source(source_code)
                ),
                None => write!(f, "Compilation failed for {filename}: {diagnostic}"),
            },
        }
    }
}
