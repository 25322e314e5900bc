//! oolc-drv - Compiler driver.
//!
//! The driver parses the command line, runs the pipeline
//! (lex → parse → analyze → optionally fold → emit) and writes the
//! assembly file. Exit codes: 0 on success, 1 on a compile error
//! (printed to stdout as a single `Error at line L, col C: ...` line),
//! 2 on invalid usage or unreadable/uncreatable files.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::Context as _;
use tracing::debug;

use oolc_gen::EmitParams;
use oolc_util::CompileResult;

/// The usage text printed for `-h` and after usage errors.
pub const USAGE: &str = "\
Usage: oolc <flags> <source> [<out.asm>]

Flags:
  -c      dump the typed program after semantic analysis
  -h      print this help and exit
  -hs N   reserve N words of heap (default 100)
  -i      dump the identifier-resolution map
  -l      print each token as scanned
  -o      run the optimizer before code generation
  -s      dump the syntax tree after parsing
  -ss N   reserve N words of stack (default 100)
";

/// Everything a compiler run needs to know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    pub source: PathBuf,
    /// Defaults to the source path with an `.asm` extension.
    pub output: PathBuf,
    pub dump_typed: bool,
    pub dump_resolutions: bool,
    pub dump_ast: bool,
    pub trace_tokens: bool,
    pub optimize: bool,
    pub heap_words: u32,
    pub stack_words: u32,
}

/// What the command line asked for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Help,
    Compile(Options),
}

/// A bad command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageError(String);

impl fmt::Display for UsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "oolc: {}", self.0)
    }
}

impl std::error::Error for UsageError {}

impl Command {
    /// Parses the arguments after the program name.
    ///
    /// The two sizing flags take a decimal word count as the following
    /// argument; everything not starting with `-` is positional (source,
    /// then optional output).
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Command, UsageError> {
        let mut args = args.into_iter();
        let mut positional: Vec<String> = Vec::new();

        let mut dump_typed = false;
        let mut dump_resolutions = false;
        let mut dump_ast = false;
        let mut trace_tokens = false;
        let mut optimize = false;
        let mut heap_words = 100;
        let mut stack_words = 100;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-c" => dump_typed = true,
                "-h" => return Ok(Command::Help),
                "-hs" => heap_words = parse_words(&mut args, "-hs")?,
                "-i" => dump_resolutions = true,
                "-l" => trace_tokens = true,
                "-o" => optimize = true,
                "-s" => dump_ast = true,
                "-ss" => stack_words = parse_words(&mut args, "-ss")?,
                flag if flag.starts_with('-') => {
                    return Err(UsageError(format!("unknown flag '{}'", flag)));
                }
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let source = PathBuf::from(
            positional
                .next()
                .ok_or_else(|| UsageError("no source file given".to_string()))?,
        );
        let output = positional
            .next()
            .map(PathBuf::from)
            .unwrap_or_else(|| source.with_extension("asm"));
        if let Some(extra) = positional.next() {
            return Err(UsageError(format!("unexpected argument '{}'", extra)));
        }

        Ok(Command::Compile(Options {
            source,
            output,
            dump_typed,
            dump_resolutions,
            dump_ast,
            trace_tokens,
            optimize,
            heap_words,
            stack_words,
        }))
    }
}

fn parse_words(
    args: &mut impl Iterator<Item = String>,
    flag: &str,
) -> Result<u32, UsageError> {
    let value = args
        .next()
        .ok_or_else(|| UsageError(format!("{} needs a word count", flag)))?;
    value
        .parse()
        .map_err(|_| UsageError(format!("{} needs a word count, got '{}'", flag, value)))
}

/// Full driver entry: parse arguments, run, map everything to an exit
/// code.
pub fn run(args: impl IntoIterator<Item = String>) -> i32 {
    match Command::parse(args) {
        Ok(Command::Help) => {
            print!("{}", USAGE);
            2
        }
        Err(err) => {
            eprintln!("{}", err);
            eprint!("{}", USAGE);
            2
        }
        Ok(Command::Compile(options)) => compile_file(&options),
    }
}

fn compile_file(options: &Options) -> i32 {
    let source = match fs::read_to_string(&options.source)
        .with_context(|| format!("'{}' cannot be found or created", options.source.display()))
    {
        Ok(source) => source,
        Err(err) => {
            eprintln!("oolc: {:#}", err);
            return 2;
        }
    };

    let assembly = match compile_source(&source, options) {
        Ok(assembly) => assembly,
        Err(err) => {
            // The single diagnostic line goes to stdout.
            println!("{}", err);
            return 1;
        }
    };

    match fs::write(&options.output, assembly)
        .with_context(|| format!("'{}' cannot be found or created", options.output.display()))
    {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("oolc: {:#}", err);
            2
        }
    }
}

/// The compilation pipeline on in-memory source text. Dump flags print
/// to stdout as the corresponding pass finishes.
pub fn compile_source(source: &str, options: &Options) -> CompileResult<String> {
    debug!(source = %options.source.display(), "compiling");

    let tokens = oolc_lex::Lexer::tokenize(source)?;
    if options.trace_tokens {
        for token in &tokens {
            println!("{}", token);
        }
    }

    let program = oolc_par::parse(tokens)?;
    if options.dump_ast {
        println!("{:#?}", program);
    }

    let mut analysis = oolc_sem::analyze(&program, options.dump_resolutions)?;
    if options.dump_typed {
        print!("{}", oolc_sem::dump::typed_program(&analysis));
    }
    if options.dump_resolutions {
        print!("{}", oolc_sem::dump::resolution_map(&analysis));
    }

    if options.optimize {
        oolc_opt::optimize(&mut analysis.decls);
    }

    let assembly = oolc_gen::emit(
        &analysis,
        EmitParams {
            heap_words: options.heap_words,
            stack_words: options.stack_words,
        },
    );
    debug!(bytes = assembly.len(), "emitted assembly");
    Ok(assembly)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, UsageError> {
        Command::parse(args.iter().map(|s| s.to_string()))
    }

    fn options(args: &[&str]) -> Options {
        match parse(args).expect("should parse") {
            Command::Compile(options) => options,
            Command::Help => panic!("unexpected help"),
        }
    }

    #[test]
    fn test_defaults() {
        let opts = options(&["prog.ool"]);
        assert_eq!(opts.source, PathBuf::from("prog.ool"));
        assert_eq!(opts.output, PathBuf::from("prog.asm"));
        assert_eq!(opts.heap_words, 100);
        assert_eq!(opts.stack_words, 100);
        assert!(!opts.optimize && !opts.dump_ast && !opts.dump_typed);
        assert!(!opts.trace_tokens && !opts.dump_resolutions);
    }

    #[test]
    fn test_explicit_output() {
        let opts = options(&["prog.ool", "build/out.asm"]);
        assert_eq!(opts.output, PathBuf::from("build/out.asm"));
    }

    #[test]
    fn test_all_flags() {
        let opts = options(&["-c", "-i", "-l", "-o", "-s", "-hs", "400", "-ss", "64", "x.ool"]);
        assert!(opts.dump_typed && opts.dump_resolutions && opts.dump_ast);
        assert!(opts.trace_tokens && opts.optimize);
        assert_eq!(opts.heap_words, 400);
        assert_eq!(opts.stack_words, 64);
    }

    #[test]
    fn test_help_wins() {
        assert_eq!(parse(&["-h"]).unwrap(), Command::Help);
        assert_eq!(parse(&["-h", "x.ool"]).unwrap(), Command::Help);
    }

    #[test]
    fn test_usage_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["-x", "p.ool"]).is_err());
        assert!(parse(&["-hs", "many", "p.ool"]).is_err());
        assert!(parse(&["-hs"]).is_err());
        assert!(parse(&["a.ool", "b.asm", "c"]).is_err());
    }

    #[test]
    fn test_compile_source_end_to_end() {
        let options = options(&["main.ool"]);
        let asm = compile_source(
            "CLASS Main IS METHOD main IS BEGIN WRITE 'x'; END METHOD END CLASS",
            &options,
        )
        .expect("compiles");
        assert!(asm.contains("Main_main:"));
        assert!(asm.contains("_stack:"));
    }

    #[test]
    fn test_compile_source_reports_first_error() {
        let options = options(&["main.ool"]);
        let err = compile_source("CLASS Main IS METHOD", &options).unwrap_err();
        assert!(err.to_string().starts_with("Error at line 1"));
    }
}
