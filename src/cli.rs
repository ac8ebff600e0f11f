// Command-line front end for revdelta.
//
// Two groups of subcommands:
//   - `diff`, `patch`, `show` work on standalone files and packed scripts;
//   - `add`, `get`, `inventory` work on a file-backed revision log.
//
// Errors are reported as `revdelta: ...` on stderr with exit code 1.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;

use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};

use crate::diff::{DiffScript, Operation};
use crate::io::{diff_file, patch_file};
use crate::revlog::{ByteStore, Entry, FileStore, Policy, Position, Revlog};

const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Clap CLI definition
// ---------------------------------------------------------------------------

/// Binary diffs and revision logs.
#[derive(Parser, Debug)]
#[command(
    name = "revdelta",
    version,
    about = "Rabin-anchored binary diffs and revision logs",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Cmd,

    /// Force overwrite existing output files.
    #[arg(short = 'f', long, global = true)]
    force: bool,

    /// Quiet mode (suppress non-error output).
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose mode (use multiple times for more detail).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Output stats and listings as JSON.
    #[arg(long = "json", global = true)]
    json_output: bool,

    #[command(flatten)]
    policy: PolicyArgs,
}

#[derive(Args, Debug)]
struct PolicyArgs {
    /// Deltas allowed between a version and its snapshot.
    #[arg(long = "max-delta-depth", global = true, default_value_t = Policy::default().max_delta_depth)]
    max_delta_depth: usize,

    /// Bytes a delta must save to be stored instead of a snapshot.
    #[arg(long = "min-diff-saving", global = true, default_value_t = Policy::default().min_diff_saving)]
    min_diff_saving: usize,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write a packed diff script turning BASE into NEW.
    Diff(DiffArgs),
    /// Apply a packed diff script to BASE.
    Patch(PatchArgs),
    /// Print the operations of a packed diff script.
    Show(ShowArgs),
    /// Store a new version in a revision log.
    Add(AddArgs),
    /// Reconstruct a version from a revision log.
    Get(GetArgs),
    /// List revision log entries, newest first.
    Inventory(InventoryArgs),
}

#[derive(Args, Debug)]
struct DiffArgs {
    /// Base file.
    #[arg(long, short = 'b', value_hint = ValueHint::FilePath)]
    base: PathBuf,

    /// New version of the file.
    #[arg(value_hint = ValueHint::FilePath)]
    new: PathBuf,

    /// Output script file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct PatchArgs {
    /// Base file.
    #[arg(long, short = 'b', value_hint = ValueHint::FilePath)]
    base: PathBuf,

    /// Packed script file.
    #[arg(value_hint = ValueHint::FilePath)]
    script: PathBuf,

    /// Output file.
    #[arg(value_hint = ValueHint::FilePath)]
    output: PathBuf,
}

#[derive(Args, Debug)]
struct ShowArgs {
    /// Packed script file.
    #[arg(value_hint = ValueHint::FilePath)]
    script: PathBuf,
}

#[derive(Args, Debug)]
struct StoreArg {
    /// Revision log file (created on first add).
    #[arg(long, short = 's', value_hint = ValueHint::FilePath)]
    store: PathBuf,
}

#[derive(Args, Debug)]
struct AddArgs {
    #[command(flatten)]
    store: StoreArg,

    /// Diff against the version at this position instead of the newest.
    #[arg(long, conflicts_with = "full")]
    base: Option<u64>,

    /// Store a full snapshot without diffing.
    #[arg(long)]
    full: bool,

    /// File holding the new version.
    #[arg(value_hint = ValueHint::FilePath)]
    input: PathBuf,
}

#[derive(Args, Debug)]
struct GetArgs {
    #[command(flatten)]
    store: StoreArg,

    /// Position printed by `add`.
    position: u64,

    /// Output file (default: stdout).
    #[arg(value_hint = ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct InventoryArgs {
    #[command(flatten)]
    store: StoreArg,
}

// ---------------------------------------------------------------------------
// Resolved options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Diff {
        base: PathBuf,
        new: PathBuf,
        output: PathBuf,
    },
    Patch {
        base: PathBuf,
        script: PathBuf,
        output: PathBuf,
    },
    Show {
        script: PathBuf,
    },
    Add {
        store: PathBuf,
        base: BaseChoice,
        input: PathBuf,
    },
    Get {
        store: PathBuf,
        position: Position,
        output: Option<PathBuf>,
    },
    Inventory {
        store: PathBuf,
    },
}

/// Which entry `add` diffs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseChoice {
    Newest,
    At(Position),
    None,
}

#[derive(Debug)]
struct Options {
    command: Command,
    force: bool,
    quiet: bool,
    verbose: u8,
    json_output: bool,
    policy: Policy,
}

fn resolve_options(cli: Cli) -> Options {
    let command = match cli.command {
        Cmd::Diff(args) => Command::Diff {
            base: args.base,
            new: args.new,
            output: args.output,
        },
        Cmd::Patch(args) => Command::Patch {
            base: args.base,
            script: args.script,
            output: args.output,
        },
        Cmd::Show(args) => Command::Show {
            script: args.script,
        },
        Cmd::Add(args) => Command::Add {
            store: args.store.store,
            base: match (args.full, args.base) {
                (true, _) => BaseChoice::None,
                (false, Some(p)) => BaseChoice::At(Position(p)),
                (false, None) => BaseChoice::Newest,
            },
            input: args.input,
        },
        Cmd::Get(args) => Command::Get {
            store: args.store.store,
            position: Position(args.position),
            output: args.output,
        },
        Cmd::Inventory(args) => Command::Inventory {
            store: args.store.store,
        },
    };

    Options {
        command,
        force: cli.force,
        quiet: cli.quiet,
        verbose: cli.verbose.min(2),
        json_output: cli.json_output,
        policy: Policy {
            max_delta_depth: cli.policy.max_delta_depth,
            min_diff_saving: cli.policy.min_diff_saving,
        },
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Refuse to clobber an existing file unless `-f` was given.
fn check_output(path: &Path, opts: &Options) -> Result<(), String> {
    if path.exists() && !opts.force {
        return Err(format!(
            "output file exists, use -f to overwrite: {}",
            path.display()
        ));
    }
    Ok(())
}

fn open_revlog(path: &Path, opts: &Options) -> Result<Revlog<FileStore>, String> {
    let store = FileStore::open(path).map_err(|e| format!("store {}: {e}", path.display()))?;
    Ok(Revlog::with_policy(store, opts.policy))
}

// ---------------------------------------------------------------------------
// diff / patch / show
// ---------------------------------------------------------------------------

fn cmd_diff(base: &Path, new: &Path, output: &Path, opts: &Options) -> Result<(), String> {
    check_output(output, opts)?;
    let stats = diff_file(base, new, output).map_err(|e| format!("diff: {e}"))?;

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "revdelta: diff: base size: {}, new size: {}, script size: {}, \
             inserts: {} ({} bytes), copies: {}",
            stats.base_size,
            stats.target_size,
            stats.script_size,
            stats.inserts,
            stats.inserted_bytes,
            stats.copies
        );
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "diff",
            "base_size": stats.base_size,
            "target_size": stats.target_size,
            "script_size": stats.script_size,
            "inserts": stats.inserts,
            "inserted_bytes": stats.inserted_bytes,
            "copies": stats.copies,
            "target_sha256": stats.target_sha256.map(|h| hex(&h)),
        });
        eprintln!("{json:#}");
    }
    Ok(())
}

fn cmd_patch(base: &Path, script: &Path, output: &Path, opts: &Options) -> Result<(), String> {
    check_output(output, opts)?;
    let stats = patch_file(base, script, output).map_err(|e| format!("patch: {e}"))?;

    if opts.verbose > 0 && !opts.quiet {
        eprintln!(
            "revdelta: patch: base size: {}, script size: {}, output size: {}, operations: {}",
            stats.base_size, stats.script_size, stats.output_size, stats.operations
        );
    }
    if opts.json_output {
        let json = serde_json::json!({
            "command": "patch",
            "base_size": stats.base_size,
            "script_size": stats.script_size,
            "output_size": stats.output_size,
            "operations": stats.operations,
            "output_sha256": stats.output_sha256.map(|h| hex(&h)),
        });
        eprintln!("{json:#}");
    }
    Ok(())
}

fn cmd_show(script: &Path, opts: &Options) -> Result<(), String> {
    let packed =
        std::fs::read(script).map_err(|e| format!("script file: {}: {e}", script.display()))?;
    let script = DiffScript::unpack(&packed).map_err(|e| format!("show: {e}"))?;

    if opts.json_output {
        let ops: Vec<serde_json::Value> = script
            .iter()
            .map(|op| match op {
                Operation::Insert(data) => serde_json::json!({
                    "op": "insert",
                    "len": data.len(),
                }),
                Operation::Copy { start, end } => serde_json::json!({
                    "op": "copy",
                    "start": start,
                    "end": end,
                }),
            })
            .collect();
        let json = serde_json::json!({
            "operations": ops,
            "target_size": script.target_len(),
            "script_size": packed.len(),
        });
        println!("{json:#}");
        return Ok(());
    }

    let mut out = BufWriter::new(io::stdout().lock());
    print_script(&mut out, &script, packed.len()).map_err(|e| format!("write error: {e}"))
}

fn print_script<W: Write>(out: &mut W, script: &DiffScript, packed_len: usize) -> io::Result<()> {
    writeln!(
        out,
        "operations: {}, target size: {}, script size: {packed_len}",
        script.len(),
        script.target_len()
    )?;
    for (i, op) in script.iter().enumerate() {
        match op {
            Operation::Insert(data) => writeln!(out, "{i:6}  insert {:>10} bytes", data.len())?,
            Operation::Copy { start, end } => writeln!(
                out,
                "{i:6}  copy   {:>10} bytes from {start}..={end}",
                op.target_len()
            )?,
        }
    }
    out.flush()
}

// ---------------------------------------------------------------------------
// add / get / inventory
// ---------------------------------------------------------------------------

fn cmd_add(store: &Path, base: BaseChoice, input: &Path, opts: &Options) -> Result<(), String> {
    let data =
        std::fs::read(input).map_err(|e| format!("input file: {}: {e}", input.display()))?;
    let mut revlog = open_revlog(store, opts)?;

    let position = match base {
        BaseChoice::Newest => revlog.add(&data),
        BaseChoice::At(p) => revlog.add_with_base(&data, Some(p)),
        BaseChoice::None => revlog.add_with_base(&data, None),
    }
    .map_err(|e| format!("add: {e}"))?;

    if opts.json_output {
        // The new entry is the one at the front of the store.
        let store_len = revlog.store().len();
        let header = Entry::read_header(&mut revlog.store().reader(0), store_len)
            .map_err(|e| format!("add: {e}"))?;
        let json = serde_json::json!({
            "command": "add",
            "position": position.0,
            "kind": header.kind.as_str(),
            "input_size": data.len(),
            "store_size": revlog.store().len(),
        });
        eprintln!("{json:#}");
    }
    if !opts.quiet {
        println!("{position}");
    }
    Ok(())
}

fn cmd_get(
    store: &Path,
    position: Position,
    output: Option<&Path>,
    opts: &Options,
) -> Result<(), String> {
    if let Some(path) = output {
        check_output(path, opts)?;
    }
    let revlog = open_revlog(store, opts)?;
    let data = revlog.get(position).map_err(|e| format!("get: {e}"))?;

    let written = match output {
        Some(path) => File::create(path).and_then(|f| {
            let mut w = BufWriter::with_capacity(BUF_SIZE, f);
            w.write_all(&data)?;
            w.flush()
        }),
        None => {
            let mut w = BufWriter::with_capacity(BUF_SIZE, io::stdout().lock());
            w.write_all(&data).and_then(|()| w.flush())
        }
    };
    written.map_err(|e| format!("write error: {e}"))?;

    if opts.verbose > 0 && !opts.quiet {
        let depth = revlog.delta_depth(position).map_err(|e| format!("get: {e}"))?;
        eprintln!(
            "revdelta: get: position: {position}, size: {}, deltas applied: {depth}",
            data.len()
        );
    }
    Ok(())
}

fn cmd_inventory(store: &Path, opts: &Options) -> Result<(), String> {
    let revlog = open_revlog(store, opts)?;
    let entries = revlog.inventory().map_err(|e| format!("inventory: {e}"))?;

    if opts.json_output {
        let list: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "position": e.position.0,
                    "kind": e.kind.as_str(),
                    "body_size": e.body_size,
                    "header_len": e.header_len,
                })
            })
            .collect();
        println!("{:#}", serde_json::Value::Array(list));
        return Ok(());
    }

    for e in &entries {
        println!("{:>12}  {:<5}  {} bytes", e.position, e.kind, e.body_size);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn dispatch(opts: &Options) -> Result<(), String> {
    match &opts.command {
        Command::Diff { base, new, output } => cmd_diff(base, new, output, opts),
        Command::Patch {
            base,
            script,
            output,
        } => cmd_patch(base, script, output, opts),
        Command::Show { script } => cmd_show(script, opts),
        Command::Add { store, base, input } => cmd_add(store, *base, input, opts),
        Command::Get {
            store,
            position,
            output,
        } => cmd_get(store, *position, output.as_deref(), opts),
        Command::Inventory { store } => cmd_inventory(store, opts),
    }
}

/// Main CLI entry point. Parses arguments via clap, dispatches commands.
pub fn run() -> ! {
    let cli = Cli::parse();
    let opts = resolve_options(cli);

    let default_level = match opts.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    let exit_code = match dispatch(&opts) {
        Ok(()) => 0,
        Err(msg) => {
            eprintln!("revdelta: {msg}");
            1
        }
    };
    process::exit(exit_code);
}

#[cfg(any(test, feature = "fuzzing"))]
pub fn fuzz_try_parse_args(args: &[String]) {
    let argv: Vec<String> = std::iter::once("revdelta".to_string())
        .chain(args.iter().cloned())
        .collect();
    if let Ok(cli) = Cli::try_parse_from(argv) {
        let _ = resolve_options(cli);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_opts(args: &[&str]) -> Options {
        let argv: Vec<String> = std::iter::once("revdelta".to_string())
            .chain(args.iter().map(|s| s.to_string()))
            .collect();
        let cli = Cli::try_parse_from(argv).expect("cli parse failed");
        resolve_options(cli)
    }

    fn parse_fails(args: &[&str]) -> bool {
        let argv = std::iter::once("revdelta").chain(args.iter().copied());
        Cli::try_parse_from(argv).is_err()
    }

    #[test]
    fn diff_subcommand_maps_correctly() {
        let opts = parse_opts(&["diff", "--base", "old.bin", "new.bin", "out.diff"]);
        assert_eq!(
            opts.command,
            Command::Diff {
                base: PathBuf::from("old.bin"),
                new: PathBuf::from("new.bin"),
                output: PathBuf::from("out.diff"),
            }
        );
        assert_eq!(opts.policy, Policy::default());
    }

    #[test]
    fn patch_and_show_map_correctly() {
        let opts = parse_opts(&["patch", "-b", "old.bin", "s.diff", "out.bin"]);
        assert!(matches!(opts.command, Command::Patch { .. }));
        let opts = parse_opts(&["--json", "show", "s.diff"]);
        assert!(opts.json_output);
        assert_eq!(
            opts.command,
            Command::Show {
                script: PathBuf::from("s.diff")
            }
        );
    }

    #[test]
    fn add_base_choice() {
        let newest = parse_opts(&["add", "--store", "log", "v1"]);
        assert!(matches!(newest.command, Command::Add { base: BaseChoice::Newest, .. }));

        let at = parse_opts(&["add", "--store", "log", "--base", "17", "v2"]);
        assert!(matches!(
            at.command,
            Command::Add { base: BaseChoice::At(Position(17)), .. }
        ));

        let full = parse_opts(&["add", "-s", "log", "--full", "v3"]);
        assert!(matches!(full.command, Command::Add { base: BaseChoice::None, .. }));

        assert!(parse_fails(&["add", "-s", "log", "--full", "--base", "3", "v4"]));
    }

    #[test]
    fn get_output_is_optional() {
        let opts = parse_opts(&["get", "--store", "log", "42"]);
        assert_eq!(
            opts.command,
            Command::Get {
                store: PathBuf::from("log"),
                position: Position(42),
                output: None,
            }
        );
        let opts = parse_opts(&["-f", "get", "-s", "log", "42", "out.bin"]);
        assert!(opts.force);
        assert!(matches!(opts.command, Command::Get { output: Some(_), .. }));
    }

    #[test]
    fn policy_flags_parse() {
        let opts = parse_opts(&[
            "--max-delta-depth",
            "3",
            "add",
            "--min-diff-saving",
            "64",
            "-s",
            "log",
            "v1",
        ]);
        assert_eq!(
            opts.policy,
            Policy {
                max_delta_depth: 3,
                min_diff_saving: 64,
            }
        );
    }

    #[test]
    fn verbose_is_capped() {
        let opts = parse_opts(&["-v", "-v", "-v", "inventory", "--store", "log"]);
        assert_eq!(opts.verbose, 2);
        assert!(parse_fails(&["-q", "-v", "inventory", "--store", "log"]));
    }

    #[test]
    fn hex_formatting() {
        assert_eq!(hex(&[0x00, 0xab, 0x10]), "00ab10");
    }

    #[test]
    fn fuzz_parse_tolerates_garbage() {
        fuzz_try_parse_args(&["get".into(), "--store".into(), "x".into(), "-1".into()]);
        fuzz_try_parse_args(&["add".into(), "--base".into(), "3".into(), "--full".into()]);
        fuzz_try_parse_args(&[]);
    }
}
