// Simple subcommand dispatcher: rpsl {index|scan|whois|init} [args...]
//
// Argument parsing, help text and plugin discovery are deliberately
// thin here; the toolkit is a library first (see `rpsl::lookup`,
// `rpsl::indexer`), this binary just wires it to a shell.

use rpsl::config::Config;
use rpsl::dom::Dom;
use rpsl::indexer::{build_index, index_files, write_sidecars};
use rpsl::lookup::Rpsl;
use rpsl::util::find_rpsl;
use std::env;
use std::path::PathBuf;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let code = match args.split_first() {
        None => {
            print_usage();
            1
        }
        Some((cmd, rest)) => run(cmd, rest),
    };
    process::exit(code);
}

fn print_usage() {
    eprintln!("Usage: rpsl [command] [options]");
    eprintln!("       rpsl help [command]");
    eprintln!();
    eprintln!("Commands: index, scan, whois, init");
}

fn run(cmd: &str, args: &[String]) -> i32 {
    match cmd {
        "help" => {
            print_usage();
            0
        }
        "index" => cmd_index(),
        "whois" => cmd_whois(args),
        "scan" => cmd_scan(args),
        "init" => cmd_init(args),
        other => {
            eprintln!("Command not found: {}", other);
            1
        }
    }
}

fn resolve_root() -> Option<PathBuf> {
    if let Ok(dir) = env::var("RPSL_DIR") {
        return Some(PathBuf::from(dir));
    }
    find_rpsl(&env::current_dir().ok()?)
}

fn load_config() -> Option<Config> {
    let root = resolve_root()?;
    match Config::from_path(&root) {
        Ok(c) => Some(c),
        Err(e) => {
            eprintln!("failed to load config: {}", e);
            None
        }
    }
}

fn cmd_index() -> i32 {
    let config = match load_config() {
        Some(c) => c,
        None => {
            eprintln!("RPSL directory not found. do `rpsl init` or set RPSL_DIR");
            return 1;
        }
    };

    eprint!("Reading Files...\r");
    let ctx = config.parse_context();
    let doms = index_files(&config.path, &ctx);
    let result = build_index(doms, &config);
    eprintln!(
        "Reading Files: done! files: {} schemas: {} networks: {}",
        result.files.len(),
        result.schemas.len(),
        result.nets.len()
    );

    if let Err(e) = write_sidecars(&config.path, &config, &result) {
        eprintln!("failed to write sidecars: {}", e);
        return 1;
    }

    eprintln!("done.");
    0
}

fn cmd_whois(args: &[String]) -> i32 {
    if args.is_empty() {
        eprintln!("Usage: rpsl whois [text] [type]");
        return 1;
    }

    let config = match load_config() {
        Some(c) => c,
        None => {
            eprintln!("RPSL index files not found. do `rpsl index`?");
            return 1;
        }
    };

    let rpsl = match Rpsl::load(config) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("RPSL index files not found. do `rpsl index`? ({})", e);
            return 1;
        }
    };

    let text = &args[0];
    let schema = args.get(1).map(|s| s.as_str());

    if rpsl::net::as_net6(text).is_ok() {
        println!("# Searching network {}...", text);
        match rpsl.find_network(text) {
            Ok(path) => println!("# Found {} containing tree node(s)", path.len()),
            Err(e) => eprintln!("lookup failed: {}", e),
        }
        return 0;
    }

    match rpsl.find(text, schema) {
        Ok(doms) => {
            println!("# Found objects");
            for dom in doms {
                println!("{}", dom);
            }
            0
        }
        Err(e) => {
            eprintln!("whois lookup failed: {}", e);
            1
        }
    }
}

fn cmd_scan(args: &[String]) -> i32 {
    let config = match load_config() {
        Some(c) => c,
        None => {
            eprintln!("RPSL directory not found. do `rpsl init` or set RPSL_DIR");
            return 1;
        }
    };

    let mut rpsl = match Rpsl::load(config.clone()) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("RPSL index files not found. do `rpsl index`? ({})", e);
            return 1;
        }
    };

    let add_index = args.iter().any(|a| a == "--add-index");
    let scan_dir = flag_value(args, "--scan-dir").map(PathBuf::from);
    let scan_file = flag_value(args, "--scan-file").map(PathBuf::from);

    let ctx = config.parse_context();
    let files: Vec<Dom> = match scan_file {
        Some(path) => {
            let text = match std::fs::read_to_string(&path) {
                Ok(t) => t,
                Err(e) => {
                    eprintln!("{}: {}", path.display(), e);
                    return 1;
                }
            };
            rpsl::transact::TransactDom::parse(text.lines(), ctx).files
        }
        None => {
            let dir = scan_dir.unwrap_or_else(|| config.path.clone());
            index_files(&dir, &ctx)
        }
    };

    if add_index {
        eprintln!("Add scanned items to lookup index...");
        for dom in &files {
            rpsl.append_index(dom);
        }
    }

    eprintln!("Scanning files...");
    let state = rpsl.scan_files(&files);
    for (level, row, msg) in &state.msgs {
        println!("{:?} {}{}", level, row.loc(), msg);
    }
    println!("{}", state);

    if state.is_pass() {
        0
    } else {
        1
    }
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    args.iter().find_map(|a| a.strip_prefix(&prefix))
}

fn cmd_init(args: &[String]) -> i32 {
    let namespace = flag_value(args, "--namespace")
        .map(|s| s.to_string())
        .unwrap_or_else(|| {
            env::current_dir()
                .ok()
                .and_then(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
                .unwrap_or_else(|| "dn42".to_string())
        });
    let force = args.iter().any(|a| a == "--force");

    if resolve_root().is_some() && !force {
        eprintln!("RPSL database already initialized!");
        return 1;
    }

    let root = match env::current_dir() {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        }
    };

    let config = Config::build(&root, &namespace, "schema", "mntner", "DN42-MNT", &[], &[], "DN42");

    if let Err(e) = std::fs::create_dir_all(config.config_file().parent().unwrap()) {
        eprintln!("{}", e);
        return 1;
    }
    if let Err(e) = std::fs::write(config.config_file(), config.to_string()) {
        eprintln!("{}", e);
        return 1;
    }

    eprintln!("Created: {}", config.config_file().display());
    0
}
