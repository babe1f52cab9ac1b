use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process;

use getopts::Options;
use regex::Regex;

use rdbexport::output::Json;
use rdbexport::{filter, Type};

fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] dump.rdb [output.json]", program);
    print!("{}", opts.usage(&brief));
}

fn usage_error(program: &str, opts: &Options, message: &str) -> ! {
    eprintln!("{}\n", message);
    print_usage(program, opts);
    process::exit(2);
}

pub fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    let program = args[0].clone();

    let mut opts = Options::new();
    opts.optflag("p", "pretty", "pretty-print the JSON output");
    opts.optflag(
        "s",
        "simple",
        "map each key directly to its value, no metadata",
    );
    opts.optopt("k", "keys", "Keys to show. Can be a regular expression", "KEYS");
    opts.optmulti(
        "d",
        "databases",
        "Database to show. Can be specified multiple times",
        "DB",
    );
    opts.optmulti(
        "t",
        "type",
        "Type to show. Can be specified multiple times",
        "TYPE",
    );
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(&args[1..]) {
        Ok(m) => m,
        Err(e) => usage_error(&program, &opts, &e.to_string()),
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        return;
    }

    let mut filter = filter::Simple::new();

    for db in matches.opt_strs("d") {
        match db.parse() {
            Ok(db) => filter.add_database(db),
            Err(_) => usage_error(&program, &opts, &format!("Invalid database: {}", db)),
        }
    }

    for t in matches.opt_strs("t") {
        let typ = match t.as_str() {
            "string" => Type::String,
            "list" => Type::List,
            "set" => Type::Set,
            "sortedset" | "sorted-set" | "sorted_set" | "zset" => Type::SortedSet,
            "hash" => Type::Hash,
            "stream" => Type::Stream,
            "module" => Type::Module,
            _ => usage_error(&program, &opts, &format!("Unknown type: {}", t)),
        };
        filter.add_type(typ);
    }

    if let Some(k) = matches.opt_str("k") {
        match Regex::new(&k) {
            Ok(re) => filter.add_keys(re),
            Err(err) => usage_error(&program, &opts, &format!("Incorrect regexp: {}", err)),
        }
    }

    if matches.free.is_empty() {
        print_usage(&program, &opts);
        process::exit(2);
    }

    let input = PathBuf::from(&matches.free[0]);
    let output = matches.free.get(1).map(PathBuf::from);

    let file = match File::open(&input) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Cannot open {}: {}", input.display(), e);
            process::exit(2);
        }
    };

    let snapshot = match rdbexport::decode_with_filter(BufReader::new(file), filter) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            eprintln!("Decoding failed: {}", e);
            process::exit(3);
        }
    };

    let mut sink = match Json::new(output, matches.opt_present("p"), matches.opt_present("s")) {
        Ok(sink) => sink,
        Err(e) => {
            eprintln!("Cannot open output: {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = sink.emit(&snapshot) {
        eprintln!("Failed to write output: {}", e);
        process::exit(2);
    }
}
