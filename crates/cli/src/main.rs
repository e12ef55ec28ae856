//! # CLI — SiltKV interactive shell
//!
//! A REPL for the SiltKV storage engine. Reads commands from stdin,
//! executes them against the engine, and prints results to stdout. Works
//! interactively or scripted (pipe commands via stdin).
//!
//! ## Commands
//!
//! ```text
//! OPEN name [capacity]  Open or create a database directory
//! CLOSE                 Flush, publish the metadata log, release the db
//! PUT key value         Insert or overwrite an integer pair
//! GET key               Look up a key (prints the value or "(nil)")
//! DEL key               Delete a key (writes a tombstone)
//! SCAN start end        Inclusive range scan, ascending
//! BTREE on|off          Switch point lookups between b-tree and binary
//! FLUSH                 Force the memtable out to an SSTable
//! STATS                 Print engine debug info
//! EXIT / QUIT           Close (if open) and leave
//! ```
//!
//! ## Example
//!
//! ```text
//! $ siltkv
//! siltkv> open demo
//! OK
//! siltkv> put 10 10010
//! OK
//! siltkv> get 10
//! 10010
//! siltkv> scan 0 100
//! 10 -> 10010
//! (1 entries)
//! siltkv> exit
//! bye
//! ```

use anyhow::Result;
use engine::{Engine, DEFAULT_MEMTABLE_CAPACITY};
use std::io::{self, BufRead, Write};

fn prompt() {
    print!("siltkv> ");
    io::stdout().flush().ok();
}

fn parse_key(token: &str) -> Result<i64> {
    token
        .parse::<i64>()
        .map_err(|_| anyhow::anyhow!("'{}' is not a 64-bit integer", token))
}

fn main() -> Result<()> {
    env_logger::init();

    println!("SiltKV shell — integer key-value store");
    println!("Commands: OPEN name [capacity] | CLOSE | PUT k v | GET k | DEL k");
    println!("          SCAN lo hi | BTREE on|off | FLUSH | STATS | EXIT");
    prompt();

    let mut engine: Option<Engine> = None;

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            prompt();
            continue;
        }

        let command = tokens[0].to_ascii_lowercase();
        let result = dispatch(&command, &tokens[1..], &mut engine);
        match result {
            Ok(ControlFlow::Continue) => {}
            Ok(ControlFlow::Quit) => break,
            Err(e) => println!("ERROR: {:#}", e),
        }
        prompt();
    }

    // EOF or EXIT: make sure buffered writes are published.
    if let Some(mut engine) = engine.take() {
        engine.close()?;
    }
    println!("bye");
    Ok(())
}

enum ControlFlow {
    Continue,
    Quit,
}

fn dispatch(command: &str, args: &[&str], engine: &mut Option<Engine>) -> Result<ControlFlow> {
    match command {
        "open" => {
            anyhow::ensure!(
                args.len() == 1 || args.len() == 2,
                "usage: OPEN name [capacity]"
            );
            anyhow::ensure!(engine.is_none(), "a database is already open; CLOSE it first");
            let capacity = match args.get(1) {
                Some(token) => token
                    .parse::<usize>()
                    .map_err(|_| anyhow::anyhow!("'{}' is not a valid capacity", token))?,
                None => DEFAULT_MEMTABLE_CAPACITY,
            };
            *engine = Some(Engine::open(args[0], capacity)?);
            println!("OK");
        }
        "close" => {
            let mut db = engine.take().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            db.close()?;
            println!("OK");
        }
        "put" => {
            anyhow::ensure!(args.len() == 2, "usage: PUT key value");
            let db = engine.as_mut().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            db.put(parse_key(args[0])?, parse_key(args[1])?)?;
            println!("OK");
        }
        "get" => {
            anyhow::ensure!(args.len() == 1, "usage: GET key");
            let db = engine.as_ref().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            match db.get(parse_key(args[0])?)? {
                Some(value) => println!("{}", value),
                None => println!("(nil)"),
            }
        }
        "del" => {
            anyhow::ensure!(args.len() == 1, "usage: DEL key");
            let db = engine.as_mut().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            db.del(parse_key(args[0])?)?;
            println!("OK");
        }
        "scan" => {
            anyhow::ensure!(args.len() == 2, "usage: SCAN start end");
            let db = engine.as_ref().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            let results = db.scan(parse_key(args[0])?, parse_key(args[1])?)?;
            for (key, value) in &results {
                println!("{} -> {}", key, value);
            }
            println!("({} entries)", results.len());
        }
        "btree" => {
            anyhow::ensure!(args.len() == 1, "usage: BTREE on|off");
            let db = engine.as_mut().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            match args[0].to_ascii_lowercase().as_str() {
                "on" => db.set_use_btree(true),
                "off" => db.set_use_btree(false),
                other => anyhow::bail!("expected 'on' or 'off', got '{}'", other),
            }
            println!("OK");
        }
        "flush" => {
            let db = engine.as_mut().ok_or_else(|| anyhow::anyhow!("no open database"))?;
            db.flush()?;
            println!("OK");
        }
        "stats" => match engine.as_ref() {
            Some(db) => println!("{:#?}", db),
            None => println!("no open database"),
        },
        "exit" | "quit" => return Ok(ControlFlow::Quit),
        "help" => {
            println!("OPEN name [capacity] | CLOSE | PUT k v | GET k | DEL k");
            println!("SCAN lo hi | BTREE on|off | FLUSH | STATS | EXIT");
        }
        other => anyhow::bail!("unknown command '{}' (try HELP)", other),
    }
    Ok(ControlFlow::Continue)
}
