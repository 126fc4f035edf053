// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::fs::File;
use std::io::Read;
use std::process;

use ujson::{Event, Flow, Tokenizer};

const CHUNK: usize = 4096;

fn main() {
    let args: Vec<_> = env::args().collect();
    if args.len() != 2 {
        eprintln!("Usage: {} file.json", args[0]);
        process::exit(2);
    }
    let path = &args[1];
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Error: Unable to open file '{}': {}", path, e);
            process::exit(1);
        }
    };

    let mut tokenizer = Tokenizer::<u128>::new();
    let mut events = 0usize;
    let mut count = |_: Event, _: usize| {
        events += 1;
        Flow::Continue
    };
    let mut chunk = [0u8; CHUNK];
    loop {
        let n = match file.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                eprintln!("Error: Unable to read file '{}': {}", path, e);
                process::exit(1);
            }
        };
        if let Err(e) = tokenizer.parse_chunk(&chunk[..n], &mut count) {
            eprintln!("Error: JSON parsing failed: {}", e);
            process::exit(1);
        }
    }
    match tokenizer.finish(&mut count) {
        Ok(total) => println!("{}: valid, {} bytes, {} events", path, total, events),
        Err(e) => {
            eprintln!("Error: JSON parsing failed: {}", e);
            process::exit(1);
        }
    }
}
