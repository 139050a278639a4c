//! # Tabula CLI
//!
//! Usage:
//!   tabula table.json -o layout.json
//!   echo '{ ... }' | tabula
//!   tabula --example > schedule.json
//!
//! Logging goes to stderr; set `RUST_LOG=debug` for per-phase detail.

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_schedule_json());
        return;
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).unwrap_or_else(|e| fail(&format!("Failed to read {}: {}", args[1], e)))
    } else {
        let mut buf = String::new();
        if let Err(e) = io::stdin().read_to_string(&mut buf) {
            fail(&format!("Failed to read stdin: {}", e));
        }
        buf
    };

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone());

    let json = match tabula::layout_json_to_string(&input) {
        Ok(json) => json,
        Err(e) => fail(&format!("✗ Layout failed: {}", e)),
    };

    match output_path {
        Some(path) => {
            if let Err(e) = fs::write(&path, &json) {
                fail(&format!("Failed to write {}: {}", path, e));
            }
            eprintln!("✓ Written layout to {}", path);
        }
        None => println!("{}", json),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("{}", message);
    process::exit(1);
}

fn example_schedule_json() -> &'static str {
    r##"{
  "page": {
    "size": "A4",
    "margin": { "top": 54, "right": 54, "bottom": 54, "left": 54 }
  },
  "config": {
    "spanPolicy": "KeepTogether",
    "rowPolicy": "Split"
  },
  "table": {
    "columns": { "Relative": [1, 3, 1] },
    "headerRows": 1,
    "items": [
      { "type": "Cell", "content": { "type": "Text", "content": "Day" }, "padding": { "top": 4, "right": 4, "bottom": 4, "left": 4 } },
      { "type": "Cell", "content": { "type": "Text", "content": "Session" }, "padding": { "top": 4, "right": 4, "bottom": 4, "left": 4 } },
      { "type": "Cell", "content": { "type": "Text", "content": "Room" }, "padding": { "top": 4, "right": 4, "bottom": 4, "left": 4 } },

      { "type": "Cell", "rowSpan": 3, "content": { "type": "Text", "content": "Monday\nMorning\nTrack" } },
      { "type": "Cell", "content": { "type": "Text", "content": "Opening keynote" } },
      { "type": "Cell", "rowSpan": 2, "content": { "type": "Text", "content": "Hall A" } },
      { "type": "Cell", "content": { "type": "Text", "content": "Layout engines that think in pages instead of canvases" } },
      { "type": "Cell", "content": { "type": "Text", "content": "Lunch" } },
      { "type": "Cell", "content": { "type": "Empty" } },

      { "type": "Cell", "content": { "type": "Text", "content": "Tuesday" } },
      { "type": "Cell", "content": { "type": "Text", "content": "Workshops" }, "minimumHeight": 40 },
      { "type": "Cell", "content": { "type": "Spacer", "height": 18 } }
    ]
  }
}
"##
}
