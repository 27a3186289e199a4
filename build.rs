use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;

use proc_macro2::{Literal, TokenStream};
use quote::quote;

mod build_serde;
use build_serde::Board;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Retrieve the enabled board feature, e.g. CARGO_FEATURE_SAMA5D3X
    let board_name = match env::vars()
        .map(|(a, _)| a)
        .filter(|x| x.starts_with("CARGO_FEATURE_SAMA5"))
        .get_one()
    {
        Ok(x) => x,
        Err(GetOneError::None) => panic!("No sama5xx Cargo feature enabled"),
        Err(GetOneError::Multiple) => panic!("Multiple sama5xx Cargo features enabled"),
    }
        .strip_prefix("CARGO_FEATURE_")
        .unwrap()
        .to_ascii_lowercase();

    println!("cargo:rerun-if-changed=data/{}", board_name);
    let data_dir = Path::new("data").join(&board_name);

    let board_path = data_dir.join("cpufreq.yaml");
    let board_content = fs::read_to_string(&board_path)
        .map_err(|e| format!("Failed to read {}: {}", board_path.display(), e))?;

    let board: Board = serde_yaml::from_str(&board_content)
        .map_err(|e| format!("Failed to parse cpufreq.yaml: {}", e))?;

    check_board(&board)?;

    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let dest_path = out_dir.join("_generated.rs");

    let token_stream = generate_board_mod(&board);

    let mut file = File::create(&dest_path).unwrap();
    write!(file, "{}", token_stream).unwrap();
    rustfmt(&dest_path);

    Ok(())
}

/// Reject board data the driver would refuse at probe time anyway.
fn check_board(board: &Board) -> Result<(), String> {
    if board.recipes.is_empty() {
        return Err("cpufreq.yaml: `recipes` is empty".into());
    }

    // Capacity of the recipe and frequency tables in src/recipe.rs and src/freq_table.rs.
    const MAX_ENTRIES: usize = 16;

    if board.recipes.len() > MAX_ENTRIES {
        return Err(format!(
            "cpufreq.yaml: {} recipes, at most {} supported",
            board.recipes.len(),
            MAX_ENTRIES
        ));
    }

    let opp_freqs: BTreeSet<u32> = board
        .operating_points
        .iter()
        .filter(|opp| opp.available)
        .map(|opp| opp.frequency_khz)
        .collect();
    if opp_freqs.len() > MAX_ENTRIES {
        return Err(format!(
            "cpufreq.yaml: {} operating point frequencies, at most {} supported",
            opp_freqs.len(),
            MAX_ENTRIES
        ));
    }

    let mut seen = BTreeSet::new();
    for recipe in &board.recipes {
        if !seen.insert(recipe.frequency_khz) {
            return Err(format!(
                "cpufreq.yaml: duplicate recipe for {} kHz",
                recipe.frequency_khz
            ));
        }
        if recipe.mdiv > 3 {
            return Err(format!(
                "cpufreq.yaml: mdiv {} for {} kHz does not fit PMC_MCKR.MDIV",
                recipe.mdiv, recipe.frequency_khz
            ));
        }
    }

    for opp in &board.operating_points {
        if !seen.contains(&opp.frequency_khz) {
            println!(
                "cargo:warning=operating point {} kHz has no register recipe",
                opp.frequency_khz
            );
        }
    }

    Ok(())
}

fn generate_board_mod(board: &Board) -> TokenStream {
    let pmc_base = Literal::usize_unsuffixed(board.pmc_base as usize);
    let ramc_base = Literal::usize_unsuffixed(board.ramc_base as usize);
    let anchor = Literal::usize_unsuffixed(board.relocation_anchor as usize);
    let mck_hz = Literal::u32_unsuffixed(board.mck_hz);

    let latency = match board.clock_latency_ns {
        Some(ns) => {
            let ns = Literal::u32_unsuffixed(ns);
            quote! { Some(#ns) }
        }
        None => quote! { None },
    };

    // Big-endian cells, the same layout as the `atmel,cpufreq_regs_setting` property.
    let cells: Vec<Literal> = board
        .recipes
        .iter()
        .flat_map(|r| r.cells())
        .flat_map(|c| c.to_be_bytes())
        .map(Literal::u8_unsuffixed)
        .collect();
    let cells_len = Literal::usize_unsuffixed(cells.len());

    let opps: Vec<TokenStream> = board
        .operating_points
        .iter()
        .map(|opp| {
            let khz = Literal::u32_unsuffixed(opp.frequency_khz);
            let uv = Literal::u32_unsuffixed(opp.voltage_uv);
            let available = opp.available;
            quote! {
                OperatingPoint {
                    frequency_khz: #khz,
                    voltage_uv: #uv,
                    available: #available,
                }
            }
        })
        .collect();
    let opps_len = Literal::usize_unsuffixed(opps.len());

    quote! {
        pub mod board {
            use crate::opp::OperatingPoint;

            /// PMC register block base address.
            pub const PMC_BASE: usize = #pmc_base;
            /// DDR controller register block base address.
            pub const RAMC_BASE: usize = #ramc_base;
            /// End address of the window the clock-update routine is staged into.
            pub const RELOCATION_ANCHOR: usize = #anchor;
            /// Master clock rate at boot.
            pub const MCK_HZ: u32 = #mck_hz;
            /// Transition latency in nanoseconds, if the board specifies one.
            pub const CLOCK_LATENCY_NS: Option<u32> = #latency;
            /// Register recipes as big-endian 4-cell records.
            pub static RECIPE_CELLS: [u8; #cells_len] = [#(#cells),*];
            /// Operating points for the core regulator.
            pub static OPERATING_POINTS: [OperatingPoint; #opps_len] = [#(#opps),*];
        }
    }
}

enum GetOneError {
    None,
    Multiple,
}

trait IteratorExt: Iterator {
    fn get_one(self) -> Result<Self::Item, GetOneError>;
}

impl<T: Iterator> IteratorExt for T {
    fn get_one(mut self) -> Result<Self::Item, GetOneError> {
        match self.next() {
            None => Err(GetOneError::None),
            Some(res) => match self.next() {
                Some(_) => Err(GetOneError::Multiple),
                None => Ok(res),
            },
        }
    }
}

/// rustfmt a given path.
/// Failures are logged to stderr and ignored.
fn rustfmt(path: impl AsRef<Path>) {
    let path = path.as_ref();
    match Command::new("rustfmt").args([path]).output() {
        Err(e) => {
            eprintln!("failed to exec rustfmt {:?}: {:?}", path, e);
        }
        Ok(out) => {
            if !out.status.success() {
                eprintln!("rustfmt {:?} failed:", path);
                eprintln!("=== STDOUT:");
                std::io::stderr().write_all(&out.stdout).unwrap();
                eprintln!("=== STDERR:");
                std::io::stderr().write_all(&out.stderr).unwrap();
            }
        }
    }
}
