#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	clap::Parser,
	const_format::formatcp,
	std::{
		collections::HashMap,
		fs::File,
		io::{self, BufReader, Write},
	},
	tmx_inspect_project::{stdoutRaw, tmx},
};

fn main() {
	const FLIP_FLAGS: u32 = !tmx::GID_MASK;

	#[derive(Parser)]
	struct Args {
		#[clap(long)]
		skipInvisibleLayers: bool,

		#[clap(long, help = formatcp!("count raw tile codes, keeping the flip bits {:#X} intact", FLIP_FLAGS))]
		keepFlipFlags: bool,

		#[clap(required = true)]
		tmxPaths: Vec<String>,
	}
	let Args { skipInvisibleLayers, keepFlipFlags, tmxPaths } = Args::parse();

	let (stdout, counts) = (&mut io::BufWriter::new(stdoutRaw()), &mut HashMap::new());
	for path in &tmxPaths {
		let path = path.as_str();
		let map = {
			let file = File::open(path).unwrap_or_else(|err| panic!("{path:?}: {err}"));
			tmx::Map::parse(BufReader::new(file)).unwrap_or_else(|err| panic!("{path:?}: {err}"))
		};
		for layer in &map.layers {
			if skipInvisibleLayers && !layer.visible {
				continue;
			}
			for tile in layer.tiles() {
				if tile.isEmpty() {
					continue;
				}
				let key = if keepFlipFlags { tile.code } else { tile.id() };
				counts.insert(key, counts.get(&key).unwrap_or(&0) + 1);
			}
		}
	}
	let mut keys = Vec::from_iter(counts.keys()).into_boxed_slice();
	keys.sort_by_key(|&key| counts[key]);
	for &key in keys.iter() {
		writeln!(stdout, "{key}\t{}", counts[key]).unwrap();
	}
}
