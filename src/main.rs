#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	std::{
		fs::File,
		io::{self, BufReader},
	},
	tmx_inspect_project::{stdoutRaw, tmx},
};

const MAP_PATH: &str = "bedroom_test.tmx";

fn main() -> Result<(), tmx::Error> {
	let file = File::open(MAP_PATH).unwrap_or_else(|err| panic!("{MAP_PATH:?}: {err}"));
	let map = tmx::Map::parse(BufReader::new(file))?;
	map.writeInspection(&mut io::BufWriter::new(stdoutRaw())).unwrap();
	Ok(())
}
