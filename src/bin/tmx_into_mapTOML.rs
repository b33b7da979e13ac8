#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	std::{
		env,
		fs::File,
		io::{BufReader, Write},
	},
	tmx_inspect_project::{stdoutRaw, toml_toStringPretty, tmx},
};

fn main() -> Result<(), tmx::Error> {
	let stdout = &mut stdoutRaw();
	for path in env::args().skip(1) {
		let path = path.as_str();
		let map = {
			let file = File::open(path).unwrap_or_else(|err| panic!("{path:?}: {err}"));
			tmx::Map::parse(BufReader::new(file))?
		};
		eprintln!("{path}: v{} {}x{}", map.version, map.width, map.height);
		stdout
			.write_all(&toml_toStringPretty(&map).unwrap_or_else(|err| panic!("{err}")).into_bytes())
			.unwrap();
	}
	Ok(())
}
