#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

use {
	std::{
		fs::{self, File},
		io::BufReader,
		path::Path,
		process::Command,
	},
	tmx_inspect_project::tmx::Map,
};

const INSPECTOR: &str = env!("CARGO_BIN_EXE_tmx_inspect_project");

fn bedroomMap() -> Map {
	Map::parse(BufReader::new(File::open("bedroom_test.tmx").unwrap())).unwrap()
}

fn bedroomReport() -> String {
	let mut buffer = Vec::new();
	bedroomMap().writeInspection(&mut buffer).unwrap();
	String::from_utf8(buffer).unwrap()
}

#[test]
fn the_report_carries_every_fixture_field() {
	let report = bedroomReport();
	assert!(report.starts_with("Hello, World!\nVersion: 1.0\n"));
	assert!(report.contains("\nTilesets: ["));
	assert!(report.contains("\nProperties: {"));
	assert!(report.contains("\"edges\": \"clamped\""));
	assert!(report.contains("\nLayer: bedroom\n"));
	assert!(report.contains("\nTileset: floor\n"));
	assert!(report.contains("\nName: floor\n"));
	assert!(report.contains("\nCount: 4\n"));
	assert!(report.contains("\nFirstGID: 1\n"));
	assert!(report.ends_with("IsEmpty: false\nId: 1\n"));
}

#[test]
fn the_report_is_identical_across_runs() {
	assert_eq!(bedroomReport(), bedroomReport());
}

#[test]
#[should_panic(expected = "can't be inspected")]
fn a_short_first_layer_stops_the_report() {
	let source = concat!(
		r#"<map version="1.0" orientation="orthogonal" width="2" height="2" tilewidth="16" tileheight="16">"#,
		r#"<layer name="tiny"><data encoding="csv">1,2,3,0</data></layer>"#,
		"</map>",
	);
	let map = Map::parse(source.as_bytes()).unwrap();
	map.writeInspection(&mut Vec::new()).unwrap();
}

#[test]
fn the_inspector_reports_beside_its_map() {
	let output = Command::new(INSPECTOR).current_dir(env!("CARGO_MANIFEST_DIR")).output().unwrap();
	assert!(output.status.success());
	let stdout = String::from_utf8(output.stdout).unwrap();
	assert!(stdout.starts_with("Hello, World!\n"));
	assert!(stdout.contains("Version: 1.0\n"));
	assert!(stdout.ends_with("Id: 1\n"));
}

#[test]
fn the_inspector_aborts_without_a_map() {
	let directory = Path::new(env!("CARGO_TARGET_TMPDIR")).join("no_map_here");
	fs::create_dir_all(&directory).unwrap();
	let output = Command::new(INSPECTOR).current_dir(&directory).output().unwrap();
	assert!(!output.status.success());
	assert!(output.stdout.is_empty());
}

#[test]
fn the_inspector_aborts_on_a_malformed_map() {
	let directory = Path::new(env!("CARGO_TARGET_TMPDIR")).join("malformed_map");
	fs::create_dir_all(&directory).unwrap();
	fs::write(directory.join("bedroom_test.tmx"), "this is no tile map at all").unwrap();
	let output = Command::new(INSPECTOR).current_dir(&directory).output().unwrap();
	assert!(!output.status.success());
	assert!(output.stdout.is_empty());
}
