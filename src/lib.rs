#![warn(clippy::pedantic, elided_lifetimes_in_paths, explicit_outlives_requirements)]
#![allow(non_snake_case)]

pub mod tmx {
	use {
		base64::{engine::general_purpose::STANDARD as BASE64, Engine as _},
		byteorder::{ReadBytesExt, LE},
		core::{
			fmt,
			str::{self, FromStr},
		},
		flate2::read::{GzDecoder, ZlibDecoder},
		memchr::memchr,
		serde::{Deserialize, Serialize},
		std::{
			collections::BTreeMap,
			io::{self, Read},
		},
		xml::{
			attribute::OwnedAttribute,
			reader::{EventReader, XmlEvent},
		},
	};

	// the three top bits of a tile code are Tiled's flip flags, the rest is the GID
	pub const FLIPPED_HORIZONTALLY: u32 = 1 << 31;
	pub const FLIPPED_VERTICALLY: u32 = 1 << 30;
	pub const FLIPPED_DIAGONALLY: u32 = 1 << 29;
	pub const GID_MASK: u32 = !(FLIPPED_HORIZONTALLY | FLIPPED_VERTICALLY | FLIPPED_DIAGONALLY);

	// the inspection report probes this tile of the first layer
	pub const INSPECTED_TILE_INDEX: usize = 20;

	pub type Properties = BTreeMap<String, String>;

	#[derive(Debug)]
	pub enum Error {
		Xml(xml::reader::Error),
		Io(io::Error),
		Base64(base64::DecodeError),
		MalformedAttribute(String),
		UnknownEncoding(String),
		PrematureEnd(&'static str),
	}

	impl fmt::Display for Error {
		fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
			match self {
				Error::Xml(err) => write!(formatter, "{err}"),
				Error::Io(err) => write!(formatter, "{err}"),
				Error::Base64(err) => write!(formatter, "{err}"),
				Error::MalformedAttribute(message) | Error::UnknownEncoding(message) => formatter.write_str(message),
				Error::PrematureEnd(message) => formatter.write_str(message),
			}
		}
	}

	impl From<xml::reader::Error> for Error {
		fn from(err: xml::reader::Error) -> Error {
			Error::Xml(err)
		}
	}

	#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
	#[serde(rename_all = "lowercase")]
	pub enum Orientation {
		Orthogonal,
		Isometric,
		Staggered,
		Hexagonal,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct Map {
		pub version: String,
		pub orientation: Orientation,
		pub width: u32,
		pub height: u32,
		pub tileWidth: u32,
		pub tileHeight: u32,
		pub properties: Properties,

		#[serde(rename = "tileset")]
		pub tilesets: Vec<Tileset>,

		#[serde(rename = "layer")]
		pub layers: Vec<Layer>,

		#[serde(rename = "objectgroup")]
		pub objectGroups: Vec<ObjectGroup>,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct Tileset {
		pub firstGid: u32,
		pub name: String,
		pub tileWidth: u32,
		pub tileHeight: u32,
		pub spacing: u32,
		pub margin: u32,
		pub tileCount: u32,

		#[serde(rename = "image")]
		pub images: Vec<Image>,

		#[serde(rename = "tile")]
		pub tiles: Vec<TilesetTile>,

		pub properties: Properties,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct TilesetTile {
		pub id: u32,
		pub properties: Properties,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct Image {
		pub source: String,
		pub width: u32,
		pub height: u32,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct Layer {
		pub name: String,
		pub visible: bool,
		pub opacity: f32,
		pub tileCodes: Vec<u32>,
		pub properties: Properties,
	}

	#[derive(Clone, Copy, Debug, PartialEq, Eq)]
	pub struct Tile {
		pub code: u32,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct ObjectGroup {
		pub name: String,
		pub visible: bool,

		#[serde(rename = "object")]
		pub objects: Vec<Object>,
	}

	#[derive(Debug, PartialEq, Serialize, Deserialize)]
	pub struct Object {
		pub name: String,

		#[serde(rename = "type")]
		pub objectType: String,

		pub x: f32,
		pub y: f32,
		pub width: f32,
		pub height: f32,
		pub visible: bool,
		pub ellipse: bool,
		pub closed: bool,
		pub points: Vec<[f32; 2]>,
		pub properties: Properties,
	}

	impl Map {
		pub fn parse(reader: impl Read) -> Result<Map, Error> {
			let parser = &mut EventReader::new(reader);
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, attributes, .. } if name.local_name == "map" => {
						return Map::fromXml(parser, &attributes)
					}
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("the document holds no <map> element")),
					_ => {}
				}
			}
		}

		fn fromXml(parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute]) -> Result<Map, Error> {
			let mut map = Map {
				version: requiredAttr(attributes, "version", "map")?.to_owned(),
				orientation: match requiredAttr(attributes, "orientation", "map")? {
					"orthogonal" => Orientation::Orthogonal,
					"isometric" => Orientation::Isometric,
					"staggered" => Orientation::Staggered,
					"hexagonal" => Orientation::Hexagonal,
					other => return Err(Error::MalformedAttribute(format!("unknown map orientation {other:?}"))),
				},
				width: parseAttr(attributes, "width", "map")?,
				height: parseAttr(attributes, "height", "map")?,
				tileWidth: parseAttr(attributes, "tilewidth", "map")?,
				tileHeight: parseAttr(attributes, "tileheight", "map")?,
				properties: Properties::new(),
				tilesets: Vec::new(),
				layers: Vec::new(),
				objectGroups: Vec::new(),
			};
			let expectedLen = (map.width * map.height) as usize;
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, attributes, .. } => match name.local_name.as_str() {
						"tileset" => map.tilesets.push(Tileset::fromXml(parser, &attributes)?),
						"layer" => map.layers.push(Layer::fromXml(parser, &attributes, expectedLen)?),
						"objectgroup" => map.objectGroups.push(ObjectGroup::fromXml(parser, &attributes)?),
						"properties" => map.properties = parseProperties(parser)?,
						_ => consumeRestOfElement(parser)?,
					},
					XmlEvent::EndElement { name } if name.local_name == "map" => return Ok(map),
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("<map> is never closed")),
					_ => {}
				}
			}
		}

		pub fn tilesetForGid(&self, gid: u32) -> Option<&Tileset> {
			self.tilesets.iter().filter(|tileset| tileset.firstGid <= gid).max_by_key(|tileset| tileset.firstGid)
		}

		pub fn tilesetForLayer(&self, layer: &Layer) -> Option<&Tileset> {
			layer.tiles().find(|tile| !tile.isEmpty()).and_then(|tile| self.tilesetForGid(tile.id()))
		}

		pub fn writeInspection(&self, out: &mut impl io::Write) -> io::Result<()> {
			writeln!(out, "Hello, World!")?;
			writeln!(out, "Version: {}", self.version)?;
			writeln!(out, "Tilesets: {:?}", self.tilesets)?;
			writeln!(out, "Properties: {:?}", self.properties)?;
			for layer in &self.layers {
				writeln!(out, "Layer: {}", layer.name)?;
				let tilesetName = match self.tilesetForLayer(layer) {
					Some(tileset) => tileset.name.as_str(),
					None => "<none>",
				};
				writeln!(out, "Tileset: {tilesetName}")?;
				writeln!(out, "Tiles: {:?}", layer.tileCodes)?;
			}
			for tileset in &self.tilesets {
				writeln!(out, "Name: {}", tileset.name)?;
				writeln!(out, "Tiles: {:?}", tileset.tiles)?;
				writeln!(out, "Count: {}", tileset.tileCount)?;
				writeln!(out, "FirstGID: {}", tileset.firstGid)?;
			}
			let firstLayer = self.layers.first().unwrap_or_else(|| panic!("the map holds no layers to inspect"));
			let tile = firstLayer.tile(INSPECTED_TILE_INDEX).unwrap_or_else(|| {
				panic!(
					"layer {:?} holds only {} tiles, tile {INSPECTED_TILE_INDEX} can't be inspected",
					firstLayer.name,
					firstLayer.tileCodes.len(),
				)
			});
			writeln!(out, "IsEmpty: {}", tile.isEmpty())?;
			writeln!(out, "Id: {}", tile.id())
		}
	}

	impl Tileset {
		fn fromXml(parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute]) -> Result<Tileset, Error> {
			if let Some(source) = attr(attributes, "source") {
				return Err(Error::MalformedAttribute(format!(
					"external tileset {source:?} isn't supported, embed it into the map"
				)));
			}
			let tileCountAttr = parseOptionalAttr(attributes, "tilecount", "tileset")?;
			let mut tileset = Tileset {
				firstGid: parseAttr(attributes, "firstgid", "tileset")?,
				name: requiredAttr(attributes, "name", "tileset")?.to_owned(),
				tileWidth: parseAttrOr(attributes, "tilewidth", "tileset", 0)?,
				tileHeight: parseAttrOr(attributes, "tileheight", "tileset", 0)?,
				spacing: parseAttrOr(attributes, "spacing", "tileset", 0)?,
				margin: parseAttrOr(attributes, "margin", "tileset", 0)?,
				tileCount: 0,
				images: Vec::new(),
				tiles: Vec::new(),
				properties: Properties::new(),
			};
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, attributes, .. } => match name.local_name.as_str() {
						"image" => tileset.images.push(Image::fromXml(parser, &attributes)?),
						"tile" => tileset.tiles.push(TilesetTile::fromXml(parser, &attributes)?),
						"properties" => tileset.properties = parseProperties(parser)?,
						_ => consumeRestOfElement(parser)?,
					},
					XmlEvent::EndElement { name } if name.local_name == "tileset" => break,
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("<tileset> is never closed")),
					_ => {}
				}
			}
			tileset.tileCount = match tileCountAttr {
				Some(count) => count,
				None => tileset.tiles.len() as _,
			};
			Ok(tileset)
		}
	}

	impl TilesetTile {
		fn fromXml(parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute]) -> Result<TilesetTile, Error> {
			let mut tile = TilesetTile { id: parseAttr(attributes, "id", "tile")?, properties: Properties::new() };
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, .. } => match name.local_name.as_str() {
						"properties" => tile.properties = parseProperties(parser)?,
						_ => consumeRestOfElement(parser)?,
					},
					XmlEvent::EndElement { name } if name.local_name == "tile" => return Ok(tile),
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("<tile> is never closed")),
					_ => {}
				}
			}
		}
	}

	impl Image {
		fn fromXml(parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute]) -> Result<Image, Error> {
			let image = Image {
				source: requiredAttr(attributes, "source", "image")?.to_owned(),
				width: parseAttrOr(attributes, "width", "image", 0)?,
				height: parseAttrOr(attributes, "height", "image", 0)?,
			};
			consumeRestOfElement(parser)?;
			Ok(image)
		}
	}

	impl Layer {
		fn fromXml(
			parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute], expectedLen: usize,
		) -> Result<Layer, Error> {
			let mut layer = Layer {
				name: requiredAttr(attributes, "name", "layer")?.to_owned(),
				visible: parseAttrOr(attributes, "visible", "layer", 1_i32)? == 1,
				opacity: parseAttrOr(attributes, "opacity", "layer", 1.0_f32)?,
				tileCodes: Vec::new(),
				properties: Properties::new(),
			};
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, attributes, .. } => match name.local_name.as_str() {
						"data" => layer.tileCodes = parseData(parser, &attributes, expectedLen)?,
						"properties" => layer.properties = parseProperties(parser)?,
						_ => consumeRestOfElement(parser)?,
					},
					XmlEvent::EndElement { name } if name.local_name == "layer" => break,
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("<layer> is never closed")),
					_ => {}
				}
			}
			if layer.tileCodes.len() != expectedLen {
				return Err(Error::MalformedAttribute(format!(
					"layer {:?} decoded {} tile codes, expected {expectedLen}",
					layer.name,
					layer.tileCodes.len(),
				)));
			}
			Ok(layer)
		}

		pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
			self.tileCodes.iter().map(|&code| Tile { code })
		}

		pub fn tile(&self, index: usize) -> Option<Tile> {
			self.tileCodes.get(index).map(|&code| Tile { code })
		}
	}

	impl Tile {
		pub fn id(self) -> u32 {
			self.code & GID_MASK
		}

		pub fn isEmpty(self) -> bool {
			self.id() == 0
		}

		pub fn flippedHorizontally(self) -> bool {
			self.code & FLIPPED_HORIZONTALLY != 0
		}

		pub fn flippedVertically(self) -> bool {
			self.code & FLIPPED_VERTICALLY != 0
		}

		pub fn flippedDiagonally(self) -> bool {
			self.code & FLIPPED_DIAGONALLY != 0
		}
	}

	impl ObjectGroup {
		fn fromXml(parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute]) -> Result<ObjectGroup, Error> {
			let mut objectGroup = ObjectGroup {
				name: attr(attributes, "name").unwrap_or("").to_owned(),
				visible: parseAttrOr(attributes, "visible", "objectgroup", 1_i32)? == 1,
				objects: Vec::new(),
			};
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, attributes, .. } => match name.local_name.as_str() {
						"object" => objectGroup.objects.push(Object::fromXml(parser, &attributes)?),
						_ => consumeRestOfElement(parser)?,
					},
					XmlEvent::EndElement { name } if name.local_name == "objectgroup" => return Ok(objectGroup),
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("<objectgroup> is never closed")),
					_ => {}
				}
			}
		}
	}

	impl Object {
		fn fromXml(parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute]) -> Result<Object, Error> {
			let mut object = Object {
				name: attr(attributes, "name").unwrap_or("").to_owned(),
				objectType: attr(attributes, "type").unwrap_or("").to_owned(),
				x: parseAttr(attributes, "x", "object")?,
				y: parseAttr(attributes, "y", "object")?,
				width: parseAttrOr(attributes, "width", "object", 0.0_f32)?,
				height: parseAttrOr(attributes, "height", "object", 0.0_f32)?,
				visible: parseAttrOr(attributes, "visible", "object", 1_i32)? == 1,
				ellipse: false,
				closed: true,
				points: Vec::new(),
				properties: Properties::new(),
			};
			loop {
				match parser.next()? {
					XmlEvent::StartElement { name, attributes, .. } => match name.local_name.as_str() {
						"ellipse" => {
							object.ellipse = true;
							consumeRestOfElement(parser)?;
						}
						"polygon" => {
							object.points = parsePoints(requiredAttr(&attributes, "points", "polygon")?)?;
							consumeRestOfElement(parser)?;
						}
						"polyline" => {
							object.closed = false;
							object.points = parsePoints(requiredAttr(&attributes, "points", "polyline")?)?;
							consumeRestOfElement(parser)?;
						}
						"properties" => object.properties = parseProperties(parser)?,
						_ => consumeRestOfElement(parser)?,
					},
					XmlEvent::EndElement { name } if name.local_name == "object" => return Ok(object),
					XmlEvent::EndDocument => return Err(Error::PrematureEnd("<object> is never closed")),
					_ => {}
				}
			}
		}
	}

	fn attr<'a>(attributes: &'a [OwnedAttribute], name: &str) -> Option<&'a str> {
		attributes.iter().find(|attribute| attribute.name.local_name == name).map(|attribute| attribute.value.as_str())
	}

	fn requiredAttr<'a>(attributes: &'a [OwnedAttribute], name: &str, element: &str) -> Result<&'a str, Error> {
		attr(attributes, name).ok_or_else(|| Error::MalformedAttribute(format!("<{element}> is missing {name:?}")))
	}

	fn parseOptionalAttr<T: FromStr>(
		attributes: &[OwnedAttribute], name: &str, element: &str,
	) -> Result<Option<T>, Error> {
		match attr(attributes, name) {
			None => Ok(None),
			Some(value) => value
				.parse()
				.map(Some)
				.map_err(|_| Error::MalformedAttribute(format!("<{element}> {name}={value:?} won't parse"))),
		}
	}

	fn parseAttr<T: FromStr>(attributes: &[OwnedAttribute], name: &str, element: &str) -> Result<T, Error> {
		parseOptionalAttr(attributes, name, element)?
			.ok_or_else(|| Error::MalformedAttribute(format!("<{element}> is missing {name:?}")))
	}

	fn parseAttrOr<T: FromStr>(
		attributes: &[OwnedAttribute], name: &str, element: &str, default: T,
	) -> Result<T, Error> {
		Ok(parseOptionalAttr(attributes, name, element)?.unwrap_or(default))
	}

	fn parseProperties(parser: &mut EventReader<impl Read>) -> Result<Properties, Error> {
		let mut properties = Properties::new();
		loop {
			match parser.next()? {
				XmlEvent::StartElement { name, attributes, .. } => {
					if name.local_name == "property" {
						properties.insert(
							requiredAttr(&attributes, "name", "property")?.to_owned(),
							attr(&attributes, "value").unwrap_or("").to_owned(),
						);
					}
					consumeRestOfElement(parser)?;
				}
				XmlEvent::EndElement { name } if name.local_name == "properties" => return Ok(properties),
				XmlEvent::EndDocument => return Err(Error::PrematureEnd("<properties> is never closed")),
				_ => {}
			}
		}
	}

	/*
		<data> payloads come in four shapes:

		csv                 - decimal codes, comma-separated, newline-split rows
		base64              - little-endian u32 codes
		base64 + zlib/gzip  - the same words behind a compression layer
		plain XML           - one <tile gid="..."/> child per cell
	*/
	fn parseData(
		parser: &mut EventReader<impl Read>, attributes: &[OwnedAttribute], expectedLen: usize,
	) -> Result<Vec<u32>, Error> {
		let (encoding, compression) = (attr(attributes, "encoding"), attr(attributes, "compression"));
		let (mut codes, mut text) = (Vec::with_capacity(expectedLen), String::new());
		loop {
			match parser.next()? {
				XmlEvent::Characters(chunk) => text.push_str(&chunk),
				XmlEvent::CData(chunk) => text.push_str(&chunk),
				XmlEvent::StartElement { name, attributes, .. } => {
					if name.local_name == "tile" {
						codes.push(parseAttrOr(&attributes, "gid", "tile", 0)?);
					}
					consumeRestOfElement(parser)?;
				}
				XmlEvent::EndElement { name } if name.local_name == "data" => break,
				XmlEvent::EndDocument => return Err(Error::PrematureEnd("<data> is never closed")),
				_ => {}
			}
		}
		match (encoding, compression) {
			(None, None) => {} // the codes came in as <tile> children
			(Some("csv"), None) => decodeCSV(&text, &mut codes)?,
			(Some("base64"), compression) => {
				let raw = BASE64.decode(text.trim()).map_err(Error::Base64)?;
				let raw = match compression {
					None => raw,
					Some("zlib") => inflate(ZlibDecoder::new(raw.as_slice()))?,
					Some("gzip") => inflate(GzDecoder::new(raw.as_slice()))?,
					Some(other) => {
						return Err(Error::UnknownEncoding(format!("unknown tile data compression {other:?}")))
					}
				};
				decodeLEWords(&raw, &mut codes)?;
			}
			(encoding, compression) => {
				return Err(Error::UnknownEncoding(format!(
					"unknown tile data encoding={encoding:?} compression={compression:?}"
				)))
			}
		}
		Ok(codes)
	}

	fn decodeCSV(text: &str, codes: &mut Vec<u32>) -> Result<(), Error> {
		let mut bytes = text.as_bytes();
		while !bytes.is_empty() {
			let line = match memchr(b'\n', bytes) {
				Some(newlineIndex) => {
					let line = &bytes[..newlineIndex];
					bytes = &bytes[newlineIndex + 1..];
					line
				}
				None => {
					let line = bytes;
					bytes = &[];
					line
				}
			};
			for value in str::from_utf8(line).unwrap().split(',') {
				let value = value.trim();
				if value.is_empty() {
					continue;
				}
				codes.push(
					u32::from_str(value)
						.map_err(|_| Error::MalformedAttribute(format!("CSV tile code {value:?} won't parse")))?,
				);
			}
		}
		Ok(())
	}

	fn decodeLEWords(bytes: &[u8], codes: &mut Vec<u32>) -> Result<(), Error> {
		if bytes.len() % 4 != 0 {
			return Err(Error::MalformedAttribute(format!(
				"{} bytes of tile data, expected a multiple of 4",
				bytes.len()
			)));
		}
		let mut cursor = io::Cursor::new(bytes);
		for _ in 0..bytes.len() / 4 {
			codes.push(cursor.read_u32::<LE>().unwrap());
		}
		Ok(())
	}

	fn inflate(mut decoder: impl Read) -> Result<Vec<u8>, Error> {
		let mut bytes = Vec::new();
		decoder.read_to_end(&mut bytes).map_err(Error::Io)?;
		Ok(bytes)
	}

	fn parsePoints(text: &str) -> Result<Vec<[f32; 2]>, Error> {
		let mut points = Vec::new();
		for pair in text.split(' ') {
			let mut coordinates = pair.split(',');
			points.push(match (coordinates.next(), coordinates.next(), coordinates.next()) {
				(Some(x), Some(y), None) => [parseCoordinate(x, pair)?, parseCoordinate(y, pair)?],
				_ => return Err(Error::MalformedAttribute(format!("point {pair:?} isn't an x,y pair"))),
			});
		}
		return Ok(points);

		fn parseCoordinate(value: &str, pair: &str) -> Result<f32, Error> {
			f32::from_str(value)
				.map_err(|_| Error::MalformedAttribute(format!("point {pair:?} coordinate {value:?} won't parse")))
		}
	}

	fn consumeRestOfElement(parser: &mut EventReader<impl Read>) -> Result<(), Error> {
		let mut depth = 1_usize;
		while depth > 0 {
			match parser.next()? {
				XmlEvent::StartElement { .. } => depth += 1,
				XmlEvent::EndElement { .. } => depth -= 1,
				XmlEvent::EndDocument => return Err(Error::PrematureEnd("the document ends inside an element")),
				_ => {}
			}
		}
		Ok(())
	}
}

use std::{fs::File, os};

#[cfg(unix)]
pub fn stdoutRaw() -> File {
	use os::unix::io::FromRawFd;
	unsafe { File::from_raw_fd(1) }
}

#[cfg(windows)]
pub fn stdoutRaw() -> File {
	use {
		os::windows::io::{AsRawHandle, FromRawHandle},
		std::io,
	};
	unsafe { File::from_raw_handle(io::stdout().as_raw_handle()) }
}

pub fn toml_toStringPretty(value: &impl serde::Serialize) -> Result<String, toml::ser::Error> {
	toml::to_string_pretty(value)
}
