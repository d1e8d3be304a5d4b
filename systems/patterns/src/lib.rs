#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Streaming reader for spawn pattern documents.
//!
//! A pattern document lists one `<level>` element per round:
//!
//! ```xml
//! <levels>
//!   <level>
//!     <spawnable type="Drone">
//!       <pattern repeat="2">
//!         <limit>3</limit>
//!         <rate>1.0</rate>
//!         <delay>0.5</delay>
//!         <maxDistance>12</maxDistance>
//!         <minDistance>6</minDistance>
//!       </pattern>
//!     </spawnable>
//!   </level>
//! </levels>
//! ```
//!
//! [`PatternReader::next_level`] yields one [`LevelPattern`] per call and keeps
//! its position in between, so rounds are read lazily from a single open
//! document. Once the document is exhausted it is reopened and cycles back to
//! its first level.

use std::{
    fmt,
    fs::File,
    io::{self, BufRead, BufReader, Cursor},
    path::{Path, PathBuf},
    sync::Arc,
};

use log::{debug, warn};
use quick_xml::{
    events::{BytesStart, Event as XmlEvent},
    Reader,
};
use ringfire_core::{ConfigError, LevelPattern, PatternGroup, SpawnConfig, SpawnLimit, SpawnableKind};
use thiserror::Error;

/// Errors raised while reading a pattern document.
#[derive(Debug, Error)]
pub enum PatternError {
    /// The pattern file could not be opened.
    #[error("failed to open pattern file {path}")]
    Open {
        /// File that was requested.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The document is not well-formed XML.
    #[error("malformed pattern document at byte {position}")]
    Xml {
        /// Byte offset the reader had reached.
        position: usize,
        /// Underlying parser failure.
        #[source]
        source: quick_xml::Error,
    },
    /// A `spawnable` element lacks its `type` attribute.
    #[error("spawnable type not specified in pattern")]
    MissingType,
    /// A pattern ended without a required value.
    #[error("{kind} pattern is missing `{field}`")]
    MissingField {
        /// Kind being configured.
        kind: SpawnableKind,
        /// Name of the missing element.
        field: &'static str,
    },
    /// A leaf element holds text that is not a number.
    #[error("`{field}` holds `{value}`, which is not a number")]
    InvalidField {
        /// Name of the offending element.
        field: &'static str,
        /// Text that was found.
        value: String,
    },
    /// The `repeat` attribute is not a positive integer.
    #[error("pattern repeat `{0}` must be a positive integer")]
    InvalidRepeat(String),
    /// A `pattern` element appeared outside of a `spawnable`.
    #[error("pattern element outside of a spawnable")]
    OrphanPattern,
    /// Values parsed but violate configuration invariants.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The document ended in the middle of a level.
    #[error("pattern document ended inside a level")]
    UnexpectedEof,
    /// The document holds no level at all.
    #[error("pattern document contains no level")]
    Empty,
}

/// Where a pattern document is read from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternSource {
    /// Document stored on disk, reopened each time it is exhausted.
    File(PathBuf),
    /// Document held in memory.
    Text(Arc<[u8]>),
}

impl PatternSource {
    fn open(&self) -> Result<Reader<Box<dyn BufRead>>, PatternError> {
        let input: Box<dyn BufRead> = match self {
            Self::File(path) => {
                let file = File::open(path).map_err(|source| PatternError::Open {
                    path: path.clone(),
                    source,
                })?;
                Box::new(BufReader::new(file))
            }
            Self::Text(text) => Box::new(Cursor::new(Arc::clone(text))),
        };

        let mut reader = Reader::from_reader(input);
        let _ = reader.trim_text(true).expand_empty_elements(true);
        Ok(reader)
    }
}

/// Lazily reads level patterns from a pattern document.
pub struct PatternReader {
    source: PatternSource,
    reader: Option<Reader<Box<dyn BufRead>>>,
    buf: Vec<u8>,
    levels_read: u64,
}

impl PatternReader {
    /// Creates a reader over `source`. Nothing is opened until the first read.
    #[must_use]
    pub fn new(source: PatternSource) -> Self {
        Self {
            source,
            reader: None,
            buf: Vec::new(),
            levels_read: 0,
        }
    }

    /// Creates a reader over the document stored at `path`.
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self::new(PatternSource::File(path.as_ref().to_path_buf()))
    }

    /// Creates a reader over an in-memory document.
    #[must_use]
    pub fn from_text(text: impl AsRef<str>) -> Self {
        Self::new(PatternSource::Text(Arc::from(text.as_ref().as_bytes())))
    }

    /// Source the reader draws from.
    #[must_use]
    pub fn source(&self) -> &PatternSource {
        &self.source
    }

    /// Number of levels returned so far.
    #[must_use]
    pub const fn levels_read(&self) -> u64 {
        self.levels_read
    }

    /// Closes the document so the next read starts from its first level.
    pub fn rewind(&mut self) {
        self.reader = None;
    }

    /// Reads the next `<level>` element.
    ///
    /// Each `spawnable` becomes a [`PatternGroup`] holding its `pattern`
    /// blocks, replicated `repeat` times. Values not restated by a pattern are
    /// inherited from the previous pattern of the same spawnable. Spawnables
    /// of unknown type are skipped.
    pub fn next_level(&mut self) -> Result<LevelPattern, PatternError> {
        let mut level: Option<LevelPattern> = None;
        let mut block: Option<Block> = None;
        let mut field: Option<Field> = None;
        let mut reopened = false;

        loop {
            let token = self.read_token()?;
            let Some(pattern) = level.as_mut() else {
                match token {
                    Token::Start(Element {
                        tag: Tag::Level, ..
                    }) => level = Some(LevelPattern::new()),
                    Token::Eof if reopened => return Err(PatternError::Empty),
                    Token::Eof => reopened = true,
                    _ => {}
                }
                continue;
            };

            match token {
                Token::Start(Element {
                    tag: Tag::Spawnable,
                    attribute,
                }) => {
                    let name = attribute.ok_or(PatternError::MissingType)?;
                    block = Some(Block::open(&name));
                }
                Token::Start(Element {
                    tag: Tag::Pattern,
                    attribute,
                }) => match block.as_mut() {
                    Some(Block::Known(spawnable)) => {
                        spawnable.repeat = Some(parse_repeat(attribute.as_deref())?);
                    }
                    Some(Block::Skipped) => {}
                    None => return Err(PatternError::OrphanPattern),
                },
                Token::Start(Element {
                    tag: Tag::Field(leaf),
                    ..
                }) => field = Some(leaf),
                Token::Text(text) => {
                    if let (Some(leaf), Some(Block::Known(spawnable))) = (field, block.as_mut()) {
                        spawnable.draft.set(leaf, &text)?;
                    }
                }
                Token::End(Tag::Field(_)) => field = None,
                Token::End(Tag::Pattern) => {
                    if let Some(Block::Known(spawnable)) = block.as_mut() {
                        spawnable.close_pattern()?;
                    }
                }
                Token::End(Tag::Spawnable) => {
                    if let Some(Block::Known(spawnable)) = block.take() {
                        pattern.push_group(spawnable.group);
                    }
                }
                Token::End(Tag::Level) => {
                    self.levels_read += 1;
                    let pattern = level.take().unwrap_or_default();
                    debug!(
                        "read level pattern #{} with {} groups",
                        self.levels_read,
                        pattern.len()
                    );
                    return Ok(pattern);
                }
                Token::Eof => return Err(PatternError::UnexpectedEof),
                _ => {}
            }
        }
    }

    fn read_token(&mut self) -> Result<Token, PatternError> {
        let mut reader = match self.reader.take() {
            Some(reader) => reader,
            None => self.source.open()?,
        };

        self.buf.clear();
        let token = match reader.read_event_into(&mut self.buf) {
            Ok(XmlEvent::Start(start)) => Token::Start(
                Element::read(&start).map_err(|source| PatternError::Xml {
                    position: reader.buffer_position(),
                    source,
                })?,
            ),
            Ok(XmlEvent::End(end)) => Token::End(Tag::from_name(end.name().as_ref())),
            Ok(XmlEvent::Text(text)) => match text.unescape() {
                Ok(text) => Token::Text(text.into_owned()),
                Err(source) => {
                    return Err(PatternError::Xml {
                        position: reader.buffer_position(),
                        source,
                    })
                }
            },
            Ok(XmlEvent::Eof) => return Ok(Token::Eof),
            Ok(_) => Token::Skip,
            Err(source) => {
                return Err(PatternError::Xml {
                    position: reader.buffer_position(),
                    source,
                })
            }
        };

        self.reader = Some(reader);
        Ok(token)
    }
}

impl fmt::Debug for PatternReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternReader")
            .field("source", &self.source)
            .field("open", &self.reader.is_some())
            .field("levels_read", &self.levels_read)
            .finish_non_exhaustive()
    }
}

fn parse_repeat(attribute: Option<&str>) -> Result<usize, PatternError> {
    let Some(raw) = attribute else {
        return Ok(1);
    };
    match raw.trim().parse::<usize>() {
        Ok(repeat) if repeat > 0 => Ok(repeat),
        _ => Err(PatternError::InvalidRepeat(raw.to_owned())),
    }
}

enum Token {
    Start(Element),
    End(Tag),
    Text(String),
    Skip,
    Eof,
}

struct Element {
    tag: Tag,
    attribute: Option<String>,
}

impl Element {
    fn read(start: &BytesStart<'_>) -> Result<Self, quick_xml::Error> {
        let tag = Tag::from_name(start.name().as_ref());
        let key = match tag {
            Tag::Spawnable => "type",
            Tag::Pattern => "repeat",
            _ => {
                return Ok(Self {
                    tag,
                    attribute: None,
                })
            }
        };

        let attribute = match start.try_get_attribute(key)? {
            Some(attribute) => Some(attribute.unescape_value()?.into_owned()),
            None => None,
        };
        Ok(Self { tag, attribute })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tag {
    Level,
    Spawnable,
    Pattern,
    Field(Field),
    Other,
}

impl Tag {
    fn from_name(name: &[u8]) -> Self {
        match name {
            b"level" => Self::Level,
            b"spawnable" => Self::Spawnable,
            b"pattern" => Self::Pattern,
            b"limit" => Self::Field(Field::Limit),
            b"rate" => Self::Field(Field::Rate),
            b"delay" => Self::Field(Field::Delay),
            b"maxDistance" => Self::Field(Field::MaxDistance),
            b"minDistance" => Self::Field(Field::MinDistance),
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Limit,
    Rate,
    Delay,
    MaxDistance,
    MinDistance,
}

impl Field {
    const fn name(self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Rate => "rate",
            Self::Delay => "delay",
            Self::MaxDistance => "maxDistance",
            Self::MinDistance => "minDistance",
        }
    }
}

enum Block {
    Known(Spawnable),
    Skipped,
}

impl Block {
    fn open(name: &str) -> Self {
        match name.trim().parse::<SpawnableKind>() {
            Ok(kind) if kind.counts_toward_spawn_limit() => Self::Known(Spawnable::new(kind)),
            Ok(kind) => {
                warn!("skipping spawnable block: {kind} cannot be spawned by patterns");
                Self::Skipped
            }
            Err(error) => {
                warn!("skipping spawnable block: {error}");
                Self::Skipped
            }
        }
    }
}

struct Spawnable {
    group: PatternGroup,
    draft: Draft,
    repeat: Option<usize>,
}

impl Spawnable {
    const fn new(kind: SpawnableKind) -> Self {
        Self {
            group: PatternGroup::new(kind),
            draft: Draft::new(),
            repeat: None,
        }
    }

    fn close_pattern(&mut self) -> Result<(), PatternError> {
        let Some(repeat) = self.repeat.take() else {
            return Ok(());
        };
        let config = self.draft.build(self.group.kind())?;
        for _ in 0..repeat {
            self.group.push(config);
        }
        Ok(())
    }
}

/// Values collected for the pattern being read.
struct Draft {
    limit: Option<SpawnLimit>,
    rate: Option<f32>,
    delay: f32,
    max_distance: Option<f32>,
    min_distance: f32,
}

impl Draft {
    const fn new() -> Self {
        Self {
            limit: None,
            rate: None,
            delay: 0.0,
            max_distance: None,
            min_distance: 0.0,
        }
    }

    fn set(&mut self, field: Field, text: &str) -> Result<(), PatternError> {
        let text = text.trim();
        let invalid = || PatternError::InvalidField {
            field: field.name(),
            value: text.to_owned(),
        };

        if field == Field::Limit {
            let raw = text.parse::<i64>().map_err(|_| invalid())?;
            self.limit = Some(SpawnLimit::from_raw(raw)?);
            return Ok(());
        }

        let value = text.parse::<f32>().map_err(|_| invalid())?;
        match field {
            Field::Rate => self.rate = Some(value),
            Field::Delay => self.delay = value,
            Field::MaxDistance => self.max_distance = Some(value),
            Field::MinDistance => self.min_distance = value,
            Field::Limit => {}
        }
        Ok(())
    }

    fn build(&self, kind: SpawnableKind) -> Result<SpawnConfig, PatternError> {
        let missing = |field: Field| PatternError::MissingField {
            kind,
            field: field.name(),
        };
        let limit = self.limit.ok_or_else(|| missing(Field::Limit))?;
        let rate = self.rate.ok_or_else(|| missing(Field::Rate))?;
        let max_distance = self.max_distance.ok_or_else(|| missing(Field::MaxDistance))?;

        Ok(SpawnConfig::from_seconds(
            kind,
            limit,
            rate,
            self.delay,
            self.min_distance,
            max_distance,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_defaults_to_one() {
        assert_eq!(parse_repeat(None).ok(), Some(1));
        assert_eq!(parse_repeat(Some(" 3 ")).ok(), Some(3));
        assert!(matches!(
            parse_repeat(Some("0")),
            Err(PatternError::InvalidRepeat(raw)) if raw == "0"
        ));
        assert!(matches!(
            parse_repeat(Some("many")),
            Err(PatternError::InvalidRepeat(_))
        ));
    }

    #[test]
    fn draft_requires_limit_rate_and_max_distance() {
        let mut draft = Draft::new();
        draft.set(Field::Rate, "1.5").expect("rate");
        draft.set(Field::MaxDistance, "10").expect("max distance");
        assert!(matches!(
            draft.build(SpawnableKind::Crasher),
            Err(PatternError::MissingField { field: "limit", .. })
        ));

        draft.set(Field::Limit, "-1").expect("limit");
        let config = draft.build(SpawnableKind::Crasher).expect("config");
        assert_eq!(config.limit(), SpawnLimit::Unbounded);
        assert_eq!(config.min_distance(), 0.0);
        assert!(config.initial_delay().is_zero());
    }

    #[test]
    fn draft_rejects_non_numeric_text() {
        let mut draft = Draft::new();
        assert!(matches!(
            draft.set(Field::Delay, "soon"),
            Err(PatternError::InvalidField { field: "delay", .. })
        ));
        assert!(matches!(
            draft.set(Field::Limit, "-4"),
            Err(PatternError::Config(ConfigError::InvalidLimit(-4)))
        ));
    }

    #[test]
    fn player_projectiles_cannot_be_pattern_spawned() {
        assert!(matches!(Block::open("Bullet"), Block::Skipped));
        assert!(matches!(Block::open("Mothership"), Block::Skipped));
        assert!(matches!(Block::open("Drone"), Block::Known(_)));
    }
}
