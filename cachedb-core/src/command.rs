//! Parsing of single protocol lines into [`Command`] values.
//!
//! The grammar, one command per line:
//!
//! ```text
//! PUT  <key> { username: <text>[, userdata: <text>] } [<ttl>]
//! MPUT [ <key> { username: <text>[, userdata: <text>] } ,* ] [<ttl>]
//! GET  <key>
//! MGET [ <key> ,* ]
//! DEL  <key>
//! MDEL [ <key> ,* ]
//! SAVE <key>
//! POP  <key> { username: <text>[, userdata: <text>] }
//! ```
//!
//! Keywords are case-sensitive. Whitespace around braces, brackets, colons and commas is
//! free-form. `username` runs up to the next `,` or `}`, `userdata` runs up to the closing
//! `}` (so it may contain commas); both are trimmed.

use thiserror::Error;

/// TTL applied by PUT and MPUT when the line carries none
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// Reasons a line failed to parse
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,

    #[error("unknown command `{0}`")]
    UnknownCommand(String),

    #[error("expected `{expected}` at `{found}`")]
    Expected { expected: &'static str, found: String },

    #[error("missing key")]
    MissingKey,

    #[error("field `{0}` has no value")]
    EmptyField(&'static str),

    #[error("`{0}` is not a valid TTL")]
    InvalidTtl(String),

    #[error("unexpected trailing input `{0}`")]
    TrailingInput(String),
}

/// The fields carried inside `{ ... }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub username: String,
    /// Empty when the line omitted `userdata`
    pub userdata: String,
}

/// One item of an MPUT batch. Items that fail their own grammar are kept so the
/// batch can report them in position.
pub type BatchItem = Result<(String, Record), ParseError>;

/// A parsed protocol command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Put {
        key: String,
        record: Record,
        /// `None` when the line carried no TTL
        ttl: Option<i64>,
    },
    MPut {
        items: Vec<BatchItem>,
        ttl: Option<i64>,
    },
    Get {
        key: String,
    },
    MGet {
        keys: Vec<String>,
    },
    Del {
        key: String,
    },
    MDel {
        keys: Vec<String>,
    },
    Save {
        key: String,
    },
    Pop {
        key: String,
        record: Record,
    },
}

impl Command {
    /// Parses one line. No state is carried between calls.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::Empty);
        }

        let (keyword, rest) = match line.find(char::is_whitespace) {
            Some(split) => (&line[..split], &line[split..]),
            // A bare keyword is never a complete command
            None => (line, ""),
        };

        let mut cursor = Cursor::new(rest);
        let command = match keyword {
            "PUT" => {
                let key = cursor.key()?;
                let record = cursor.record()?;
                let ttl = cursor.ttl()?;
                Command::Put { key, record, ttl }
            }
            "MPUT" => {
                let items = cursor.batch()?;
                let ttl = cursor.ttl()?;
                Command::MPut { items, ttl }
            }
            "GET" => Command::Get { key: cursor.key()? },
            "MGET" => Command::MGet { keys: cursor.key_list()? },
            "DEL" => Command::Del { key: cursor.key()? },
            "MDEL" => Command::MDel { keys: cursor.key_list()? },
            "SAVE" => Command::Save { key: cursor.key()? },
            "POP" => {
                let key = cursor.key()?;
                let record = cursor.record()?;
                Command::Pop { key, record }
            }
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };

        cursor.finish()?;
        Ok(command)
    }

    /// Protocol keyword, for logging
    pub fn name(&self) -> &'static str {
        match self {
            Command::Put { .. } => "PUT",
            Command::MPut { .. } => "MPUT",
            Command::Get { .. } => "GET",
            Command::MGet { .. } => "MGET",
            Command::Del { .. } => "DEL",
            Command::MDel { .. } => "MDEL",
            Command::Save { .. } => "SAVE",
            Command::Pop { .. } => "POP",
        }
    }
}

fn is_key_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '{' | '}' | '[' | ']' | ',')
}

/// Recursive-descent reader over the remainder of a line
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Consumes `c` (after optional whitespace) if it is next
    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.expected(expected))
        }
    }

    fn expect_word(&mut self, word: &'static str) -> Result<(), ParseError> {
        self.skip_ws();
        match self.rest.strip_prefix(word) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(self.expected(word)),
        }
    }

    fn expected(&self, expected: &'static str) -> ParseError {
        ParseError::Expected {
            expected,
            found: self.rest.to_string(),
        }
    }

    fn key(&mut self) -> Result<String, ParseError> {
        self.skip_ws();
        let end = self.rest.find(|c: char| !is_key_char(c)).unwrap_or(self.rest.len());
        if end == 0 {
            return Err(ParseError::MissingKey);
        }

        let (key, rest) = self.rest.split_at(end);
        self.rest = rest;
        Ok(key.to_string())
    }

    /// A `<text>` value: up to the first of `delimiters`, trimmed, non-empty
    fn text(&mut self, field: &'static str, delimiters: &[char]) -> Result<String, ParseError> {
        let end = self.rest.find(delimiters).unwrap_or(self.rest.len());
        let (value, rest) = self.rest.split_at(end);
        self.rest = rest;

        let value = value.trim();
        if value.is_empty() {
            return Err(ParseError::EmptyField(field));
        }
        Ok(value.to_string())
    }

    fn field(&mut self, name: &'static str, delimiters: &[char]) -> Result<String, ParseError> {
        self.expect_word(name)?;
        self.expect(':', ":")?;
        self.text(name, delimiters)
    }

    /// `{ username: <text>[, userdata: <text>] }`
    fn record(&mut self) -> Result<Record, ParseError> {
        self.expect('{', "{")?;
        let username = self.field("username", &[',', '}'])?;
        let userdata = if self.eat(',') {
            self.field("userdata", &['}'])?
        } else {
            String::new()
        };
        self.expect('}', "}")?;

        Ok(Record { username, userdata })
    }

    /// Optional trailing TTL: an optionally signed integer
    fn ttl(&mut self) -> Result<Option<i64>, ParseError> {
        self.skip_ws();
        if self.rest.is_empty() {
            return Ok(None);
        }

        let end = self
            .rest
            .find(char::is_whitespace)
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);

        let digits = token.strip_prefix(['-', '+']).unwrap_or(token);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::InvalidTtl(token.to_string()));
        }
        let ttl = token
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidTtl(token.to_string()))?;

        self.rest = rest;
        Ok(Some(ttl))
    }

    /// `[ <key>, ... ]` with at least one key and at most one trailing comma
    fn key_list(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect('[', "[")?;
        let mut keys = vec![self.key()?];
        while self.eat(',') {
            self.skip_ws();
            if self.peek() == Some(']') {
                break;
            }
            keys.push(self.key()?);
        }
        self.expect(']', "]")?;
        Ok(keys)
    }

    /// `[ <key> { ... }, ... ]`, each item parsed on its own
    fn batch(&mut self) -> Result<Vec<BatchItem>, ParseError> {
        self.expect('[', "[")?;
        let input = self.rest;

        let mut items = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        let mut close = None;

        // Only commas outside braces separate items
        for (i, c) in input.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                ',' if depth == 0 => {
                    items.push(&input[start..i]);
                    start = i + 1;
                }
                ']' if depth == 0 => {
                    items.push(&input[start..i]);
                    close = Some(i);
                    break;
                }
                _ => {}
            }
        }

        let Some(close) = close else {
            return Err(self.expected("]"));
        };
        if items.iter().all(|item| item.trim().is_empty()) {
            return Err(ParseError::MissingKey);
        }

        let items = items.into_iter().map(Self::batch_item).collect();
        self.rest = &input[close + 1..];
        Ok(items)
    }

    fn batch_item(segment: &str) -> BatchItem {
        let mut cursor = Cursor::new(segment);
        let key = cursor.key()?;
        let record = cursor.record()?;
        cursor.finish()?;
        Ok((key, record))
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(ParseError::TrailingInput(self.rest.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(username: &str, userdata: &str) -> Record {
        Record {
            username: username.to_string(),
            userdata: userdata.to_string(),
        }
    }

    #[test]
    fn test_parse_put_full() {
        let command = Command::parse("PUT user456 { username: JaneDoe, userdata: MoreData } 100").unwrap();
        assert_eq!(
            command,
            Command::Put {
                key: "user456".into(),
                record: record("JaneDoe", "MoreData"),
                ttl: Some(100),
            }
        );
    }

    #[test]
    fn test_parse_put_without_userdata_or_ttl() {
        let command = Command::parse("PUT a {username: X}").unwrap();
        assert_eq!(
            command,
            Command::Put {
                key: "a".into(),
                record: record("X", ""),
                ttl: None,
            }
        );
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        let command = Command::parse("  PUT   a   {   username :  John Doe  ,userdata:x y  }   7  ").unwrap();
        assert_eq!(
            command,
            Command::Put {
                key: "a".into(),
                record: record("John Doe", "x y"),
                ttl: Some(7),
            }
        );
    }

    #[test]
    fn test_parse_put_keeps_signed_ttl() {
        let command = Command::parse("PUT a { username: X } 0").unwrap();
        assert!(matches!(command, Command::Put { ttl: Some(0), .. }));

        let command = Command::parse("PUT a { username: X } -5").unwrap();
        assert!(matches!(command, Command::Put { ttl: Some(-5), .. }));
    }

    #[test]
    fn test_parse_put_rejects_bad_ttl() {
        assert_eq!(
            Command::parse("PUT a { username: X } soon"),
            Err(ParseError::InvalidTtl("soon".into()))
        );
        assert!(matches!(
            Command::parse("PUT a { username: X } 99999999999999999999"),
            Err(ParseError::InvalidTtl(_))
        ));
        assert!(matches!(
            Command::parse("PUT a { username: X } 10 20"),
            Err(ParseError::TrailingInput(_))
        ));
    }

    #[test]
    fn test_parse_put_requires_braces() {
        assert!(matches!(
            Command::parse("PUT a username: X"),
            Err(ParseError::Expected { expected: "{", .. })
        ));
        assert!(matches!(
            Command::parse("PUT user004 username: Superman, userdata: ClarkKent"),
            Err(ParseError::Expected { .. })
        ));
        assert!(matches!(
            Command::parse("PUT a { username: X"),
            Err(ParseError::Expected { expected: "}", .. })
        ));
    }

    #[test]
    fn test_parse_record_field_rules() {
        assert_eq!(
            Command::parse("PUT a { username: }"),
            Err(ParseError::EmptyField("username"))
        );
        assert!(matches!(
            Command::parse("PUT a { userdata: Y, username: X }"),
            Err(ParseError::Expected { expected: "username", .. })
        ));
        assert_eq!(
            Command::parse("PUT a { username: X, userdata: }"),
            Err(ParseError::EmptyField("userdata"))
        );
    }

    #[test]
    fn test_parse_userdata_runs_to_closing_brace() {
        assert_eq!(
            Command::parse("PUT a { username: X, userdata: Y, Z } 10"),
            Ok(Command::Put {
                key: "a".into(),
                record: record("X", "Y, Z"),
                ttl: Some(10),
            })
        );
        assert_eq!(
            Command::parse("MPUT [ b { username: X, userdata: Y, Z }, c { username: Q } ] 10"),
            Ok(Command::MPut {
                items: vec![
                    Ok(("b".into(), record("X", "Y, Z"))),
                    Ok(("c".into(), record("Q", ""))),
                ],
                ttl: Some(10),
            })
        );
        // The username still stops at the first comma
        assert!(matches!(
            Command::parse("PUT a { username: X, Y }"),
            Err(ParseError::Expected { expected: "userdata", .. })
        ));
    }

    #[test]
    fn test_parse_mput() {
        let command = Command::parse("MPUT [ a {username: X}, b {username: Y, userdata: Z} ] 50").unwrap();
        assert_eq!(
            command,
            Command::MPut {
                items: vec![
                    Ok(("a".into(), record("X", ""))),
                    Ok(("b".into(), record("Y", "Z"))),
                ],
                ttl: Some(50),
            }
        );
    }

    #[test]
    fn test_parse_mput_keeps_bad_items_in_place() {
        let command = Command::parse("MPUT [ a {username: X}, b username Y, c {username: Z} ]").unwrap();
        let Command::MPut { items, ttl } = command else {
            panic!("expected MPUT");
        };

        assert_eq!(ttl, None);
        assert_eq!(items.len(), 3);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
        assert_eq!(items[2], Ok(("c".into(), record("Z", ""))));
    }

    #[test]
    fn test_parse_mput_outer_grammar() {
        assert!(Command::parse("MPUT user003 { username: Batman, userdata: BruceWayne }").is_err());
        assert!(Command::parse("MPUT [ a {username: X}").is_err());
        assert!(Command::parse("MPUT [ ]").is_err());
        assert!(Command::parse("MPUT [ a {username: X} ] later").is_err());
    }

    #[test]
    fn test_parse_single_key_commands() {
        assert_eq!(Command::parse("GET k1"), Ok(Command::Get { key: "k1".into() }));
        assert_eq!(Command::parse("DEL k1"), Ok(Command::Del { key: "k1".into() }));
        assert_eq!(Command::parse("SAVE   k1 "), Ok(Command::Save { key: "k1".into() }));
        assert_eq!(Command::parse("GET"), Err(ParseError::MissingKey));
        assert!(matches!(
            Command::parse("SAVE user 004 to a File"),
            Err(ParseError::TrailingInput(_))
        ));
    }

    #[test]
    fn test_parse_key_lists() {
        assert_eq!(
            Command::parse("MGET [ user789, user101,user303 ]"),
            Ok(Command::MGet {
                keys: vec!["user789".into(), "user101".into(), "user303".into()],
            })
        );
        assert_eq!(
            Command::parse("MDEL [a]"),
            Ok(Command::MDel { keys: vec!["a".into()] })
        );
        assert_eq!(Command::parse("MGET [ ]"), Err(ParseError::MissingKey));
        assert_eq!(Command::parse("MGET [ a, , b ]"), Err(ParseError::MissingKey));
        assert_eq!(
            Command::parse("MGET [ e, ]"),
            Ok(Command::MGet { keys: vec!["e".into()] })
        );
        assert_eq!(
            Command::parse("MDEL [ a, b,]"),
            Ok(Command::MDel { keys: vec!["a".into(), "b".into()] })
        );
        assert_eq!(Command::parse("MGET [ a, , ]"), Err(ParseError::MissingKey));
        assert_eq!(Command::parse("MGET [ , ]"), Err(ParseError::MissingKey));
        assert!(Command::parse("MGET a, b").is_err());
    }

    #[test]
    fn test_parse_pop() {
        assert_eq!(
            Command::parse("POP user004 { username: Thor, userdata: ThunderGod }"),
            Ok(Command::Pop {
                key: "user004".into(),
                record: record("Thor", "ThunderGod"),
            })
        );
        // POP takes no TTL
        assert!(Command::parse("POP a { username: X } 10").is_err());
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(Command::parse(""), Err(ParseError::Empty));
        assert_eq!(Command::parse("   \t "), Err(ParseError::Empty));
        assert_eq!(
            Command::parse("DEL_user"),
            Err(ParseError::UnknownCommand("DEL_user".into()))
        );
        assert_eq!(
            Command::parse("get a"),
            Err(ParseError::UnknownCommand("get".into()))
        );
    }
}
