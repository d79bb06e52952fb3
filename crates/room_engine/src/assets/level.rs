//! Level description reader
//!
//! A level is a whitespace separated token stream of records:
//!
//! ```text
//! book 0,1.2,3 0.5
//! wall 0,10,-20 30,10,1
//! ```
//!
//! Every record starts with a type keyword and an `x,y,z` position. `wall` is
//! followed by a half-extent triple; everything else by an optional yaw in
//! radians, 0 when left out. Keywords start with a letter, which is how a
//! malformed record is told apart from the one after it.

use std::fs;
use std::path::Path;
use std::iter::Peekable;
use std::str::SplitWhitespace;

use thiserror::Error;

use crate::foundation::math::Vec3;

/// Level parsing errors
#[derive(Error, Debug)]
pub enum LevelError {
    /// Level file could not be read
    #[error("failed to open level file {path}: {source}")]
    Io {
        /// Offending file
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Record ended early
    #[error("record '{keyword}' is missing its {field}")]
    MissingField {
        /// Keyword of the truncated record
        keyword: String,
        /// Field that was expected
        field: &'static str,
    },
    /// Token is not a number or triple
    #[error("record '{keyword}': invalid {field} '{token}'")]
    InvalidField {
        /// Keyword of the record
        keyword: String,
        /// Field being parsed
        field: &'static str,
        /// Token as written
        token: String,
    },
    /// Number or triple where a record keyword should be
    #[error("expected a record keyword, found '{token}'")]
    UnexpectedToken {
        /// Token as written
        token: String,
    },
}

/// One parsed level record
#[derive(Debug, Clone, PartialEq)]
pub enum LevelRecord {
    /// Anything placed by keyword, including `room` and unknown keywords
    Entity {
        /// Type keyword as written
        keyword: String,
        /// World position
        position: Vec3,
        /// Rotation about +Y in radians
        yaw: f32,
    },
    /// Invisible static box
    Wall {
        /// Box center
        position: Vec3,
        /// Half extents
        half_extents: Vec3,
    },
}

/// Level file contents
#[derive(Debug, Clone)]
pub struct Level {
    source: String,
}

impl Level {
    /// Read a level file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let source = fs::read_to_string(path).map_err(|source| LevelError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self { source })
    }

    /// Wrap level text already in memory
    pub fn from_source(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    /// Iterate records in file order
    ///
    /// A malformed record yields one error, then iteration resumes at the next
    /// keyword.
    pub fn records(&self) -> LevelRecords<'_> {
        LevelRecords {
            tokens: self.source.split_whitespace().peekable(),
        }
    }
}

fn is_keyword(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_alphabetic())
}

/// Iterator over [`LevelRecord`]s
pub struct LevelRecords<'a> {
    tokens: Peekable<SplitWhitespace<'a>>,
}

impl LevelRecords<'_> {
    fn next_record(&mut self, keyword: &str) -> Result<LevelRecord, LevelError> {
        let position = self.triple(keyword, "position")?;

        if keyword == "wall" {
            let half_extents = self.triple(keyword, "half extents")?;
            return Ok(LevelRecord::Wall { position, half_extents });
        }

        let yaw = self.optional_yaw();
        Ok(LevelRecord::Entity {
            keyword: keyword.to_string(),
            position,
            yaw,
        })
    }

    fn optional_yaw(&mut self) -> f32 {
        let yaw = self
            .tokens
            .peek()
            .filter(|token| !is_keyword(token))
            .and_then(|token| token.parse().ok());
        if yaw.is_some() {
            self.tokens.next();
        }
        yaw.unwrap_or(0.0)
    }

    // A keyword is left in place so the next record still starts on it
    fn field(&mut self, keyword: &str, field: &'static str) -> Result<&str, LevelError> {
        match self.tokens.peek() {
            Some(token) if !is_keyword(token) => Ok(self.tokens.next().unwrap_or_default()),
            _ => Err(LevelError::MissingField {
                keyword: keyword.to_string(),
                field,
            }),
        }
    }

    fn skip_to_keyword(&mut self) {
        while self.tokens.next_if(|token| !is_keyword(token)).is_some() {}
    }

    fn triple(&mut self, keyword: &str, field: &'static str) -> Result<Vec3, LevelError> {
        let token = self.field(keyword, field)?;
        let invalid = || LevelError::InvalidField {
            keyword: keyword.to_string(),
            field,
            token: token.to_string(),
        };

        let mut components = token.split(',');
        let mut values = [0.0f32; 3];
        for value in &mut values {
            *value = components
                .next()
                .and_then(|c| c.parse().ok())
                .ok_or_else(invalid)?;
        }
        if components.next().is_some() {
            return Err(invalid());
        }
        Ok(Vec3::new(values[0], values[1], values[2]))
    }
}

impl Iterator for LevelRecords<'_> {
    type Item = Result<LevelRecord, LevelError>;

    fn next(&mut self) -> Option<Self::Item> {
        let keyword = self.tokens.next()?;
        let record = if is_keyword(keyword) {
            self.next_record(keyword)
        } else {
            Err(LevelError::UnexpectedToken {
                token: keyword.to_string(),
            })
        };
        if record.is_err() {
            self.skip_to_keyword();
        }
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_entity_and_wall_records() {
        let level = Level::from_source("book 0,0,0 0.0\nwall 1,2,3 10,0.5,4\n  monitor -1.5,2,0.25   1.57");
        let records: Vec<_> = level.records().collect::<Result<_, _>>().unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            LevelRecord::Entity { keyword: "book".into(), position: Vec3::zeros(), yaw: 0.0 }
        );
        assert_eq!(
            records[1],
            LevelRecord::Wall { position: Vec3::new(1.0, 2.0, 3.0), half_extents: Vec3::new(10.0, 0.5, 4.0) }
        );
        match &records[2] {
            LevelRecord::Entity { keyword, position, yaw } => {
                assert_eq!(keyword, "monitor");
                assert_relative_eq!(position.x, -1.5);
                assert_relative_eq!(*yaw, 1.57);
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_unknown_keyword_consumes_position_and_yaw() {
        let level = Level::from_source("lamp 0,0,0 1.0 book 1,1,1 0");
        let records: Vec<_> = level.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[1], LevelRecord::Entity { keyword, .. } if keyword == "book"));
    }

    #[test]
    fn test_truncated_position_is_reported() {
        let level = Level::from_source("book 0,0,0 0 mug 1,2");
        let mut records = level.records();
        assert!(records.next().unwrap().is_ok());
        assert!(matches!(
            records.next(),
            Some(Err(LevelError::InvalidField { field: "position", .. }))
        ));
        assert!(records.next().is_none());
    }

    #[test]
    fn test_missing_yaw_defaults_to_zero() {
        let level = Level::from_source("desk 0,0,0");
        let records: Vec<_> = level.records().collect::<Result<_, _>>().unwrap();
        assert_eq!(
            records,
            vec![LevelRecord::Entity { keyword: "desk".into(), position: Vec3::zeros(), yaw: 0.0 }]
        );
    }

    #[test]
    fn test_missing_yaw_keeps_the_next_keyword() {
        let level = Level::from_source("room 0,0,0 book 1,0,0 0");
        let records: Vec<_> = level.records().collect::<Result<_, _>>().unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0],
            LevelRecord::Entity { keyword: "room".into(), position: Vec3::zeros(), yaw: 0.0 }
        );
        assert_eq!(
            records[1],
            LevelRecord::Entity { keyword: "book".into(), position: Vec3::new(1.0, 0.0, 0.0), yaw: 0.0 }
        );
    }

    #[test]
    fn test_bad_record_is_skipped() {
        let level = Level::from_source("mug 1,x,0 0.5 2.0 lamp book 1,1,1 0.25 wall 0,0,0 1,1,1");
        let records: Vec<_> = level.records().collect();

        assert_eq!(records.len(), 4);
        assert!(matches!(&records[0], Err(LevelError::InvalidField { keyword, field: "position", .. }) if keyword == "mug"));
        assert!(matches!(&records[1], Err(LevelError::MissingField { keyword, field: "position" }) if keyword == "lamp"));
        match &records[2] {
            Ok(LevelRecord::Entity { keyword, yaw, .. }) => {
                assert_eq!(keyword, "book");
                assert_relative_eq!(*yaw, 0.25);
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(matches!(records[3], Ok(LevelRecord::Wall { .. })));
    }

    #[test]
    fn test_leading_number_is_unexpected() {
        let level = Level::from_source("1.5 2,2,2 book 0,0,0");
        let records: Vec<_> = level.records().collect();
        assert_eq!(records.len(), 2);
        assert!(matches!(&records[0], Err(LevelError::UnexpectedToken { token }) if token == "1.5"));
        assert!(records[1].is_ok());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(matches!(
            Level::load("/definitely/not/here/level.txt"),
            Err(LevelError::Io { .. })
        ));
    }
}
