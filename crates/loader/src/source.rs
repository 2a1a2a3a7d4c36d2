//! Tabular source reader
//!
//! Reads a delimited catalog export into rows of string fields. Every row is
//! returned verbatim, header included; callers relying on positional column
//! mapping skip row 0 themselves. The reader does not validate arity
//! (`flexible`), it only surfaces structural failures such as unterminated
//! quotes. Embedded commas inside quoted fields are preserved.

use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use ludobot_common::models::GameRecord;
use tracing::debug;

use crate::errors::LoaderError;

/// Read every row of a CSV file, header included
pub fn read_rows(path: &Path) -> Result<Vec<StringRecord>, LoaderError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| LoaderError::Parse {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        rows.push(record);
    }

    debug!(path = %path.display(), rows = rows.len(), "Source file read");
    Ok(rows)
}

fn field<'a>(row: &'a StringRecord, index: usize, name: &str) -> Result<&'a str, LoaderError> {
    row.get(index).ok_or_else(|| LoaderError::Row {
        line: row_line(row),
        message: format!("missing column {index} ({name})"),
    })
}

fn row_line(row: &StringRecord) -> u64 {
    row.position().map(|p| p.line()).unwrap_or(0)
}

/// Positionally map a 9-column games catalog row
///
/// Column order: basename, name, genre, platform, publisher, developer,
/// critic_score, user_score, year.
pub fn game_from_row(row: &StringRecord) -> Result<GameRecord, LoaderError> {
    Ok(GameRecord {
        basename: field(row, 0, "basename")?.to_string(),
        name: field(row, 1, "name")?.to_string(),
        genre: field(row, 2, "genre")?.to_string(),
        platform: field(row, 3, "platform")?.to_string(),
        publisher: field(row, 4, "publisher")?.to_string(),
        developer: field(row, 5, "developer")?.to_string(),
        critic_score: field(row, 6, "critic_score")?.to_string(),
        user_score: field(row, 7, "user_score")?.to_string(),
        year: field(row, 8, "year")?.to_string(),
    })
}

/// A row of the streamer export
///
/// Column order: id, name, language, games_names, play_counts. The last two
/// are comma-joined quoted lists pairing one play count per game name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerRow {
    pub id: String,
    pub name: String,
    pub language: String,
    pub game_names: Vec<String>,
    pub play_counts: Vec<i64>,
}

impl StreamerRow {
    pub fn from_row(row: &StringRecord) -> Result<Self, LoaderError> {
        let line = row_line(row);

        let game_names: Vec<String> = split_list(field(row, 3, "games_names")?);
        let play_counts = split_list(field(row, 4, "play_counts")?)
            .iter()
            .map(|raw| {
                raw.parse::<i64>().map_err(|e| LoaderError::Row {
                    line,
                    message: format!("bad play count {raw:?}: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if game_names.len() != play_counts.len() {
            return Err(LoaderError::Row {
                line,
                message: format!(
                    "{} game names but {} play counts",
                    game_names.len(),
                    play_counts.len()
                ),
            });
        }

        Ok(Self {
            id: field(row, 0, "id")?.to_string(),
            name: field(row, 1, "name")?.to_string(),
            language: field(row, 2, "language")?.to_string(),
            game_names,
            play_counts,
        })
    }

    /// Paired (game name, play count) entries
    pub fn games_played(&self) -> impl Iterator<Item = (&str, i64)> {
        self.game_names
            .iter()
            .map(String::as_str)
            .zip(self.play_counts.iter().copied())
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_header_row_is_returned_verbatim() {
        let file = write_csv("basename,name,genre\nhl2,Half-Life 2,Shooter\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(0), Some("basename"));
        assert_eq!(rows[1].get(1), Some("Half-Life 2"));
    }

    #[test]
    fn test_embedded_commas_preserved_in_quoted_fields() {
        let file = write_csv("hl2,Half-Life 2,\"Shooter, Action\",PC\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows[0].get(2), Some("Shooter, Action"));
        assert_eq!(rows[0].get(3), Some("PC"));
    }

    #[test]
    fn test_uneven_arity_is_not_a_reader_error() {
        let file = write_csv("a,b,c\nd,e\n");
        let rows = read_rows(file.path()).unwrap();
        assert_eq!(rows[1].len(), 2);
    }

    #[test]
    fn test_game_from_row_maps_all_columns() {
        let file = write_csv(
            "hl2,Half-Life 2,\"Shooter, Action\",\"PC, Xbox\",Valve,Valve,96,9.2,2004\n",
        );
        let rows = read_rows(file.path()).unwrap();
        let record = game_from_row(&rows[0]).unwrap();
        assert_eq!(record.basename, "hl2");
        assert_eq!(record.genre, "Shooter, Action");
        assert_eq!(record.platform, "PC, Xbox");
        assert_eq!(record.year, "2004");
    }

    #[test]
    fn test_game_from_row_reports_missing_column_with_line() {
        let file = write_csv("first\nhl2,Half-Life 2\n");
        let rows = read_rows(file.path()).unwrap();
        let err = game_from_row(&rows[1]).unwrap_err();
        match err {
            LoaderError::Row { line, message } => {
                assert_eq!(line, 2);
                assert!(message.contains("genre"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_streamer_row_pairs_names_with_counts() {
        let file = write_csv("42,gamerpro,fr,\"Half-Life 2,Portal\",\"3,1\"\n");
        let rows = read_rows(file.path()).unwrap();
        let streamer = StreamerRow::from_row(&rows[0]).unwrap();
        assert_eq!(streamer.id, "42");
        let played: Vec<_> = streamer.games_played().collect();
        assert_eq!(played, vec![("Half-Life 2", 3), ("Portal", 1)]);
    }

    #[test]
    fn test_streamer_row_rejects_mismatched_counts() {
        let file = write_csv("42,gamerpro,fr,\"Half-Life 2,Portal\",\"3\"\n");
        let rows = read_rows(file.path()).unwrap();
        assert!(StreamerRow::from_row(&rows[0]).is_err());
    }
}
