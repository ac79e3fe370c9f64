//! Addresses for subscriptions.
//!
//! The string form is slash-delimited and has one to five segments:
//!
//! | segments | form                                         | variant                 |
//! |----------|----------------------------------------------|-------------------------|
//! | 1        | `players`, `categories`, `sessions`          | [`Path::Collection`]    |
//! | 2        | `sessions/{id}` (any root table)             | [`Path::Document`]      |
//! | 3        | `sessions/{id}/games`                        | [`Path::Games`]         |
//! | 4        | `sessions/{id}/games/{id}`                   | [`Path::Game`]          |
//! | 5        | `sessions/{id}/games/{id}/pointUpdates`      | [`Path::PointUpdates`]  |

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::storage::Table;

const GAMES: &str = "games";
const POINT_UPDATES: &str = "pointUpdates";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Path {
    Collection(Table),
    Document { table: Table, id: String },
    Games { session_id: String },
    Game { session_id: String, game_id: String },
    PointUpdates { session_id: String, game_id: String },
}

impl Path {
    pub fn collection(table: Table) -> Self {
        Path::Collection(table)
    }

    pub fn document(table: Table, id: impl Into<String>) -> Self {
        Path::Document { table, id: id.into() }
    }

    pub fn sessions() -> Self {
        Path::Collection(Table::Sessions)
    }

    pub fn session(session_id: impl Into<String>) -> Self {
        Path::document(Table::Sessions, session_id)
    }

    pub fn games(session_id: impl Into<String>) -> Self {
        Path::Games { session_id: session_id.into() }
    }

    pub fn game(session_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Path::Game { session_id: session_id.into(), game_id: game_id.into() }
    }

    pub fn point_updates(session_id: impl Into<String>, game_id: impl Into<String>) -> Self {
        Path::PointUpdates { session_id: session_id.into(), game_id: game_id.into() }
    }

    /// The document `id` inside the collection addressed by `collection_path`
    /// (`"sessions"` or `"sessions/{id}/games"`).
    pub fn document_in(collection_path: &str, id: &str) -> Result<Self> {
        match collection_path.parse::<Path>()? {
            Path::Collection(table) => Ok(Path::document(table, id)),
            Path::Games { session_id } => Ok(Path::game(session_id, id)),
            other => Err(Error::invalid_format(format!(
                "'{}' does not address a collection of documents",
                other
            ))),
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            Path::Document { table: Table::Sessions, id } => Some(id.as_str()),
            Path::Games { session_id }
            | Path::Game { session_id, .. }
            | Path::PointUpdates { session_id, .. } => Some(session_id.as_str()),
            _ => None,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Path::Collection(_) | Path::Games { .. } | Path::PointUpdates { .. })
    }

    /// Every path whose view of the session changes when the session record
    /// itself changes: the collection, the document, and its games.
    pub fn session_family(session_id: &str) -> [Path; 3] {
        [Path::sessions(), Path::session(session_id), Path::games(session_id)]
    }

    /// [`Path::session_family`] plus the game document and its point updates.
    pub fn game_family(session_id: &str, game_id: &str) -> [Path; 5] {
        [
            Path::sessions(),
            Path::session(session_id),
            Path::games(session_id),
            Path::game(session_id, game_id),
            Path::point_updates(session_id, game_id),
        ]
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Path::Collection(table) => write!(f, "{}", table),
            Path::Document { table, id } => write!(f, "{}/{}", table, id),
            Path::Games { session_id } => write!(f, "sessions/{}/{}", session_id, GAMES),
            Path::Game { session_id, game_id } => {
                write!(f, "sessions/{}/{}/{}", session_id, GAMES, game_id)
            }
            Path::PointUpdates { session_id, game_id } => write!(
                f,
                "sessions/{}/{}/{}/{}",
                session_id, GAMES, game_id, POINT_UPDATES
            ),
        }
    }
}

impl FromStr for Path {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let segments: Vec<&str> = s.split('/').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(Error::invalid_format(format!("empty segment in path '{}'", s)));
        }

        let bad_path = || Error::invalid_format(format!("unsupported path '{}'", s));

        match segments.as_slice() {
            [table] => Ok(Path::Collection(table.parse()?)),
            [table, id] => Ok(Path::document(table.parse()?, *id)),
            ["sessions", session_id, GAMES] => Ok(Path::games(*session_id)),
            ["sessions", session_id, GAMES, game_id] => Ok(Path::game(*session_id, *game_id)),
            ["sessions", session_id, GAMES, game_id, POINT_UPDATES] => {
                Ok(Path::point_updates(*session_id, *game_id))
            }
            _ => Err(bad_path()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_every_depth() {
        assert_eq!("players".parse::<Path>().unwrap(), Path::Collection(Table::Players));
        assert_eq!("sessions/s1".parse::<Path>().unwrap(), Path::session("s1"));
        assert_eq!("sessions/s1/games".parse::<Path>().unwrap(), Path::games("s1"));
        assert_eq!("sessions/s1/games/g1".parse::<Path>().unwrap(), Path::game("s1", "g1"));
        assert_eq!(
            "sessions/s1/games/g1/pointUpdates".parse::<Path>().unwrap(),
            Path::point_updates("s1", "g1")
        );
    }

    #[test]
    fn test_display_round_trips() {
        for raw in [
            "categories",
            "players/p1",
            "sessions/s1/games",
            "sessions/s1/games/g1",
            "sessions/s1/games/g1/pointUpdates",
        ] {
            assert_eq!(raw.parse::<Path>().unwrap().to_string(), raw);
        }
    }

    #[test]
    fn test_rejects_malformed_paths() {
        for raw in ["", "games", "sessions//games", "players/p1/games", "sessions/s1/rounds", "sessions/s1/games/g1/x/y"] {
            assert!(raw.parse::<Path>().is_err(), "accepted {:?}", raw);
        }
    }

    #[test]
    fn test_session_id_of_nested_paths() {
        assert_eq!(Path::point_updates("s1", "g1").session_id(), Some("s1"));
        assert_eq!(Path::session("s1").session_id(), Some("s1"));
        assert_eq!(Path::sessions().session_id(), None);
        assert_eq!(Path::document(Table::Players, "p1").session_id(), None);
    }

    #[test]
    fn test_document_in_collection_path() {
        assert_eq!(Path::document_in("sessions", "s1").unwrap(), Path::session("s1"));
        assert_eq!(
            Path::document_in("sessions/s1/games", "g1").unwrap(),
            Path::game("s1", "g1")
        );
        assert!(Path::document_in("sessions/s1", "g1").is_err());
    }
}
