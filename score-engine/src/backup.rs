//! Export documents.
//!
//! The export format keeps record ids under `_id` and encodes every timestamp
//! as an ISO-8601 string. Conversion is done per entity so that only the
//! known `createdAt` fields change encoding.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::model::{Category, Game, Player, PointUpdate, Scores, Session, SessionPlayer};
use crate::ops::Store;
use crate::path::Path;
use crate::state::CacheState;
use crate::storage::{Storage, Table};
use crate::timestamp::Timestamp;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDoc {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDoc {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointUpdateDoc {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    #[serde(default)]
    pub scores: Scores,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameDoc {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub game_number: u32,
    pub created_at: String,
    #[serde(default)]
    pub game_scores: Scores,
    #[serde(default)]
    pub point_updates: Vec<PointUpdateDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDoc {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    pub created_at: String,
    #[serde(default)]
    pub players: Vec<SessionPlayer>,
    #[serde(default)]
    pub total_scores: Scores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub games: Vec<GameDoc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FullBackup {
    pub players: Vec<PlayerDoc>,
    pub categories: Vec<CategoryDoc>,
    pub sessions: Vec<SessionDoc>,
}

const REQUIRED_FIELDS: [&str; 3] = ["players", "categories", "sessions"];

impl FullBackup {
    /// Validates the top-level shape, then decodes the document.
    pub fn from_value(value: Value) -> Result<Self> {
        let Some(object) = value.as_object() else {
            return Err(Error::invalid_format("backup must be a JSON object"));
        };
        for field in REQUIRED_FIELDS {
            match object.get(field) {
                Some(Value::Array(_)) => {}
                Some(_) => {
                    return Err(Error::invalid_format(format!("'{}' must be an array", field)))
                }
                None => {
                    return Err(Error::invalid_format(format!("missing top-level field '{}'", field)))
                }
            }
        }
        serde_json::from_value(value).map_err(|e| Error::invalid_format(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| Error::invalid_format(e.to_string()))?;
        Self::from_value(value)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_state(state: &CacheState) -> Self {
        FullBackup {
            players: state.players.iter().map(PlayerDoc::from).collect(),
            categories: state.categories.iter().map(CategoryDoc::from).collect(),
            sessions: state.sessions.iter().map(SessionDoc::from).collect(),
        }
    }

    /// Decodes every record and refreshes the embedded player snapshots
    /// against the imported roster.
    pub fn into_state(self) -> Result<CacheState> {
        let players: Vec<Player> = self.players.into_iter().map(Player::from).collect();
        let categories: Vec<Category> = self.categories.into_iter().map(Category::from).collect();
        let mut sessions = self
            .sessions
            .into_iter()
            .map(Session::try_from)
            .collect::<Result<Vec<_>>>()?;

        for session in &mut sessions {
            session.refresh_players(&players);
            for snapshot in &session.players {
                if !players.iter().any(|p| p.id == snapshot.id) {
                    warn!(
                        session = %session.id,
                        player = %snapshot.id,
                        "session references a player missing from the roster"
                    );
                }
            }
        }

        Ok(CacheState { players, categories, sessions })
    }
}

impl From<&Player> for PlayerDoc {
    fn from(player: &Player) -> Self {
        PlayerDoc {
            id: player.id.clone(),
            name: player.name.clone(),
            color: player.color.clone(),
            avatar_image: player.avatar_image.clone(),
        }
    }
}

impl From<PlayerDoc> for Player {
    fn from(doc: PlayerDoc) -> Self {
        Player { id: doc.id, name: doc.name, color: doc.color, avatar_image: doc.avatar_image }
    }
}

impl From<&Category> for CategoryDoc {
    fn from(category: &Category) -> Self {
        CategoryDoc { id: category.id.clone(), name: category.name.clone() }
    }
}

impl From<CategoryDoc> for Category {
    fn from(doc: CategoryDoc) -> Self {
        Category { id: doc.id, name: doc.name }
    }
}

impl From<&PointUpdate> for PointUpdateDoc {
    fn from(update: &PointUpdate) -> Self {
        PointUpdateDoc {
            id: update.id.clone(),
            scores: update.scores.clone(),
            created_at: update.created_at.to_wire(),
        }
    }
}

impl TryFrom<PointUpdateDoc> for PointUpdate {
    type Error = Error;

    fn try_from(doc: PointUpdateDoc) -> Result<Self> {
        Ok(PointUpdate {
            created_at: Timestamp::parse_wire(&doc.created_at)?,
            id: doc.id,
            scores: doc.scores,
        })
    }
}

impl From<&Game> for GameDoc {
    fn from(game: &Game) -> Self {
        GameDoc {
            id: game.id.clone(),
            name: game.name.clone(),
            category_id: game.category_id.clone(),
            category_name: game.category_name.clone(),
            game_number: game.game_number,
            created_at: game.created_at.to_wire(),
            game_scores: game.game_scores.clone(),
            point_updates: game.point_updates.iter().map(PointUpdateDoc::from).collect(),
        }
    }
}

impl TryFrom<GameDoc> for Game {
    type Error = Error;

    fn try_from(doc: GameDoc) -> Result<Self> {
        Ok(Game {
            created_at: Timestamp::parse_wire(&doc.created_at)?,
            point_updates: doc
                .point_updates
                .into_iter()
                .map(PointUpdate::try_from)
                .collect::<Result<Vec<_>>>()?,
            id: doc.id,
            name: doc.name,
            category_id: doc.category_id,
            category_name: doc.category_name,
            game_number: doc.game_number,
            game_scores: doc.game_scores,
        })
    }
}

impl From<&Session> for SessionDoc {
    fn from(session: &Session) -> Self {
        SessionDoc {
            id: session.id.clone(),
            name: session.name.clone(),
            created_at: session.created_at.to_wire(),
            players: session.players.clone(),
            total_scores: session.total_scores.clone(),
            cover_image: session.cover_image.clone(),
            games: session.games.iter().map(GameDoc::from).collect(),
        }
    }
}

impl TryFrom<SessionDoc> for Session {
    type Error = Error;

    fn try_from(doc: SessionDoc) -> Result<Self> {
        Ok(Session {
            created_at: Timestamp::parse_wire(&doc.created_at)?,
            games: doc
                .games
                .into_iter()
                .map(Game::try_from)
                .collect::<Result<Vec<_>>>()?,
            id: doc.id,
            name: doc.name,
            players: doc.players,
            total_scores: doc.total_scores,
            cover_image: doc.cover_image,
        })
    }
}

impl<S: Storage> Store<S> {
    pub fn export_data(&self) -> FullBackup {
        FullBackup::from_state(self.state())
    }

    /// Replaces every table with the contents of `backup`.
    ///
    /// The backup is fully decoded before anything is cleared, so a malformed
    /// document leaves the store untouched.
    pub fn import_data(&mut self, backup: FullBackup) -> Result<()> {
        let state = backup.into_state()?;
        self.tables
            .replace_all(&state.players, &state.categories, &state.sessions)?;

        info!(
            players = state.players.len(),
            categories = state.categories.len(),
            sessions = state.sessions.len(),
            "imported backup"
        );

        let mut paths: BTreeSet<Path> = Table::ALL.into_iter().map(Path::collection).collect();
        for session in &state.sessions {
            paths.insert(Path::session(session.id.as_str()));
            paths.insert(Path::games(session.id.as_str()));
        }
        self.state = state;

        // Views on paths that no longer exist must also re-render.
        paths.extend(self.subscriptions.active_paths());
        self.notify_each(paths);
        Ok(())
    }

    pub fn import_json(&mut self, json: &str) -> Result<()> {
        let backup = FullBackup::from_json(json)?;
        self.import_data(backup)
    }
}
