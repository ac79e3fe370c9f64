use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::subscription::{FieldValue, Sortable};
use crate::timestamp::Timestamp;

pub type Scores = BTreeMap<String, i64>;

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Copy of a player's display attributes taken when the player joined a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPlayer {
    pub id: String,
    pub name: String,
    pub color: String,
    #[serde(default, alias = "avatar", skip_serializing_if = "Option::is_none")]
    pub avatar_image: Option<String>,
}

impl SessionPlayer {
    /// Copies the display attributes of `player`. Returns whether anything changed.
    pub fn refresh_from(&mut self, player: &Player) -> bool {
        let changed = self.name != player.name
            || self.color != player.color
            || self.avatar_image != player.avatar_image;
        if changed {
            self.name = player.name.clone();
            self.color = player.color.clone();
            self.avatar_image = player.avatar_image.clone();
        }
        changed
    }
}

impl From<&Player> for SessionPlayer {
    fn from(player: &Player) -> Self {
        SessionPlayer {
            id: player.id.clone(),
            name: player.name.clone(),
            color: player.color.clone(),
            avatar_image: player.avatar_image.clone(),
        }
    }
}

/// A session record, stored whole with its games and their point updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: String,
    pub name: String,
    pub created_at: Timestamp,
    pub players: Vec<SessionPlayer>,
    pub total_scores: Scores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub games: Vec<Game>,
}

impl Session {
    pub fn game(&self, game_id: &str) -> Option<&Game> {
        self.games.iter().find(|g| g.id == game_id)
    }

    pub fn game_mut(&mut self, game_id: &str) -> Option<&mut Game> {
        self.games.iter_mut().find(|g| g.id == game_id)
    }

    pub fn has_player(&self, player_id: &str) -> bool {
        self.players.iter().any(|p| p.id == player_id)
    }

    /// Refreshes every embedded snapshot whose id is in `roster`.
    pub fn refresh_players(&mut self, roster: &[Player]) -> bool {
        let mut changed = false;
        for snapshot in &mut self.players {
            if let Some(player) = roster.iter().find(|p| p.id == snapshot.id) {
                changed |= snapshot.refresh_from(player);
            }
        }
        changed
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub game_number: u32,
    pub created_at: Timestamp,
    pub game_scores: Scores,
    #[serde(default)]
    pub point_updates: Vec<PointUpdate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointUpdate {
    pub id: String,
    pub scores: Scores,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGame {
    pub session_id: String,
    pub session_name: String,
    #[serde(flatten)]
    pub game: Game,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPlayer {
    pub name: String,
    pub color: String,
    pub avatar_image: Option<String>,
}

impl NewPlayer {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self { name: name.into(), color: color.into(), avatar_image: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewRecord {
    Player(NewPlayer),
    Category(NewCategory),
}

impl NewRecord {
    pub fn player(name: impl Into<String>, color: impl Into<String>) -> Self {
        NewRecord::Player(NewPlayer::new(name, color))
    }

    pub fn category(name: impl Into<String>) -> Self {
        NewRecord::Category(NewCategory { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewGame {
    pub name: String,
    pub category_id: String,
    pub category_name: String,
    pub game_scores: Scores,
}

/// Partial player update; `None` leaves a field as it is.
/// `avatar_image: Some(None)` removes the avatar.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlayerPatch {
    pub name: Option<String>,
    pub color: Option<String>,
    pub avatar_image: Option<Option<String>>,
}

impl PlayerPatch {
    pub(crate) fn apply(self, player: &mut Player) {
        if let Some(name) = self.name {
            player.name = name;
        }
        if let Some(color) = self.color {
            player.color = color;
        }
        if let Some(avatar) = self.avatar_image {
            player.avatar_image = avatar;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
}

impl CategoryPatch {
    pub(crate) fn apply(self, category: &mut Category) {
        if let Some(name) = self.name {
            category.name = name;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionPatch {
    pub name: Option<String>,
    pub cover_image: Option<Option<String>>,
}

impl SessionPatch {
    pub(crate) fn apply(self, session: &mut Session) {
        if let Some(name) = self.name {
            session.name = name;
        }
        if let Some(cover) = self.cover_image {
            session.cover_image = cover;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPatch {
    Player(PlayerPatch),
    Category(CategoryPatch),
    Session(SessionPatch),
}

impl RecordPatch {
    pub fn rename_player(name: impl Into<String>) -> Self {
        RecordPatch::Player(PlayerPatch { name: Some(name.into()), ..Default::default() })
    }

    pub fn rename_category(name: impl Into<String>) -> Self {
        RecordPatch::Category(CategoryPatch { name: Some(name.into()) })
    }
}

fn combine_scores(
    target: &mut Scores,
    delta: &Scores,
    op: fn(i64, i64) -> Option<i64>,
) -> Result<()> {
    for (player_id, points) in delta {
        let total = target.entry(player_id.clone()).or_insert(0);
        *total = op(*total, *points).ok_or_else(|| {
            Error::invalid_format(format!("score for player '{}' out of range", player_id))
        })?;
    }
    Ok(())
}

/// Errors if a total would leave the `i64` range, leaving `target` partly updated.
pub(crate) fn add_scores(target: &mut Scores, delta: &Scores) -> Result<()> {
    combine_scores(target, delta, i64::checked_add)
}

pub(crate) fn subtract_scores(target: &mut Scores, delta: &Scores) -> Result<()> {
    combine_scores(target, delta, i64::checked_sub)
}

fn text(value: &str) -> Option<FieldValue> {
    Some(FieldValue::Text(value.to_string()))
}

fn opt_text(value: &Option<String>) -> Option<FieldValue> {
    value.as_deref().and_then(text)
}

impl Sortable for Player {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => text(&self.id),
            "name" => text(&self.name),
            "color" => text(&self.color),
            "avatarImage" => opt_text(&self.avatar_image),
            _ => None,
        }
    }
}

impl Sortable for Category {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => text(&self.id),
            "name" => text(&self.name),
            _ => None,
        }
    }
}

impl Sortable for Session {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => text(&self.id),
            "name" => text(&self.name),
            "createdAt" => Some(FieldValue::Time(self.created_at)),
            "coverImage" => opt_text(&self.cover_image),
            _ => None,
        }
    }
}

impl Sortable for Game {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => text(&self.id),
            "name" => text(&self.name),
            "categoryId" => text(&self.category_id),
            "categoryName" => text(&self.category_name),
            "gameNumber" => Some(FieldValue::Number(i64::from(self.game_number))),
            "createdAt" => Some(FieldValue::Time(self.created_at)),
            _ => None,
        }
    }
}

impl Sortable for PointUpdate {
    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "id" => text(&self.id),
            "createdAt" => Some(FieldValue::Time(self.created_at)),
            _ => None,
        }
    }
}
