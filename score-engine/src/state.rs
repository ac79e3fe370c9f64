use crate::error::{EntityKind, Error, Result};
use crate::model::{Category, Game, Player, PointUpdate, Session, SessionGame};
use crate::path::Path;
use crate::storage::Table;
use crate::subscription::{OrderBy, Sortable};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    pub players: Vec<Player>,
    pub categories: Vec<Category>,
    pub sessions: Vec<Session>,
}

impl CacheState {
    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn category(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn session(&self, id: &str) -> Option<&Session> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub(crate) fn session_index(&self, id: &str) -> Result<usize> {
        self.sessions
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| Error::not_found(EntityKind::Session, id))
    }

    /// A copy of the session, for mutations that persist before committing.
    pub(crate) fn session_copy(&self, id: &str) -> Result<(usize, Session)> {
        let index = self.session_index(id)?;
        Ok((index, self.sessions[index].clone()))
    }

    /// Every game of every session with its owner, oldest first. Games created
    /// at the same instant keep session order.
    pub fn all_games(&self) -> Vec<SessionGame> {
        let mut games: Vec<SessionGame> = self
            .sessions
            .iter()
            .flat_map(|session| {
                session.games.iter().map(move |game| SessionGame {
                    session_id: session.id.clone(),
                    session_name: session.name.clone(),
                    game: game.clone(),
                })
            })
            .collect();
        games.sort_by_key(|g| g.game.created_at);
        games
    }

    /// The current value visible at `path`. Missing parents yield an empty
    /// list for collection paths and `None` for document paths.
    pub fn snapshot(&self, path: &Path) -> Snapshot {
        match path {
            Path::Collection(Table::Players) => Snapshot::Players(self.players.clone()),
            Path::Collection(Table::Categories) => Snapshot::Categories(self.categories.clone()),
            Path::Collection(Table::Sessions) => Snapshot::Sessions(self.sessions.clone()),
            Path::Document { table: Table::Players, id } => {
                Snapshot::Player(self.player(id).cloned())
            }
            Path::Document { table: Table::Categories, id } => {
                Snapshot::Category(self.category(id).cloned())
            }
            Path::Document { table: Table::Sessions, id } => {
                Snapshot::Session(self.session(id).cloned())
            }
            Path::Games { session_id } => Snapshot::Games(
                self.session(session_id)
                    .map(|s| s.games.clone())
                    .unwrap_or_default(),
            ),
            Path::Game { session_id, game_id } => Snapshot::Game(
                self.session(session_id)
                    .and_then(|s| s.game(game_id))
                    .cloned(),
            ),
            Path::PointUpdates { session_id, game_id } => Snapshot::PointUpdates(
                self.session(session_id)
                    .and_then(|s| s.game(game_id))
                    .map(|g| g.point_updates.clone())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// What a listener receives. Every snapshot is an owned copy of the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Snapshot {
    Players(Vec<Player>),
    Categories(Vec<Category>),
    Sessions(Vec<Session>),
    Player(Option<Player>),
    Category(Option<Category>),
    Session(Option<Session>),
    Games(Vec<Game>),
    Game(Option<Game>),
    PointUpdates(Vec<PointUpdate>),
}

fn sort_list<T: Sortable>(items: &mut [T], order: &OrderBy) {
    items.sort_by(|a, b| order.compare(a, b));
}

impl Snapshot {
    /// Sorts list snapshots in place; documents are left alone.
    pub fn sort(&mut self, order: &OrderBy) {
        match self {
            Snapshot::Players(items) => sort_list(items, order),
            Snapshot::Categories(items) => sort_list(items, order),
            Snapshot::Sessions(items) => sort_list(items, order),
            Snapshot::Games(items) => sort_list(items, order),
            Snapshot::PointUpdates(items) => sort_list(items, order),
            Snapshot::Player(_) | Snapshot::Category(_) | Snapshot::Session(_) | Snapshot::Game(_) => {}
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Snapshot::Players(items) => items.len(),
            Snapshot::Categories(items) => items.len(),
            Snapshot::Sessions(items) => items.len(),
            Snapshot::Games(items) => items.len(),
            Snapshot::PointUpdates(items) => items.len(),
            Snapshot::Player(doc) => usize::from(doc.is_some()),
            Snapshot::Category(doc) => usize::from(doc.is_some()),
            Snapshot::Session(doc) => usize::from(doc.is_some()),
            Snapshot::Game(doc) => usize::from(doc.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_players(self) -> Option<Vec<Player>> {
        match self {
            Snapshot::Players(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_categories(self) -> Option<Vec<Category>> {
        match self {
            Snapshot::Categories(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_sessions(self) -> Option<Vec<Session>> {
        match self {
            Snapshot::Sessions(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_games(self) -> Option<Vec<Game>> {
        match self {
            Snapshot::Games(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_point_updates(self) -> Option<Vec<PointUpdate>> {
        match self {
            Snapshot::PointUpdates(items) => Some(items),
            _ => None,
        }
    }

    pub fn into_session(self) -> Option<Session> {
        match self {
            Snapshot::Session(doc) => doc,
            _ => None,
        }
    }

    pub fn into_game(self) -> Option<Game> {
        match self {
            Snapshot::Game(doc) => doc,
            _ => None,
        }
    }

    pub fn into_player(self) -> Option<Player> {
        match self {
            Snapshot::Player(doc) => doc,
            _ => None,
        }
    }

    pub fn into_category(self) -> Option<Category> {
        match self {
            Snapshot::Category(doc) => doc,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Scores, SessionPlayer};
    use crate::subscription::Direction;
    use crate::timestamp::Timestamp;

    fn ts(millis: i64) -> Timestamp {
        Timestamp::from_millis(millis).unwrap()
    }

    fn game(id: &str, number: u32, created: i64) -> Game {
        Game {
            id: id.into(),
            name: format!("Game {}", number),
            category_id: "c1".into(),
            category_name: "Quiz".into(),
            game_number: number,
            created_at: ts(created),
            game_scores: Scores::new(),
            point_updates: vec![PointUpdate { id: format!("{}-u1", id), scores: Scores::new(), created_at: ts(created) }],
        }
    }

    fn state() -> CacheState {
        let player = Player { id: "p1".into(), name: "Alice".into(), color: "#fff".into(), avatar_image: None };
        CacheState {
            sessions: vec![Session {
                id: "s1".into(),
                name: "Quiz Night".into(),
                created_at: ts(0),
                players: vec![SessionPlayer::from(&player)],
                total_scores: Scores::new(),
                cover_image: None,
                games: vec![game("g1", 1, 200), game("g2", 2, 100)],
            }],
            players: vec![player],
            categories: Vec::new(),
        }
    }

    #[test]
    fn test_snapshot_at_every_depth() {
        let state = state();
        assert_eq!(state.snapshot(&Path::sessions()).len(), 1);
        assert_eq!(state.snapshot(&Path::session("s1")).into_session().unwrap().name, "Quiz Night");
        assert_eq!(state.snapshot(&Path::games("s1")).len(), 2);
        assert_eq!(state.snapshot(&Path::game("s1", "g2")).into_game().unwrap().game_number, 2);
        assert_eq!(state.snapshot(&Path::point_updates("s1", "g1")).len(), 1);
        assert_eq!(
            state.snapshot(&Path::document(Table::Players, "p1")).into_player().unwrap().name,
            "Alice"
        );
    }

    #[test]
    fn test_snapshot_of_missing_entities() {
        let state = state();
        assert_eq!(state.snapshot(&Path::session("nope")), Snapshot::Session(None));
        assert_eq!(state.snapshot(&Path::games("nope")), Snapshot::Games(Vec::new()));
        assert_eq!(state.snapshot(&Path::game("s1", "nope")), Snapshot::Game(None));
        assert_eq!(state.snapshot(&Path::point_updates("s1", "nope")), Snapshot::PointUpdates(Vec::new()));
    }

    #[test]
    fn test_sort_games_by_created_at() {
        let mut snapshot = state().snapshot(&Path::games("s1"));
        snapshot.sort(&OrderBy::new("createdAt", Direction::Asc));
        let ids: Vec<_> = snapshot.into_games().unwrap().into_iter().map(|g| g.id).collect();
        assert_eq!(ids, vec!["g2", "g1"]);
    }

    #[test]
    fn test_session_index_not_found() {
        let err = state().session_index("missing").unwrap_err();
        assert!(err.is_not_found());
    }
}
