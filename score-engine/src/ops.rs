use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::error::{EntityKind, Error, Result};
use crate::model::{
    add_scores, new_id, subtract_scores, Category, Game, NewGame, NewRecord, Player, PlayerPatch,
    PointUpdate, RecordPatch, Scores, Session, SessionGame, SessionPlayer,
};
use crate::path::Path;
use crate::seed;
use crate::state::{CacheState, Snapshot};
use crate::storage::{Storage, Table};
use crate::subscription::{SubscribeOptions, Subscription, SubscriptionRegistry};
use crate::table::TableStore;
use crate::timestamp::Timestamp;
#[cfg(feature = "sqlite")]
use crate::config::StoreConfig;
#[cfg(feature = "sqlite")]
use crate::storage::SqliteStorage;

/// The loaded store: durable tables, their in-memory mirror, and the
/// listeners watching it.
///
/// Every mutation builds the new record from a copy of the cache, persists it,
/// and only then commits it to the cache and notifies. A failed write leaves
/// the cache as it was.
pub struct Store<S: Storage> {
    pub(crate) tables: TableStore<S>,
    pub(crate) state: CacheState,
    pub(crate) subscriptions: SubscriptionRegistry,
}

#[cfg(feature = "sqlite")]
impl Store<SqliteStorage> {
    pub fn open(config: &StoreConfig) -> Result<Self> {
        let path = config.database_path.to_string_lossy();
        info!(path = %path, "opening store");
        let tables = TableStore::open(&path)?;
        Self::load(tables, config.seed_on_empty)
    }
}

fn read_state<S: Storage>(tables: &TableStore<S>) -> Result<CacheState> {
    Ok(CacheState {
        players: tables.load()?,
        categories: tables.load()?,
        sessions: tables.load()?,
    })
}

impl<S: Storage> Store<S> {
    /// Reads every table into the cache. When all tables are empty and
    /// `seed_on_empty` is set, the built-in dataset is written first.
    pub fn load(mut tables: TableStore<S>, seed_on_empty: bool) -> Result<Self> {
        if seed_on_empty && tables.is_empty()? {
            let seed = seed::dataset()?.into_state()?;
            tables.replace_all(&seed.players, &seed.categories, &seed.sessions)?;
            info!(sessions = seed.sessions.len(), "seeded empty store");
        }

        let state = read_state(&tables)?;
        info!(
            players = state.players.len(),
            categories = state.categories.len(),
            sessions = state.sessions.len(),
            "store loaded"
        );
        Ok(Self { tables, state, subscriptions: SubscriptionRegistry::new() })
    }

    /// Re-reads the cache from durable storage and refreshes every open view.
    pub fn reload(&mut self) -> Result<()> {
        self.state = read_state(&self.tables)?;
        debug!("cache reloaded");
        let paths = self.subscriptions.active_paths();
        self.notify_each(paths);
        Ok(())
    }

    pub fn state(&self) -> &CacheState {
        &self.state
    }

    pub fn subscriptions(&self) -> &SubscriptionRegistry {
        &self.subscriptions
    }

    pub fn into_tables(self) -> TableStore<S> {
        self.tables
    }

    // ---- subscriptions ----

    /// Registers `callback` at `path` and calls it right away with the
    /// current value.
    pub fn subscribe<F>(&self, path: Path, options: SubscribeOptions, callback: F) -> Subscription
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let initial = self.state.snapshot(&path);
        debug!(path = %path, "subscribe");
        self.subscriptions.register(path, options, Box::new(callback), initial)
    }

    pub fn subscribe_collection<F>(
        &self,
        table: Table,
        options: SubscribeOptions,
        callback: F,
    ) -> Subscription
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        self.subscribe(Path::collection(table), options, callback)
    }

    /// `path` must address a list, e.g. `sessions/{id}/games`.
    pub fn subscribe_sub_collection<F>(
        &self,
        path: &str,
        options: SubscribeOptions,
        callback: F,
    ) -> Result<Subscription>
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let path: Path = path.parse()?;
        if !path.is_list() {
            return Err(Error::invalid_format(format!("'{}' is not a collection path", path)));
        }
        Ok(self.subscribe(path, options, callback))
    }

    pub fn subscribe_document<F>(
        &self,
        collection_path: &str,
        id: &str,
        callback: F,
    ) -> Result<Subscription>
    where
        F: FnMut(Snapshot) + Send + 'static,
    {
        let path = Path::document_in(collection_path, id)?;
        Ok(self.subscribe(path, SubscribeOptions::default(), callback))
    }

    pub(crate) fn notify(&self, path: &Path) {
        if !self.subscriptions.has_listeners(path) {
            return;
        }
        let snapshot = self.state.snapshot(path);
        let delivered = self.subscriptions.notify(path, &snapshot);
        debug!(path = %path, listeners = delivered, "notified");
    }

    pub(crate) fn notify_each(&self, paths: impl IntoIterator<Item = Path>) {
        for path in paths {
            self.notify(&path);
        }
    }

    fn commit_session(&mut self, index: usize, session: Session) {
        self.state.sessions[index] = session;
    }

    // ---- roster and taxonomy ----

    pub fn add_record(&mut self, record: NewRecord) -> Result<String> {
        let id = new_id();
        match record {
            NewRecord::Player(new) => {
                let player = Player {
                    id: id.clone(),
                    name: new.name,
                    color: new.color,
                    avatar_image: new.avatar_image,
                };
                self.tables.save(&player)?;
                self.state.players.push(player);
                self.notify(&Path::collection(Table::Players));
            }
            NewRecord::Category(new) => {
                let category = Category { id: id.clone(), name: new.name };
                self.tables.save(&category)?;
                self.state.categories.push(category);
                self.notify(&Path::collection(Table::Categories));
            }
        }
        debug!(id = %id, "record added");
        Ok(id)
    }

    /// Merges `patch` into the record `id`. Player changes are copied into
    /// every session that embeds that player.
    pub fn update_record(&mut self, id: &str, patch: RecordPatch) -> Result<()> {
        match patch {
            RecordPatch::Player(patch) => self.update_player(id, patch),
            RecordPatch::Category(patch) => {
                let index = self
                    .state
                    .categories
                    .iter()
                    .position(|c| c.id == id)
                    .ok_or_else(|| Error::not_found(EntityKind::Category, id))?;
                let mut category = self.state.categories[index].clone();
                patch.apply(&mut category);
                self.tables.save(&category)?;
                self.state.categories[index] = category;
                self.notify_each([
                    Path::collection(Table::Categories),
                    Path::document(Table::Categories, id),
                ]);
                Ok(())
            }
            RecordPatch::Session(patch) => {
                let (index, mut session) = self.state.session_copy(id)?;
                patch.apply(&mut session);
                self.tables.save(&session)?;
                self.commit_session(index, session);
                self.notify_each([Path::sessions(), Path::session(id)]);
                Ok(())
            }
        }
    }

    fn update_player(&mut self, id: &str, patch: PlayerPatch) -> Result<()> {
        let index = self
            .state
            .players
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::not_found(EntityKind::Player, id))?;
        let mut player = self.state.players[index].clone();
        patch.apply(&mut player);

        let roster = std::slice::from_ref(&player);
        let touched: Vec<(usize, Session)> = self
            .state
            .sessions
            .iter()
            .enumerate()
            .filter_map(|(i, session)| {
                let mut session = session.clone();
                session.refresh_players(roster).then_some((i, session))
            })
            .collect();

        self.tables.transaction(|tables| {
            tables.save(&player)?;
            let sessions: Vec<Session> = touched.iter().map(|(_, s)| s.clone()).collect();
            tables.save_all(&sessions)
        })?;

        self.state.players[index] = player;
        debug!(player = %id, sessions = touched.len(), "player updated");
        let mut paths = vec![Path::collection(Table::Players), Path::document(Table::Players, id)];
        if !touched.is_empty() {
            paths.push(Path::sessions());
        }
        for (session_index, session) in touched {
            paths.push(Path::session(session.id.as_str()));
            self.commit_session(session_index, session);
        }
        self.notify_each(paths);
        Ok(())
    }

    /// Removes a player, category or session. Sessions keep their copies of
    /// deleted players and categories.
    pub fn delete_record(&mut self, table: Table, id: &str) -> Result<()> {
        match table {
            Table::Players => {
                let index = self
                    .state
                    .players
                    .iter()
                    .position(|p| p.id == id)
                    .ok_or_else(|| Error::not_found(EntityKind::Player, id))?;
                self.tables.delete(table, id)?;
                self.state.players.remove(index);
            }
            Table::Categories => {
                let index = self
                    .state
                    .categories
                    .iter()
                    .position(|c| c.id == id)
                    .ok_or_else(|| Error::not_found(EntityKind::Category, id))?;
                self.tables.delete(table, id)?;
                self.state.categories.remove(index);
            }
            Table::Sessions => return self.delete_session(id),
        }
        debug!(table = %table, id = %id, "record deleted");
        self.notify_each([Path::collection(table), Path::document(table, id)]);
        Ok(())
    }

    // ---- sessions and games ----

    pub fn start_session(
        &mut self,
        name: &str,
        players: &[Player],
        cover_image: Option<String>,
    ) -> Result<String> {
        let mut session = Session {
            id: new_id(),
            name: name.to_string(),
            created_at: Timestamp::now(),
            players: Vec::with_capacity(players.len()),
            total_scores: Scores::new(),
            cover_image,
            games: Vec::new(),
        };
        for player in players {
            if !session.has_player(&player.id) {
                session.players.push(SessionPlayer::from(player));
                session.total_scores.insert(player.id.clone(), 0);
            }
        }

        self.tables.save(&session)?;
        let id = session.id.clone();
        debug!(session = %id, players = session.players.len(), "session started");
        self.state.sessions.push(session);
        self.notify(&Path::sessions());
        Ok(id)
    }

    /// Appends a game to the session and returns its id. Every session player
    /// gets a score entry.
    pub fn start_game(&mut self, session_id: &str, game: NewGame) -> Result<String> {
        let (index, mut session) = self.state.session_copy(session_id)?;

        // Equal to count + 1 unless games were deleted. Never collides with a
        // number still in use, but a deleted highest number is handed out again.
        let highest = session.games.iter().map(|g| g.game_number).max().unwrap_or(0);
        let game_number = highest.max(session.games.len() as u32) + 1;

        let mut game_scores = game.game_scores;
        for player in &session.players {
            game_scores.entry(player.id.clone()).or_insert(0);
        }
        let game = Game {
            id: new_id(),
            name: game.name,
            category_id: game.category_id,
            category_name: game.category_name,
            game_number,
            created_at: Timestamp::now(),
            game_scores,
            point_updates: Vec::new(),
        };
        let game_id = game.id.clone();
        session.games.push(game);

        self.tables.save(&session)?;
        self.commit_session(index, session);
        debug!(session = %session_id, game = %game_id, game_number, "game started");
        self.notify_each(Path::session_family(session_id));
        Ok(game_id)
    }

    /// Adds `delta` to the game and session totals and records it as a new
    /// point update. Returns the point update id.
    pub fn apply_score_delta(
        &mut self,
        session_id: &str,
        game_id: &str,
        delta: &Scores,
    ) -> Result<String> {
        let (index, mut session) = self.state.session_copy(session_id)?;
        let game = session
            .game_mut(game_id)
            .ok_or_else(|| Error::not_found(EntityKind::Game, game_id))?;

        add_scores(&mut game.game_scores, delta)?;
        let update = PointUpdate { id: new_id(), scores: delta.clone(), created_at: Timestamp::now() };
        let update_id = update.id.clone();
        game.point_updates.push(update);
        add_scores(&mut session.total_scores, delta)?;

        self.tables.save(&session)?;
        self.commit_session(index, session);
        debug!(session = %session_id, game = %game_id, update = %update_id, "score delta applied");
        self.notify_each(Path::game_family(session_id, game_id));
        Ok(update_id)
    }

    pub fn undo_last_update(&mut self, session_id: &str, game_id: &str) -> Result<PointUpdate> {
        let (index, mut session) = self.state.session_copy(session_id)?;
        let game = session
            .game_mut(game_id)
            .ok_or_else(|| Error::not_found(EntityKind::Game, game_id))?;
        let update = game
            .point_updates
            .pop()
            .ok_or_else(|| Error::not_found(EntityKind::PointUpdates, game_id))?;

        subtract_scores(&mut game.game_scores, &update.scores)?;
        subtract_scores(&mut session.total_scores, &update.scores)?;

        self.tables.save(&session)?;
        self.commit_session(index, session);
        debug!(session = %session_id, game = %game_id, update = %update.id, "point update undone");
        self.notify_each(Path::game_family(session_id, game_id));
        Ok(update)
    }

    /// Removes the game and takes its scores off the session totals. Other
    /// games keep their numbers.
    pub fn delete_game(&mut self, session_id: &str, game_id: &str) -> Result<()> {
        let (index, mut session) = self.state.session_copy(session_id)?;
        let position = session
            .games
            .iter()
            .position(|g| g.id == game_id)
            .ok_or_else(|| Error::not_found(EntityKind::Game, game_id))?;
        let game = session.games.remove(position);
        subtract_scores(&mut session.total_scores, &game.game_scores)?;

        self.tables.save(&session)?;
        self.commit_session(index, session);
        debug!(session = %session_id, game = %game_id, "game deleted");
        self.notify_each(Path::game_family(session_id, game_id));
        Ok(())
    }

    /// Adds the players not yet in the session, with zero scores in the
    /// session and in every existing game. Returns how many were added.
    pub fn add_players_to_session(&mut self, session_id: &str, players: &[Player]) -> Result<usize> {
        let (index, mut session) = self.state.session_copy(session_id)?;

        let mut added = 0;
        for player in players {
            if session.has_player(&player.id) {
                continue;
            }
            session.players.push(SessionPlayer::from(player));
            session.total_scores.entry(player.id.clone()).or_insert(0);
            for game in &mut session.games {
                game.game_scores.entry(player.id.clone()).or_insert(0);
            }
            added += 1;
        }
        if added == 0 {
            return Ok(0);
        }

        self.tables.save(&session)?;
        self.commit_session(index, session);
        debug!(session = %session_id, added, "players joined session");
        self.notify_each(Path::session_family(session_id));
        Ok(added)
    }

    pub fn delete_session(&mut self, session_id: &str) -> Result<()> {
        let index = self.state.session_index(session_id)?;
        self.tables.delete(Table::Sessions, session_id)?;
        self.state.sessions.remove(index);
        debug!(session = %session_id, "session deleted");
        let nested: Vec<Path> = self
            .subscriptions
            .active_paths()
            .into_iter()
            .filter(|path| matches!(path, Path::Game { .. } | Path::PointUpdates { .. }))
            .filter(|path| path.session_id() == Some(session_id))
            .collect();
        self.notify_each(Path::session_family(session_id).into_iter().chain(nested));
        Ok(())
    }

    // ---- queries ----

    /// Every game name used in any session, sorted and without duplicates.
    pub fn list_distinct_game_names(&self) -> Vec<String> {
        self.state
            .sessions
            .iter()
            .flat_map(|s| s.games.iter().map(|g| g.name.clone()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn list_all_games(&self) -> Vec<SessionGame> {
        self.state.all_games()
    }
}
