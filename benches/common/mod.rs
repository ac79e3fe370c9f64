#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use score_engine::{
    MemoryStorage, NewGame, NewRecord, Player, Scores, SqliteStorage, Storage, Store, TableStore,
};

pub const COLORS: [&str; 5] = ["#3b82f6", "#ef4444", "#be38f3", "#22c55e", "#f59e0b"];
pub const GAME_NAMES: [&str; 5] = [
    "Blamieren oder Kassieren",
    "Schätzen-Duell",
    "Songquiz",
    "Promi Quiz",
    "Film und Serie",
];

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5c0e)
}

pub fn random_delta(rng: &mut StdRng, players: &[Player]) -> Scores {
    players
        .iter()
        .map(|p| (p.id.clone(), rng.gen_range(-2..=5)))
        .collect()
}

pub fn memory_store() -> Store<MemoryStorage> {
    Store::load(TableStore::with_storage(MemoryStorage::new()), false).unwrap()
}

pub fn sqlite_store() -> Store<SqliteStorage> {
    Store::load(TableStore::open_in_memory().unwrap(), false).unwrap()
}

/// `sessions` sessions with `games` games each and `updates` point updates per game.
pub fn populate<S: Storage>(
    store: &mut Store<S>,
    players: usize,
    sessions: usize,
    games: usize,
    updates: usize,
) {
    let mut rng = rng();
    for i in 0..players {
        store
            .add_record(NewRecord::player(format!("player_{}", i), COLORS[i % COLORS.len()]))
            .unwrap();
    }
    let category = store.add_record(NewRecord::category("Quiz allgemein")).unwrap();
    let roster = store.state().players.clone();

    for s in 0..sessions {
        let sid = store.start_session(&format!("Session {}", s), &roster, None).unwrap();
        for g in 0..games {
            let game = NewGame {
                name: GAME_NAMES[g % GAME_NAMES.len()].to_string(),
                category_id: category.clone(),
                category_name: "Quiz allgemein".into(),
                ..Default::default()
            };
            let gid = store.start_game(&sid, game).unwrap();
            for _ in 0..updates {
                let delta = random_delta(&mut rng, &roster);
                store.apply_score_delta(&sid, &gid, &delta).unwrap();
            }
        }
    }
}

pub fn populated_memory_store(sessions: usize) -> Store<MemoryStorage> {
    let mut store = memory_store();
    populate(&mut store, 4, sessions, 5, 10);
    store
}
