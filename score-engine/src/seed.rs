//! The dataset written on first start.

use crate::backup::FullBackup;
use crate::error::Result;

const SEED_JSON: &str = include_str!("../data/seed.json");

pub fn dataset() -> Result<FullBackup> {
    FullBackup::from_json(SEED_JSON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_decodes() {
        let state = dataset().unwrap().into_state().unwrap();
        assert_eq!(state.players.len(), 3);
        assert_eq!(state.categories.len(), 4);
        assert_eq!(state.sessions.len(), 3);
        assert_eq!(state.all_games().len(), 16);

        let session = &state.sessions[0];
        assert_eq!(session.name, "Schlag den Star | 01.11.2025");
        assert_eq!(session.games.len(), 3);
        assert_eq!(session.total_scores["player_bastbeat_id"], 4);
        assert_eq!(session.total_scores["player_schuetti_id"], 14);
        assert_eq!(session.created_at.to_millis(), 1_762_028_778_639);

        let totals: Vec<(i64, i64)> = state
            .sessions
            .iter()
            .map(|s| (s.total_scores["player_bastbeat_id"], s.total_scores["player_schuetti_id"]))
            .collect();
        assert_eq!(totals, vec![(4, 14), (10, 14), (17, 25)]);
    }
}
