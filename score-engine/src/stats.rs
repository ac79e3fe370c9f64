//! Leaderboards and score timelines derived from the cache.

use serde::Serialize;

use crate::model::{Player, Scores};
use crate::ops::Store;
use crate::state::CacheState;
use crate::storage::Storage;

pub const TIMELINE_START: &str = "Start";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    pub player_id: String,
    pub name: String,
    pub color: String,
    pub score: i64,
}

/// One step of a cumulative score series. `totals` has an entry for every
/// roster player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    pub label: String,
    pub totals: Scores,
}

fn standing(player: &Player, score: i64) -> Standing {
    Standing {
        player_id: player.id.clone(),
        name: player.name.clone(),
        color: player.color.clone(),
        score,
    }
}

fn rank(mut standings: Vec<Standing>) -> Vec<Standing> {
    standings.sort_by(|a, b| b.score.cmp(&a.score));
    standings
}

fn points(scores: &Scores, player_id: &str) -> i64 {
    scores.get(player_id).copied().unwrap_or(0)
}

pub fn global_leaderboard(state: &CacheState) -> Vec<Standing> {
    let standings = state
        .players
        .iter()
        .map(|player| {
            let score = state
                .sessions
                .iter()
                .fold(0i64, |total, s| total.saturating_add(points(&s.total_scores, &player.id)));
            standing(player, score)
        })
        .collect();
    rank(standings)
}

/// Each roster player's points in games of `category_id`. Players without a
/// positive total are left out.
pub fn category_leaderboard(state: &CacheState, category_id: &str) -> Vec<Standing> {
    let games: Vec<_> = state
        .sessions
        .iter()
        .flat_map(|s| s.games.iter())
        .filter(|g| g.category_id == category_id)
        .collect();

    let standings = state
        .players
        .iter()
        .map(|player| {
            let score = games
                .iter()
                .fold(0i64, |total, g| total.saturating_add(points(&g.game_scores, &player.id)));
            standing(player, score)
        })
        .filter(|s| s.score > 0)
        .collect();
    rank(standings)
}

struct Accumulator<'a> {
    roster: &'a [Player],
    running: Scores,
    points: Vec<TimelinePoint>,
}

impl<'a> Accumulator<'a> {
    fn new(roster: &'a [Player]) -> Self {
        let running: Scores = roster.iter().map(|p| (p.id.clone(), 0)).collect();
        let points = vec![TimelinePoint { label: TIMELINE_START.to_string(), totals: running.clone() }];
        Self { roster, running, points }
    }

    fn step(&mut self, label: String, scores: &Scores) {
        for player in self.roster {
            if let Some(total) = self.running.get_mut(&player.id) {
                *total = total.saturating_add(points(scores, &player.id));
            }
        }
        self.points.push(TimelinePoint { label, totals: self.running.clone() });
    }
}

pub fn score_timeline(state: &CacheState) -> Vec<TimelinePoint> {
    let mut sessions: Vec<_> = state.sessions.iter().collect();
    sessions.sort_by_key(|s| s.created_at);

    let mut acc = Accumulator::new(&state.players);
    for session in sessions {
        acc.step(session.name.clone(), &session.total_scores);
    }
    acc.points
}

/// Running totals after each game of `category_id`, labelled
/// `"<game> (<session>)"`.
pub fn category_timeline(state: &CacheState, category_id: &str) -> Vec<TimelinePoint> {
    let mut acc = Accumulator::new(&state.players);
    for entry in state.all_games() {
        if entry.game.category_id == category_id {
            let label = format!("{} ({})", entry.game.name, entry.session_name);
            acc.step(label, &entry.game.game_scores);
        }
    }
    acc.points
}

impl<S: Storage> Store<S> {
    pub fn global_leaderboard(&self) -> Vec<Standing> {
        global_leaderboard(self.state())
    }

    pub fn category_leaderboard(&self, category_id: &str) -> Vec<Standing> {
        category_leaderboard(self.state(), category_id)
    }

    pub fn score_timeline(&self) -> Vec<TimelinePoint> {
        score_timeline(self.state())
    }

    pub fn category_timeline(&self, category_id: &str) -> Vec<TimelinePoint> {
        category_timeline(self.state(), category_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed;

    fn seeded() -> CacheState {
        seed::dataset().unwrap().into_state().unwrap()
    }

    #[test]
    fn test_global_leaderboard_sorts_descending() {
        let board = global_leaderboard(&seeded());
        let summary: Vec<(&str, i64)> = board.iter().map(|s| (s.name.as_str(), s.score)).collect();
        assert_eq!(summary, vec![("Schütti", 53), ("BastBeat", 31), ("Schum", 0)]);
    }

    #[test]
    fn test_category_leaderboard_omits_non_positive() {
        let state = seeded();
        let board = category_leaderboard(&state, "cat_songquiz_id");
        let summary: Vec<(&str, i64)> = board.iter().map(|s| (s.player_id.as_str(), s.score)).collect();
        assert_eq!(summary, vec![("player_schuetti_id", 12), ("player_bastbeat_id", 6)]);

        let board = category_leaderboard(&state, "cat_film_serie_id");
        assert_eq!(board.len(), 1);
        assert_eq!((board[0].name.as_str(), board[0].score), ("BastBeat", 2));
        assert!(category_leaderboard(&state, "unknown_category").is_empty());
    }

    #[test]
    fn test_score_timeline_accumulates_per_session() {
        let timeline = score_timeline(&seeded());
        let labels: Vec<&str> = timeline.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(
            labels,
            vec![
                TIMELINE_START,
                "Wer stielt mir die Show | 26.10.2025",
                "Schlag den Star | 01.11.2025",
                "Wer stiehlt mir die Show | 02.11.2025",
            ]
        );
        assert_eq!(timeline[0].totals.len(), 3);
        assert!(timeline[0].totals.values().all(|v| *v == 0));

        let bastbeat: Vec<i64> = timeline.iter().map(|p| p.totals["player_bastbeat_id"]).collect();
        let schuetti: Vec<i64> = timeline.iter().map(|p| p.totals["player_schuetti_id"]).collect();
        assert_eq!(bastbeat, vec![0, 17, 21, 31]);
        assert_eq!(schuetti, vec![0, 25, 39, 53]);
        assert_eq!(timeline[3].totals["xJcstcD1MkC8VOjeAl3Y"], 0);
    }

    #[test]
    fn test_category_timeline_labels_games() {
        let timeline = category_timeline(&seeded(), "cat_film_serie_id");
        let labels: Vec<&str> = timeline.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Start", "Ich bin dann mal Wer (Wer stielt mir die Show | 26.10.2025)"]);

        let timeline = category_timeline(&seeded(), "cat_quiz_allgemein_id");
        assert_eq!(timeline.len(), 11);
        assert_eq!(timeline[1].label, "Die gemeinen Fünf (Wer stielt mir die Show | 26.10.2025)");
        assert_eq!(timeline[4].label, "Blamieren oder Kassieren (Schlag den Star | 01.11.2025)");
        let last = &timeline[10];
        assert_eq!(last.label, "Finale (Wer stiehlt mir die Show | 02.11.2025)");
        assert_eq!((last.totals["player_bastbeat_id"], last.totals["player_schuetti_id"]), (21, 38));
    }
}
