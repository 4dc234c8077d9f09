use crate::types::*;
use std::cmp::Ordering;

/// Cumulative statistics of one lobby, in first-join order.
///
/// Entries are never removed: a player who leaves keeps their row and still
/// shows up in the final highscore.
#[derive(Debug, Clone, Default)]
pub struct ScoreBoard {
    stats: Vec<PlayerStatistics>,
}

impl ScoreBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the statistics row for a newly joined player
    pub fn register(&mut self, player_id: &PlayerId, display_name: &str) {
        if self.get(player_id).is_none() {
            self.stats
                .push(PlayerStatistics::new(player_id.clone(), display_name.to_string()));
        }
    }

    pub fn get(&self, player_id: &str) -> Option<&PlayerStatistics> {
        self.stats.iter().find(|s| s.player_id == player_id)
    }

    fn get_or_insert(&mut self, player_id: &str, display_name: &str) -> &mut PlayerStatistics {
        match self.stats.iter().position(|s| s.player_id == player_id) {
            Some(pos) => &mut self.stats[pos],
            None => {
                self.stats.push(PlayerStatistics::new(
                    player_id.to_string(),
                    display_name.to_string(),
                ));
                let last = self.stats.len() - 1;
                &mut self.stats[last]
            }
        }
    }

    /// Fold one evaluated round into the cumulative statistics.
    ///
    /// Every entry counts as a participant. Entries with a deviation are ranked
    /// ascending (stable, so ties keep answer-list order) and the k-th ranked
    /// player gets `participants - k` points.
    pub fn record(&mut self, entries: &[ResultEntry]) {
        let participants = entries.len() as u32;

        for entry in entries {
            let stats = self.get_or_insert(&entry.player_id, &entry.name);
            stats.rounds_participated += 1;
            stats.last_points_awarded = 0;
            stats.last_deviation = entry.deviation;
            if let Some(deviation) = entry.deviation {
                stats.valid_answer_count += 1;
                stats.total_deviation += deviation;
            }
        }

        let mut ranked: Vec<(&PlayerId, f64)> = entries
            .iter()
            .filter_map(|e| e.deviation.map(|d| (&e.player_id, d)))
            .collect();
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        for (rank, (player_id, _)) in ranked.into_iter().enumerate() {
            let awarded = participants - rank as u32;
            if let Some(stats) = self.stats.iter_mut().find(|s| &s.player_id == player_id) {
                stats.points += awarded;
                stats.last_points_awarded = awarded;
            }
        }
    }

    /// Final ranking over everybody who took part in at least one round
    pub fn build_highscore(&self) -> Vec<HighscoreEntry> {
        let mut entries: Vec<HighscoreEntry> = self
            .stats
            .iter()
            .filter(|s| s.rounds_participated > 0 || s.points > 0 || s.valid_answer_count > 0)
            .map(|s| HighscoreEntry {
                average_deviation: s.average_deviation(),
                stats: s.clone(),
            })
            .collect();

        entries.sort_by(compare_highscore);
        entries
    }
}

/// Points descending, then average deviation ascending (no average ranks
/// last), then total deviation ascending, then name.
fn compare_highscore(a: &HighscoreEntry, b: &HighscoreEntry) -> Ordering {
    b.stats
        .points
        .cmp(&a.stats.points)
        .then_with(|| match (a.average_deviation, b.average_deviation) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.stats.total_deviation.total_cmp(&b.stats.total_deviation))
        .then_with(|| compare_names(&a.stats.display_name, &b.stats.display_name))
}

/// German-ish collation: umlauts sort with their base letter and case is
/// ignored, raw order as the final tiebreak
fn compare_names(a: &str, b: &str) -> Ordering {
    collation_key(a)
        .cmp(&collation_key(b))
        .then_with(|| a.cmp(b))
}

fn collation_key(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .flat_map(|c| match c {
            'ä' => vec!['a'],
            'ö' => vec!['o'],
            'ü' => vec!['u'],
            'ß' => vec!['s', 's'],
            other => vec![other],
        })
        .collect()
}
