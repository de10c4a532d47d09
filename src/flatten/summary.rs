use serde::{Deserialize, Serialize};

use crate::model::{Incident, IncidentClass, IncidentType};
use crate::table::Cell;

/// Number of per-side summary slots.
pub const SLOTS: usize = 15;

const YELLOW: usize = 0;
const RED: usize = 2;
const YELLOW_RED: usize = 4;
const GOALS: usize = 6;
const SCORE_SNAPSHOT: usize = 8;
const PENALTY_SCORED: usize = 10;
const PENALTY_MISSED: usize = 11;
const OWN_GOAL: usize = 12;
const SUBSTITUTIONS: usize = 13;

/// Minute after which an incident counts as second half when the match has
/// no explicit half-time marker.
const HALF_LENGTH_MINUTES: i64 = 45;

/// Output columns: 15 home slots, then 15 away slots.
pub const COLUMNS: [&str; 2 * SLOTS] = [
    "hy_1", "hy_2", "hr_1", "hr_2", "hyr_1", "hyr_2", "hg_1", "hg_2", "h_ht", "h_ft", "hp", "hpm",
    "hog", "hs_1", "hs_2", "ay_1", "ay_2", "ar_1", "ar_2", "ayr_1", "ayr_2", "ag_1", "ag_2",
    "a_ht", "a_ft", "ap", "apm", "aog", "as_1", "as_2",
];

/// How zero-valued slots are written out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotEncoding {
    /// Every zero is written as a missing value.
    #[default]
    ZeroAsMissing,
    /// A slot is missing only when nothing could be observed for it;
    /// otherwise its count is written, zero included.
    TriState,
}

/// Running state of the incident reduction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryState {
    pub home: [i64; SLOTS],
    pub away: [i64; SLOTS],
    /// Running (home, away) score.
    pub score: (i64, i64),
    pub second_half: bool,
    sides_tracked: bool,
    snapshots_taken: [bool; 2],
}

impl SummaryState {
    fn half(&self) -> usize {
        usize::from(self.second_half)
    }

    fn side(&mut self, home: bool) -> &mut [i64; SLOTS] {
        if home {
            &mut self.home
        } else {
            &mut self.away
        }
    }

    /// Fold one incident into the state.
    pub fn step(mut self, incident: &Incident, has_half_time_marker: bool) -> Self {
        if !has_half_time_marker && incident.time.is_some_and(|t| t > HALF_LENGTH_MINUTES) {
            self.second_half = true;
        }
        let half = self.half();

        if let Some(is_home) = incident.is_home {
            self.sides_tracked = true;
            match incident.incident_type {
                IncidentType::Card => {
                    let slot = match incident.incident_class {
                        Some(IncidentClass::Yellow) => Some(YELLOW),
                        Some(IncidentClass::Red) => Some(RED),
                        Some(IncidentClass::YellowRed) => Some(YELLOW_RED),
                        _ => None,
                    };
                    if let Some(slot) = slot {
                        self.side(is_home)[slot + half] += 1;
                    }
                }
                IncidentType::Goal => self.goal(incident, is_home, half),
                IncidentType::InGamePenalty => self.side(is_home)[PENALTY_MISSED] += 1,
                IncidentType::Substitution => self.side(is_home)[SUBSTITUTIONS + half] += 1,
                IncidentType::Period | IncidentType::Other => {}
            }
        }

        if incident.incident_type == IncidentType::Period {
            self.home[SCORE_SNAPSHOT + half] = incident.home_score.unwrap_or(self.score.0);
            self.away[SCORE_SNAPSHOT + half] = incident.away_score.unwrap_or(self.score.1);
            self.snapshots_taken[half] = true;
            if has_half_time_marker && incident.is_half_time_marker() {
                self.second_half = true;
            }
        }
        self
    }

    /// A goal is credited to whichever side's score advanced, not to `isHome`.
    fn goal(&mut self, incident: &Incident, is_home: bool, half: usize) {
        let mut scorer = is_home;
        if let (Some(home), Some(away)) = (incident.home_score, incident.away_score) {
            let home_delta = home - self.score.0;
            let away_delta = away - self.score.1;
            if home_delta + away_delta > 0 {
                scorer = home_delta > away_delta;
                self.side(scorer)[GOALS + half] += 1;
                self.score = (home, away);
                if incident.incident_class == Some(IncidentClass::Penalty) {
                    self.side(scorer)[PENALTY_SCORED] += 1;
                }
            }
        }
        if incident.incident_class == Some(IncidentClass::OwnGoal) {
            self.side(scorer)[OWN_GOAL] += 1;
        }
    }

    fn slot_cell(&self, value: i64, slot: usize, encoding: SlotEncoding) -> Cell {
        let observable = match slot {
            s if s == SCORE_SNAPSHOT || s == SCORE_SNAPSHOT + 1 => {
                self.snapshots_taken[s - SCORE_SNAPSHOT]
            }
            _ => self.sides_tracked,
        };
        match encoding {
            SlotEncoding::ZeroAsMissing if value == 0 => Cell::Null,
            SlotEncoding::TriState if !observable => Cell::Null,
            _ => Cell::Int(value),
        }
    }

    /// The 30 summary cells in [`COLUMNS`] order.
    pub fn to_cells(&self, encoding: SlotEncoding) -> Vec<Cell> {
        self.home
            .iter()
            .chain(self.away.iter())
            .enumerate()
            .map(|(i, &value)| self.slot_cell(value, i % SLOTS, encoding))
            .collect()
    }
}

/// Whether the sequence marks half time explicitly with an `HT` period.
pub fn has_half_time_marker(incidents: &[Incident]) -> bool {
    incidents
        .iter()
        .any(|i| i.incident_type == IncidentType::Period)
        && incidents.iter().any(Incident::is_half_time_marker)
}

/// Reduce an oldest-first incident sequence into per-side summary slots.
pub fn summarize(incidents: &[Incident], has_half_time_marker: bool) -> SummaryState {
    incidents
        .iter()
        .fold(SummaryState::default(), |state, incident| {
            state.step(incident, has_half_time_marker)
        })
}
