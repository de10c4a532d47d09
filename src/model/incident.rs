use serde::Deserialize;

/// Kind of an in-match incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncidentType {
    Card,
    Goal,
    /// A penalty that was missed or saved.
    InGamePenalty,
    Substitution,
    Period,
    #[serde(other)]
    Other,
}

/// Sub-classification of an incident (card colour, goal type, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IncidentClass {
    Yellow,
    Red,
    YellowRed,
    Penalty,
    OwnGoal,
    #[serde(other)]
    Other,
}

/// The fields of an incident the summarizer looks at.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub incident_type: IncidentType,
    #[serde(default)]
    pub incident_class: Option<IncidentClass>,
    #[serde(default)]
    pub is_home: Option<bool>,
    #[serde(default)]
    pub home_score: Option<i64>,
    #[serde(default)]
    pub away_score: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
    #[serde(default)]
    pub text: Option<String>,
}

impl Incident {
    pub fn new(incident_type: IncidentType) -> Self {
        Self {
            incident_type,
            incident_class: None,
            is_home: None,
            home_score: None,
            away_score: None,
            time: None,
            text: None,
        }
    }

    pub fn is_half_time_marker(&self) -> bool {
        self.text.as_deref() == Some("HT")
    }
}
