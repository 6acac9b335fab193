//! The conversation state record threaded through every phase transition.

use serde::{Deserialize, Serialize};

/// Questionnaire items, in the order they can be asked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionId {
    Location,
    City,
    PlanToMove,
    PreferredCities,
    CallCenterExperience,
    ExperienceDetails,
    WhyCallCenter,
    SalaryExpectation,
    PreviousApplications,
}

impl QuestionId {
    pub const ALL: [QuestionId; 9] = [
        Self::Location,
        Self::City,
        Self::PlanToMove,
        Self::PreferredCities,
        Self::CallCenterExperience,
        Self::ExperienceDetails,
        Self::WhyCallCenter,
        Self::SalaryExpectation,
        Self::PreviousApplications,
    ];

    /// Human-readable label used in the audit log.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Location => "Location (in Morocco?)",
            Self::City => "Current city",
            Self::PlanToMove => "Plan to move to Morocco",
            Self::PreferredCities => "Preferred work cities",
            Self::CallCenterExperience => "Call center experience",
            Self::ExperienceDetails => "Experience details",
            Self::WhyCallCenter => "Why call center",
            Self::SalaryExpectation => "Salary expectation",
            Self::PreviousApplications => "Previous applications",
        }
    }
}

impl std::fmt::Display for QuestionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Location => "location",
            Self::City => "city",
            Self::PlanToMove => "plan_to_move",
            Self::PreferredCities => "preferred_cities",
            Self::CallCenterExperience => "call_center_experience",
            Self::ExperienceDetails => "experience_details",
            Self::WhyCallCenter => "why_call_center",
            Self::SalaryExpectation => "salary_expectation",
            Self::PreviousApplications => "previous_applications",
        };
        write!(f, "{s}")
    }
}

/// Where the dialogue currently stands. Derived from the state, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "question", rename_all = "snake_case")]
pub enum Phase {
    Meeting,
    Permission,
    Questionnaire(QuestionId),
    Completed,
}

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub role: Speaker,
    pub content: String,
}

/// Questionnaire answers. Yes/no items are `Option<bool>`, the rest are the
/// candidate's reply verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answers {
    pub in_morocco: Option<bool>,
    pub current_city: Option<String>,
    pub plan_to_move: Option<String>,
    pub preferred_cities: Option<String>,
    pub has_call_center_experience: Option<bool>,
    pub experience_details: Option<String>,
    pub why_call_center: Option<String>,
    pub salary_expectation: Option<String>,
    pub previous_applications: Option<String>,
}

impl Answers {
    /// Number of questionnaire items with an answer.
    pub fn answered_count(&self) -> usize {
        let flags = [self.in_morocco.is_some(), self.has_call_center_experience.is_some()];
        let texts = [
            &self.current_city,
            &self.plan_to_move,
            &self.preferred_cities,
            &self.experience_details,
            &self.why_call_center,
            &self.salary_expectation,
            &self.previous_applications,
        ];
        flags.iter().filter(|f| **f).count() + texts.iter().filter(|t| t.is_some()).count()
    }

    /// Store a verbatim reply for a free-text item. Yes/no items are ignored.
    pub(crate) fn set_text(&mut self, id: QuestionId, value: &str) {
        let slot = match id {
            QuestionId::City => &mut self.current_city,
            QuestionId::PlanToMove => &mut self.plan_to_move,
            QuestionId::PreferredCities => &mut self.preferred_cities,
            QuestionId::ExperienceDetails => &mut self.experience_details,
            QuestionId::WhyCallCenter => &mut self.why_call_center,
            QuestionId::SalaryExpectation => &mut self.salary_expectation,
            QuestionId::PreviousApplications => &mut self.previous_applications,
            QuestionId::Location | QuestionId::CallCenterExperience => return,
        };
        *slot = Some(value.to_string());
    }

    /// Store a yes/no answer. Free-text items are ignored.
    pub(crate) fn set_flag(&mut self, id: QuestionId, value: bool) {
        match id {
            QuestionId::Location => self.in_morocco = Some(value),
            QuestionId::CallCenterExperience => self.has_call_center_experience = Some(value),
            _ => {}
        }
    }
}

/// Display form of a tri-state answer.
pub fn flag_label(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Not answered",
    }
}

/// Snapshot of everything collected about the candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedData {
    pub first_name: String,
    pub meeting_booked: Option<bool>,
    pub permission_given: Option<bool>,
    #[serde(flatten)]
    pub answers: Answers,
}

/// Mutable record owned by a single assistant.
///
/// The transcript and audit log are append-only; the meeting and permission
/// flags are write-once.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationState {
    first_name: String,
    meeting_booked: Option<bool>,
    permission_given: Option<bool>,
    current_question: Option<QuestionId>,
    answers: Answers,
    transcript: Vec<TranscriptEntry>,
    log: Vec<String>,
}

impl ConversationState {
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            meeting_booked: None,
            permission_given: None,
            current_question: None,
            answers: Answers::default(),
            transcript: Vec::new(),
            log: Vec::new(),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn meeting_booked(&self) -> Option<bool> {
        self.meeting_booked
    }

    pub fn permission_given(&self) -> Option<bool> {
        self.permission_given
    }

    pub fn current_question(&self) -> Option<QuestionId> {
        self.current_question
    }

    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        &self.transcript
    }

    pub fn log(&self) -> &[String] {
        &self.log
    }

    /// The phase the next user turn will be routed through.
    pub fn phase(&self) -> Phase {
        match (self.meeting_booked, self.permission_given, self.current_question) {
            (None, _, _) => Phase::Meeting,
            (Some(_), None, _) => Phase::Permission,
            (Some(_), Some(_), Some(q)) => Phase::Questionnaire(q),
            (Some(_), Some(_), None) => Phase::Completed,
        }
    }

    /// Content of the most recent user message, or `""` if none.
    pub fn last_user_message(&self) -> &str {
        self.transcript
            .iter()
            .rev()
            .find(|e| e.role == Speaker::User)
            .map(|e| e.content.as_str())
            .unwrap_or("")
    }

    /// Content of the most recent assistant message, or `""` if none.
    pub fn last_assistant_message(&self) -> &str {
        self.transcript
            .iter()
            .rev()
            .find(|e| e.role == Speaker::Assistant)
            .map(|e| e.content.as_str())
            .unwrap_or("")
    }

    pub fn collected_data(&self) -> CollectedData {
        CollectedData {
            first_name: self.first_name.clone(),
            meeting_booked: self.meeting_booked,
            permission_given: self.permission_given,
            answers: self.answers.clone(),
        }
    }

    pub(crate) fn push_user(&mut self, content: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            role: Speaker::User,
            content: content.into(),
        });
    }

    pub(crate) fn push_assistant(&mut self, content: impl Into<String>) {
        self.transcript.push(TranscriptEntry {
            role: Speaker::Assistant,
            content: content.into(),
        });
    }

    pub(crate) fn push_log(&mut self, entry: impl Into<String>) {
        self.log.push(entry.into());
    }

    /// Record the meeting answer. Returns `false` if it was already set.
    pub(crate) fn record_meeting_booked(&mut self, booked: bool) -> bool {
        if self.meeting_booked.is_some() {
            return false;
        }
        self.meeting_booked = Some(booked);
        true
    }

    /// Record the permission answer. Returns `false` if it was already set.
    pub(crate) fn record_permission_given(&mut self, given: bool) -> bool {
        if self.permission_given.is_some() {
            return false;
        }
        self.permission_given = Some(given);
        true
    }

    pub(crate) fn set_current_question(&mut self, question: Option<QuestionId>) {
        self.current_question = question;
    }

    pub(crate) fn answers_mut(&mut self) -> &mut Answers {
        &mut self.answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_serde() {
        for id in QuestionId::ALL {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(format!("\"{id}\""), json, "Display and serde differ for {id:?}");
        }
    }

    #[test]
    fn phase_follows_fields() {
        let mut state = ConversationState::new("Amal");
        assert_eq!(state.phase(), Phase::Meeting);

        state.record_meeting_booked(true);
        assert_eq!(state.phase(), Phase::Permission);

        state.record_permission_given(false);
        assert_eq!(state.phase(), Phase::Completed);

        state.set_current_question(Some(QuestionId::City));
        assert_eq!(state.phase(), Phase::Questionnaire(QuestionId::City));
    }

    #[test]
    fn meeting_and_permission_are_write_once() {
        let mut state = ConversationState::new("Amal");
        assert!(state.record_meeting_booked(false));
        assert!(!state.record_meeting_booked(true));
        assert_eq!(state.meeting_booked(), Some(false));

        assert!(state.record_permission_given(true));
        assert!(!state.record_permission_given(false));
        assert_eq!(state.permission_given(), Some(true));
    }

    #[test]
    fn last_messages_by_role() {
        let mut state = ConversationState::new("Amal");
        assert_eq!(state.last_user_message(), "");
        assert_eq!(state.last_assistant_message(), "");

        state.push_assistant("hello");
        state.push_user("hi");
        state.push_assistant("question?");
        assert_eq!(state.last_user_message(), "hi");
        assert_eq!(state.last_assistant_message(), "question?");
    }

    #[test]
    fn answers_setters_respect_kind() {
        let mut answers = Answers::default();
        answers.set_text(QuestionId::Location, "Casablanca");
        answers.set_flag(QuestionId::City, true);
        assert_eq!(answers, Answers::default());

        answers.set_text(QuestionId::City, "Rabat");
        answers.set_flag(QuestionId::Location, true);
        assert_eq!(answers.current_city.as_deref(), Some("Rabat"));
        assert_eq!(answers.in_morocco, Some(true));
        assert_eq!(answers.answered_count(), 2);
    }

    #[test]
    fn collected_data_flattens_answers() {
        let mut state = ConversationState::new("Amal");
        state.record_meeting_booked(true);
        state.answers_mut().set_text(QuestionId::SalaryExpectation, "6000 MAD");

        let json = serde_json::to_value(state.collected_data()).unwrap();
        assert_eq!(json["first_name"], "Amal");
        assert_eq!(json["meeting_booked"], true);
        assert_eq!(json["permission_given"], serde_json::Value::Null);
        assert_eq!(json["salary_expectation"], "6000 MAD");
        assert!(json.get("answers").is_none());
    }

    #[test]
    fn flag_labels() {
        assert_eq!(flag_label(Some(true)), "Yes");
        assert_eq!(flag_label(Some(false)), "No");
        assert_eq!(flag_label(None), "Not answered");
    }

    #[test]
    fn phase_serializes_with_question() {
        let json = serde_json::to_value(Phase::Questionnaire(QuestionId::PlanToMove)).unwrap();
        assert_eq!(json["phase"], "questionnaire");
        assert_eq!(json["question"], "plan_to_move");

        let json = serde_json::to_value(Phase::Meeting).unwrap();
        assert_eq!(json["phase"], "meeting");
    }
}
