//! Phase routers: decide the next node(s) from the latest user message.
//!
//! Routers are the only place classifier verdicts and captured answers are
//! written into the state. Each route maps to a fixed node sequence through
//! [`MeetingRoute::nodes`], [`PermissionRoute::nodes`] and
//! [`QuestionRoute::node`].

use tracing::{info, warn};

use crate::classifier::{IntentClassifier, YesNo};

use super::nodes::Node;
use super::state::{ConversationState, QuestionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeetingRoute {
    Unclear,
    Booked,
    NotBooked,
}

impl MeetingRoute {
    pub fn nodes(self) -> &'static [Node] {
        match self {
            Self::Unclear => &[Node::MeetingUnclear],
            Self::Booked => &[Node::PermissionQuestion],
            Self::NotBooked => &[Node::SendBookingLink, Node::PermissionQuestion],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionRoute {
    Unclear,
    Granted,
    /// Persuade, then start the questionnaire anyway.
    Denied,
}

impl PermissionRoute {
    pub fn nodes(self) -> &'static [Node] {
        match self {
            Self::Unclear => &[Node::PermissionUnclear],
            Self::Granted => &[Node::EndSuccess, Node::Question(QuestionId::Location)],
            Self::Denied => &[
                Node::PersuasionThenEnd,
                Node::Question(QuestionId::Location),
            ],
        }
    }

    pub fn starts_questionnaire(self) -> bool {
        !matches!(self, Self::Unclear)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionRoute {
    Ask(QuestionId),
    Finish,
}

impl QuestionRoute {
    pub fn node(self) -> Node {
        match self {
            Self::Ask(id) => Node::Question(id),
            Self::Finish => Node::FinalMessage,
        }
    }
}

/// Route a reply to "have you booked a meeting?".
pub async fn route_meeting(
    state: &mut ConversationState,
    classifier: &dyn IntentClassifier,
) -> MeetingRoute {
    let verdict = classifier.classify_yes_no(state.last_user_message()).await;
    let Some(booked) = verdict.as_bool() else {
        return MeetingRoute::Unclear;
    };

    state.record_meeting_booked(booked);
    info!(booked, "Meeting answer recorded");
    if booked {
        MeetingRoute::Booked
    } else {
        MeetingRoute::NotBooked
    }
}

/// Route a reply to "may we ask you some questions?".
pub async fn route_permission(
    state: &mut ConversationState,
    classifier: &dyn IntentClassifier,
) -> PermissionRoute {
    let verdict = classifier.classify_yes_no(state.last_user_message()).await;
    let Some(given) = verdict.as_bool() else {
        return PermissionRoute::Unclear;
    };

    state.record_permission_given(given);
    info!(given, "Permission answer recorded");
    if given {
        PermissionRoute::Granted
    } else {
        PermissionRoute::Denied
    }
}

/// Capture the answer to the pending question and pick the next one.
pub async fn route_question(
    state: &mut ConversationState,
    classifier: &dyn IntentClassifier,
) -> QuestionRoute {
    let Some(current) = state.current_question() else {
        warn!("Question router reached with no pending question; falling back");
        return QuestionRoute::Ask(QuestionId::PreferredCities);
    };

    match current {
        QuestionId::Location => {
            classify_branch(state, classifier, current, QuestionId::City, QuestionId::PlanToMove)
                .await
        }
        QuestionId::CallCenterExperience => {
            classify_branch(
                state,
                classifier,
                current,
                QuestionId::ExperienceDetails,
                QuestionId::WhyCallCenter,
            )
            .await
        }
        QuestionId::City | QuestionId::PlanToMove => {
            capture_reply(state, current);
            QuestionRoute::Ask(QuestionId::PreferredCities)
        }
        QuestionId::PreferredCities => {
            capture_reply(state, current);
            QuestionRoute::Ask(QuestionId::CallCenterExperience)
        }
        QuestionId::ExperienceDetails | QuestionId::WhyCallCenter => {
            capture_reply(state, current);
            QuestionRoute::Ask(QuestionId::SalaryExpectation)
        }
        QuestionId::SalaryExpectation => {
            capture_reply(state, current);
            QuestionRoute::Ask(QuestionId::PreviousApplications)
        }
        QuestionId::PreviousApplications => {
            capture_reply(state, current);
            QuestionRoute::Finish
        }
    }
}

/// Classify the reply to a yes/no question; an unclear reply re-asks it.
///
/// An unclear reply must not fall through to the `on_no` branch; the flag
/// stays unset until the candidate gives a clear answer.
async fn classify_branch(
    state: &mut ConversationState,
    classifier: &dyn IntentClassifier,
    current: QuestionId,
    on_yes: QuestionId,
    on_no: QuestionId,
) -> QuestionRoute {
    let verdict = classifier.classify_yes_no(state.last_user_message()).await;
    match verdict {
        YesNo::Unclear => {
            info!(question = %current, "Unclear yes/no answer; asking again");
            QuestionRoute::Ask(current)
        }
        YesNo::Yes => {
            state.answers_mut().set_flag(current, true);
            QuestionRoute::Ask(on_yes)
        }
        YesNo::No => {
            state.answers_mut().set_flag(current, false);
            QuestionRoute::Ask(on_no)
        }
    }
}

/// Store the last user message verbatim as the answer to `current`.
fn capture_reply(state: &mut ConversationState, current: QuestionId) {
    let reply = state.last_user_message().to_string();
    state.answers_mut().set_text(current, &reply);
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;

    /// Returns the same verdict for every input.
    struct FixedClassifier(YesNo);

    #[async_trait]
    impl IntentClassifier for FixedClassifier {
        async fn classify_yes_no(&self, _text: &str) -> YesNo {
            self.0
        }
    }

    /// Panics if consulted; free-text routing must not classify.
    struct ForbiddenClassifier;

    #[async_trait]
    impl IntentClassifier for ForbiddenClassifier {
        async fn classify_yes_no(&self, text: &str) -> YesNo {
            panic!("classifier called for free-text reply {text:?}")
        }
    }

    fn state_with_reply(reply: &str) -> ConversationState {
        let mut state = ConversationState::new("Amal");
        state.push_user(reply);
        state
    }

    fn asking(question: QuestionId, reply: &str) -> ConversationState {
        let mut state = ConversationState::new("Amal");
        state.record_meeting_booked(true);
        state.record_permission_given(true);
        state.set_current_question(Some(question));
        state.push_user(reply);
        state
    }

    #[tokio::test]
    async fn meeting_routes() {
        let cases = [
            (YesNo::Yes, MeetingRoute::Booked, Some(true)),
            (YesNo::No, MeetingRoute::NotBooked, Some(false)),
            (YesNo::Unclear, MeetingRoute::Unclear, None),
        ];
        for (verdict, expected, booked) in cases {
            let mut state = state_with_reply("...");
            let route = route_meeting(&mut state, &FixedClassifier(verdict)).await;
            assert_eq!(route, expected);
            assert_eq!(state.meeting_booked(), booked);
        }
    }

    #[tokio::test]
    async fn permission_routes() {
        let cases = [
            (YesNo::Yes, PermissionRoute::Granted, Some(true)),
            (YesNo::No, PermissionRoute::Denied, Some(false)),
            (YesNo::Unclear, PermissionRoute::Unclear, None),
        ];
        for (verdict, expected, given) in cases {
            let mut state = state_with_reply("...");
            let route = route_permission(&mut state, &FixedClassifier(verdict)).await;
            assert_eq!(route, expected);
            assert_eq!(state.permission_given(), given);
        }
    }

    #[test]
    fn route_tables() {
        assert_eq!(
            MeetingRoute::NotBooked.nodes(),
            [Node::SendBookingLink, Node::PermissionQuestion]
        );
        assert_eq!(
            PermissionRoute::Denied.nodes().last(),
            Some(&Node::Question(QuestionId::Location))
        );
        assert!(PermissionRoute::Granted.starts_questionnaire());
        assert!(!PermissionRoute::Unclear.starts_questionnaire());
        assert_eq!(QuestionRoute::Finish.node(), Node::FinalMessage);
    }

    #[tokio::test]
    async fn location_branches() {
        let mut state = asking(QuestionId::Location, "yes");
        let route = route_question(&mut state, &FixedClassifier(YesNo::Yes)).await;
        assert_eq!(route, QuestionRoute::Ask(QuestionId::City));
        assert_eq!(state.answers().in_morocco, Some(true));

        let mut state = asking(QuestionId::Location, "no");
        let route = route_question(&mut state, &FixedClassifier(YesNo::No)).await;
        assert_eq!(route, QuestionRoute::Ask(QuestionId::PlanToMove));
        assert_eq!(state.answers().in_morocco, Some(false));
    }

    #[tokio::test]
    async fn experience_branches() {
        let mut state = asking(QuestionId::CallCenterExperience, "yes, 2 years");
        let route = route_question(&mut state, &FixedClassifier(YesNo::Yes)).await;
        assert_eq!(route, QuestionRoute::Ask(QuestionId::ExperienceDetails));
        assert_eq!(state.answers().has_call_center_experience, Some(true));

        let mut state = asking(QuestionId::CallCenterExperience, "never");
        let route = route_question(&mut state, &FixedClassifier(YesNo::No)).await;
        assert_eq!(route, QuestionRoute::Ask(QuestionId::WhyCallCenter));
        assert_eq!(state.answers().has_call_center_experience, Some(false));
    }

    #[tokio::test]
    async fn unclear_yes_no_question_is_asked_again() {
        for question in [QuestionId::Location, QuestionId::CallCenterExperience] {
            let mut state = asking(question, "hmm");
            let route = route_question(&mut state, &FixedClassifier(YesNo::Unclear)).await;
            assert_eq!(route, QuestionRoute::Ask(question));
            assert_eq!(state.answers().answered_count(), 0);
        }
    }

    #[tokio::test]
    async fn free_text_questions_capture_verbatim() {
        let cases = [
            (QuestionId::City, QuestionRoute::Ask(QuestionId::PreferredCities)),
            (QuestionId::PlanToMove, QuestionRoute::Ask(QuestionId::PreferredCities)),
            (
                QuestionId::PreferredCities,
                QuestionRoute::Ask(QuestionId::CallCenterExperience),
            ),
            (
                QuestionId::ExperienceDetails,
                QuestionRoute::Ask(QuestionId::SalaryExpectation),
            ),
            (
                QuestionId::WhyCallCenter,
                QuestionRoute::Ask(QuestionId::SalaryExpectation),
            ),
            (
                QuestionId::SalaryExpectation,
                QuestionRoute::Ask(QuestionId::PreviousApplications),
            ),
            (QuestionId::PreviousApplications, QuestionRoute::Finish),
        ];
        for (question, expected) in cases {
            let mut state = asking(question, "  Tanger, maybe Rabat  ");
            let route = route_question(&mut state, &ForbiddenClassifier).await;
            assert_eq!(route, expected, "{question}");
            assert_eq!(state.answers().answered_count(), 1, "{question}");
        }

        let mut state = asking(QuestionId::City, "  Tanger, maybe Rabat  ");
        route_question(&mut state, &ForbiddenClassifier).await;
        assert_eq!(
            state.answers().current_city.as_deref(),
            Some("  Tanger, maybe Rabat  ")
        );
    }

    #[tokio::test]
    async fn empty_reply_is_accepted() {
        let mut state = asking(QuestionId::SalaryExpectation, "");
        route_question(&mut state, &ForbiddenClassifier).await;
        assert_eq!(state.answers().salary_expectation.as_deref(), Some(""));
    }

    #[tokio::test]
    async fn missing_question_falls_back_to_preferred_cities() {
        let mut state = state_with_reply("anything");
        let route = route_question(&mut state, &ForbiddenClassifier).await;
        assert_eq!(route, QuestionRoute::Ask(QuestionId::PreferredCities));
        assert_eq!(state.answers().answered_count(), 0);
    }
}
