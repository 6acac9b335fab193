//! The assistant driver: owns one conversation and dispatches each user
//! turn to the router and nodes of the active phase.

use std::sync::Arc;

use tracing::info;

use crate::classifier::IntentClassifier;

use super::nodes::Node;
use super::routers::{route_meeting, route_permission, route_question};
use super::state::{CollectedData, ConversationState, Phase, Speaker};
use super::templates::Templates;

/// Scripted recruiter dialogue for one candidate.
pub struct RecruiterAssistant {
    state: ConversationState,
    classifier: Arc<dyn IntentClassifier>,
    templates: Arc<Templates>,
    started: bool,
    /// Set once the first questionnaire item has been asked.
    questions_started: bool,
}

impl RecruiterAssistant {
    pub fn new(
        first_name: impl Into<String>,
        classifier: Arc<dyn IntentClassifier>,
        templates: Arc<Templates>,
    ) -> Self {
        Self {
            state: ConversationState::new(first_name),
            classifier,
            templates,
            started: false,
            questions_started: false,
        }
    }

    /// Send the welcome message. Only the first call has an effect.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        self.run(Node::Welcome);
    }

    /// Handle one user turn and return the assistant messages it produced,
    /// in order. Input after completion is recorded but produces nothing.
    pub async fn process_user_input(&mut self, text: &str) -> Vec<String> {
        let before = self.state.transcript().len();
        self.state.push_user(text);

        let phase = self.current_phase();
        match phase {
            Phase::Meeting => {
                let route = route_meeting(&mut self.state, self.classifier.as_ref()).await;
                self.run_all(route.nodes());
            }
            Phase::Permission => {
                let route = route_permission(&mut self.state, self.classifier.as_ref()).await;
                if route.starts_questionnaire() {
                    self.questions_started = true;
                }
                self.run_all(route.nodes());
            }
            Phase::Questionnaire(_) => {
                let route = route_question(&mut self.state, self.classifier.as_ref()).await;
                self.run(route.node());
            }
            Phase::Completed => {}
        }

        let replies = self.assistant_messages_since(before + 1);
        info!(
            ?phase,
            next = ?self.current_phase(),
            replies = replies.len(),
            "Processed user turn"
        );
        replies
    }

    /// The dialogue is complete once the questionnaire has been entered and
    /// the final message has cleared the pending question.
    pub fn is_completed(&self) -> bool {
        self.state.current_question().is_none()
            && self.questions_started
            && self.state.permission_given().is_some()
    }

    pub fn current_phase(&self) -> Phase {
        self.state.phase()
    }

    pub fn collected_data(&self) -> CollectedData {
        self.state.collected_data()
    }

    /// The most recent assistant message, or `""` before `start`.
    pub fn last_message(&self) -> &str {
        self.state.last_assistant_message()
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    fn run(&mut self, node: Node) {
        node.apply(&mut self.state, &self.templates);
    }

    fn run_all(&mut self, nodes: &[Node]) {
        for node in nodes {
            self.run(*node);
        }
    }

    fn assistant_messages_since(&self, index: usize) -> Vec<String> {
        self.state.transcript()[index..]
            .iter()
            .filter(|e| e.role == Speaker::Assistant)
            .map(|e| e.content.clone())
            .collect()
    }
}
