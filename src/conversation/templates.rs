//! Fixed assistant utterances.

use serde::{Deserialize, Serialize};

use super::state::QuestionId;

pub const DEFAULT_BOOKING_LINK: &str = "https://linkrsmarokko.com/book-meeting";

/// Every message the assistant can send. `welcome` may contain `{first_name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Templates {
    pub welcome: String,
    pub meeting_unclear: String,
    pub booking_link: String,
    pub permission_question: String,
    pub permission_unclear: String,
    pub persuasion: String,
    pub location: String,
    pub city: String,
    pub plan_to_move: String,
    pub preferred_cities: String,
    pub call_center_experience: String,
    pub experience_details: String,
    pub why_call_center: String,
    pub salary_expectation: String,
    pub previous_applications: String,
    pub final_message: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            welcome: "Thank you {first_name} for your application via the Linkrsmarokko website. \
                      Have you been able to book a meeting via the website with one of our recruiters?"
                .to_string(),
            meeting_unclear:
                "Sorry, I didn't fully catch that — have you already booked a meeting? (yes/no)"
                    .to_string(),
            booking_link: DEFAULT_BOOKING_LINK.to_string(),
            permission_question: "Is it okay if we ask you a couple of questions to prepare \
                                  ourselves for the upcoming meeting?"
                .to_string(),
            permission_unclear:
                "Just to confirm — is it okay if we ask you a few questions? (yes/no)".to_string(),
            persuasion: "No worries — these questions help our recruiter prepare and make the \
                         meeting more effective. It takes only about 2 minutes."
                .to_string(),
            location: "Are you currently in Morocco?".to_string(),
            city: "In what city are you currently residing?".to_string(),
            plan_to_move: "How concrete is your plan to come to Morocco? When are you planning \
                           to come and live in Morocco?"
                .to_string(),
            preferred_cities: "Which cities would you prefer to work in?".to_string(),
            call_center_experience: "Do you already have experience working in call centers?"
                .to_string(),
            experience_details: "Can you tell me about your call center experiences, what tasks \
                                 you performed, and the dates you worked?"
                .to_string(),
            why_call_center:
                "Why do you think working in a call center is the right job for you?".to_string(),
            salary_expectation: "What is your salary expectation?".to_string(),
            previous_applications: "Which call centers have you already applied to in Morocco?"
                .to_string(),
            final_message: "Thank you for answering our questions. Please let us know if you \
                            have any additional questions. Otherwise, we look forward to meeting you."
                .to_string(),
        }
    }
}

impl Templates {
    /// Defaults with a different booking link.
    pub fn with_booking_link(mut self, link: impl Into<String>) -> Self {
        self.booking_link = link.into();
        self
    }

    pub fn welcome_for(&self, first_name: &str) -> String {
        self.welcome.replace("{first_name}", first_name)
    }

    pub fn booking_message(&self) -> String {
        format!(
            "No problem! Please book a meeting using this link:\n{}\n\n\
             After booking, I'll ask you a couple of quick questions to prepare for the meeting.",
            self.booking_link
        )
    }

    pub fn question(&self, id: QuestionId) -> &str {
        match id {
            QuestionId::Location => &self.location,
            QuestionId::City => &self.city,
            QuestionId::PlanToMove => &self.plan_to_move,
            QuestionId::PreferredCities => &self.preferred_cities,
            QuestionId::CallCenterExperience => &self.call_center_experience,
            QuestionId::ExperienceDetails => &self.experience_details,
            QuestionId::WhyCallCenter => &self.why_call_center,
            QuestionId::SalaryExpectation => &self.salary_expectation,
            QuestionId::PreviousApplications => &self.previous_applications,
        }
    }
}
