/// Step sequence for one reservation attempt. Transitions are strictly
/// forward; the verification pair is skipped when the site asks for no
/// code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    Starting,
    Navigating,
    AwaitingPageReady,
    SelectingSport,
    AwaitingGroupSizePage,
    FillingGroupSize,
    ConfirmingGroupSize,
    AwaitingTimeSelectionPage,
    SelectingTimeSlot,
    AwaitingContactPage,
    FillingContactInfo,
    ConfirmingContactInfo,
    AwaitingVerification,
    EnteringVerificationCode,
    CheckingResult,
    Succeeded,
    Failed(String),
}

impl FlowState {
    /// Description collaborators can render without interpreting error
    /// types.
    pub fn describe(&self) -> String {
        match self {
            FlowState::Starting => "starting".into(),
            FlowState::Navigating => "opening the facility page".into(),
            FlowState::AwaitingPageReady => "waiting for the page to load".into(),
            FlowState::SelectingSport => "selecting the sport".into(),
            FlowState::AwaitingGroupSizePage => "waiting for the group size page".into(),
            FlowState::FillingGroupSize => "filling in the group size".into(),
            FlowState::ConfirmingGroupSize => "confirming the group size".into(),
            FlowState::AwaitingTimeSelectionPage => "waiting for the time selection page".into(),
            FlowState::SelectingTimeSlot => "selecting a time slot".into(),
            FlowState::AwaitingContactPage => "waiting for the contact page".into(),
            FlowState::FillingContactInfo => "filling in contact details".into(),
            FlowState::ConfirmingContactInfo => "confirming contact details".into(),
            FlowState::AwaitingVerification => "waiting for the verification code mail".into(),
            FlowState::EnteringVerificationCode => "entering the verification code".into(),
            FlowState::CheckingResult => "checking the booking result".into(),
            FlowState::Succeeded => "booking confirmed".into(),
            FlowState::Failed(reason) => format!("booking failed: {}", reason),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Succeeded | FlowState::Failed(_))
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(FlowState::Succeeded.is_terminal());
        assert!(FlowState::Failed("x".into()).is_terminal());
        assert!(!FlowState::SelectingTimeSlot.is_terminal());
    }

    #[test]
    fn failed_description_carries_reason() {
        let state = FlowState::Failed("no slot available".into());
        assert!(state.describe().contains("no slot available"));
    }
}
