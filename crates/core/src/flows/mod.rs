pub mod controller;
pub mod engine;
pub mod states;

pub use controller::{ConversationController, HandleOutcome, InboundEvent};
pub use engine::{FlowDefinition, FlowEngine, FlowTransitionError, TariffEstimateFlow};
pub use states::{
    ClassSelection, ConversationEvent, ConversationState, FinalChoiceSelection, FlowAction,
    LocaleSelection, TransitionOutcome,
};
