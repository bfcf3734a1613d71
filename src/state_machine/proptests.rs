//! Property-based tests for the state machine
//!
//! Each generated session is a sequence of submissions, some of which
//! arrive while a response is outstanding, driven through `transition`
//! against a real `ConversationStore`.

use super::transition::*;
use super::*;
use crate::conversation::{ConversationStore, Message, MessagePatch};
use crate::exchange::normalize_bullets;
use crate::llm::ChatTurn;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

#[derive(Debug, Clone)]
enum Step {
    /// Submit, then let the exchange finish with success or failure
    Exchange { text: String, succeed: bool },
    /// Submit twice before the first exchange finishes
    DoubleSubmit { first: String, second: String },
    /// Submit whitespace only
    Blank(String),
}

fn arb_text() -> impl Strategy<Value = String> {
    "[a-zA-Z?][a-zA-Z0-9 ?]{0,40}"
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        (arb_text(), any::<bool>()).prop_map(|(text, succeed)| Step::Exchange { text, succeed }),
        (arb_text(), arb_text()).prop_map(|(first, second)| Step::DoubleSubmit { first, second }),
        "[ \t\n]{0,5}".prop_map(Step::Blank),
    ]
}

fn arb_markdown_line() -> impl Strategy<Value = String> {
    prop_oneof![
        "[ \t]{0,3}\\*[ \t]{0,3}[a-z]{1,10}",
        "\\*\\*[A-Za-z ]{1,10}\\*\\*",
        "[a-z ]{0,10}\\*[a-z ]{0,10}",
        "#{1,3} [A-Za-z]{1,10}",
        "[ \t]{0,2}",
    ]
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    store: ConversationStore,
    state: RequestState,
    /// History carried by the most recent model request
    requested_history: Option<Vec<ChatTurn>>,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: ConversationStore::with_greeting("Hello!"),
            state: RequestState::Idle,
            requested_history: None,
        }
    }

    fn dispatch(&mut self, event: Event) -> Result<Option<String>, TransitionError> {
        let result = transition(&self.state, event)?;
        self.state = result.new_state;
        let mut requested = None;
        for effect in result.effects {
            match effect {
                Effect::AppendMessages { messages } => self.store.append(messages),
                Effect::RequestResponse {
                    message_id,
                    history,
                    ..
                } => {
                    self.requested_history = Some(history);
                    requested = Some(message_id);
                }
                Effect::ResolvePending {
                    message_id,
                    content,
                } => {
                    self.store
                        .patch(&message_id, MessagePatch::resolve(content))
                        .expect("placeholder exists");
                }
                Effect::NotifyStateChange => {}
            }
        }
        Ok(requested)
    }

    fn submit(&mut self, text: &str) -> Result<Option<String>, TransitionError> {
        let history = self.store.history();
        let user = Message::user(self.store.next_id(), text, vec![]);
        let placeholder = Message::placeholder(self.store.next_id());
        self.dispatch(Event::UserSubmit {
            user,
            placeholder,
            history,
        })
    }

    fn finish(&mut self, message_id: String, succeed: bool) {
        let event = if succeed {
            Event::ResponseReceived {
                message_id,
                text: "answer".to_string(),
            }
        } else {
            Event::ResponseFailed { message_id }
        };
        self.dispatch(event).expect("awaiting the finished request");
    }
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every accepted submission adds exactly two entries, and at most one
    /// entry is ever pending
    #[test]
    fn prop_two_entries_per_accepted_submit(steps in prop::collection::vec(arb_step(), 0..20)) {
        let mut harness = Harness::new();
        let initial = harness.store.len();
        let mut accepted = 0usize;

        for step in steps {
            match step {
                Step::Exchange { text, succeed } => {
                    let id = harness.submit(&text).unwrap().unwrap();
                    accepted += 1;
                    prop_assert_eq!(harness.store.pending_count(), 1);
                    harness.finish(id, succeed);
                }
                Step::DoubleSubmit { first, second } => {
                    let id = harness.submit(&first).unwrap().unwrap();
                    accepted += 1;
                    prop_assert_eq!(harness.submit(&second), Err(TransitionError::Busy));
                    prop_assert_eq!(harness.store.pending_count(), 1);
                    harness.finish(id, true);
                }
                Step::Blank(text) => {
                    prop_assert_eq!(harness.submit(&text), Err(TransitionError::EmptyMessage));
                }
            }
            prop_assert!(harness.store.pending_count() <= 1);
            prop_assert!(!harness.state.is_awaiting());
        }

        prop_assert_eq!(harness.store.len(), initial + 2 * accepted);
        prop_assert_eq!(harness.store.pending_count(), 0);
    }

    /// Failed exchanges always surface the generic message
    #[test]
    fn prop_failure_content_is_generic(text in arb_text()) {
        let mut harness = Harness::new();
        let id = harness.submit(&text).unwrap().unwrap();
        harness.finish(id.clone(), false);

        let message = harness.store.get(&id).unwrap();
        prop_assert_eq!(message.content.as_str(), RESPONSE_ERROR_MESSAGE);
        prop_assert!(!message.pending);
        let failed = matches!(harness.state, RequestState::Failed { .. });
        prop_assert!(failed, "state: {:?}", harness.state);
    }

    /// History handed to the model is the store's history from before the
    /// submission; the new prompt only shows up in later requests
    #[test]
    fn prop_history_snapshot_precedes_submit(texts in prop::collection::vec(arb_text(), 1..6)) {
        let mut harness = Harness::new();
        for text in texts {
            let before = harness.store.history();
            let id = harness.submit(&text).unwrap().unwrap();
            prop_assert_eq!(harness.requested_history.take(), Some(before.clone()));

            let mut expected = before;
            expected.push(ChatTurn::user(text.clone()));
            prop_assert_eq!(harness.store.history(), expected);

            harness.finish(id, true);
        }
    }

    #[test]
    fn prop_bullet_normalization_idempotent(
        lines in prop::collection::vec(arb_markdown_line(), 0..12)
    ) {
        let text = lines.join("\n");
        let once = normalize_bullets(&text);
        prop_assert_eq!(normalize_bullets(&once), once.clone());
        prop_assert_eq!(once.lines().count(), text.lines().count());
    }
}
