mod common;

use common::strategies::*;
use integration_runtime::lifecycle::{plan_transition, LifecycleRequest, LifecycleState, ParentStateValidator};
use integration_runtime::message::{DefaultMessageFactory, MessageFactory};
use proptest::prelude::*;

proptest! {
    /// Property: a legal request's hooks always end in the request's target state
    #[test]
    fn legal_transitions_reach_target_state(
        state in lifecycle_state_strategy(),
        request in lifecycle_request_strategy(),
    ) {
        match plan_transition(state, request) {
            None => {
                prop_assert_eq!(state, LifecycleState::Closed);
                prop_assert_eq!(request, LifecycleRequest::Start);
            }
            Some([]) => {}
            Some(hooks) => {
                let reached = hooks.last().map(|hook| hook.target_state());
                prop_assert_eq!(reached, Some(request.target_state()));
            }
        }
    }

    /// Property: close is legal from every state and always ends Closed
    #[test]
    fn close_always_legal(state in lifecycle_state_strategy()) {
        let hooks = plan_transition(state, LifecycleRequest::Close);
        prop_assert!(hooks.is_some());
        let end = hooks
            .and_then(|h| h.last().map(|hook| hook.target_state()))
            .unwrap_or(state);
        prop_assert_eq!(end, LifecycleState::Closed);
    }

    /// Property: stop and close are never blocked by a parent
    #[test]
    fn parent_never_blocks_shutdown(parent in lifecycle_state_strategy()) {
        prop_assert!(ParentStateValidator::permits(LifecycleRequest::Stop, parent));
        prop_assert!(ParentStateValidator::permits(LifecycleRequest::Close, parent));
    }

    /// Property: mutating a clone's metadata never changes the source
    #[test]
    fn cloned_metadata_is_isolated(
        metadata in metadata_strategy(),
        extra_key in metadata_key_strategy(),
    ) {
        let mut source = DefaultMessageFactory::new().new_string_message("payload").unwrap();
        for (key, value) in &metadata {
            source.add_metadata(key.as_str(), value.as_str());
        }
        let snapshot = source.metadata().to_vec();

        let mut clone = source.clone();
        clone.add_metadata(extra_key.as_str(), "changed");
        for (key, _) in &metadata {
            clone.add_metadata(key.as_str(), "overwritten");
        }
        clone.set_content("other", None).unwrap();

        prop_assert_eq!(source.metadata().to_vec(), snapshot);
        prop_assert_eq!(source.content().unwrap(), "payload");
    }

    /// Property: preserving a subset keeps exactly those keys and the id
    #[test]
    fn preserved_copy_keeps_only_requested_keys(metadata in metadata_strategy()) {
        let factory = DefaultMessageFactory::new();
        let mut source = factory.new_string_message("payload").unwrap();
        for (key, value) in &metadata {
            source.add_metadata(key.as_str(), value.as_str());
        }
        let keep: Vec<&str> = metadata.iter().take(2).map(|(k, _)| k.as_str()).collect();
        let copy = factory.new_message_preserving(&source, &keep);

        prop_assert_eq!(copy.unique_id(), source.unique_id());
        for element in copy.metadata() {
            prop_assert!(keep.contains(&element.key.as_str()));
            prop_assert_eq!(Some(element.value.as_str()), source.metadata_value(&element.key));
        }
        prop_assert!(copy.payload().is_empty());
    }
}
