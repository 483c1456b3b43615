#![allow(dead_code)]

use proptest::prelude::*;

use integration_runtime::lifecycle::{LifecycleRequest, LifecycleState};

pub fn lifecycle_state_strategy() -> impl Strategy<Value = LifecycleState> {
    prop_oneof![
        Just(LifecycleState::Closed),
        Just(LifecycleState::Initialised),
        Just(LifecycleState::Started),
        Just(LifecycleState::Stopped),
    ]
}

pub fn lifecycle_request_strategy() -> impl Strategy<Value = LifecycleRequest> {
    prop_oneof![
        Just(LifecycleRequest::Init),
        Just(LifecycleRequest::Start),
        Just(LifecycleRequest::Stop),
        Just(LifecycleRequest::Close),
    ]
}

/// Metadata keys that avoid the runtime's reserved keys
pub fn metadata_key_strategy() -> impl Strategy<Value = String> {
    "user_[a-z][a-z0-9_]{0,15}"
}

pub fn metadata_strategy() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec((metadata_key_strategy(), "[a-zA-Z0-9 ]{0,32}"), 0..12)
}
