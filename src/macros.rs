//! Utility macros for common patterns across the runtime
//!
//! Reduces the boilerplate of wiring a component's `LifecycleCell` into the
//! lifecycle state machine.

/// Implement `StateManagedComponent` for a type holding a `LifecycleCell`
///
/// The field is named `lifecycle` unless given explicitly.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use integration_runtime::lifecycle::{Component, LifecycleCell};
/// use integration_runtime::state_managed;
///
/// pub struct MyConnection {
///     id: String,
///     lifecycle: LifecycleCell,
/// }
///
/// #[async_trait]
/// impl Component for MyConnection {
///     fn component_id(&self) -> &str {
///         &self.id
///     }
/// }
///
/// state_managed!(MyConnection);
/// ```
#[macro_export]
macro_rules! state_managed {
    ($type_name:ty) => {
        $crate::state_managed!($type_name, lifecycle);
    };
    ($type_name:ty, $cell_field:ident) => {
        impl $crate::lifecycle::StateManagedComponent for $type_name {
            fn lifecycle(&self) -> &$crate::lifecycle::LifecycleCell {
                &self.$cell_field
            }
        }
    };
}
