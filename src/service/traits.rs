use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ServiceResult;
use crate::lifecycle::StateManagedComponent;
use crate::message::Message;

/// One processing step of a service chain
///
/// A service mutates the message in place. It may set the message's next
/// service id (consulted by branching collections) or the stop-processing
/// flag (the workflow then skips its producer).
#[async_trait]
pub trait Service: StateManagedComponent {
    fn unique_id(&self) -> &str;

    /// Whether an enclosing collection should log this service's failure and
    /// carry on with the next service
    fn continue_on_fail(&self) -> bool {
        false
    }

    /// Whether this service sets the next service id
    fn is_branching(&self) -> bool {
        false
    }

    async fn do_service(&self, msg: &mut Message) -> ServiceResult<()>;
}

/// Creates independent service instances, e.g. for a pool of workers
pub trait ServiceFactory: Send + Sync {
    fn create(&self) -> ServiceResult<Arc<dyn Service>>;
}

impl<F> ServiceFactory for F
where
    F: Fn() -> ServiceResult<Arc<dyn Service>> + Send + Sync,
{
    fn create(&self) -> ServiceResult<Arc<dyn Service>> {
        self()
    }
}
