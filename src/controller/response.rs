use serde::Serialize;

use crate::{
    error::Error,
    query::{QueryHandle, QueryState, QueryStatus},
};

/// Body of every data endpoint.
#[derive(Debug, Serialize, PartialEq)]
pub struct QueryResponse<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub is_fetching: bool,
    pub error: Option<String>,
}

impl<T> QueryResponse<T> {
    pub fn from_state<S>(state: QueryState<S>, map: impl FnOnce(S) -> T) -> Self {
        QueryResponse {
            data: state.data.map(map),
            status: state.status,
            is_fetching: state.is_fetching,
            error: state.error.map(|e| e.to_string()),
        }
    }
}

/// Current state of `handle`, waiting only when there is nothing to serve
/// yet. Stale values are returned while their refetch runs.
pub async fn resolve<T>(handle: &QueryHandle<T>) -> Result<QueryState<T>, Error>
where
    T: Clone + Send + Sync + 'static,
{
    let mut state = handle.state();

    if state.data.is_none() && state.enabled {
        state = handle.wait().await;
    }

    match state.error {
        Some(error) if state.data.is_none() => Err(Error::Api(error)),
        _ => Ok(state),
    }
}
