use kv_watch::stream::StreamError;
use kv_watch::{
    NamespaceError,
    SnapshotError,
};
use rocket::Responder;
use tracing::*;

#[derive(Debug, Responder)]
pub enum ApiError {
    #[response(status = 400)]
    BadRequest(String),

    #[response(status = 403)]
    Forbidden(String),

    #[response(status = 500)]
    ServerError(String),
}

// anyhow::Error's Debug implementation prints the whole chain, but rocket only ever sees the
// flattened string, so anything unexpected gets logged in full here before it's converted.
impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        if e.downcast_ref::<StreamError>().is_some() || e.downcast_ref::<SnapshotError>().is_some() {
            warn!("rejecting request: {e}");
            Self::BadRequest(e.to_string())
        } else if e.downcast_ref::<NamespaceError>().is_some() {
            Self::Forbidden(e.to_string())
        } else {
            error!("{e:?}");
            Self::ServerError(format!("KubeView error: {e}"))
        }
    }
}
