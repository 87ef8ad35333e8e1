use std::net::SocketAddr;
use tracing::info;
use warp::Filter;

mod state;
pub use state::{new_shared_session_state, PollMode, SessionPhase, SessionSnapshot, SharedSessionState};

/// Local status endpoint for the running reconciliation session
///
/// - GET /status: `{"status": "active"}`
/// - GET /session: snapshot of the current session
///
/// ```bash
/// curl http://127.0.0.1:7070/session
/// ```
pub fn status_routes(
    state: SharedSessionState,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let status_route = warp::path("status")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "active" })));

    let with_state = warp::any().map(move || state.clone());
    let session_route = warp::path("session")
        .and(warp::path::end())
        .and(warp::get())
        .and(with_state)
        .and_then(|state: SharedSessionState| async move {
            let snapshot = state.read().await.clone();
            Ok::<_, std::convert::Infallible>(warp::reply::json(&snapshot))
        });

    status_route.or(session_route)
}

pub async fn serve_status(state: SharedSessionState, addr: SocketAddr) {
    info!(addr = %addr, "Status API listening");
    info!("  GET http://{}/status", addr);
    info!("  GET http://{}/session", addr);

    warp::serve(status_routes(state)).run(addr).await;
}
