//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. Each request body is
//! collected once so the signature verifier and the handler see the same
//! bytes.

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::http::request::Parts;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::{
    Authenticator, CookieKey, CookieNames, PayloadSecret, PayloadSigner, SessionVerifier,
    SignatureScheme,
};
use crate::config::Args;
use crate::relay::{DispatchForwarder, RelayClient};
use crate::routes::{self, profile::Counter, Route};
use crate::services::{HttpMailer, LogMailer, Mailer, NotificationGate};
use crate::store::{
    ActionRoomStore, MemoryActionRoomStore, MemoryNotificationStore, MemoryProfileStore,
    MemorySettingStore, NotificationStore, ProfileStore, SettingStore,
};
use crate::tasks::TaskSupervisor;
use crate::types::{GatehouseError, Result};

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// How long shutdown waits for background tasks
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(10);

/// Shared application state
///
/// Built once at startup and read-only afterwards.
pub struct AppState {
    pub args: Args,
    pub signer: Arc<PayloadSigner>,
    pub auth: Authenticator,
    /// Signed calls to other services
    pub relay: RelayClient,
    pub dispatch: DispatchForwarder,
    pub gate: Arc<NotificationGate>,
    pub notifications: Arc<dyn NotificationStore>,
    pub settings: Arc<dyn SettingStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub rooms: Arc<dyn ActionRoomStore>,
    pub tasks: TaskSupervisor,
    pub started_at: Instant,
}

/// Persistence and mail collaborators
pub struct Collaborators {
    pub notifications: Arc<dyn NotificationStore>,
    pub settings: Arc<dyn SettingStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub rooms: Arc<dyn ActionRoomStore>,
    pub mailer: Arc<dyn Mailer>,
}

impl Collaborators {
    /// In-memory stores with the mailer `args` selects
    pub fn in_memory(args: &Args, http: &reqwest::Client) -> Self {
        let mailer: Arc<dyn Mailer> = match &args.mail_api_url {
            Some(url) => Arc::new(HttpMailer::new(
                http.clone(),
                url.clone(),
                args.mail_api_key.clone(),
                args.mail_sender.clone(),
                args.relay_timeout(),
            )),
            None => Arc::new(LogMailer),
        };

        Self {
            notifications: Arc::new(MemoryNotificationStore::new()),
            settings: Arc::new(MemorySettingStore::new()),
            profiles: Arc::new(MemoryProfileStore::new()),
            rooms: Arc::new(MemoryActionRoomStore::new()),
            mailer,
        }
    }
}

impl AppState {
    /// State with in-memory stores
    pub fn new(args: Args) -> Result<Self> {
        let http = build_http_client()?;
        let collaborators = Collaborators::in_memory(&args, &http);
        Self::assemble(args, http, collaborators)
    }

    /// State with caller-supplied collaborators
    pub fn with_collaborators(args: Args, collaborators: Collaborators) -> Result<Self> {
        Self::assemble(args, build_http_client()?, collaborators)
    }

    fn assemble(args: Args, http: reqwest::Client, collaborators: Collaborators) -> Result<Self> {
        let secret = args
            .payload_secret()
            .ok_or_else(|| GatehouseError::Config("PAYLOAD_SECRET is not set".into()))?;
        let scheme = SignatureScheme::from_max_age(args.signature_max_age_secs);
        let signer = Arc::new(PayloadSigner::new(PayloadSecret::new(secret), scheme));

        let cookie_key = match (&args.cookie_public_key, args.jwt_secret()) {
            (Some(pem), _) => CookieKey::Es256Pem(pem.clone()),
            (None, Some(secret)) => CookieKey::Hs256(secret),
            (None, None) => {
                return Err(GatehouseError::Config(
                    "JWT_SECRET or COOKIE_PUBLIC_KEY is not set".into(),
                ))
            }
        };
        let sessions = SessionVerifier::new(
            cookie_key,
            CookieNames {
                header: args.header_cookie_name.clone(),
                payload: args.payload_cookie_name.clone(),
                signature: args.signature_cookie_name.clone(),
            },
        )?;

        let relay = RelayClient::with_client(
            http.clone(),
            args.internal_gateway.clone(),
            Arc::clone(&signer),
            args.relay_timeout(),
        );
        let dispatch = DispatchForwarder::new(
            http,
            args.websocket_server_url.clone(),
            args.gateway.clone(),
            args.relay_timeout(),
        );
        let gate = Arc::new(NotificationGate::new(
            relay.clone(),
            collaborators.mailer,
            args.app_name.clone(),
            args.web_domain.clone(),
        ));
        let tasks = TaskSupervisor::new(args.background_task_timeout());

        Ok(Self {
            auth: Authenticator::new(Arc::clone(&signer), sessions),
            signer,
            relay,
            dispatch,
            gate,
            notifications: collaborators.notifications,
            settings: collaborators.settings,
            profiles: collaborators.profiles,
            rooms: collaborators.rooms,
            tasks,
            started_at: Instant::now(),
            args,
        })
    }
}

// One pooled client for relay, dispatch and mail; deadlines are set per call.
fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|e| GatehouseError::Config(format!("failed to create HTTP client: {}", e)))
}

/// Start the HTTP server on `LISTEN`, stopping on Ctrl-C
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen)
        .await
        .map_err(|e| GatehouseError::Config(format!("failed to bind {}: {}", state.args.listen, e)))?;

    info!("Gatehouse listening on {}", state.args.listen);
    if state.args.dev_mode {
        warn!("Development mode enabled - insecure default secrets may be in use");
    }

    serve(listener, state, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await
}

/// Accept connections on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let state = Arc::clone(&state);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);

                        let service = service_fn(move |req| {
                            let state = Arc::clone(&state);
                            async move { handle_request(state, addr, req).await }
                        });

                        if let Err(err) = http1::Builder::new()
                            .serve_connection(io, service)
                            .await
                        {
                            debug!("Error serving connection from {}: {:?}", addr, err);
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {:?}", e);
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown requested, draining background tasks");
                break;
            }
        }
    }

    let summary = state.tasks.drain(SHUTDOWN_DRAIN).await;
    if summary.abandoned > 0 {
        warn!(
            completed = summary.completed,
            abandoned = summary.abandoned,
            "Background tasks still running at shutdown"
        );
    } else {
        info!(completed = summary.completed, "Background tasks drained");
    }
    Ok(())
}

async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let (parts, body) = req.into_parts();
    debug!("[{}] {} {}", addr, parts.method, parts.uri.path());

    let body = match Limited::new(body, MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("[{}] Failed to read request body: {}", addr, e);
            return Ok(GatehouseError::bad_request(
                "readBody",
                "Request body could not be read",
            )
            .into_response());
        }
    };

    Ok(route(&state, &parts, body).await)
}

/// Resolve, authenticate and handle one request
pub async fn route(state: &AppState, parts: &Parts, body: Bytes) -> Response<Full<Bytes>> {
    let path = parts.uri.path();

    if parts.method == Method::OPTIONS {
        return preflight_response();
    }

    let Some(route) = Route::resolve(&parts.method, path) else {
        return not_found_response(path);
    };

    if let Some(service) = route.service() {
        if !state.args.service_enabled(service) {
            return not_found_response(path);
        }
    }

    let ctx = match route.auth_mode() {
        None => None,
        Some(mode) => match state.auth.authenticate(mode, &parts.headers, &body) {
            Ok(ctx) => Some(ctx),
            Err(e) => {
                warn!(method = %parts.method, path = %path, error = %e, "Rejected request");
                return e.into_response();
            }
        },
    };

    match dispatch_route(state, parts, route, ctx, body).await {
        Ok(response) => response,
        Err(e) => {
            if e.status_code().is_server_error() {
                error!(path = %path, code = e.code(), error = %e, "Request failed");
            } else {
                debug!(path = %path, code = e.code(), error = %e, "Request rejected");
            }
            e.into_response()
        }
    }
}

async fn dispatch_route(
    state: &AppState,
    parts: &Parts,
    route: Route,
    ctx: Option<crate::auth::RequestContext>,
    body: Bytes,
) -> Result<Response<Full<Bytes>>> {
    if let Route::Health = route {
        return Ok(routes::health_check(state));
    }

    let ctx = ctx.ok_or_else(|| GatehouseError::Internal("route ran without verification".into()))?;
    let query = parts.uri.query();

    match route {
        Route::Health => Ok(routes::health_check(state)),
        Route::Dispatch { room_id } => routes::actions::dispatch(state, parts, &room_id, body).await,
        Route::CreateActionRoom => routes::actions::create_room(state, &ctx, &body).await,
        Route::UpdateActionRoom => routes::actions::update_room(state, &ctx, &body).await,
        Route::DeleteActionRoom { room_id } => {
            routes::actions::delete_room(state, &ctx, &room_id).await
        }
        Route::SetAccessKey => routes::actions::set_access_key(state, &ctx).await,
        Route::GetAccessKey => routes::actions::get_access_key(state, &ctx).await,
        Route::VerifyAccessKey => routes::actions::verify_access_key(state, &ctx, &body).await,

        Route::CreateNotification => routes::notifications::create(state, &ctx, &body).await,
        Route::ListNotifications => routes::notifications::list(state, &ctx, query).await,
        Route::SeenNotification { id } => routes::notifications::seen(state, &ctx, &id).await,
        Route::SeenAllNotifications => routes::notifications::seen_all(state, &ctx).await,
        Route::DeleteNotification { id } => routes::notifications::delete(state, &ctx, &id).await,
        Route::DeleteMyNotifications => routes::notifications::delete_mine(state, &ctx).await,

        Route::GetSettings => routes::setting::get_all(state, &ctx).await,
        Route::CreateSettings => routes::setting::create(state, &ctx, &body).await,
        Route::UpdateSettings => routes::setting::update(state, &ctx, &body).await,
        Route::DeleteSettings => routes::setting::delete_all(state, &ctx).await,
        Route::SettingsByIds => routes::setting::by_user_ids(state, &body).await,

        Route::MyProfile => routes::profile::my_profile(state, &ctx).await,
        Route::UpdateProfile => routes::profile::update(state, &ctx, &body).await,
        Route::UpdateLastSeen => routes::profile::update_last_seen(state, &body).await,
        Route::ProfileById { user_id } => routes::profile::by_id(state, &user_id).await,
        Route::ProfileIndex => routes::profile::create_index(state).await,
        Route::FollowCount { inc, user_id } => {
            routes::profile::increment(state, Counter::Follow, &inc, &user_id).await
        }
        Route::FollowerCount { inc, user_id } => {
            routes::profile::increment(state, Counter::Follower, &inc, &user_id).await
        }

        Route::AdminSetup => routes::admin::setup(state, &ctx).await,
    }
}

/// CORS preflight response
fn preflight_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", "*")
        .header("Access-Control-Allow-Headers", "*")
        .header("Access-Control-Allow-Methods", "GET, POST, PUT, DELETE, OPTIONS")
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::new())))
}

/// Not found response
fn not_found_response(path: &str) -> Response<Full<Bytes>> {
    GatehouseError::NotFound(format!("Route {}", path)).into_response()
}
