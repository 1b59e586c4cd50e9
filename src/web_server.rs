use anyhow::{Context, Result};
use axum::{
    extract::{FromRef, OriginalUri, Request, State},
    http::StatusCode,
    middleware,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    serve, Extension, Form, Router,
};
use minijinja::{context, path_loader, Environment, Value};
use minijinja_autoreload::AutoReloader;
use serde::Deserialize;
use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::Arc,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::auth::{self, AuthState, Identity, IdentityProvider, RouteGuard, StaticIdentityProvider};
use crate::config::{ServerConfig, COPY_ACK_MS};
use crate::controller::{FormController, SubmitOutcome};
use crate::conversation::Conversation;
use crate::error::GatewayError;
use crate::gateway::{self, Gateway};
use crate::gemini::{CompletionModel, GeminiClient};
use crate::render::conversation_views;
use crate::tools::{placeholder_tool, AssistantKind, NAV_ROUTES, TOOLS};

// Shared application state. Everything in here is immutable once built;
// conversations live in the pages, not on the server.
#[derive(Clone)]
pub struct AppState {
    templates: Arc<AutoReloader>,
    gateway: Gateway,
    auth: AuthState,
}

impl FromRef<AppState> for Gateway {
    fn from_ref(state: &AppState) -> Self {
        state.gateway.clone()
    }
}

impl AppState {
    pub fn new(
        templates_dir: impl Into<PathBuf>,
        model: Arc<dyn CompletionModel>,
        provider: Arc<dyn IdentityProvider>,
        guard: RouteGuard,
    ) -> Self {
        Self {
            templates: Arc::new(create_minijinja_env(templates_dir.into())),
            gateway: Gateway::new(model),
            auth: AuthState {
                provider,
                guard: Arc::new(guard),
            },
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let model = GeminiClient::new(&config.api_base, &config.api_key).with_model(&config.model);
        let provider = StaticIdentityProvider::new(config.sessions.iter().cloned());
        if provider.is_empty() {
            warn!("No sessions configured; every protected page will redirect to sign-in");
        }
        let guard = RouteGuard::new(config.protected_prefixes.iter().cloned(), &config.sign_in_url);
        Self::new(
            config.templates_dir.clone(),
            Arc::new(model),
            Arc::new(provider),
            guard,
        )
    }
}

// Minijinja Environment setup
fn create_minijinja_env(dir: PathBuf) -> AutoReloader {
    // Use AutoReloader for development convenience
    AutoReloader::new(move |notifier| {
        let mut env = Environment::new();
        env.set_loader(path_loader(dir.clone()));
        // Watch the templates directory for changes
        notifier.watch_path(&dir, true);
        Ok(env)
    })
}

fn render_page(state: &AppState, name: &str, ctx: Value) -> Response {
    // Acquire env, get template, and render within the same block
    state
        .templates
        .acquire_env()
        .and_then(|env| env.get_template(name).and_then(|tmpl| tmpl.render(ctx)))
        .map(|html| Html(html).into_response())
        .unwrap_or_else(|e| {
            // Handle errors from acquire_env, get_template, or render
            error!("Failed to get or render template {}: {}", name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Html(format!("Internal Server Error: {}", e)),
            )
                .into_response()
        })
}

fn user_name(identity: &Identity) -> Option<String> {
    identity.user().map(|u| u.to_string())
}

async fn index_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = context! {
        title => "Nest AI",
        active => "/",
        user => user_name(&identity),
    };
    render_page(&state, "landing.html", ctx)
}

async fn dashboard_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Response {
    let ctx = context! {
        title => "Dashboard",
        nav => NAV_ROUTES,
        active => "/dashboard",
        user => user_name(&identity),
        tools => TOOLS,
    };
    render_page(&state, "dashboard.html", ctx)
}

async fn placeholder_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    OriginalUri(uri): OriginalUri,
) -> Response {
    let Some(tool) = placeholder_tool(uri.path()) else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    let ctx = context! {
        title => tool.label,
        nav => NAV_ROUTES,
        active => tool.href,
        user => user_name(&identity),
        tool => tool,
    };
    render_page(&state, "placeholder.html", ctx)
}

#[derive(Debug, Deserialize)]
pub struct PromptForm {
    #[serde(default)]
    prompt: String,
    /// The conversation so far, as JSON, carried by the page itself.
    #[serde(default)]
    history: String,
}

struct AssistantView<'a> {
    controller: &'a FormController,
    error: Option<String>,
    alert: Option<String>,
}

fn render_assistant(
    state: &AppState,
    kind: AssistantKind,
    identity: &Identity,
    view: AssistantView<'_>,
) -> Response {
    let page = kind.page();
    let conversation = view.controller.conversation();
    let turns: Vec<Value> = conversation_views(conversation)
        .iter()
        .map(|t| t.to_value())
        .collect();

    let ctx = context! {
        title => page.title,
        nav => NAV_ROUTES,
        active => page.href,
        user => user_name(identity),
        page => page,
        turns => turns,
        history => conversation.to_json(),
        input => view.controller.input(),
        error => view.error,
        alert => view.alert,
        copy_ack_ms => COPY_ACK_MS,
    };
    render_page(state, "assistant.html", ctx)
}

async fn assistant_page(state: AppState, kind: AssistantKind, identity: Identity) -> Response {
    // Navigating to the page always starts a fresh conversation.
    let controller = FormController::default();
    let view = AssistantView {
        controller: &controller,
        error: None,
        alert: None,
    };
    render_assistant(&state, kind, &identity, view)
}

async fn assistant_submit(
    state: AppState,
    kind: AssistantKind,
    identity: Identity,
    form: PromptForm,
) -> Response {
    let conversation = match Conversation::from_json(&form.history) {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "Discarding submission with unreadable history");
            return GatewayError::MalformedRequest.into_response();
        }
    };

    let mut controller = FormController::new(conversation);
    controller.set_input(form.prompt.as_str());

    let (error, alert) = match controller.submit(&form.prompt, &state.gateway).await {
        Ok(SubmitOutcome::Completed { .. }) => (None, None),
        Ok(SubmitOutcome::Failed { alert, .. }) => (None, Some(alert)),
        Err(e) => (Some(e.to_string()), None),
    };

    let view = AssistantView {
        controller: &controller,
        error,
        alert,
    };
    render_assistant(&state, kind, &identity, view)
}

async fn chat_page(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> Response {
    assistant_page(state, AssistantKind::Chat, identity).await
}

async fn chat_submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<PromptForm>,
) -> Response {
    assistant_submit(state, AssistantKind::Chat, identity, form).await
}

async fn code_page(State(state): State<AppState>, Extension(identity): Extension<Identity>) -> Response {
    assistant_page(state, AssistantKind::Code, identity).await
}

async fn code_submit(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Form(form): Form<PromptForm>,
) -> Response {
    assistant_submit(state, AssistantKind::Code, identity, form).await
}

pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    // Serve static files from the configured directory
    let static_files_service = ServeDir::new(static_dir).not_found_service(tower::service_fn(
        |_req: Request| async {
            Ok::<_, std::convert::Infallible>((StatusCode::NOT_FOUND, "Not Found").into_response())
        },
    ));

    Router::new()
        .route("/", get(index_handler))
        .route("/dashboard", get(dashboard_handler))
        .route("/chat", get(chat_page).post(chat_submit))
        .route("/code", get(code_page).post(code_submit))
        .route("/image", get(placeholder_handler))
        .route("/video", get(placeholder_handler))
        .route("/music", get(placeholder_handler))
        .route("/api/code", post(gateway::completion_handler))
        .nest_service("/static", static_files_service)
        .layer(middleware::from_fn_with_state(state.auth.clone(), auth::identify))
        .with_state(state)
        .layer(TraceLayer::new_for_http()) // Add request logging
}

pub async fn start_web_server(config: ServerConfig) -> Result<()> {
    let state = AppState::from_config(&config);
    let app = build_router(state, &config.static_dir);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(model = %config.model, "Web server listening on http://{}", addr);

    // Bind using tokio::net::TcpListener
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context(format!("Failed to bind to address {}", addr))?;

    serve(listener, app.into_make_service())
        .await
        .context("Web server failed")?;

    Ok(())
}
