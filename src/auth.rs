use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use futures::future::BoxFuture;
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{debug, info};

/// Cookie set by the identity provider once a visitor has signed in.
pub const SESSION_COOKIE: &str = "__session";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is making the request. Attached to every request by [`identify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity(Option<UserId>);

impl Identity {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn signed_in(user: UserId) -> Self {
        Self(Some(user))
    }

    pub fn user(&self) -> Option<&UserId> {
        self.0.as_ref()
    }

    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

/// Resolves session tokens to users.
pub trait IdentityProvider: Send + Sync {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<UserId>>;
}

/// Accepts a fixed set of session tokens from configuration.
#[derive(Debug, Default, Clone)]
pub struct StaticIdentityProvider {
    sessions: HashMap<String, UserId>,
}

impl StaticIdentityProvider {
    pub fn new<I, T, U>(sessions: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        Self {
            sessions: sessions
                .into_iter()
                .map(|(token, user)| (token.into(), UserId::new(user)))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl IdentityProvider for StaticIdentityProvider {
    fn verify<'a>(&'a self, token: &'a str) -> BoxFuture<'a, Option<UserId>> {
        let user = self.sessions.get(token).cloned();
        Box::pin(async move { user })
    }
}

/// Decides which paths need a session and where anonymous visitors go.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    prefixes: Vec<String>,
    sign_in_url: String,
}

impl RouteGuard {
    pub fn new<I, S>(prefixes: I, sign_in_url: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            sign_in_url: sign_in_url.into(),
        }
    }

    pub fn is_protected(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }

    /// Sign-in URL that brings the visitor back to `target` (path and query).
    pub fn sign_in_redirect(&self, target: &str) -> String {
        let sep = if self.sign_in_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}redirect_url={}",
            self.sign_in_url,
            sep,
            urlencoding::encode(target)
        )
    }
}

#[derive(Clone)]
pub struct AuthState {
    pub provider: Arc<dyn IdentityProvider>,
    pub guard: Arc<RouteGuard>,
}

/// Session token from the provider's cookie, or a bearer token.
pub fn session_token(cookies: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = cookies.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Identify the caller and challenge anonymous visitors of protected paths.
pub async fn identify(
    State(auth): State<AuthState>,
    cookies: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = match session_token(&cookies, request.headers()) {
        Some(token) => match auth.provider.verify(&token).await {
            Some(user) => Identity::signed_in(user),
            None => {
                debug!("Session token not recognised");
                Identity::anonymous()
            }
        },
        None => Identity::anonymous(),
    };

    let uri = request.uri();
    if identity.is_anonymous() && auth.guard.is_protected(uri.path()) {
        let target = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        info!(%target, "Anonymous request to protected page, redirecting to sign-in");
        return Redirect::to(&auth.guard.sign_in_redirect(target)).into_response();
    }

    request.extensions_mut().insert(identity);
    next.run(request).await
}
