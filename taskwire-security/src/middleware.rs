//! `AuthMiddleware`: decode the task's bearer token (if any) and key a
//! lazily-resolved session off its subject claim, failing closed only
//! when a credential was presented and rejected (spec SPEC_FULL §4
//! security addendum, spec §4.7 "From-task construction").

use crate::identity::AuthenticatedUser;
use crate::jwt::JwtValidator;
use async_trait::async_trait;
use taskwire_core::context::TaskContext;
use taskwire_core::error::TaskError;
use taskwire_core::middleware::{Middleware, Next};
use taskwire_core::result::TaskResult;
use taskwire_core::session::Session;

pub struct AuthMiddleware {
    validator: JwtValidator,
}

impl AuthMiddleware {
    pub fn new(validator: JwtValidator) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Middleware for AuthMiddleware {
    async fn handle<'a>(&'a self, ctx: &mut TaskContext, next: Next<'a>) -> Result<TaskResult, TaskError> {
        if let Some(auth) = ctx.task.metadata.authorization.clone() {
            let claims = self
                .validator
                .decode_authorization(&auth)
                .map_err(|e| TaskError::Unauthorized(e.to_string()))?;
            let subject = claims.sub.clone();
            // The session-id claim (spec §4.7 "From-task construction")
            // keys the pool, not the `X-Client-Id` header; resolution
            // itself stays lazy until something accesses `ctx.session()`.
            ctx.prepare_session(subject, move |id| {
                let session = Session::new(id);
                session.set(AuthenticatedUser::from_claims(claims));
                std::future::ready(session)
            });
        }
        next.run(ctx).await
    }
}

/// Require an [`AuthenticatedUser`] carrying at least one of `roles`,
/// for use inside a handler body (spec SPEC_FULL §4: role checks are a
/// handler-level concern, not a generated `#[roles(...)]` attribute —
/// spec §9 Design Notes). Resolves the session (possibly for the first
/// time) via [`TaskContext::session`].
pub async fn require_roles(
    ctx: &TaskContext,
    roles: &[&str],
) -> Result<std::sync::Arc<AuthenticatedUser>, TaskError> {
    let session = ctx.require_session().await?;
    let user = session
        .get::<AuthenticatedUser>()
        .ok_or_else(|| TaskError::Unauthorized("no authenticated identity on session".into()))?;
    if roles.is_empty() || user.has_any_role(roles) {
        Ok(user)
    } else {
        Err(TaskError::Forbidden(format!("requires one of {roles:?}")))
    }
}
