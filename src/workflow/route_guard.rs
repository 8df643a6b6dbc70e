//! 受保护页面的访问控制

use crate::error::{AppError, AppResult, AuthError};
use crate::services::navigation::{Navigator, Route};
use crate::services::session::SessionSnapshot;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// 会话仍在恢复中，暂不决定
    Pending,
    Allow,
    RedirectToLogin,
}

pub struct RouteGate;

impl RouteGate {
    pub fn check(session: &SessionSnapshot, route: Route) -> GateDecision {
        if session.is_loading {
            GateDecision::Pending
        } else if !route.is_protected() || session.is_logged_in {
            GateDecision::Allow
        } else {
            GateDecision::RedirectToLogin
        }
    }

    /// 检查并执行跳转
    pub fn enter(session: &SessionSnapshot, route: Route, navigator: &dyn Navigator) -> GateDecision {
        let decision = Self::check(session, route);
        debug!("访问 {} → {:?}", route.path(), decision);
        match decision {
            GateDecision::Allow => navigator.navigate(route),
            GateDecision::RedirectToLogin => navigator.navigate(Route::Login),
            GateDecision::Pending => {}
        }
        decision
    }

    /// 进入页面，未登录时返回 `NotLoggedIn`
    pub fn require(session: &SessionSnapshot, route: Route, navigator: &dyn Navigator) -> AppResult<()> {
        match Self::enter(session, route, navigator) {
            GateDecision::Allow => Ok(()),
            GateDecision::RedirectToLogin => Err(AuthError::NotLoggedIn.into()),
            GateDecision::Pending => Err(AppError::InvalidState {
                phase: "Loading",
                operation: route.path(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::User;
    use crate::services::navigation::RecordingNavigator;

    fn snapshot(is_logged_in: bool, is_loading: bool) -> SessionSnapshot {
        SessionSnapshot {
            user: is_logged_in.then(|| User::new("Ada", "ada@example.com")),
            token: is_logged_in.then(|| "abc123".to_string()),
            is_logged_in,
            is_loading,
        }
    }

    #[test]
    fn test_loading_session_is_pending() {
        assert_eq!(RouteGate::check(&snapshot(false, true), Route::Solver), GateDecision::Pending);
    }

    #[test]
    fn test_protected_route_requires_login() {
        let navigator = RecordingNavigator::new();
        let decision = RouteGate::enter(&snapshot(false, false), Route::Bookmarks, &navigator);
        assert_eq!(decision, GateDecision::RedirectToLogin);
        assert_eq!(navigator.visited(), vec![Route::Login]);

        assert_eq!(RouteGate::check(&snapshot(true, false), Route::Bookmarks), GateDecision::Allow);
        assert_eq!(RouteGate::check(&snapshot(false, false), Route::Register), GateDecision::Allow);
    }

    #[test]
    fn test_require_reports_not_logged_in() {
        let navigator = RecordingNavigator::new();
        let err = RouteGate::require(&snapshot(false, false), Route::Solver, &navigator).unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::NotLoggedIn)));
        assert_eq!(navigator.visited(), vec![Route::Login]);

        assert!(RouteGate::require(&snapshot(true, false), Route::Solver, &navigator).is_ok());
        assert!(matches!(
            RouteGate::require(&snapshot(false, true), Route::Solver, &navigator),
            Err(AppError::InvalidState { phase: "Loading", .. })
        ));
    }
}
