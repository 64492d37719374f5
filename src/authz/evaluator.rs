use async_trait::async_trait;

use super::principal::Principal;
use super::scopes::Scope;

/// Policy evaluator trait for pluggable authorization logic
#[async_trait]
pub trait PolicyEvaluator: Send + Sync {
    /// Check whether the principal satisfies at least one acceptable scope.
    /// `None` entries are conditional scopes whose condition did not hold.
    async fn allows(&self, principal: &Principal, acceptable: &[Option<Scope>]) -> bool;
}

/// Any-of scope matching.
///
/// Evaluation order:
/// 1. no acceptable scope left after dropping `None` -> deny
/// 2. admin scope -> allow
/// 3. any acceptable scope granted -> allow
/// 4. deny
#[derive(Debug, Clone, Default)]
pub struct DefaultPolicyEvaluator;

impl DefaultPolicyEvaluator {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PolicyEvaluator for DefaultPolicyEvaluator {
    async fn allows(&self, principal: &Principal, acceptable: &[Option<Scope>]) -> bool {
        let mut wanted = acceptable.iter().flatten().copied().peekable();

        // Nothing to satisfy, so nothing is granted. This also holds for admins.
        if wanted.peek().is_none() {
            tracing::debug!(identity = %principal.identity, "no acceptable scopes");
            return false;
        }

        if principal.is_admin() {
            tracing::debug!(identity = %principal.identity, "admin bypass");
            return true;
        }

        if let Some(scope) = wanted.find(|s| principal.has_scope(*s)) {
            tracing::debug!(identity = %principal.identity, scope = %scope, "scope match");
            return true;
        }

        tracing::debug!(identity = %principal.identity, "scope denied");
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authz::principal::Identity;

    fn user(scopes: &[Scope]) -> Principal {
        Principal::new(Identity::User("U1".into())).with_scopes(scopes.iter().copied())
    }

    #[tokio::test]
    async fn empty_acceptable_list_denies() {
        let evaluator = DefaultPolicyEvaluator::new();
        assert!(!evaluator.allows(&user(&[Scope::GetShifts]), &[]).await);
        assert!(!evaluator.allows(&user(&[Scope::Admin]), &[]).await);
    }

    #[tokio::test]
    async fn only_none_entries_denies() {
        let evaluator = DefaultPolicyEvaluator::new();
        assert!(!evaluator.allows(&user(&[Scope::Admin]), &[None, None]).await);
    }

    #[tokio::test]
    async fn admin_satisfies_everything() {
        let evaluator = DefaultPolicyEvaluator::new();
        let admin = user(&[Scope::Admin]);
        assert!(evaluator.allows(&admin, &[Some(Scope::DeleteSchedule)]).await);
        assert!(evaluator.allows(&admin, &[None, Some(Scope::GetOwnShift)]).await);
    }

    #[tokio::test]
    async fn any_of_matches() {
        let evaluator = DefaultPolicyEvaluator::new();
        let p = user(&[Scope::UpdateSchedule]);
        assert!(evaluator.allows(&p, &[Some(Scope::CreateShift), Some(Scope::UpdateSchedule)]).await);
        assert!(!evaluator.allows(&p, &[Some(Scope::CreateShift), Some(Scope::DeleteShift)]).await);
    }

    #[tokio::test]
    async fn none_entries_are_ignored_not_failing() {
        let evaluator = DefaultPolicyEvaluator::new();
        for granted in [&[Scope::GetShifts][..], &[Scope::DeleteAlert][..], &[][..]] {
            let p = user(granted);
            let with_gap = evaluator
                .allows(&p, &[Some(Scope::GetShifts), None, Some(Scope::DeleteAlert)])
                .await;
            let without = evaluator
                .allows(&p, &[Some(Scope::GetShifts), Some(Scope::DeleteAlert)])
                .await;
            assert_eq!(with_gap, without);
        }
    }

    #[tokio::test]
    async fn conditional_self_scope() {
        let evaluator = DefaultPolicyEvaluator::new();
        let p = user(&[Scope::GetOwnShift]);
        let own = p.identity.is_user("U1").then_some(Scope::GetOwnShift);
        let other = p.identity.is_user("U2").then_some(Scope::GetOwnShift);
        assert!(evaluator.allows(&p, &[Some(Scope::GetShifts), own]).await);
        assert!(!evaluator.allows(&p, &[Some(Scope::GetShifts), other]).await);
    }

    #[tokio::test]
    async fn no_scopes_denies() {
        let evaluator = DefaultPolicyEvaluator::new();
        assert!(!evaluator.allows(&user(&[]), &[Some(Scope::GetSchedules)]).await);
    }
}
