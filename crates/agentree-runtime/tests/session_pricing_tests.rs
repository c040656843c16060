//! Integration tests for sign-in sessions and card pricing.

mod common;

use agentree_auth::Authority;
use agentree_runtime::agent::{AgentError, NewAgent};
use agentree_runtime::pricing::CardType;
use agentree_runtime::session::{ActorSession, SessionError};
use common::{approx, Fixture, ROOT, ROOT_PASSWORD, TENANT};

// =============================================================================
// Sessions
// =============================================================================

mod session {
    use super::*;

    #[test]
    fn matches_across_enabled_tenants() {
        let fx = Fixture::new();
        fx.add_tenant("game", true);
        fx.seed_root("game", ROOT, ROOT_PASSWORD, 1.0, 0);
        fx.add_tenant("closed", false);
        fx.seed_root("closed", ROOT, ROOT_PASSWORD, 1.0, 0);
        fx.add_tenant("other", true);
        fx.seed_root("other", ROOT, "different", 1.0, 0);

        let session = ActorSession::establish(&fx.registry, ROOT, ROOT_PASSWORD).unwrap();
        let tenants: Vec<&str> = session.tenants().map(|t| t.as_str()).collect();
        assert_eq!(tenants, ["default", "game"]);
        assert_eq!(session.username(), ROOT);
        assert!(session.agent("game").is_some());
        assert!(session.agent("closed").is_none());
    }

    #[test]
    fn wrong_password_has_no_account() {
        let fx = Fixture::new();
        let err = ActorSession::establish(&fx.registry, ROOT, "nope").unwrap_err();
        assert!(matches!(err, SessionError::NoValidAccount(_)));
    }

    #[test]
    fn disabled_deleted_and_expired_accounts_are_skipped() {
        let fx = Fixture::new().tree();
        let now = 1_700_000_000;
        fx.hierarchy
            .create_child(
                TENANT,
                ROOT,
                NewAgent::new("temp", "pw").with_expiry(now - 1),
            )
            .unwrap();
        fx.hierarchy
            .create_child(
                TENANT,
                ROOT,
                NewAgent::new("later", "pw").with_expiry(now + 60),
            )
            .unwrap();
        fx.hierarchy.set_enabled(TENANT, ROOT, &["r2"], false).unwrap();
        fx.hierarchy.delete_child(TENANT, "r1", "r1a").unwrap();

        for (user, password) in [("temp", "pw"), ("r2", "r2-pw"), ("r1a", "r1a-pw")] {
            let err = ActorSession::establish_at(&fx.registry, user, password, now).unwrap_err();
            assert!(matches!(err, SessionError::NoValidAccount(_)), "{user}");
        }
        assert!(ActorSession::establish_at(&fx.registry, "later", "pw", now).is_ok());
    }

    #[test]
    fn refresh_sees_new_balance() {
        let fx = Fixture::new().tree();
        let mut session = ActorSession::establish(&fx.registry, "r1", "r1-pw").unwrap();
        assert!(approx(session.agent(TENANT).unwrap().balance, 0.0));

        fx.transfers
            .transfer(
                TENANT,
                ROOT,
                "r1",
                agentree_runtime::agent::TransferRequest::balance(10.0),
            )
            .unwrap();
        // Cached until refreshed.
        assert!(approx(session.agent(TENANT).unwrap().balance, 0.0));

        let fresh = session.refresh(&fx.registry, TENANT).unwrap();
        assert!(approx(fresh.balance, 5.0));

        let err = session.refresh(&fx.registry, "game").unwrap_err();
        assert!(matches!(err, SessionError::TenantNotInSession(_)));
    }

    #[test]
    fn refresh_drops_deleted_account() {
        let fx = Fixture::new().tree();
        let mut session = ActorSession::establish(&fx.registry, "r2", "r2-pw").unwrap();
        fx.hierarchy.delete_child(TENANT, ROOT, "r2").unwrap();

        let err = session.refresh(&fx.registry, TENANT).unwrap_err();
        assert!(matches!(err, SessionError::Agent(AgentError::ActorNotFound(_))));
        assert!(session.agent(TENANT).is_none());
    }

    #[test]
    fn change_password_checks_old() {
        let fx = Fixture::new().tree();
        let mut session = ActorSession::establish(&fx.registry, "r1", "r1-pw").unwrap();

        let err = session
            .change_password(&fx.registry, TENANT, "guess", "new-pw")
            .unwrap_err();
        assert!(matches!(err, SessionError::WrongPassword));

        let err = session
            .change_password(&fx.registry, TENANT, "r1-pw", "")
            .unwrap_err();
        assert!(matches!(err, SessionError::Agent(AgentError::InvalidRequest(_))));

        session
            .change_password(&fx.registry, TENANT, "r1-pw", "new-pw")
            .unwrap();
        assert!(ActorSession::establish(&fx.registry, "r1", "r1-pw").is_err());
        assert!(ActorSession::establish(&fx.registry, "r1", "new-pw").is_ok());
    }
}

// =============================================================================
// Pricing
// =============================================================================

mod pricing {
    use super::*;

    fn with_card_types(fx: &Fixture) {
        for card in [
            CardType::new("day", 1.0).with_prefix("D").with_duration(24),
            CardType::new("week", 9.99).with_prefix("W").with_duration(168),
            CardType::new("month", 30.0).with_prefix("M").with_duration(720),
        ] {
            fx.pricing.define_card_type(TENANT, &card).unwrap();
        }
    }

    #[test]
    fn catalog_is_listed_by_name() {
        let fx = Fixture::new();
        with_card_types(&fx);
        let names: Vec<String> = fx
            .pricing
            .card_types(TENANT)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["day", "month", "week"]);
    }

    #[test]
    fn define_replaces_existing() {
        let fx = Fixture::new();
        with_card_types(&fx);
        fx.pricing
            .define_card_type(TENANT, &CardType::new("day", 2.0))
            .unwrap();

        let cards = fx.pricing.card_types(TENANT).unwrap();
        assert_eq!(cards.len(), 3);
        assert!(approx(cards[0].price, 2.0));
    }

    #[test]
    fn define_rejects_bad_input() {
        let fx = Fixture::new();
        let err = fx
            .pricing
            .define_card_type(TENANT, &CardType::new(" ", 1.0))
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)));

        let err = fx
            .pricing
            .define_card_type(TENANT, &CardType::new("x", -1.0))
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidRequest(_)));
    }

    #[test]
    fn priced_list_follows_grants_and_rate() {
        let fx = Fixture::new().tree();
        with_card_types(&fx);

        // r1: grants [day],[week], effective rate 50.
        let priced = fx.pricing.priced_card_types(TENANT, "r1").unwrap();
        let rows: Vec<(&str, f64)> = priced
            .iter()
            .map(|p| (p.card_type.name.as_str(), p.agent_price))
            .collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0, "day");
        assert!(approx(rows[0].1, 0.5));
        assert_eq!(rows[1].0, "week");
        assert!(approx(rows[1].1, 4.99));
    }

    #[test]
    fn grants_without_card_type_are_skipped() {
        let fx = Fixture::new();
        with_card_types(&fx);
        fx.child(ROOT, "c", Authority::empty(), &["year", "day"], 100.0);

        let priced = fx.pricing.priced_card_types(TENANT, "c").unwrap();
        assert_eq!(priced.len(), 1);
        assert_eq!(priced[0].card_type.name, "day");
    }

    #[test]
    fn quote_through_the_chain() {
        let fx = Fixture::new().tree();
        with_card_types(&fx);

        let quote = fx.pricing.quote(TENANT, "r1a", "day").unwrap();
        assert!(approx(quote.effective_rate, 40.0));
        assert!(approx(quote.base_price, 1.0));
        assert!(approx(quote.price, 0.4));

        let root = fx.pricing.quote(TENANT, ROOT, "month").unwrap();
        assert!(approx(root.price, 30.0));
    }

    #[test]
    fn quote_errors() {
        let fx = Fixture::new().tree();
        with_card_types(&fx);
        fx.child(ROOT, "c", Authority::empty(), &["year"], 100.0);

        let err = fx.pricing.quote(TENANT, "ghost", "day").unwrap_err();
        assert!(matches!(err, AgentError::ActorNotFound(_)));

        let err = fx.pricing.quote(TENANT, "r1a", "week").unwrap_err();
        assert!(matches!(err, AgentError::CardTypeNotGranted { .. }));

        let err = fx.pricing.quote(TENANT, "c", "year").unwrap_err();
        assert!(matches!(err, AgentError::CardTypeNotFound(name) if name == "year"));
    }
}
