//! Shared fixtures for runtime integration tests.
//!
//! Every fixture owns a temporary data directory with the default tenant
//! provisioned, registered and seeded with one root agent:
//!
//! ```text
//! admin   ALL authority, grants [day],[week],[month], balance 100, 2h
//! ```

#![allow(dead_code)]

use agentree_auth::Authority;
use agentree_runtime::agent::{Agent, HierarchyService, NewAgent, TransferService};
use agentree_runtime::config::AgentreeConfig;
use agentree_runtime::pricing::PricingService;
use agentree_runtime::store::StoreRegistry;
use std::sync::Arc;
use tempfile::TempDir;

pub const TENANT: &str = "default";
pub const ROOT: &str = "admin";
pub const ROOT_PASSWORD: &str = "root-pw";

pub struct Fixture {
    pub dir: TempDir,
    pub registry: Arc<StoreRegistry>,
    pub hierarchy: HierarchyService,
    pub transfers: TransferService,
    pub pricing: PricingService,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = AgentreeConfig::with_data_dir(dir.path());
        let registry = Arc::new(StoreRegistry::new(&config).expect("registry"));
        registry.provision(TENANT).expect("provision");
        registry.register_tenant(TENANT, true).expect("register");

        let fixture = Self {
            hierarchy: HierarchyService::new(Arc::clone(&registry)),
            transfers: TransferService::new(Arc::clone(&registry)),
            pricing: PricingService::new(Arc::clone(&registry)),
            registry,
            dir,
        };
        fixture.seed_root(TENANT, ROOT, ROOT_PASSWORD, 100.0, 2);
        fixture
    }

    pub fn seed_root(&self, tenant: &str, name: &str, password: &str, balance: f64, hours: u32) -> Agent {
        let spec = NewAgent::new(name, password)
            .with_authority(Authority::ALL)
            .with_grants(["day", "week", "month"]);
        self.hierarchy
            .create_root(tenant, spec, balance, hours)
            .expect("create root")
    }

    /// Adds a second tenant with its own root.
    pub fn add_tenant(&self, tenant: &str, enabled: bool) {
        self.registry.provision(tenant).expect("provision");
        self.registry.register_tenant(tenant, enabled).expect("register");
    }

    pub fn child(
        &self,
        parent: &str,
        name: &str,
        authority: Authority,
        grants: &[&str],
        own_rate: f64,
    ) -> Agent {
        let spec = NewAgent::new(name, format!("{name}-pw"))
            .with_authority(authority)
            .with_grants(grants.iter().copied())
            .with_own_rate(own_rate);
        self.hierarchy
            .create_child(TENANT, parent, spec)
            .expect("create child")
    }

    /// ```text
    /// admin
    /// ├── r1    MANAGE_AGENT, [day],[week], own 50
    /// │   └── r1a  MANAGE_AGENT, [day], own 80
    /// └── r2    no authority, [day], own 100
    /// ```
    pub fn tree(self) -> Self {
        self.child(ROOT, "r1", Authority::MANAGE_AGENT, &["day", "week"], 50.0);
        self.child("r1", "r1a", Authority::MANAGE_AGENT, &["day"], 80.0);
        self.child(ROOT, "r2", Authority::empty(), &["day"], 100.0);
        self
    }

    pub fn agent(&self, name: &str) -> Agent {
        self.hierarchy.get_agent(TENANT, name).expect("agent")
    }

    pub fn names(agents: &[Agent]) -> Vec<&str> {
        agents.iter().map(|a| a.username.as_str()).collect()
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
