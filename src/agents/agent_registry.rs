use super::{
    DrafterAgent, EnhancerAgent, FactCheckerAgent, FormatterAgent, IndexerAgent, StageAgent,
    ValidatorAgent,
};
use std::sync::Arc;

/// Registry the queue manager looks agents up in by their tag
#[derive(Default)]
pub struct AgentRegistry {
    pub agents: Vec<Arc<dyn StageAgent>>,
}

impl AgentRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in template agents, one per
    /// pipeline role
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DrafterAgent));
        registry.register(Arc::new(EnhancerAgent));
        registry.register(Arc::new(FormatterAgent));
        registry.register(Arc::new(FactCheckerAgent));
        registry.register(Arc::new(ValidatorAgent));
        registry.register(Arc::new(IndexerAgent));
        registry
    }

    /// Adds an agent. The first agent registered under a tag wins lookups,
    /// so tests can front-run a built-in with a scripted double.
    pub fn register(&mut self, agent: Arc<dyn StageAgent>) {
        self.agents.push(agent);
    }

    /// Finds the agent registered under the given tag
    pub fn get_agent(&self, name: &str) -> Option<&Arc<dyn StageAgent>> {
        self.agents.iter().find(|agent| agent.name() == name)
    }

    /// Tags of every registered agent
    pub fn agent_names(&self) -> Vec<&str> {
        self.agents.iter().map(|agent| agent.name()).collect()
    }
}
