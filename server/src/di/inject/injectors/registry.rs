use crate::di::inject::injectors::config::ServerConfigInjector;
use htlcgate_components::intercept::registry::HtlcInterceptRegistry;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone)]
pub struct RegistryInjector {
    config: ServerConfigInjector,
    singleton: Rc<RefCell<Option<HtlcInterceptRegistry>>>,
}

impl RegistryInjector {
    pub fn new(config: ServerConfigInjector) -> Self {
        Self {
            config,
            singleton: Default::default(),
        }
    }

    pub fn get(&self) -> anyhow::Result<HtlcInterceptRegistry> {
        if let Some(registry) = self.singleton.borrow().as_ref() {
            return Ok(registry.clone());
        }

        let registry = HtlcInterceptRegistry::new(self.config.get().registry_config()?);
        *self.singleton.borrow_mut() = Some(registry.clone());
        Ok(registry)
    }
}
