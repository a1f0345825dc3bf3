//! Mock creation, naming, and bulk verification.
//!
//! A [`MockFactory`] owns the serial counter used to name mocks
//! (`Mock<Contract:N>`), the catalog of contracts that default-value
//! synthesis may auto-mock, and the [`MockOptions`] applied to every mock it
//! creates. [`Mock::new`] uses a lazily created process-wide factory; tests
//! that depend on exact names should use their own factory or call
//! [`MockFactory::reset_serials`].

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock, RwLock, Weak};

use crate::config::{ConfigError, FactoryConfig, MockOptions};
use crate::contract::Contract;
use crate::defaults::{Defaults, SynthesisChain};
use crate::error::MockError;
use crate::mock::{Mock, MockInner};

/// State shared between a factory and every mock it created.
#[derive(Debug, Default)]
pub(crate) struct FactoryShared {
    serial: AtomicU64,
    catalog: RwLock<HashMap<String, Arc<Contract>>>,
}

impl FactoryShared {
    fn next_serial(&self) -> u64 {
        self.serial.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn register(&self, contract: &Arc<Contract>) {
        self.catalog
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(contract.name().to_owned())
            .or_insert_with(|| Arc::clone(contract));
    }

    pub(crate) fn lookup(&self, name: &str) -> Option<Arc<Contract>> {
        self.catalog
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Creates a mock, stubbing its properties when the options ask for it.
    /// Property stubbing already sees `defaults`.
    pub(crate) fn spawn(
        this: &Arc<Self>,
        contract: Arc<Contract>,
        options: MockOptions,
        defaults: Defaults,
        name: Option<String>,
        chain: &mut SynthesisChain,
    ) -> Mock {
        this.register(&contract);
        let name =
            name.unwrap_or_else(|| format!("Mock<{}:{}>", contract.name(), this.next_serial()));
        let mock = Mock::from_parts(name, contract, options, defaults, Arc::clone(this));
        if options.stub_properties {
            mock.stub_all_properties(chain);
        }
        tracing::debug!(
            mock = %mock.name(),
            behavior = ?options.behavior,
            default_value = ?options.default_value,
            "created mock"
        );
        mock
    }
}

/// Creates mocks with shared options and verifies them together.
#[derive(Debug)]
pub struct MockFactory {
    shared: Arc<FactoryShared>,
    options: MockOptions,
    track_mocks: bool,
    created: Mutex<Vec<Weak<MockInner>>>,
}

impl Default for MockFactory {
    fn default() -> Self {
        Self::new(MockOptions::default())
    }
}

impl MockFactory {
    /// A factory applying `options` to every mock it creates.
    #[must_use]
    pub fn new(options: MockOptions) -> Self {
        Self::from_config(FactoryConfig {
            mocks: options,
            ..FactoryConfig::default()
        })
    }

    /// A factory built from loaded configuration.
    #[must_use]
    pub fn from_config(config: FactoryConfig) -> Self {
        Self {
            shared: Arc::new(FactoryShared::default()),
            options: config.mocks,
            track_mocks: config.track_mocks,
            created: Mutex::new(Vec::new()),
        }
    }

    /// A factory configured from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Ok(Self::from_config(FactoryConfig::from_file(path)?))
    }

    /// The process-wide factory behind [`Mock::new`]. It does not track the
    /// mocks it creates.
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<MockFactory> = OnceLock::new();
        SHARED.get_or_init(|| {
            Self::from_config(FactoryConfig {
                track_mocks: false,
                ..FactoryConfig::default()
            })
        })
    }

    /// Options applied to created mocks.
    #[must_use]
    pub const fn options(&self) -> &MockOptions {
        &self.options
    }

    /// Makes `contract` available for auto-mocking of return values.
    pub fn register_contract(&self, contract: &Arc<Contract>) {
        self.shared.register(contract);
    }

    /// A contract previously registered or mocked through this factory.
    #[must_use]
    pub fn contract(&self, name: &str) -> Option<Arc<Contract>> {
        self.shared.lookup(name)
    }

    /// Creates a mock with the factory's options.
    #[must_use]
    pub fn create(&self, contract: Arc<Contract>) -> Mock {
        self.create_with(contract, self.options)
    }

    /// Creates a mock with explicit options.
    #[must_use]
    pub fn create_with(&self, contract: Arc<Contract>, options: MockOptions) -> Mock {
        self.spawn(contract, options, None)
    }

    /// Creates a mock with a caller-chosen name.
    #[must_use]
    pub fn create_named(&self, contract: Arc<Contract>, name: impl Into<String>) -> Mock {
        self.spawn(contract, self.options, Some(name.into()))
    }

    fn spawn(&self, contract: Arc<Contract>, options: MockOptions, name: Option<String>) -> Mock {
        let mock = FactoryShared::spawn(
            &self.shared,
            contract,
            options,
            Defaults::new(options.default_value),
            name,
            &mut SynthesisChain::new(),
        );
        if self.track_mocks {
            let mut created = self
                .created
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            created.retain(|weak| weak.strong_count() > 0);
            created.push(mock.downgrade());
        }
        mock
    }

    /// Restarts mock numbering at 1.
    pub fn reset_serials(&self) {
        self.shared.serial.store(0, Ordering::Release);
    }

    /// Live mocks created by this factory, in creation order.
    #[must_use]
    pub fn mocks(&self) -> Vec<Mock> {
        self.created
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter_map(Weak::upgrade)
            .map(Mock::from_inner)
            .collect()
    }

    /// Runs [`Mock::verify_all`] on every live mock.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn verify_all(&self) -> Result<(), MockError> {
        self.mocks().iter().try_for_each(Mock::verify_all)
    }

    /// Runs [`Mock::verify_verifiable`] on every live mock.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn verify_verifiable(&self) -> Result<(), MockError> {
        self.mocks().iter().try_for_each(Mock::verify_verifiable)
    }

    /// Runs [`Mock::verify_no_other_calls`] on every live mock.
    ///
    /// # Errors
    ///
    /// Returns the first failure.
    pub fn verify_no_other_calls(&self) -> Result<(), MockError> {
        self.mocks().iter().try_for_each(Mock::verify_no_other_calls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::TypeDescriptor;

    fn contract(name: &str) -> Arc<Contract> {
        Contract::interface(name)
            .method("f", [], TypeDescriptor::unit())
            .build()
    }

    #[test]
    fn names_follow_the_serial_counter() {
        let factory = MockFactory::default();
        assert_eq!(factory.create(contract("A")).name(), "Mock<A:1>");
        assert_eq!(factory.create(contract("B")).name(), "Mock<B:2>");
        factory.reset_serials();
        assert_eq!(factory.create(contract("A")).name(), "Mock<A:1>");
        assert_eq!(factory.create_named(contract("A"), "primary").name(), "primary");
    }

    #[test]
    fn mocked_contracts_join_the_catalog() {
        let factory = MockFactory::default();
        assert!(factory.contract("A").is_none());
        let _mock = factory.create(contract("A"));
        assert!(factory.contract("A").is_some());
        factory.register_contract(&contract("B"));
        assert_eq!(factory.contract("B").unwrap().name(), "B");
    }

    #[test]
    fn only_live_mocks_are_tracked() {
        let factory = MockFactory::default();
        let kept = factory.create(contract("A"));
        drop(factory.create(contract("B")));
        let mocks = factory.mocks();
        assert_eq!(mocks.len(), 1);
        assert!(mocks[0].ptr_eq(&kept));
    }

    #[test]
    fn shared_factory_does_not_track() {
        let _mock = Mock::new(contract("Shared"));
        assert!(MockFactory::shared().mocks().is_empty());
    }
}
