//! Factory directory: from a fragment's namespace and local name to a fresh,
//! decoded component.
//!
//! Each object mapping contributes one [`MappingFactory`] listing the root
//! elements it can build for commands and for responses. A factory marked
//! extension-only builds elements that are valid solely inside an
//! `<extension>` block, never as the main payload. The directory
//! indexes factories by namespace URI. Registration happens once at
//! startup and must complete before the first lookup; after that the
//! directory is only read.

use std::any::TypeId;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::component::{CodecContext, Payload, RootElement};
use crate::error::{EppError, Result};
use crate::fragment::Element;

/// Builds an empty root component, ready for `decode`.
pub type Constructor = fn() -> Box<dyn Payload>;

fn construct<T: RootElement>() -> Box<dyn Payload> {
    Box::new(T::default())
}

/// A constructor together with the concrete type it builds.
#[derive(Clone, Copy, Debug)]
struct Slot {
    type_id: TypeId,
    construct: Constructor,
}

impl Slot {
    fn of<T: RootElement>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            construct: construct::<T>,
        }
    }
}

/// Which side of the exchange a root element belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Command,
    Response,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Command => f.write_str("command"),
            Role::Response => f.write_str("response"),
        }
    }
}

/// Constructors for every root element of one namespace.
#[derive(Debug)]
pub struct MappingFactory {
    namespace: String,
    extension_only: bool,
    commands: BTreeMap<&'static str, Slot>,
    responses: BTreeMap<&'static str, Slot>,
}

impl MappingFactory {
    pub fn builder(namespace: impl Into<String>) -> MappingFactoryBuilder {
        MappingFactoryBuilder {
            factory: MappingFactory {
                namespace: namespace.into(),
                extension_only: false,
                commands: BTreeMap::new(),
                responses: BTreeMap::new(),
            },
            error: None,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// A fresh, empty component for `name`, if this factory knows it.
    pub fn construct(&self, role: Role, name: &str) -> Option<Box<dyn Payload>> {
        self.table(role).get(name).map(|slot| (slot.construct)())
    }

    /// Whether this namespace only ever appears inside `<extension>`.
    pub fn is_extension_only(&self) -> bool {
        self.extension_only
    }

    pub fn handles(&self, role: Role, name: &str) -> bool {
        self.table(role).contains_key(name)
    }

    /// Local names of the root elements for `role`, sorted.
    pub fn elements(&self, role: Role) -> Vec<&'static str> {
        self.table(role).keys().copied().collect()
    }

    /// Two factories are interchangeable when every element name maps to
    /// the same concrete type in both.
    fn same_signature(&self, other: &MappingFactory) -> bool {
        self.namespace == other.namespace
            && self.extension_only == other.extension_only
            && self.type_table(Role::Command).eq(other.type_table(Role::Command))
            && self.type_table(Role::Response).eq(other.type_table(Role::Response))
    }

    fn type_table(&self, role: Role) -> impl Iterator<Item = (&'static str, TypeId)> + '_ {
        self.table(role).iter().map(|(name, slot)| (*name, slot.type_id))
    }

    fn table(&self, role: Role) -> &BTreeMap<&'static str, Slot> {
        match role {
            Role::Command => &self.commands,
            Role::Response => &self.responses,
        }
    }
}

/// Builder for [`MappingFactory`]. The first inconsistency is reported by `build`.
pub struct MappingFactoryBuilder {
    factory: MappingFactory,
    error: Option<EppError>,
}

impl MappingFactoryBuilder {
    pub fn command<T: RootElement>(self) -> Self {
        self.add::<T>(Role::Command)
    }

    pub fn response<T: RootElement>(self) -> Self {
        self.add::<T>(Role::Response)
    }

    /// Restricts every element of this factory to `<extension>` blocks.
    pub fn extension_only(mut self) -> Self {
        self.factory.extension_only = true;
        self
    }

    pub fn build(self) -> Result<MappingFactory> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.factory),
        }
    }

    fn add<T: RootElement>(mut self, role: Role) -> Self {
        if self.error.is_some() {
            return self;
        }
        let namespace = &self.factory.namespace;
        if T::NAMESPACE != namespace {
            self.error = Some(EppError::registration(
                namespace.clone(),
                format!("{role} element {} belongs to {}", T::ELEMENT, T::NAMESPACE),
            ));
            return self;
        }
        let table = match role {
            Role::Command => &mut self.factory.commands,
            Role::Response => &mut self.factory.responses,
        };
        if table.insert(T::ELEMENT, Slot::of::<T>()).is_some() {
            self.error = Some(EppError::registration(
                namespace.clone(),
                format!("{role} element {} registered twice", T::ELEMENT),
            ));
        }
        self
    }
}

/// Namespace URI → factory.
#[derive(Debug, Default)]
pub struct FactoryDirectory {
    factories: DashMap<String, Arc<MappingFactory>>,
}

static GLOBAL: OnceLock<Arc<FactoryDirectory>> = OnceLock::new();

impl FactoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide directory. It starts empty; nothing is registered
    /// until the application calls `register` (or a mapping's `install`).
    pub fn global() -> Arc<FactoryDirectory> {
        GLOBAL.get_or_init(|| Arc::new(FactoryDirectory::new())).clone()
    }

    /// Adds a factory under its namespace.
    ///
    /// Registering the same factory again, or one building the same
    /// concrete type for every element name, is a no-op. A different factory for a namespace that is
    /// already taken is a registration error.
    pub fn register(&self, factory: Arc<MappingFactory>) -> Result<()> {
        match self.factories.entry(factory.namespace().to_string()) {
            Entry::Occupied(existing) => {
                let current = existing.get();
                if Arc::ptr_eq(current, &factory) || current.same_signature(&factory) {
                    debug!(namespace = %factory.namespace(), "Factory already registered");
                    return Ok(());
                }
                warn!(
                    namespace = %factory.namespace(),
                    "Rejected conflicting factory registration"
                );
                Err(EppError::registration(
                    factory.namespace(),
                    "a different factory is already registered for this namespace",
                ))
            }
            Entry::Vacant(slot) => {
                info!(
                    namespace = %factory.namespace(),
                    commands = factory.commands.len(),
                    responses = factory.responses.len(),
                    "Registered mapping factory"
                );
                slot.insert(factory);
                Ok(())
            }
        }
    }

    pub fn lookup(&self, namespace: &str) -> Option<Arc<MappingFactory>> {
        self.factories.get(namespace).map(|f| Arc::clone(f.value()))
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.factories.contains_key(namespace)
    }

    /// Registered namespace URIs, sorted.
    pub fn namespaces(&self) -> Vec<String> {
        let mut namespaces: Vec<String> = self.factories.iter().map(|f| f.key().clone()).collect();
        namespaces.sort();
        namespaces
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Builds and decodes the command payload rooted at `element`.
    pub fn create_command(&self, element: &Element, ctx: &CodecContext) -> Result<Box<dyn Payload>> {
        self.create_main(Role::Command, element, ctx)
    }

    /// Builds and decodes the response payload rooted at `element`.
    pub fn create_response(&self, element: &Element, ctx: &CodecContext) -> Result<Box<dyn Payload>> {
        self.create_main(Role::Response, element, ctx)
    }

    /// Like `create`, but an unknown namespace yields `None` so the
    /// caller can keep the fragment verbatim.
    pub fn claim_extension(
        &self,
        element: &Element,
        role: Role,
        ctx: &CodecContext,
    ) -> Result<Option<Box<dyn Payload>>> {
        if !self.is_registered(&element.namespace) {
            return Ok(None);
        }
        self.create(role, element, ctx).map(Some)
    }

    /// `create` for a main payload: extension-only namespaces are refused.
    fn create_main(&self, role: Role, element: &Element, ctx: &CodecContext) -> Result<Box<dyn Payload>> {
        if self
            .lookup(&element.namespace)
            .is_some_and(|factory| factory.is_extension_only())
        {
            return Err(EppError::decode(
                &element.name,
                format!("{} elements are only valid inside <extension>", element.namespace),
            ));
        }
        self.create(role, element, ctx)
    }

    /// Unknown namespace → dispatch error; unknown local name under a
    /// known namespace → decode error naming the local name.
    pub fn create(&self, role: Role, element: &Element, ctx: &CodecContext) -> Result<Box<dyn Payload>> {
        let factory = self
            .lookup(&element.namespace)
            .ok_or_else(|| EppError::dispatch(&element.namespace, &element.name))?;
        let mut payload = factory.construct(role, &element.name).ok_or_else(|| {
            EppError::decode(
                &element.name,
                format!("no {role} element of that name in {}", element.namespace),
            )
        })?;
        debug!(
            namespace = %element.namespace,
            element = %element.name,
            role = %role,
            "Dispatching fragment"
        );
        payload.decode_payload(element, ctx)?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::error::ErrorKind;
    use crate::fragment::expect_element;

    const NS: &str = "urn:example:gadget-1.0";

    #[derive(Clone, Debug, Default, PartialEq)]
    struct GadgetCheck {
        names: Vec<String>,
    }

    impl Component for GadgetCheck {
        fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
            Ok(Element::new(NS, "check")
                .with_children(self.names.iter().map(|n| Element::leaf(NS, "name", n.as_str()))))
        }

        fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
            expect_element(element, NS, "check")?;
            self.names = element.texts("name");
            Ok(())
        }
    }

    impl RootElement for GadgetCheck {
        const NAMESPACE: &'static str = NS;
        const ELEMENT: &'static str = "check";
    }

    /// Same element name as `GadgetCheck`, different type.
    #[derive(Clone, Debug, Default, PartialEq)]
    struct RivalCheck {
        names: Vec<String>,
    }

    impl Component for RivalCheck {
        fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
            Ok(Element::new(NS, "check"))
        }

        fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
            expect_element(element, NS, "check")?;
            self.names = element.texts("id");
            Ok(())
        }
    }

    impl RootElement for RivalCheck {
        const NAMESPACE: &'static str = NS;
        const ELEMENT: &'static str = "check";
    }

    #[derive(Clone, Debug, Default, PartialEq)]
    struct Stray;

    impl Component for Stray {
        fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
            Ok(Element::new("urn:example:stray", "stray"))
        }

        fn decode(&mut self, _element: &Element, _ctx: &CodecContext) -> Result<()> {
            Ok(())
        }
    }

    impl RootElement for Stray {
        const NAMESPACE: &'static str = "urn:example:stray";
        const ELEMENT: &'static str = "stray";
    }

    fn factory() -> Arc<MappingFactory> {
        Arc::new(
            MappingFactory::builder(NS)
                .command::<GadgetCheck>()
                .build()
                .unwrap(),
        )
    }

    fn check_fragment() -> Element {
        Element::new(NS, "check")
            .with_child(Element::leaf(NS, "name", "a"))
            .with_child(Element::leaf(NS, "name", "b"))
    }

    #[test]
    fn builder_rejects_foreign_namespace() {
        let err = MappingFactory::builder(NS).command::<Stray>().build().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registration);
    }

    #[test]
    fn builder_rejects_duplicate_element() {
        let err = MappingFactory::builder(NS)
            .command::<GadgetCheck>()
            .command::<GadgetCheck>()
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registration);
    }

    #[test]
    fn creates_and_decodes_by_exact_name() {
        let directory = FactoryDirectory::new();
        directory.register(factory()).unwrap();
        let payload = directory
            .create_command(&check_fragment(), &CodecContext::default())
            .unwrap();
        let check = payload.downcast_ref::<GadgetCheck>().unwrap();
        assert_eq!(check.names, vec!["a", "b"]);
    }

    #[test]
    fn unknown_namespace_is_a_dispatch_error() {
        let directory = FactoryDirectory::new();
        let err = directory
            .create_command(&check_fragment(), &CodecContext::default())
            .unwrap_err();
        assert!(err.is_dispatch());
    }

    #[test]
    fn unknown_local_name_is_a_decode_error() {
        let directory = FactoryDirectory::new();
        directory.register(factory()).unwrap();
        let err = directory
            .create_command(&Element::new(NS, "Check"), &CodecContext::default())
            .unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.subject(), "Check");

        let err = directory
            .create_response(&Element::new(NS, "check"), &CodecContext::default())
            .unwrap_err();
        assert!(err.is_decode());
    }

    #[test]
    fn registration_is_idempotent() {
        let directory = FactoryDirectory::new();
        let shared = factory();
        directory.register(Arc::clone(&shared)).unwrap();
        directory.register(shared).unwrap();
        directory.register(factory()).unwrap();
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn conflicting_registration_fails() {
        let directory = FactoryDirectory::new();
        directory.register(factory()).unwrap();
        let other = Arc::new(
            MappingFactory::builder(NS)
                .command::<GadgetCheck>()
                .response::<GadgetCheck>()
                .build()
                .unwrap(),
        );
        let err = directory.register(other).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registration);
        assert!(!directory.lookup(NS).unwrap().handles(Role::Response, "check"));
    }

    #[test]
    fn same_names_different_types_is_a_conflict() {
        let directory = FactoryDirectory::new();
        directory.register(factory()).unwrap();
        let rival = Arc::new(MappingFactory::builder(NS).command::<RivalCheck>().build().unwrap());
        assert_eq!(rival.elements(Role::Command), factory().elements(Role::Command));

        let err = directory.register(rival).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Registration);
        let payload = directory
            .create_command(&check_fragment(), &CodecContext::default())
            .unwrap();
        assert!(payload.is::<GadgetCheck>());
    }

    #[test]
    fn extension_only_factory_is_never_a_main_payload() {
        let directory = FactoryDirectory::new();
        let extension = Arc::new(
            MappingFactory::builder(NS)
                .command::<GadgetCheck>()
                .extension_only()
                .build()
                .unwrap(),
        );
        assert!(extension.is_extension_only());
        directory.register(extension).unwrap();
        let ctx = CodecContext::default();

        let err = directory.create_command(&check_fragment(), &ctx).unwrap_err();
        assert!(err.is_decode());
        assert_eq!(err.subject(), "check");

        let claimed = directory
            .claim_extension(&check_fragment(), Role::Command, &ctx)
            .unwrap()
            .unwrap();
        assert!(claimed.is::<GadgetCheck>());

        // Same elements, but usable as a main payload: not interchangeable.
        assert_eq!(
            directory.register(factory()).unwrap_err().kind(),
            ErrorKind::Registration
        );
    }

    #[test]
    fn unclaimed_extension_is_none() {
        let directory = FactoryDirectory::new();
        let claimed = directory
            .claim_extension(&check_fragment(), Role::Command, &CodecContext::default())
            .unwrap();
        assert!(claimed.is_none());
    }

    #[test]
    fn global_directory_starts_without_test_namespace() {
        let global = FactoryDirectory::global();
        assert!(!global.is_registered("urn:example:never-registered"));
        assert!(Arc::ptr_eq(&global, &FactoryDirectory::global()));
    }
}
