//! # EPP object mappings
//!
//! Contact (RFC 5733), domain (RFC 5731) and host (RFC 5732) mappings plus
//! the registry grace period extension (RFC 3915), built on `epp-core`.
//!
//! Nothing is registered implicitly. A composing application calls
//! [`install`] once at startup, before the first message is decoded:
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use epp_core::{Codec, CodecConfig, FactoryDirectory};
//!
//! let directory = Arc::new(FactoryDirectory::new());
//! epp_mappings::install(&directory)?;
//! let codec = Codec::new(directory, CodecConfig::default());
//! ```

#![deny(unsafe_code)]

pub mod check;
pub mod contact;
pub mod domain;
pub mod host;
pub mod info;
pub mod rgp;

use std::sync::Arc;

use epp_core::{FactoryDirectory, MappingFactory, ObjectMapping, Result};
use tracing::info;

use contact::{
    Contact, ContactCheck, ContactCheckData, ContactCreate, ContactCreateData, ContactDelete,
    ContactInfo, ContactInfoData, ContactPendingAction, ContactTransfer, ContactTransferData,
};
use domain::{
    Domain, DomainCheck, DomainCheckData, DomainCreate, DomainCreateData, DomainDelete, DomainInfo,
    DomainInfoData, DomainPendingAction, DomainTransfer, DomainTransferData, DomainUpdate,
};
use host::{
    Host, HostCheck, HostCheckData, HostCreate, HostCreateData, HostDelete, HostInfo, HostInfoData,
    HostPendingAction,
};
use rgp::{RgpInfoData, RgpUpdate, RgpUpdateData};

/// The factories this crate contributes, one per namespace.
pub fn factories() -> Result<Vec<MappingFactory>> {
    Ok(vec![
        MappingFactory::builder(Contact::NAMESPACE)
            .command::<ContactCheck>()
            .command::<ContactInfo>()
            .command::<ContactDelete>()
            .command::<ContactCreate>()
            .command::<ContactTransfer>()
            .response::<ContactCheckData>()
            .response::<ContactInfoData>()
            .response::<ContactCreateData>()
            .response::<ContactTransferData>()
            .response::<ContactPendingAction>()
            .build()?,
        MappingFactory::builder(Domain::NAMESPACE)
            .command::<DomainCheck>()
            .command::<DomainInfo>()
            .command::<DomainDelete>()
            .command::<DomainCreate>()
            .command::<DomainUpdate>()
            .command::<DomainTransfer>()
            .response::<DomainCheckData>()
            .response::<DomainInfoData>()
            .response::<DomainCreateData>()
            .response::<DomainTransferData>()
            .response::<DomainPendingAction>()
            .build()?,
        MappingFactory::builder(Host::NAMESPACE)
            .command::<HostCheck>()
            .command::<HostInfo>()
            .command::<HostDelete>()
            .command::<HostCreate>()
            .response::<HostCheckData>()
            .response::<HostInfoData>()
            .response::<HostCreateData>()
            .response::<HostPendingAction>()
            .build()?,
        MappingFactory::builder(rgp::NAMESPACE)
            .command::<RgpUpdate>()
            .response::<RgpInfoData>()
            .response::<RgpUpdateData>()
            .extension_only()
            .build()?,
    ])
}

/// Registers every mapping of this crate. Calling it again is a no-op.
pub fn install(directory: &FactoryDirectory) -> Result<()> {
    let factories = factories()?;
    let count = factories.len();
    for factory in factories {
        directory.register(Arc::new(factory))?;
    }
    info!(mappings = count, namespaces = directory.len(), "EPP mappings installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use epp_core::Role;

    #[test]
    fn every_factory_builds() {
        let factories = factories().unwrap();
        let namespaces: Vec<&str> = factories.iter().map(|f| f.namespace()).collect();
        assert_eq!(
            namespaces,
            vec![Contact::NAMESPACE, Domain::NAMESPACE, Host::NAMESPACE, rgp::NAMESPACE]
        );
    }

    #[test]
    fn hosts_have_no_transfer() {
        let factories = factories().unwrap();
        let host = &factories[2];
        assert!(!host.handles(Role::Command, "transfer"));
        assert!(!host.handles(Role::Response, "trnData"));
        assert!(factories[1].handles(Role::Command, "transfer"));
        assert!(host.handles(Role::Response, "panData"));
    }

    #[test]
    fn install_is_idempotent() {
        let directory = FactoryDirectory::new();
        install(&directory).unwrap();
        install(&directory).unwrap();
        assert_eq!(directory.len(), 4);
        assert!(directory.is_registered(rgp::NAMESPACE));
    }

    #[test]
    fn rgp_is_extension_only() {
        let factories = factories().unwrap();
        assert!(factories[3].is_extension_only());
        assert!(factories[..3].iter().all(|f| !f.is_extension_only()));
        assert!(factories[1].handles(Role::Command, "update"));
    }
}
