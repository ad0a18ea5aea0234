//! `<info>` and `<delete>` commands, shared by every object type.

use std::marker::PhantomData;

use epp_core::component::{decode_opt_child, encode_opt, require_text};
use epp_core::fragment::expect_element;
use epp_core::{AuthInfo, CodecContext, Component, Element, ObjectMapping, Result, RootElement};

/// Requests the details of one object.
///
/// Non-sponsoring clients may include the object's authorization token to
/// see the full record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InfoCommand<M: ObjectMapping> {
    pub identifier: String,
    pub auth_info: Option<AuthInfo<M>>,
}

impl<M: ObjectMapping> InfoCommand<M> {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            auth_info: None,
        }
    }

    pub fn with_auth_info(mut self, auth_info: AuthInfo<M>) -> Self {
        self.auth_info = Some(auth_info);
        self
    }
}

impl<M: ObjectMapping> Component for InfoCommand<M> {
    fn encode(&self, ctx: &CodecContext) -> Result<Element> {
        let identifier = require_text(&self.identifier, "object-identifier")?;
        Ok(Element::new(M::NAMESPACE, "info")
            .with_child(Element::leaf(M::NAMESPACE, M::IDENTIFIER, identifier))
            .with_opt_child(encode_opt(&self.auth_info, ctx)?))
    }

    fn decode(&mut self, element: &Element, ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "info")?;
        self.identifier = element.required_text(M::IDENTIFIER)?;
        self.auth_info = decode_opt_child(element, "authInfo", ctx)?;
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for InfoCommand<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "info";
}

/// Deletes one object.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeleteCommand<M: ObjectMapping> {
    pub identifier: String,
    _mapping: PhantomData<M>,
}

impl<M: ObjectMapping> DeleteCommand<M> {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            _mapping: PhantomData,
        }
    }
}

impl<M: ObjectMapping> Component for DeleteCommand<M> {
    fn encode(&self, _ctx: &CodecContext) -> Result<Element> {
        let identifier = require_text(&self.identifier, "object-identifier")?;
        Ok(Element::new(M::NAMESPACE, "delete")
            .with_child(Element::leaf(M::NAMESPACE, M::IDENTIFIER, identifier)))
    }

    fn decode(&mut self, element: &Element, _ctx: &CodecContext) -> Result<()> {
        expect_element(element, M::NAMESPACE, "delete")?;
        self.identifier = element.required_text(M::IDENTIFIER)?;
        Ok(())
    }
}

impl<M: ObjectMapping> RootElement for DeleteCommand<M> {
    const NAMESPACE: &'static str = M::NAMESPACE;
    const ELEMENT: &'static str = "delete";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use crate::host::Host;
    use epp_core::component::decode_new;

    #[test]
    fn info_with_auth_roundtrip() {
        let ctx = CodecContext::default();
        let info = InfoCommand::<Contact>::new("sh8013").with_auth_info(AuthInfo::new("2fooBAR"));
        let el = info.encode(&ctx).unwrap();
        assert_eq!(el.child("id").unwrap().text(), "sh8013");
        assert_eq!(decode_new::<InfoCommand<Contact>>(&el, &ctx).unwrap(), info);
    }

    #[test]
    fn identifier_is_required() {
        let ctx = CodecContext::default();
        let err = InfoCommand::<Host>::new("").encode(&ctx).unwrap_err();
        assert_eq!(err.subject(), "object-identifier");
        let err = DeleteCommand::<Host>::new(" ").encode(&ctx).unwrap_err();
        assert_eq!(err.subject(), "object-identifier");
    }

    #[test]
    fn delete_uses_mapping_identifier() {
        let ctx = CodecContext::default();
        let delete = DeleteCommand::<Host>::new("ns1.example.com");
        let el = delete.encode(&ctx).unwrap();
        assert_eq!(el.child("name").unwrap().text(), "ns1.example.com");
        assert_eq!(decode_new::<DeleteCommand<Host>>(&el, &ctx).unwrap(), delete);
    }
}
