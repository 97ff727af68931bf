//! The codec-plugin boundary.
//!
//! A codec plugin, keyed by service-model OID, turns [`SmPayload`] records
//! into wire bytes and back. The simulator never inspects the bytes; a
//! bit-exact ASN.1 PER codec can be slotted in behind [`SmCodec`] without
//! touching the core. [`JsonSmCodec`] is the reference plugin used by the
//! in-tree simulator and its tests.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use bytes::Bytes;
use ransim_common::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::e2sm::kpm::{
    KpmActionDefinition, KpmEventTriggerDefinition, KpmIndicationHeader, KpmIndicationMessage,
};
use crate::e2sm::mho::{MhoEventTriggerDefinition, MhoIndicationHeader, MhoIndicationMessage};
use crate::e2sm::rcpre::{
    RcPreControlHeader, RcPreControlMessage, RcPreEventTriggerDefinition, RcPreIndicationHeader,
    RcPreIndicationMessage,
};

/// Message classes a codec can encode or decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadClass {
    /// Indication header.
    IndicationHeader,
    /// Indication message.
    IndicationMessage,
    /// Event-trigger definition.
    EventTrigger,
    /// Action definition.
    ActionDefinition,
    /// Control header.
    ControlHeader,
    /// Control message.
    ControlMessage,
}

/// A service-model payload record, across all supported service models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SmPayload {
    /// KPM indication header.
    KpmIndicationHeader(KpmIndicationHeader),
    /// KPM indication message, format 1.
    KpmIndicationMessage(KpmIndicationMessage),
    /// KPM event-trigger definition.
    KpmEventTrigger(KpmEventTriggerDefinition),
    /// KPM action definition, format 1.
    KpmActionDefinition(KpmActionDefinition),
    /// MHO indication header.
    MhoIndicationHeader(MhoIndicationHeader),
    /// MHO indication message (format 1 or 2).
    MhoIndicationMessage(MhoIndicationMessage),
    /// MHO event-trigger definition.
    MhoEventTrigger(MhoEventTriggerDefinition),
    /// RC-PRE indication header.
    RcPreIndicationHeader(RcPreIndicationHeader),
    /// RC-PRE indication message.
    RcPreIndicationMessage(RcPreIndicationMessage),
    /// RC-PRE event-trigger definition.
    RcPreEventTrigger(RcPreEventTriggerDefinition),
    /// RC-PRE control header.
    RcPreControlHeader(RcPreControlHeader),
    /// RC-PRE control message.
    RcPreControlMessage(RcPreControlMessage),
}

impl SmPayload {
    /// Returns the message class of this payload.
    pub fn class(&self) -> PayloadClass {
        match self {
            SmPayload::KpmIndicationHeader(_)
            | SmPayload::MhoIndicationHeader(_)
            | SmPayload::RcPreIndicationHeader(_) => PayloadClass::IndicationHeader,
            SmPayload::KpmIndicationMessage(_)
            | SmPayload::MhoIndicationMessage(_)
            | SmPayload::RcPreIndicationMessage(_) => PayloadClass::IndicationMessage,
            SmPayload::KpmEventTrigger(_)
            | SmPayload::MhoEventTrigger(_)
            | SmPayload::RcPreEventTrigger(_) => PayloadClass::EventTrigger,
            SmPayload::KpmActionDefinition(_) => PayloadClass::ActionDefinition,
            SmPayload::RcPreControlHeader(_) => PayloadClass::ControlHeader,
            SmPayload::RcPreControlMessage(_) => PayloadClass::ControlMessage,
        }
    }

    /// Extracts a KPM event-trigger definition.
    pub fn into_kpm_event_trigger(self) -> Result<KpmEventTriggerDefinition> {
        match self {
            SmPayload::KpmEventTrigger(t) => Ok(t),
            other => Err(Error::Invalid(format!(
                "expected KPM event trigger, got {:?}",
                other.class()
            ))),
        }
    }

    /// Extracts a KPM action definition.
    pub fn into_kpm_action_definition(self) -> Result<KpmActionDefinition> {
        match self {
            SmPayload::KpmActionDefinition(a) => Ok(a),
            other => Err(Error::Invalid(format!(
                "expected KPM action definition, got {:?}",
                other.class()
            ))),
        }
    }

    /// Extracts an MHO event-trigger definition.
    pub fn into_mho_event_trigger(self) -> Result<MhoEventTriggerDefinition> {
        match self {
            SmPayload::MhoEventTrigger(t) => Ok(t),
            other => Err(Error::Invalid(format!(
                "expected MHO event trigger, got {:?}",
                other.class()
            ))),
        }
    }

    /// Extracts an RC-PRE event-trigger definition.
    pub fn into_rcpre_event_trigger(self) -> Result<RcPreEventTriggerDefinition> {
        match self {
            SmPayload::RcPreEventTrigger(t) => Ok(t),
            other => Err(Error::Invalid(format!(
                "expected RC-PRE event trigger, got {:?}",
                other.class()
            ))),
        }
    }

    /// Extracts an RC-PRE control header.
    pub fn into_rcpre_control_header(self) -> Result<RcPreControlHeader> {
        match self {
            SmPayload::RcPreControlHeader(h) => Ok(h),
            other => Err(Error::Invalid(format!(
                "expected RC-PRE control header, got {:?}",
                other.class()
            ))),
        }
    }

    /// Extracts an RC-PRE control message.
    pub fn into_rcpre_control_message(self) -> Result<RcPreControlMessage> {
        match self {
            SmPayload::RcPreControlMessage(m) => Ok(m),
            other => Err(Error::Invalid(format!(
                "expected RC-PRE control message, got {:?}",
                other.class()
            ))),
        }
    }
}

/// A service-model codec plugin.
pub trait SmCodec: Send + Sync {
    /// The service-model OID this codec serves.
    fn oid(&self) -> &str;

    /// Encodes a payload record into wire bytes.
    fn encode(&self, payload: &SmPayload) -> Result<Bytes>;

    /// Decodes wire bytes of the given message class into a payload record.
    fn decode(&self, class: PayloadClass, bytes: &[u8]) -> Result<SmPayload>;
}

impl std::fmt::Debug for dyn SmCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmCodec").field("oid", &self.oid()).finish()
    }
}

/// Reference codec plugin carrying payloads as a JSON envelope.
pub struct JsonSmCodec {
    oid: String,
}

impl JsonSmCodec {
    /// Creates a JSON codec for the given service-model OID.
    pub fn new(oid: impl Into<String>) -> Self {
        Self { oid: oid.into() }
    }
}

impl SmCodec for JsonSmCodec {
    fn oid(&self) -> &str {
        &self.oid
    }

    fn encode(&self, payload: &SmPayload) -> Result<Bytes> {
        let raw = serde_json::to_vec(payload)
            .map_err(|e| Error::Internal(format!("codec encode: {e}")))?;
        Ok(Bytes::from(raw))
    }

    fn decode(&self, class: PayloadClass, bytes: &[u8]) -> Result<SmPayload> {
        let payload: SmPayload = serde_json::from_slice(bytes)
            .map_err(|e| Error::Invalid(format!("codec decode: {e}")))?;
        if payload.class() != class {
            return Err(Error::Invalid(format!(
                "decoded {:?} where {:?} was expected",
                payload.class(),
                class
            )));
        }
        Ok(payload)
    }
}

/// Registry of codec plugins, keyed by service-model OID.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn SmCodec>>>,
}

impl std::fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry").finish_non_exhaustive()
    }
}

impl CodecRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the JSON reference codec registered for the
    /// three supported service models.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(Arc::new(JsonSmCodec::new(crate::e2sm::kpm::OID)));
        registry.register(Arc::new(JsonSmCodec::new(crate::e2sm::mho::OID)));
        registry.register(Arc::new(JsonSmCodec::new(crate::e2sm::rcpre::OID)));
        registry
    }

    /// Registers a codec under its OID, replacing any previous entry.
    pub fn register(&self, codec: Arc<dyn SmCodec>) {
        let mut codecs = self.codecs.write().unwrap_or_else(|e| e.into_inner());
        codecs.insert(codec.oid().to_string(), codec);
    }

    /// Looks up the codec for an OID.
    pub fn get(&self, oid: &str) -> Result<Arc<dyn SmCodec>> {
        let codecs = self.codecs.read().unwrap_or_else(|e| e.into_inner());
        codecs
            .get(oid)
            .cloned()
            .ok_or_else(|| Error::Unavailable(format!("no codec plugin for OID {oid}")))
    }
}
