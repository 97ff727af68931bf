//! Typed E2AP PDU records.
//!
//! These are plain data records for every PDU kind the simulator consumes or
//! produces. Encoded service-model payloads (headers, messages, trigger and
//! action definitions) travel as opaque [`Bytes`] produced by a codec
//! plugin.

use bytes::Bytes;

/// RAN function identifier advertised by an E2 node.
pub type RanFunctionId = i32;

/// Identifier of a single RIC action within a subscription.
pub type RicActionId = i32;

/// RIC request identifier pair carried by every procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RicRequestId {
    /// Requester identifier chosen by the RIC.
    pub requester_id: i32,
    /// RIC instance identifier.
    pub instance_id: i32,
}

impl RicRequestId {
    /// Creates a new request identifier pair.
    pub const fn new(requester_id: i32, instance_id: i32) -> Self {
        Self {
            requester_id,
            instance_id,
        }
    }
}

/// RIC action types per E2AP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RicActionType {
    /// Periodic or event-driven reporting.
    Report,
    /// Insert-style interception.
    Insert,
    /// Policy installation.
    Policy,
}

/// Failure causes surfaced in subscription and control outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RicCause {
    /// The requested action type is not supported by the service model.
    ActionNotSupported,
    /// The event-trigger definition was absent or failed to decode.
    InvalidEventTrigger,
    /// No subscription is registered under the request identifier.
    RequestIdUnknown,
    /// The RAN function identifier is not installed on the node.
    FunctionIdInvalid,
    /// Unspecified failure.
    Unspecified,
}

/// One action requested in a subscription.
#[derive(Debug, Clone, PartialEq)]
pub struct RicActionToBeSetup {
    /// Action identifier.
    pub action_id: RicActionId,
    /// Action type.
    pub action_type: RicActionType,
    /// Optional encoded action definition, parsed by the service model.
    pub definition: Option<Bytes>,
}

/// RIC subscription request.
#[derive(Debug, Clone, PartialEq)]
pub struct RicSubscriptionRequest {
    /// Request identifier pair.
    pub request_id: RicRequestId,
    /// Target RAN function.
    pub ran_function_id: RanFunctionId,
    /// Encoded event-trigger definition.
    pub event_trigger: Bytes,
    /// Requested actions.
    pub actions: Vec<RicActionToBeSetup>,
}

/// An action rejected during subscription setup, with its cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RejectedAction {
    /// Action identifier.
    pub action_id: RicActionId,
    /// Rejection cause.
    pub cause: RicCause,
}

/// RIC subscription response.
#[derive(Debug, Clone, PartialEq)]
pub struct RicSubscriptionResponse {
    /// Request identifier pair, echoed from the request.
    pub request_id: RicRequestId,
    /// Target RAN function, echoed from the request.
    pub ran_function_id: RanFunctionId,
    /// Actions admitted by the node.
    pub actions_admitted: Vec<RicActionId>,
    /// Actions not admitted, with causes.
    pub actions_not_admitted: Vec<RejectedAction>,
}

/// RIC subscription failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RicSubscriptionFailure {
    /// Request identifier pair, echoed from the request.
    pub request_id: RicRequestId,
    /// Target RAN function, echoed from the request.
    pub ran_function_id: RanFunctionId,
    /// Failure cause.
    pub cause: RicCause,
    /// Actions not admitted, with causes.
    pub actions_not_admitted: Vec<RejectedAction>,
}

/// RIC subscription delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RicSubscriptionDeleteRequest {
    /// Request identifier pair of the subscription to delete.
    pub request_id: RicRequestId,
    /// RAN function of the subscription to delete.
    pub ran_function_id: RanFunctionId,
}

/// RIC subscription delete response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RicSubscriptionDeleteResponse {
    /// Request identifier pair, echoed from the request.
    pub request_id: RicRequestId,
    /// RAN function, echoed from the request.
    pub ran_function_id: RanFunctionId,
}

/// RIC subscription delete failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RicSubscriptionDeleteFailure {
    /// Request identifier pair, echoed from the request.
    pub request_id: RicRequestId,
    /// RAN function, echoed from the request.
    pub ran_function_id: RanFunctionId,
    /// Failure cause.
    pub cause: RicCause,
}

/// Indication delivery class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RicIndicationType {
    /// Report indication.
    Report,
    /// Insert indication.
    Insert,
}

/// RIC indication: a report PDU sent from the node to the RIC.
#[derive(Debug, Clone, PartialEq)]
pub struct RicIndication {
    /// Request identifier pair of the owning subscription.
    pub request_id: RicRequestId,
    /// RAN function of the owning subscription.
    pub ran_function_id: RanFunctionId,
    /// Action that produced this indication.
    pub action_id: RicActionId,
    /// Delivery class.
    pub indication_type: RicIndicationType,
    /// Optional sequence number.
    pub indication_sn: Option<i32>,
    /// Encoded indication header.
    pub header: Bytes,
    /// Encoded indication message.
    pub message: Bytes,
}

/// RIC control request.
#[derive(Debug, Clone, PartialEq)]
pub struct RicControlRequest {
    /// Request identifier pair.
    pub request_id: RicRequestId,
    /// Target RAN function.
    pub ran_function_id: RanFunctionId,
    /// Encoded control header.
    pub header: Bytes,
    /// Encoded control message.
    pub message: Bytes,
}

/// RIC control acknowledge.
#[derive(Debug, Clone, PartialEq)]
pub struct RicControlAcknowledge {
    /// Request identifier pair, echoed from the request.
    pub request_id: RicRequestId,
    /// RAN function, echoed from the request.
    pub ran_function_id: RanFunctionId,
    /// Optional encoded control outcome.
    pub outcome: Option<Bytes>,
}

/// RIC control failure.
#[derive(Debug, Clone, PartialEq)]
pub struct RicControlFailure {
    /// Request identifier pair, echoed from the request.
    pub request_id: RicRequestId,
    /// RAN function, echoed from the request.
    pub ran_function_id: RanFunctionId,
    /// Failure cause.
    pub cause: RicCause,
}
