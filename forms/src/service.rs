//! The three request forms and the requests they produce.
//!
//! [`FormState`] is a tagged variant with a fixed field set per service.
//! Free-text fields and inventory selections are addressed by [`TextField`]
//! and [`SelectKey`]; addressing a field the active form does not have is an
//! [`InputError`], never a silent insert.

use crate::events::{
    DataCenterDeploymentEvent, DeviceConnectionEvent, EventHeader, EventKind, PopDeploymentEvent,
};
use crate::interfaces::{InterfaceEditor, InterfacePlan, RenameError, interface_summary};
use crate::options::SelectField;
use crate::simulator::TaskPlan;
use crate::validation::{ValidationResult, collect_validation_errors, validate_required_field};
use chrono::{DateTime, Utc};
use franc_portal_core::event::{EventError, SerializedEvent};
use franc_portal_core::inventory::{InventoryKind, OptionFilter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A request type offered in the service catalogue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    /// Connect a device and its interfaces
    #[serde(rename = "device_connection")]
    DeviceConnection,
    /// Deploy a data center
    #[serde(rename = "datacenter_deployment")]
    DataCenterDeployment,
    /// Deploy a point of presence
    #[serde(rename = "pop_deployment")]
    PopDeployment,
}

impl Service {
    /// Every service, catalogue order
    pub const ALL: [Self; 3] = [
        Self::DataCenterDeployment,
        Self::PopDeployment,
        Self::DeviceConnection,
    ];

    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeviceConnection => "device_connection",
            Self::DataCenterDeployment => "datacenter_deployment",
            Self::PopDeployment => "pop_deployment",
        }
    }

    /// Catalogue title
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::DeviceConnection => "Connection Request",
            Self::DataCenterDeployment => "Deploy Data Center",
            Self::PopDeployment => "Deploy PoP",
        }
    }

    /// Help topic describing the service
    #[must_use]
    pub const fn help_topic(self) -> &'static str {
        match self {
            Self::DeviceConnection => "connect-device",
            Self::DataCenterDeployment => "deploy-dc",
            Self::PopDeployment => "deploy-pop",
        }
    }

    /// Help topic with step-by-step instructions
    #[must_use]
    pub const fn instructions_topic(self) -> &'static str {
        match self {
            Self::DeviceConnection => "connect-device-instructions",
            Self::DataCenterDeployment => "deploy-dc-instructions",
            Self::PopDeployment => "deploy-pop-instructions",
        }
    }

    /// Help topic shown after a successful submission
    #[must_use]
    pub const fn next_steps_topic(self) -> &'static str {
        match self {
            Self::DeviceConnection => "connection-next-steps",
            Self::DataCenterDeployment => "dc-next-steps",
            Self::PopDeployment => "pop-next-steps",
        }
    }

    /// Event kind published for accepted requests
    #[must_use]
    pub const fn event_kind(self) -> EventKind {
        match self {
            Self::DeviceConnection => EventKind::DeviceConnection,
            Self::DataCenterDeployment => EventKind::DatacenterDeployment,
            Self::PopDeployment => EventKind::PopDeployment,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown service or field name.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownName {
    kind: &'static str,
    value: String,
}

impl FromStr for Service {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device_connection" | "connect-device" => Ok(Self::DeviceConnection),
            "datacenter_deployment" | "deploy-dc" => Ok(Self::DataCenterDeployment),
            "pop_deployment" | "deploy-pop" => Ok(Self::PopDeployment),
            other => Err(UnknownName {
                kind: "service",
                value: other.to_string(),
            }),
        }
    }
}

/// Free-text fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    /// Change-management identifier, every form
    ChangeNumber,
    /// Device connection
    DeviceName,
    /// Data-center deployment
    DcName,
    /// PoP deployment
    PopName,
}

impl TextField {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChangeNumber => "change_number",
            Self::DeviceName => "device_name",
            Self::DcName => "dc_name",
            Self::PopName => "pop_name",
        }
    }
}

impl FromStr for TextField {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "change_number" => Ok(Self::ChangeNumber),
            "device_name" => Ok(Self::DeviceName),
            "dc_name" => Ok(Self::DcName),
            "pop_name" => Ok(Self::PopName),
            other => Err(UnknownName {
                kind: "field",
                value: other.to_string(),
            }),
        }
    }
}

/// Inventory-backed selection fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectKey {
    /// Device connection
    DeviceType,
    /// Every form
    Location,
    /// Data-center and PoP deployment
    DesignPattern,
    /// PoP deployment
    Provider,
}

impl SelectKey {
    /// Wire name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DeviceType => "device_type",
            Self::Location => "location",
            Self::DesignPattern => "design_pattern",
            Self::Provider => "provider",
        }
    }
}

impl FromStr for SelectKey {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "device_type" => Ok(Self::DeviceType),
            "location" => Ok(Self::Location),
            "design_pattern" => Ok(Self::DesignPattern),
            "provider" => Ok(Self::Provider),
            other => Err(UnknownName {
                kind: "selection",
                value: other.to_string(),
            }),
        }
    }
}

/// Input the active form cannot accept.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// No service is open
    #[error("no service form is open")]
    NoActiveForm,

    /// The field belongs to another service
    #[error("{service} form has no field '{field}'")]
    FieldNotInForm {
        /// Open service
        service: Service,
        /// Requested field
        field: &'static str,
    },

    /// Interface rows exist only on the device connection form
    #[error("{0} form has no interfaces")]
    NoInterfaces(Service),

    /// More interface rows than one request may carry
    #[error("at most {max} interfaces can be configured, {requested} requested")]
    TooManyInterfaces {
        /// Requested row count
        requested: usize,
        /// Allowed maximum
        max: usize,
    },

    /// The vPC rename was refused
    #[error(transparent)]
    Rename(#[from] RenameError),

    /// A submission is still being processed
    #[error("a submission is already in progress")]
    SubmissionInProgress,
}

/// Device connection form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceConnectionForm {
    /// Change number
    pub change_number: String,
    /// Device name
    pub device_name: String,
    /// Device type (`DcimDeviceType`)
    pub device_type: SelectField,
    /// Building (`LocationBuilding`)
    pub location: SelectField,
    /// Interface rows and vPC groups
    pub interfaces: InterfaceEditor,
}

/// Data-center deployment form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DataCenterForm {
    /// Change number
    pub change_number: String,
    /// Data center name
    pub dc_name: String,
    /// Metro (`LocationMetro`)
    pub location: SelectField,
    /// Design (`DesignTopology`, type DC)
    pub design_pattern: SelectField,
}

/// PoP deployment form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PopForm {
    /// Change number
    pub change_number: String,
    /// PoP name
    pub pop_name: String,
    /// Metro (`LocationMetro`)
    pub location: SelectField,
    /// Design (`DesignTopology`, type POP)
    pub design_pattern: SelectField,
    /// Provider (`OrganizationProvider`)
    pub provider: SelectField,
}

/// In-progress input for one session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormState {
    /// Device connection request
    DeviceConnection(DeviceConnectionForm),
    /// Data-center deployment request
    DataCenterDeployment(DataCenterForm),
    /// PoP deployment request
    PopDeployment(PopForm),
}

/// One option list to load for a form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OptionQuery {
    /// Field the options are for
    pub key: SelectKey,
    /// Schema kind to query
    pub kind: InventoryKind,
    /// Attribute filters
    pub filters: Vec<OptionFilter>,
}

impl OptionQuery {
    fn new(key: SelectKey, kind: InventoryKind) -> Self {
        Self {
            key,
            kind,
            filters: Vec::new(),
        }
    }

    fn designs(design_type: &str) -> Self {
        Self {
            key: SelectKey::DesignPattern,
            kind: InventoryKind::DesignTopology,
            filters: vec![OptionFilter::new("type__value", design_type)],
        }
    }
}

/// Serializable view of a form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FormView {
    /// Open service
    pub service: Service,
    /// Free-text values by field name
    pub fields: BTreeMap<&'static str, String>,
    /// Selections by field name
    pub selections: BTreeMap<&'static str, SelectField>,
    /// Device connection only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<InterfacePlan>,
}

fn required(value: &str, label: &str) -> Option<String> {
    validate_required_field(Some(value), label)
}

impl FormState {
    /// Blank form for `service`
    #[must_use]
    pub fn for_service(service: Service) -> Self {
        match service {
            Service::DeviceConnection => Self::DeviceConnection(DeviceConnectionForm::default()),
            Service::DataCenterDeployment => Self::DataCenterDeployment(DataCenterForm::default()),
            Service::PopDeployment => Self::PopDeployment(PopForm::default()),
        }
    }

    /// Which service this form is for
    #[must_use]
    pub const fn service(&self) -> Service {
        match self {
            Self::DeviceConnection(_) => Service::DeviceConnection,
            Self::DataCenterDeployment(_) => Service::DataCenterDeployment,
            Self::PopDeployment(_) => Service::PopDeployment,
        }
    }

    /// Option lists this form needs
    #[must_use]
    pub fn option_queries(&self) -> Vec<OptionQuery> {
        match self {
            Self::DeviceConnection(_) => vec![
                OptionQuery::new(SelectKey::DeviceType, InventoryKind::DcimDeviceType),
                OptionQuery::new(SelectKey::Location, InventoryKind::LocationBuilding),
            ],
            Self::DataCenterDeployment(_) => vec![
                OptionQuery::new(SelectKey::Location, InventoryKind::LocationMetro),
                OptionQuery::designs("DC"),
            ],
            Self::PopDeployment(_) => vec![
                OptionQuery::new(SelectKey::Location, InventoryKind::LocationMetro),
                OptionQuery::designs("POP"),
                OptionQuery::new(SelectKey::Provider, InventoryKind::OrganizationProvider),
            ],
        }
    }

    fn text_mut(&mut self, field: TextField) -> Result<&mut String, InputError> {
        let service = self.service();
        let slot = match (self, field) {
            (Self::DeviceConnection(f), TextField::ChangeNumber) => &mut f.change_number,
            (Self::DataCenterDeployment(f), TextField::ChangeNumber) => &mut f.change_number,
            (Self::PopDeployment(f), TextField::ChangeNumber) => &mut f.change_number,
            (Self::DeviceConnection(f), TextField::DeviceName) => &mut f.device_name,
            (Self::DataCenterDeployment(f), TextField::DcName) => &mut f.dc_name,
            (Self::PopDeployment(f), TextField::PopName) => &mut f.pop_name,
            _ => {
                return Err(InputError::FieldNotInForm {
                    service,
                    field: field.as_str(),
                });
            },
        };
        Ok(slot)
    }

    /// Mutable access to a selection field.
    ///
    /// # Errors
    ///
    /// [`InputError::FieldNotInForm`] if this form has no such selection.
    pub fn selection_mut(&mut self, key: SelectKey) -> Result<&mut SelectField, InputError> {
        let service = self.service();
        let field = match (self, key) {
            (Self::DeviceConnection(f), SelectKey::DeviceType) => &mut f.device_type,
            (Self::DeviceConnection(f), SelectKey::Location) => &mut f.location,
            (Self::DataCenterDeployment(f), SelectKey::Location) => &mut f.location,
            (Self::DataCenterDeployment(f), SelectKey::DesignPattern) => &mut f.design_pattern,
            (Self::PopDeployment(f), SelectKey::Location) => &mut f.location,
            (Self::PopDeployment(f), SelectKey::DesignPattern) => &mut f.design_pattern,
            (Self::PopDeployment(f), SelectKey::Provider) => &mut f.provider,
            _ => {
                return Err(InputError::FieldNotInForm {
                    service,
                    field: key.as_str(),
                });
            },
        };
        Ok(field)
    }

    /// Set a free-text field.
    ///
    /// # Errors
    ///
    /// [`InputError::FieldNotInForm`] if this form has no such field.
    pub fn set_text(&mut self, field: TextField, value: String) -> Result<(), InputError> {
        *self.text_mut(field)? = value;
        Ok(())
    }

    /// Choose an option by label or id.
    ///
    /// # Errors
    ///
    /// [`InputError::FieldNotInForm`] if this form has no such selection.
    pub fn select(&mut self, key: SelectKey, value: &str) -> Result<(), InputError> {
        self.selection_mut(key)?.select(value);
        Ok(())
    }

    /// The interface editor of a device connection form.
    ///
    /// # Errors
    ///
    /// [`InputError::NoInterfaces`] for the other forms.
    pub fn interfaces_mut(&mut self) -> Result<&mut InterfaceEditor, InputError> {
        match self {
            Self::DeviceConnection(f) => Ok(&mut f.interfaces),
            other => Err(InputError::NoInterfaces(other.service())),
        }
    }

    /// Clear every input but keep the loaded option lists.
    pub fn clear_inputs(&mut self) {
        match self {
            Self::DeviceConnection(f) => {
                f.change_number.clear();
                f.device_name.clear();
                f.device_type.clear();
                f.location.clear();
                f.interfaces = InterfaceEditor::new();
            },
            Self::DataCenterDeployment(f) => {
                f.change_number.clear();
                f.dc_name.clear();
                f.location.clear();
                f.design_pattern.clear();
            },
            Self::PopDeployment(f) => {
                f.change_number.clear();
                f.pop_name.clear();
                f.location.clear();
                f.design_pattern.clear();
                f.provider.clear();
            },
        }
    }

    /// Run every check for this form, in display order.
    #[must_use]
    pub fn validate(&self) -> ValidationResult {
        match self {
            Self::DeviceConnection(f) => {
                let mut checks = vec![
                    required(&f.change_number, "Change number"),
                    required(&f.device_name, "Device name"),
                    f.device_type.validate("Device type"),
                    f.location.validate("Location"),
                ];
                checks.extend(f.interfaces.snapshot().validation_errors());
                collect_validation_errors(checks)
            },
            Self::DataCenterDeployment(f) => collect_validation_errors([
                required(&f.change_number, "Change Number"),
                required(&f.dc_name, "Data Center Name"),
                f.location.validate("Location"),
                f.design_pattern.validate("Design Pattern"),
            ]),
            Self::PopDeployment(f) => collect_validation_errors([
                required(&f.change_number, "Change Number"),
                required(&f.pop_name, "PoP Name"),
                f.location.validate("Location"),
                f.design_pattern.validate("Design Pattern"),
                f.provider.validate("Provider"),
            ]),
        }
    }

    /// Validate and, if valid, snapshot the form into a request.
    ///
    /// # Errors
    ///
    /// Returns the non-empty [`ValidationResult`] when any check fails.
    pub fn submit(&self) -> Result<SubmittedRequest, ValidationResult> {
        let result = self.validate();
        if !result.is_valid() {
            return Err(result);
        }
        let text = |s: &String| s.trim().to_string();
        Ok(match self {
            Self::DeviceConnection(f) => SubmittedRequest::DeviceConnection {
                change_number: text(&f.change_number),
                device_name: text(&f.device_name),
                device_type: f.device_type.value().to_string(),
                location: f.location.value().to_string(),
                interfaces: f.interfaces.snapshot(),
            },
            Self::DataCenterDeployment(f) => SubmittedRequest::DataCenterDeployment {
                change_number: text(&f.change_number),
                dc_name: text(&f.dc_name),
                location: f.location.value().to_string(),
                design_pattern: f.design_pattern.value().to_string(),
            },
            Self::PopDeployment(f) => SubmittedRequest::PopDeployment {
                change_number: text(&f.change_number),
                pop_name: text(&f.pop_name),
                location: f.location.value().to_string(),
                design_pattern: f.design_pattern.value().to_string(),
                provider: f.provider.value().to_string(),
            },
        })
    }

    /// Serializable view
    #[must_use]
    pub fn view(&self) -> FormView {
        let mut fields = BTreeMap::new();
        let mut selections = BTreeMap::new();
        let mut interfaces = None;
        match self {
            Self::DeviceConnection(f) => {
                fields.insert(TextField::ChangeNumber.as_str(), f.change_number.clone());
                fields.insert(TextField::DeviceName.as_str(), f.device_name.clone());
                selections.insert(SelectKey::DeviceType.as_str(), f.device_type.clone());
                selections.insert(SelectKey::Location.as_str(), f.location.clone());
                interfaces = Some(f.interfaces.snapshot());
            },
            Self::DataCenterDeployment(f) => {
                fields.insert(TextField::ChangeNumber.as_str(), f.change_number.clone());
                fields.insert(TextField::DcName.as_str(), f.dc_name.clone());
                selections.insert(SelectKey::Location.as_str(), f.location.clone());
                selections.insert(SelectKey::DesignPattern.as_str(), f.design_pattern.clone());
            },
            Self::PopDeployment(f) => {
                fields.insert(TextField::ChangeNumber.as_str(), f.change_number.clone());
                fields.insert(TextField::PopName.as_str(), f.pop_name.clone());
                selections.insert(SelectKey::Location.as_str(), f.location.clone());
                selections.insert(SelectKey::DesignPattern.as_str(), f.design_pattern.clone());
                selections.insert(SelectKey::Provider.as_str(), f.provider.clone());
            },
        }
        FormView {
            service: self.service(),
            fields,
            selections,
            interfaces,
        }
    }
}

/// A validated, immutable snapshot of a form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "service", rename_all = "snake_case")]
pub enum SubmittedRequest {
    /// Device connection
    DeviceConnection {
        /// Change number
        change_number: String,
        /// Device name
        device_name: String,
        /// Device type label
        device_type: String,
        /// Building label
        location: String,
        /// Rows and groups at submit time
        interfaces: InterfacePlan,
    },
    /// Data-center deployment
    #[serde(rename = "datacenter_deployment")]
    DataCenterDeployment {
        /// Change number
        change_number: String,
        /// Data center name
        dc_name: String,
        /// Metro label
        location: String,
        /// Design label
        design_pattern: String,
    },
    /// PoP deployment
    PopDeployment {
        /// Change number
        change_number: String,
        /// PoP name
        pop_name: String,
        /// Metro label
        location: String,
        /// Design label
        design_pattern: String,
        /// Provider label
        provider: String,
    },
}

impl SubmittedRequest {
    /// Service the request is for
    #[must_use]
    pub const fn service(&self) -> Service {
        match self {
            Self::DeviceConnection { .. } => Service::DeviceConnection,
            Self::DataCenterDeployment { .. } => Service::DataCenterDeployment,
            Self::PopDeployment { .. } => Service::PopDeployment,
        }
    }

    /// Change number (partition key)
    #[must_use]
    pub fn change_number(&self) -> &str {
        match self {
            Self::DeviceConnection { change_number, .. }
            | Self::DataCenterDeployment { change_number, .. }
            | Self::PopDeployment { change_number, .. } => change_number,
        }
    }

    /// e.g. `pop_CHG-1`
    #[must_use]
    pub fn request_id(&self) -> String {
        self.service().event_kind().request_id(self.change_number())
    }

    /// Confirmation shown to the user
    #[must_use]
    pub fn success_message(&self) -> String {
        match self {
            Self::DeviceConnection {
                change_number,
                device_name,
                device_type,
                location,
                ..
            } => format!(
                "Success! Connection request for '{device_name}' ({device_type}) at '{location}' has been submitted. Change Number: {change_number}"
            ),
            Self::DataCenterDeployment { change_number, .. } => {
                format!("Change Number: {change_number} submitted for deployment!")
            },
            Self::PopDeployment {
                change_number,
                pop_name,
                location,
                design_pattern,
                provider,
            } => format!(
                "Success! PoP '{pop_name}' will be deployed at {location} with design '{design_pattern}' and provider '{provider}'. Change Number: {change_number}"
            ),
        }
    }

    /// Interface summary line, device connection only
    #[must_use]
    pub fn interface_summary(&self) -> Option<String> {
        match self {
            Self::DeviceConnection { interfaces, .. } => Some(interface_summary(interfaces)),
            _ => None,
        }
    }

    /// Task the accepted request spawns
    #[must_use]
    pub fn task_plan(&self) -> TaskPlan {
        match self {
            Self::DeviceConnection {
                change_number,
                device_name,
                interfaces,
                ..
            } => TaskPlan::device_connection(device_name, change_number, interfaces.rows.len()),
            Self::DataCenterDeployment {
                change_number,
                dc_name,
                design_pattern,
                ..
            } => TaskPlan::datacenter_deployment(dc_name, change_number, design_pattern),
            Self::PopDeployment {
                change_number,
                pop_name,
                provider,
                ..
            } => TaskPlan::pop_deployment(pop_name, change_number, provider),
        }
    }

    /// Encode the request event.
    ///
    /// # Errors
    ///
    /// [`EventError::SerializationError`] if JSON encoding fails.
    pub fn to_event(
        &self,
        now: DateTime<Utc>,
        user_id: Option<String>,
    ) -> Result<SerializedEvent, EventError> {
        let header = EventHeader::new(self.service().event_kind(), self.change_number(), now, user_id);
        match self {
            Self::DeviceConnection {
                device_name,
                device_type,
                location,
                interfaces,
                ..
            } => SerializedEvent::from_event(
                &DeviceConnectionEvent {
                    header,
                    device_name: device_name.clone(),
                    device_type: device_type.clone(),
                    location: location.clone(),
                    interfaces: interfaces.rows.clone(),
                    vpc_groups: interfaces.referenced_groups(),
                },
                None,
            ),
            Self::DataCenterDeployment {
                dc_name,
                location,
                design_pattern,
                ..
            } => SerializedEvent::from_event(
                &DataCenterDeploymentEvent {
                    header,
                    dc_name: dc_name.clone(),
                    location: location.clone(),
                    design_pattern: design_pattern.clone(),
                },
                None,
            ),
            Self::PopDeployment {
                pop_name,
                location,
                design_pattern,
                provider,
                ..
            } => SerializedEvent::from_event(
                &PopDeploymentEvent {
                    header,
                    pop_name: pop_name.clone(),
                    location: location.clone(),
                    design_pattern: design_pattern.clone(),
                    provider: provider.clone(),
                },
                None,
            ),
        }
    }
}
