//! The simulation model: nodes, cells, controllers, service models and the
//! map layout, loadable from a YAML file.
//!
//! Unknown YAML keys are ignored; missing required keys fail the load.

use std::collections::HashMap;
use std::path::Path;

use ransim_common::{Coordinate, Crnti, Ecgi, EnbId, Error, Imsi, PlmnId, Result, RrcStatus};
use serde::{Deserialize, Serialize};

/// A complete simulation model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    /// Operator identifier, constant for the whole model.
    #[serde(rename = "plmnID")]
    pub plmn_id: PlmnId,
    /// Map display layout.
    #[serde(default)]
    pub layout: MapLayout,
    /// Simulated E2 nodes by name.
    #[serde(default)]
    pub nodes: HashMap<String, Node>,
    /// Radio cells by name.
    #[serde(default)]
    pub cells: HashMap<String, Cell>,
    /// E2T controllers by name.
    #[serde(default)]
    pub controllers: HashMap<String, Controller>,
    /// Advertised service models by name.
    #[serde(rename = "servicemodels", default)]
    pub service_models: HashMap<String, ServiceModelInfo>,
    /// Number of UEs to populate.
    #[serde(rename = "ueCount", default)]
    pub ue_count: u32,
}

impl Model {
    /// Loads and validates a model from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Model> {
        let raw = std::fs::read_to_string(path)?;
        let model: Model = serde_yaml::from_str(&raw)?;
        model.validate()?;
        Ok(model)
    }

    /// Validates internal references of the model.
    pub fn validate(&self) -> Result<()> {
        for (name, node) in &self.nodes {
            for ecgi in &node.cells {
                if !self.cells.values().any(|c| c.ecgi == *ecgi) {
                    return Err(Error::Invalid(format!(
                        "node {name} references unknown cell {ecgi}"
                    )));
                }
            }
            for sm in &node.service_models {
                if !self.service_models.contains_key(sm) {
                    return Err(Error::Invalid(format!(
                        "node {name} references unknown service model {sm}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Map display layout. Display-only; retained for the management surface.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MapLayout {
    /// Map center.
    #[serde(default)]
    pub center: Coordinate,
    /// Initial zoom level.
    #[serde(default)]
    pub zoom: f32,
    /// Scale applied to generated locations.
    #[serde(rename = "locationsScale", default)]
    pub locations_scale: f32,
    /// Whether cells fade with distance.
    #[serde(default)]
    pub fade: bool,
    /// Whether UE routes are drawn.
    #[serde(rename = "showRoutes", default)]
    pub show_routes: bool,
    /// Whether TX power is drawn.
    #[serde(rename = "showPower", default)]
    pub show_power: bool,
}

/// Administrative status of a node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// The node's agent is not serving.
    #[default]
    Stopped,
    /// The node's agent is serving.
    Running,
}

/// A simulated E2 node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier.
    #[serde(rename = "enbID")]
    pub enb_id: EnbId,
    /// Names of the controllers this node connects to.
    #[serde(default)]
    pub controllers: Vec<String>,
    /// Names of the service models this node advertises.
    #[serde(rename = "servicemodels", default)]
    pub service_models: Vec<String>,
    /// Attached cells, by global identifier.
    #[serde(default)]
    pub cells: Vec<Ecgi>,
    /// Administrative status.
    #[serde(default)]
    pub status: NodeStatus,
}

/// Sector geometry of a cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sector {
    /// Sector center (tower position).
    pub center: Coordinate,
    /// Azimuth of the sector center line, degrees [0, 360).
    #[serde(default)]
    pub azimuth: i32,
    /// Angular width of the sector, degrees (0, 360].
    #[serde(default = "default_arc")]
    pub arc: i32,
}

fn default_arc() -> i32 {
    360
}

/// A radio cell.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    /// Global cell identifier.
    pub ecgi: Ecgi,
    /// Sector geometry.
    pub sector: Sector,
    /// Display color tag.
    #[serde(default)]
    pub color: String,
    /// Maximum number of admitted UEs.
    #[serde(rename = "maxUEs", default = "default_max_ues")]
    pub max_ues: u32,
    /// Neighbor cells, bounded by the generator's `max_neighbors`.
    #[serde(default)]
    pub neighbors: Vec<Ecgi>,
    /// Transmit power in dB.
    #[serde(rename = "txPowerDB", default = "default_tx_power")]
    pub tx_power_db: f64,
}

fn default_max_ues() -> u32 {
    99_999
}

fn default_tx_power() -> f64 {
    11.0
}

/// An E2T controller endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controller {
    /// Controller identifier.
    pub id: String,
    /// Address.
    pub address: String,
    /// Port.
    pub port: u16,
}

/// Descriptor of an advertised service model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceModelInfo {
    /// Numeric identifier.
    pub id: i32,
    /// Version tag.
    #[serde(default)]
    pub version: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// A cell as seen by a UE: identity plus measured strength.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UeCell {
    /// Global cell identifier.
    pub ecgi: Ecgi,
    /// Measured signal strength in dB.
    pub strength: f64,
}

/// A simulated user equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ue {
    /// Subscriber identifier.
    pub imsi: Imsi,
    /// Type tag, e.g. "phone".
    pub ue_type: String,
    /// Current position.
    pub location: Coordinate,
    /// Compass heading in degrees.
    pub heading: u32,
    /// Cell-scoped radio identifier.
    pub crnti: Crnti,
    /// Serving cell.
    pub cell: UeCell,
    /// Candidate neighbor cells, strongest first. Never contains the
    /// serving cell.
    pub candidate_cells: Vec<UeCell>,
    /// RRC connectivity state.
    pub rrc_state: RrcStatus,
    /// Whether the serving cell admitted this UE.
    pub is_admitted: bool,
}
