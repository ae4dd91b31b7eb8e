//! # cemkit-core: Network model for market and capacity-expansion studies
//!
//! Provides the component records and the network container that the
//! optimiser in `cemkit-algo` reads from and writes results back into.
//!
//! ## Design
//!
//! Networks are **undirected multigraphs**:
//! - **Nodes**: buses, generators, loads and storage units
//! - **Edges**: transmission lines between buses
//!
//! Carriers and global constraints are not attached to a location and live in
//! side tables on the [`Network`]. Every component has a unique name within
//! its kind and a typed ID assigned when it is added.
//!
//! ## Quick Start
//!
//! ```rust
//! use cemkit_core::*;
//!
//! let mut network = Network::new();
//! let sa = network.add_bus(Bus::new("SA").with_v_nom(400.0)).unwrap();
//! network.add_carrier(Carrier::new("coal").with_co2_emissions(0.34)).unwrap();
//!
//! network
//!     .add_generator(
//!         Generator::new("SA coal", sa)
//!             .with_carrier("coal")
//!             .with_p_nom(35_000.0)
//!             .with_efficiency(0.33)
//!             .with_marginal_cost(8.0 / 0.33),
//!     )
//!     .unwrap();
//! network.add_load(Load::new("SA load", sa, 42_000.0)).unwrap();
//!
//! assert_eq!(network.stats().num_generators, 1);
//! ```
//!
//! ## Results
//!
//! Fields suffixed `_opt` and the per-snapshot vectors (`p`, `p_dispatch`,
//! `state_of_charge`, `p0`, `marginal_price`) are empty until an optimisation
//! writes them. [`Network::clear_results`] resets them.

use petgraph::{prelude::*, Undirected};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

pub mod diagnostics;
pub mod error;
pub mod finance;
pub mod snapshots;
pub mod units;

pub use diagnostics::{Category, DiagnosticIssue, Diagnostics, Severity};
pub use error::{CemError, CemResult};
pub use petgraph::graph::{EdgeIndex, NodeIndex};
pub use snapshots::{Profile, SnapshotWeighting, Snapshots};
pub use units::{Hours, Kilovolts, MegawattHours, Megawatts, Ohms};

use chrono::NaiveDateTime;

// Newtype wrappers for IDs for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneratorId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageUnitId(usize);
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(usize);

macro_rules! impl_id {
    ($type:ident) => {
        impl $type {
            #[inline]
            pub fn new(value: usize) -> Self {
                $type(value)
            }
            #[inline]
            pub fn value(&self) -> usize {
                self.0
            }
        }
    };
}

impl_id!(BusId);
impl_id!(GeneratorId);
impl_id!(LoadId);
impl_id!(StorageUnitId);
impl_id!(LineId);

/// Electrical node
#[derive(Debug, Clone)]
pub struct Bus {
    pub id: BusId,
    pub name: String,
    pub x: f64,
    pub y: f64,
    /// Nominal voltage, used to convert line reactance to per-unit
    pub v_nom: Kilovolts,
    pub carrier: String,
    /// Nodal price per snapshot (currency/MWh), set by the optimiser
    pub marginal_price: Vec<f64>,
}

impl Bus {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BusId(0),
            name: name.into(),
            x: 0.0,
            y: 0.0,
            v_nom: Kilovolts(1.0),
            carrier: "AC".to_string(),
            marginal_price: Vec::new(),
        }
    }

    pub fn with_coordinates(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_v_nom(mut self, kv: f64) -> Self {
        self.v_nom = Kilovolts(kv);
        self
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self
    }
}

/// Energy carrier (fuel or technology class)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Carrier {
    pub name: String,
    /// Emission intensity of the primary energy (tCO2/MWh_th)
    pub co2_emissions: f64,
    pub nice_name: String,
    pub color: String,
}

impl Carrier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            co2_emissions: 0.0,
            nice_name: String::new(),
            color: String::new(),
        }
    }

    pub fn with_co2_emissions(mut self, t_per_mwh: f64) -> Self {
        self.co2_emissions = t_per_mwh;
        self
    }

    pub fn with_nice_name(mut self, nice_name: impl Into<String>) -> Self {
        self.nice_name = nice_name.into();
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Display label: the nice name if set, otherwise the identifier.
    pub fn label(&self) -> &str {
        if self.nice_name.is_empty() {
            &self.name
        } else {
            &self.nice_name
        }
    }
}

/// Power plant attached to a bus
#[derive(Debug, Clone)]
pub struct Generator {
    pub id: GeneratorId,
    pub name: String,
    pub bus: BusId,
    pub carrier: String,
    /// Installed capacity; lower bound context only when extendable
    pub p_nom: Megawatts,
    /// Let the optimiser choose the capacity
    pub p_nom_extendable: bool,
    pub p_nom_min: Megawatts,
    pub p_nom_max: Megawatts,
    /// Minimum dispatch per unit of capacity
    pub p_min_pu: Profile,
    /// Availability per unit of capacity (capacity factor for renewables)
    pub p_max_pu: Profile,
    /// Electrical output per unit of primary energy
    pub efficiency: f64,
    /// Currency/MWh of electrical output
    pub marginal_cost: f64,
    /// Currency/MW/year
    pub capital_cost: f64,
    pub p_nom_opt: Megawatts,
    /// Dispatch per snapshot (MW)
    pub p: Vec<f64>,
}

impl Generator {
    pub fn new(name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id: GeneratorId(0),
            name: name.into(),
            bus,
            carrier: String::new(),
            p_nom: Megawatts(0.0),
            p_nom_extendable: false,
            p_nom_min: Megawatts(0.0),
            p_nom_max: Megawatts(f64::INFINITY),
            p_min_pu: Profile::Static(0.0),
            p_max_pu: Profile::Static(1.0),
            efficiency: 1.0,
            marginal_cost: 0.0,
            capital_cost: 0.0,
            p_nom_opt: Megawatts(0.0),
            p: Vec::new(),
        }
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self
    }

    pub fn with_p_nom(mut self, mw: f64) -> Self {
        self.p_nom = Megawatts(mw);
        self
    }

    /// Make the capacity a decision variable
    pub fn extendable(mut self) -> Self {
        self.p_nom_extendable = true;
        self
    }

    pub fn with_p_nom_limits(mut self, min_mw: f64, max_mw: f64) -> Self {
        self.p_nom_min = Megawatts(min_mw);
        self.p_nom_max = Megawatts(max_mw);
        self
    }

    pub fn with_p_min_pu(mut self, profile: impl Into<Profile>) -> Self {
        self.p_min_pu = profile.into();
        self
    }

    pub fn with_p_max_pu(mut self, profile: impl Into<Profile>) -> Self {
        self.p_max_pu = profile.into();
        self
    }

    pub fn with_efficiency(mut self, efficiency: f64) -> Self {
        self.efficiency = efficiency;
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    pub fn with_capital_cost(mut self, cost: f64) -> Self {
        self.capital_cost = cost;
        self
    }
}

/// Electricity demand at a bus
#[derive(Debug, Clone)]
pub struct Load {
    pub id: LoadId,
    pub name: String,
    pub bus: BusId,
    /// Demand (MW), constant or per snapshot
    pub p_set: Profile,
}

impl Load {
    pub fn new(name: impl Into<String>, bus: BusId, p_set: impl Into<Profile>) -> Self {
        Self {
            id: LoadId(0),
            name: name.into(),
            bus,
            p_set: p_set.into(),
        }
    }
}

/// Storage with separate charge and discharge efficiencies
#[derive(Debug, Clone)]
pub struct StorageUnit {
    pub id: StorageUnitId,
    pub name: String,
    pub bus: BusId,
    pub carrier: String,
    /// Power rating for both charging and discharging
    pub p_nom: Megawatts,
    pub p_nom_extendable: bool,
    pub p_nom_min: Megawatts,
    pub p_nom_max: Megawatts,
    /// Energy capacity per MW of power rating
    pub max_hours: Hours,
    pub efficiency_store: f64,
    pub efficiency_dispatch: f64,
    /// Fraction of the state of charge lost per hour
    pub standing_loss: f64,
    /// State of charge wraps from the last snapshot to the first
    pub cyclic_state_of_charge: bool,
    /// Used only when not cyclic
    pub state_of_charge_initial: MegawattHours,
    pub marginal_cost: f64,
    pub capital_cost: f64,
    pub p_nom_opt: Megawatts,
    pub p_dispatch: Vec<f64>,
    pub p_store: Vec<f64>,
    pub state_of_charge: Vec<f64>,
}

impl StorageUnit {
    pub fn new(name: impl Into<String>, bus: BusId) -> Self {
        Self {
            id: StorageUnitId(0),
            name: name.into(),
            bus,
            carrier: String::new(),
            p_nom: Megawatts(0.0),
            p_nom_extendable: false,
            p_nom_min: Megawatts(0.0),
            p_nom_max: Megawatts(f64::INFINITY),
            max_hours: Hours(1.0),
            efficiency_store: 1.0,
            efficiency_dispatch: 1.0,
            standing_loss: 0.0,
            cyclic_state_of_charge: false,
            state_of_charge_initial: MegawattHours(0.0),
            marginal_cost: 0.0,
            capital_cost: 0.0,
            p_nom_opt: Megawatts(0.0),
            p_dispatch: Vec::new(),
            p_store: Vec::new(),
            state_of_charge: Vec::new(),
        }
    }

    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = carrier.into();
        self
    }

    pub fn with_p_nom(mut self, mw: f64) -> Self {
        self.p_nom = Megawatts(mw);
        self
    }

    pub fn extendable(mut self) -> Self {
        self.p_nom_extendable = true;
        self
    }

    pub fn with_max_hours(mut self, hours: f64) -> Self {
        self.max_hours = Hours(hours);
        self
    }

    pub fn with_efficiencies(mut self, store: f64, dispatch: f64) -> Self {
        self.efficiency_store = store;
        self.efficiency_dispatch = dispatch;
        self
    }

    pub fn with_standing_loss(mut self, per_hour: f64) -> Self {
        self.standing_loss = per_hour;
        self
    }

    pub fn cyclic(mut self) -> Self {
        self.cyclic_state_of_charge = true;
        self
    }

    pub fn with_state_of_charge_initial(mut self, mwh: f64) -> Self {
        self.state_of_charge_initial = MegawattHours(mwh);
        self
    }

    pub fn with_marginal_cost(mut self, cost: f64) -> Self {
        self.marginal_cost = cost;
        self
    }

    pub fn with_capital_cost(mut self, cost: f64) -> Self {
        self.capital_cost = cost;
        self
    }

    /// Energy capacity implied by the optimised power rating
    pub fn energy_capacity_opt(&self) -> MegawattHours {
        self.p_nom_opt * self.max_hours
    }
}

/// Transmission line between two buses
#[derive(Debug, Clone)]
pub struct Line {
    pub id: LineId,
    pub name: String,
    pub bus0: BusId,
    pub bus1: BusId,
    /// Series reactance; zero makes the line a pure transport link
    pub x: Ohms,
    pub r: Ohms,
    /// Thermal rating
    pub s_nom: Megawatts,
    pub s_nom_extendable: bool,
    pub s_nom_min: Megawatts,
    pub s_nom_max: Megawatts,
    pub s_max_pu: f64,
    pub capital_cost: f64,
    pub s_nom_opt: Megawatts,
    /// Flow from bus0 to bus1 per snapshot (MW)
    pub p0: Vec<f64>,
}

impl Line {
    pub fn new(name: impl Into<String>, bus0: BusId, bus1: BusId) -> Self {
        Self {
            id: LineId(0),
            name: name.into(),
            bus0,
            bus1,
            x: Ohms(0.0),
            r: Ohms(0.0),
            s_nom: Megawatts(0.0),
            s_nom_extendable: false,
            s_nom_min: Megawatts(0.0),
            s_nom_max: Megawatts(f64::INFINITY),
            s_max_pu: 1.0,
            capital_cost: 0.0,
            s_nom_opt: Megawatts(0.0),
            p0: Vec::new(),
        }
    }

    pub fn with_impedance(mut self, r_ohm: f64, x_ohm: f64) -> Self {
        self.r = Ohms(r_ohm);
        self.x = Ohms(x_ohm);
        self
    }

    pub fn with_s_nom(mut self, mw: f64) -> Self {
        self.s_nom = Megawatts(mw);
        self
    }

    pub fn extendable(mut self) -> Self {
        self.s_nom_extendable = true;
        self
    }

    pub fn with_capital_cost(mut self, cost: f64) -> Self {
        self.capital_cost = cost;
        self
    }
}

/// Direction of a global constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sense {
    #[serde(rename = "<=")]
    LessEqual,
    #[serde(rename = ">=")]
    GreaterEqual,
    #[serde(rename = "==")]
    Equal,
}

impl FromStr for Sense {
    type Err = CemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<=" => Ok(Sense::LessEqual),
            ">=" => Ok(Sense::GreaterEqual),
            "==" | "=" => Ok(Sense::Equal),
            other => Err(CemError::Parse(format!(
                "unknown constraint sense '{}'; use <=, >= or ==",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Sense {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Sense::LessEqual => "<=",
            Sense::GreaterEqual => ">=",
            Sense::Equal => "==",
        };
        f.write_str(s)
    }
}

/// Carrier attribute a global constraint can aggregate
pub const CO2_EMISSIONS: &str = "co2_emissions";

/// System-wide constraint over an aggregated carrier attribute, e.g. total
/// CO2 emissions (t) <= constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalConstraint {
    pub name: String,
    pub carrier_attribute: String,
    pub sense: Sense,
    pub constant: f64,
    /// Shadow price set by the optimiser (currency per unit of attribute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mu: Option<f64>,
}

impl GlobalConstraint {
    pub fn co2_limit(name: impl Into<String>, sense: Sense, tonnes: f64) -> Self {
        Self {
            name: name.into(),
            carrier_attribute: CO2_EMISSIONS.to_string(),
            sense,
            constant: tonnes,
            mu: None,
        }
    }
}

// Enum to represent different types of nodes in the graph
#[derive(Debug, Clone)]
pub enum Node {
    Bus(Bus),
    Generator(Generator),
    Load(Load),
    StorageUnit(StorageUnit),
}

// Enum to represent different types of edges in the graph
#[derive(Debug, Clone)]
pub enum Edge {
    Line(Line),
}

/// The network container. Owns every component and the time axis.
#[derive(Debug, Default)]
pub struct Network {
    pub graph: Graph<Node, Edge, Undirected>,
    pub carriers: Vec<Carrier>,
    pub global_constraints: Vec<GlobalConstraint>,
    snapshots: Snapshots,
    /// Objective value of the last successful optimisation
    pub objective: Option<f64>,
    bus_nodes: HashMap<BusId, NodeIndex>,
    names: HashSet<(&'static str, String)>,
}

impl Network {
    pub fn new() -> Self {
        Self {
            graph: Graph::new_undirected(),
            ..Self::default()
        }
    }

    // =========================================================================
    // Construction
    // =========================================================================

    fn claim_name(&self, kind: &'static str, name: &str) -> CemResult<()> {
        if name.is_empty() {
            return Err(CemError::Network(format!("{} name must not be empty", kind)));
        }
        if self.names.contains(&(kind, name.to_string())) {
            return Err(CemError::Network(format!(
                "{} '{}' already exists",
                kind, name
            )));
        }
        Ok(())
    }

    fn check_bus(&self, bus: BusId, owner: &str) -> CemResult<NodeIndex> {
        self.bus_nodes.get(&bus).copied().ok_or_else(|| {
            CemError::Network(format!("{} references unknown bus {:?}", owner, bus))
        })
    }

    fn count_kind(&self, f: impl Fn(&Node) -> bool) -> usize {
        self.graph.node_weights().filter(|n| f(n)).count()
    }

    pub fn add_bus(&mut self, mut bus: Bus) -> CemResult<BusId> {
        self.claim_name("Bus", &bus.name)?;
        let id = BusId(self.bus_nodes.len());
        bus.id = id;
        let name = bus.name.clone();
        let idx = self.graph.add_node(Node::Bus(bus));
        self.bus_nodes.insert(id, idx);
        self.names.insert(("Bus", name));
        Ok(id)
    }

    pub fn add_carrier(&mut self, carrier: Carrier) -> CemResult<()> {
        if self.carrier(&carrier.name).is_some() {
            return Err(CemError::Network(format!(
                "Carrier '{}' already exists",
                carrier.name
            )));
        }
        self.carriers.push(carrier);
        Ok(())
    }

    pub fn add_generator(&mut self, mut gen: Generator) -> CemResult<GeneratorId> {
        self.claim_name("Generator", &gen.name)?;
        self.check_bus(gen.bus, &format!("Generator '{}'", gen.name))?;
        let id = GeneratorId(self.count_kind(|n| matches!(n, Node::Generator(_))));
        gen.id = id;
        self.names.insert(("Generator", gen.name.clone()));
        self.graph.add_node(Node::Generator(gen));
        Ok(id)
    }

    pub fn add_load(&mut self, mut load: Load) -> CemResult<LoadId> {
        self.claim_name("Load", &load.name)?;
        self.check_bus(load.bus, &format!("Load '{}'", load.name))?;
        let id = LoadId(self.count_kind(|n| matches!(n, Node::Load(_))));
        load.id = id;
        self.names.insert(("Load", load.name.clone()));
        self.graph.add_node(Node::Load(load));
        Ok(id)
    }

    pub fn add_storage_unit(&mut self, mut su: StorageUnit) -> CemResult<StorageUnitId> {
        self.claim_name("StorageUnit", &su.name)?;
        self.check_bus(su.bus, &format!("StorageUnit '{}'", su.name))?;
        let id = StorageUnitId(self.count_kind(|n| matches!(n, Node::StorageUnit(_))));
        su.id = id;
        self.names.insert(("StorageUnit", su.name.clone()));
        self.graph.add_node(Node::StorageUnit(su));
        Ok(id)
    }

    pub fn add_line(&mut self, mut line: Line) -> CemResult<LineId> {
        self.claim_name("Line", &line.name)?;
        let owner = format!("Line '{}'", line.name);
        let a = self.check_bus(line.bus0, &owner)?;
        let b = self.check_bus(line.bus1, &owner)?;
        if a == b {
            return Err(CemError::Network(format!("{} connects a bus to itself", owner)));
        }
        let id = LineId(self.graph.edge_count());
        line.id = id;
        self.names.insert(("Line", line.name.clone()));
        self.graph.add_edge(a, b, Edge::Line(line));
        Ok(id)
    }

    pub fn add_global_constraint(&mut self, constraint: GlobalConstraint) -> CemResult<()> {
        if self
            .global_constraints
            .iter()
            .any(|c| c.name == constraint.name)
        {
            return Err(CemError::Network(format!(
                "GlobalConstraint '{}' already exists",
                constraint.name
            )));
        }
        if constraint.carrier_attribute != CO2_EMISSIONS {
            return Err(CemError::Network(format!(
                "GlobalConstraint '{}' aggregates unsupported attribute '{}'",
                constraint.name, constraint.carrier_attribute
            )));
        }
        self.global_constraints.push(constraint);
        Ok(())
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn snapshots(&self) -> &Snapshots {
        &self.snapshots
    }

    /// Replace the time axis. Weightings reset to one hour and previous
    /// results are cleared.
    pub fn set_snapshots(&mut self, index: Vec<NaiveDateTime>) -> CemResult<()> {
        self.snapshots = Snapshots::new(index)?;
        self.clear_results();
        Ok(())
    }

    /// Set objective, generator and store weightings of every snapshot.
    pub fn set_snapshot_weightings(&mut self, hours: f64) {
        self.snapshots.set_uniform_weighting(hours);
    }

    pub fn snapshots_mut(&mut self) -> &mut Snapshots {
        &mut self.snapshots
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    pub fn bus_id(&self, name: &str) -> CemResult<BusId> {
        self.buses()
            .find(|b| b.name == name)
            .map(|b| b.id)
            .ok_or_else(|| CemError::Network(format!("unknown bus '{}'", name)))
    }

    pub fn bus(&self, id: BusId) -> Option<&Bus> {
        self.bus_nodes.get(&id).and_then(|idx| match &self.graph[*idx] {
            Node::Bus(b) => Some(b),
            _ => None,
        })
    }

    pub fn carrier(&self, name: &str) -> Option<&Carrier> {
        self.carriers.iter().find(|c| c.name == name)
    }

    /// CO2 intensity of a carrier; unknown or empty carriers emit nothing.
    pub fn co2_intensity(&self, carrier: &str) -> f64 {
        self.carrier(carrier).map(|c| c.co2_emissions).unwrap_or(0.0)
    }

    pub fn buses(&self) -> impl Iterator<Item = &Bus> {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Bus(b) => Some(b),
            _ => None,
        })
    }

    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Generator(g) => Some(g),
            _ => None,
        })
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> {
        self.graph.node_weights().filter_map(|n| match n {
            Node::Load(l) => Some(l),
            _ => None,
        })
    }

    pub fn storage_units(&self) -> impl Iterator<Item = &StorageUnit> {
        self.graph.node_weights().filter_map(|n| match n {
            Node::StorageUnit(s) => Some(s),
            _ => None,
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.graph.edge_weights().map(|e| match e {
            Edge::Line(l) => l,
        })
    }

    pub fn generator(&self, name: &str) -> Option<&Generator> {
        self.generators().find(|g| g.name == name)
    }

    pub fn storage_unit(&self, name: &str) -> Option<&StorageUnit> {
        self.storage_units().find(|s| s.name == name)
    }

    pub fn line(&self, name: &str) -> Option<&Line> {
        self.lines().find(|l| l.name == name)
    }

    pub fn global_constraint(&self, name: &str) -> Option<&GlobalConstraint> {
        self.global_constraints.iter().find(|c| c.name == name)
    }

    /// Reset every optimisation result to its unsolved state.
    pub fn clear_results(&mut self) {
        self.objective = None;
        for node in self.graph.node_weights_mut() {
            match node {
                Node::Bus(b) => b.marginal_price.clear(),
                Node::Generator(g) => {
                    g.p_nom_opt = Megawatts(0.0);
                    g.p.clear();
                }
                Node::StorageUnit(s) => {
                    s.p_nom_opt = Megawatts(0.0);
                    s.p_dispatch.clear();
                    s.p_store.clear();
                    s.state_of_charge.clear();
                }
                Node::Load(_) => {}
            }
        }
        for edge in self.graph.edge_weights_mut() {
            let Edge::Line(l) = edge;
            l.s_nom_opt = Megawatts(0.0);
            l.p0.clear();
        }
        for c in &mut self.global_constraints {
            c.mu = None;
        }
    }

    // =========================================================================
    // Statistics & validation
    // =========================================================================

    pub fn stats(&self) -> NetworkStats {
        let mut stats = NetworkStats::default();

        for node in self.graph.node_weights() {
            match node {
                Node::Bus(_) => stats.num_buses += 1,
                Node::Generator(g) => {
                    stats.num_generators += 1;
                    if g.p_nom_extendable {
                        stats.num_extendable += 1;
                    } else {
                        stats.fixed_capacity_mw += g.p_nom.value();
                    }
                }
                Node::Load(l) => {
                    stats.num_loads += 1;
                    stats.peak_load_mw += l.p_set.max();
                }
                Node::StorageUnit(s) => {
                    stats.num_storage_units += 1;
                    if s.p_nom_extendable {
                        stats.num_extendable += 1;
                    }
                }
            }
        }

        stats.num_lines = self.graph.edge_count();
        stats.num_carriers = self.carriers.len();
        stats.num_snapshots = self.snapshots.len();
        stats
    }

    /// Check the network for data that would make the optimisation fail or
    /// silently misbehave.
    pub fn validate_into(&self, diag: &mut Diagnostics) {
        let stats = self.stats();
        let n = self.snapshots.len();

        if stats.num_buses == 0 {
            diag.error(Category::Structure, "Network has no buses");
            return;
        }
        if stats.num_loads == 0 {
            diag.warning(Category::Structure, "Network has no loads");
        }
        if stats.num_generators == 0 && stats.num_storage_units == 0 {
            diag.error(Category::Structure, "Network has no generators");
        }
        if stats.num_lines == 0 && stats.num_buses > 1 {
            diag.warning(
                Category::Structure,
                "Network has multiple buses but no lines; each bus is balanced on its own",
            );
        }

        for gen in self.generators() {
            let component = format!("Generator {}", gen.name);
            for (attr, profile) in [("p_max_pu", &gen.p_max_pu), ("p_min_pu", &gen.p_min_pu)] {
                if let Err(msg) = profile.check_len(n) {
                    diag.error(Category::Profile, format!("{}: {}", attr, msg))
                        .on(&component);
                }
            }
            if !(gen.efficiency > 0.0) {
                diag.error(
                    Category::Parameter,
                    format!("efficiency must be positive, got {}", gen.efficiency),
                )
                .on(&component);
            }
            if gen.p_nom_extendable && gen.p_nom_min > gen.p_nom_max {
                diag.error(Category::Parameter, "p_nom_min exceeds p_nom_max")
                    .on(&component);
            }
            if !gen.carrier.is_empty() && self.carrier(&gen.carrier).is_none() {
                diag.warning(
                    Category::Reference,
                    format!("carrier '{}' is not defined; assuming zero emissions", gen.carrier),
                )
                .on(&component);
            }
        }

        for load in self.loads() {
            if let Err(msg) = load.p_set.check_len(n) {
                diag.error(Category::Profile, format!("p_set: {}", msg))
                    .on(format!("Load {}", load.name));
            }
        }

        for su in self.storage_units() {
            let component = format!("StorageUnit {}", su.name);
            if !(su.efficiency_store > 0.0) || !(su.efficiency_dispatch > 0.0) {
                diag.error(
                    Category::Parameter,
                    "store and dispatch efficiencies must be positive",
                )
                .on(&component);
            }
            if su.max_hours.value() < 0.0 {
                diag.error(Category::Parameter, "max_hours must not be negative")
                    .on(&component);
            }
            if su.p_nom_extendable && su.p_nom_min > su.p_nom_max {
                diag.error(Category::Parameter, "p_nom_min exceeds p_nom_max")
                    .on(&component);
            }
        }

        for line in self.lines() {
            if line.s_nom_extendable && line.s_nom_min > line.s_nom_max {
                diag.error(Category::Parameter, "s_nom_min exceeds s_nom_max")
                    .on(format!("Line {}", line.name));
            }
        }
    }

    /// Validate and turn any error into a [`CemError::Validation`].
    pub fn validate(&self) -> CemResult<Diagnostics> {
        let mut diag = Diagnostics::new();
        self.validate_into(&mut diag);
        if diag.has_errors() {
            let messages: Vec<String> = diag.errors().map(|i| i.to_string()).collect();
            return Err(CemError::Validation(messages.join("; ")));
        }
        Ok(diag)
    }
}

/// Statistics about a network's size
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkStats {
    pub num_buses: usize,
    pub num_carriers: usize,
    pub num_generators: usize,
    pub num_loads: usize,
    pub num_storage_units: usize,
    pub num_lines: usize,
    pub num_extendable: usize,
    pub num_snapshots: usize,
    pub fixed_capacity_mw: f64,
    pub peak_load_mw: f64,
}

impl std::fmt::Display for NetworkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} buses, {} lines, {} generators, {} storage units, {} loads ({:.0} MW peak), {} snapshots",
            self.num_buses,
            self.num_lines,
            self.num_generators,
            self.num_storage_units,
            self.num_loads,
            self.peak_load_mw,
            self.num_snapshots
        )
    }
}
