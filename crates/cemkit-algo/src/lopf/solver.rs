//! LP assembly, solve and result write-back.

use super::{OptimizeConfig, OptimizeOutcome};
use cemkit_core::{
    BusId, CemError, CemResult, Edge, GeneratorId, LineId, Megawatts, Network, Node, Sense,
    SnapshotWeighting, StorageUnitId, CO2_EMISSIONS,
};
use good_lp::solvers::clarabel::clarabel;
use good_lp::solvers::{DualValues, SolutionWithDual};
use good_lp::{
    constraint, variable, variables, Constraint, Expression, ResolutionError, Solution,
    SolverModel, Variable,
};
use petgraph::unionfind::UnionFind;
use std::collections::HashMap;
use tracing::{debug, info, warn};
use web_time::Instant;

/// Reactances below this (per-unit) are treated as transport links
const MIN_X_PU: f64 = 1e-12;

/// Capacity of an asset: fixed by input data or chosen by the optimiser
#[derive(Debug, Clone, Copy)]
enum Capacity {
    Fixed(f64),
    Extendable(Variable),
}

impl Capacity {
    fn value(&self, solution: &impl Solution) -> f64 {
        match self {
            Capacity::Fixed(v) => *v,
            Capacity::Extendable(var) => solution.value(*var),
        }
    }
}

/// Create the capacity term, charging the capital cost for extendable assets.
fn capacity_term(
    vars: &mut good_lp::ProblemVariables,
    objective: &mut Expression,
    extendable: bool,
    nominal: Megawatts,
    min: Megawatts,
    max: Megawatts,
    capital_cost: f64,
) -> Capacity {
    if !extendable {
        return Capacity::Fixed(nominal.value());
    }
    let mut def = variable().min(min.value());
    if max.value().is_finite() {
        def = def.max(max.value());
    }
    let var = vars.add(def);
    *objective += capital_cost * var;
    Capacity::Extendable(var)
}

struct GeneratorResult {
    id: GeneratorId,
    p_nom_opt: f64,
    p: Vec<f64>,
}

struct StorageResult {
    id: StorageUnitId,
    p_nom_opt: f64,
    p_dispatch: Vec<f64>,
    p_store: Vec<f64>,
    state_of_charge: Vec<f64>,
}

struct LineResult {
    id: LineId,
    s_nom_opt: f64,
    p0: Vec<f64>,
}

struct ModelResults {
    objective: f64,
    generators: Vec<GeneratorResult>,
    storage_units: Vec<StorageResult>,
    lines: Vec<LineResult>,
    prices: HashMap<BusId, Vec<f64>>,
    /// (index into network.global_constraints, shadow price)
    shadow_prices: Vec<(usize, f64)>,
    num_variables: usize,
    num_constraints: usize,
}

/// Optimise dispatch and extendable capacities of `network`.
///
/// Results (`p_nom_opt`, dispatch series, flows, prices, `mu`) are written
/// into the network and [`Network::objective`] is set. On error the network
/// keeps its previous results.
///
/// # Example
///
/// ```no_run
/// use cemkit_algo::{optimize, OptimizeConfig};
/// use cemkit_core::{Bus, Generator, Load, Network};
///
/// let mut network = Network::new();
/// let bus = network.add_bus(Bus::new("electricity"))?;
/// network.add_generator(Generator::new("gas", bus).with_p_nom(100.0).with_marginal_cost(50.0))?;
/// network.add_load(Load::new("demand", bus, 80.0))?;
///
/// let outcome = optimize(&mut network, &OptimizeConfig::default())?;
/// println!("{}", outcome.summary());
/// # Ok::<(), cemkit_core::CemError>(())
/// ```
pub fn optimize(network: &mut Network, config: &OptimizeConfig) -> CemResult<OptimizeOutcome> {
    let start = Instant::now();

    let diagnostics = network.validate()?;
    for issue in diagnostics.warnings() {
        warn!("{}", issue);
    }
    info!("Optimising network: {}", network.stats());

    let results = solve_model(network, config)?;

    let outcome = OptimizeOutcome {
        objective: results.objective,
        num_variables: results.num_variables,
        num_constraints: results.num_constraints,
        num_snapshots: network.snapshots().len(),
        solve_time: start.elapsed(),
    };
    apply_results(network, results);

    info!("Optimisation finished: {}", outcome.summary());
    Ok(outcome)
}

fn solve_model(network: &Network, config: &OptimizeConfig) -> CemResult<ModelResults> {
    let weights: Vec<SnapshotWeighting> = network.snapshots().weightings().to_vec();
    let n_t = weights.len();

    let buses: Vec<_> = network.buses().collect();
    let bus_pos: HashMap<BusId, usize> = buses.iter().enumerate().map(|(i, b)| (b.id, i)).collect();
    let position = |id: BusId| -> CemResult<usize> {
        bus_pos
            .get(&id)
            .copied()
            .ok_or_else(|| CemError::Network(format!("unknown bus {:?}", id)))
    };
    let n_bus = buses.len();

    let generators: Vec<_> = network.generators().collect();
    let storage_units: Vec<_> = network.storage_units().collect();
    let lines: Vec<_> = network.lines().collect();

    let mut vars = variables!();
    let mut num_variables = 0usize;
    let mut objective = Expression::from(0.0);
    let mut constraints: Vec<Constraint> = Vec::new();

    // Net injection expression per bus and snapshot
    let mut injection: Vec<Vec<Expression>> = vec![vec![Expression::from(0.0); n_t]; n_bus];
    let mut load = vec![vec![0.0; n_t]; n_bus];
    for l in network.loads() {
        let b = position(l.bus)?;
        for (t, demand) in load[b].iter_mut().enumerate() {
            *demand += l.p_set.at(t);
        }
    }

    // === Generators ===
    let mut gen_cap = Vec::with_capacity(generators.len());
    let mut gen_p: Vec<Vec<Variable>> = Vec::with_capacity(generators.len());
    for gen in &generators {
        let b = position(gen.bus)?;
        let cap = capacity_term(
            &mut vars,
            &mut objective,
            gen.p_nom_extendable,
            gen.p_nom,
            gen.p_nom_min,
            gen.p_nom_max,
            gen.capital_cost,
        );
        let mut series = Vec::with_capacity(n_t);
        for t in 0..n_t {
            let lo = gen.p_min_pu.at(t);
            let hi = gen.p_max_pu.at(t);
            let p = match cap {
                Capacity::Fixed(p_nom) => vars.add(variable().min(lo * p_nom).max(hi * p_nom)),
                Capacity::Extendable(p_nom) => {
                    let p = vars.add(variable());
                    constraints.push(constraint!(p - hi * p_nom <= 0.0));
                    constraints.push(constraint!(p - lo * p_nom >= 0.0));
                    p
                }
            };
            objective += (weights[t].objective.value() * gen.marginal_cost) * p;
            injection[b][t] += p;
            series.push(p);
        }
        num_variables += n_t + usize::from(matches!(cap, Capacity::Extendable(_)));
        gen_cap.push(cap);
        gen_p.push(series);
    }

    // === Storage units ===
    let mut su_cap = Vec::with_capacity(storage_units.len());
    let mut su_vars: Vec<(Vec<Variable>, Vec<Variable>, Vec<Variable>)> =
        Vec::with_capacity(storage_units.len());
    for su in &storage_units {
        let b = position(su.bus)?;
        let cap = capacity_term(
            &mut vars,
            &mut objective,
            su.p_nom_extendable,
            su.p_nom,
            su.p_nom_min,
            su.p_nom_max,
            su.capital_cost,
        );
        let max_hours = su.max_hours.value();
        let mut dispatch = Vec::with_capacity(n_t);
        let mut store = Vec::with_capacity(n_t);
        let mut soc = Vec::with_capacity(n_t);
        for t in 0..n_t {
            let (d, c, e) = match cap {
                Capacity::Fixed(p_nom) => (
                    vars.add(variable().min(0.0).max(p_nom)),
                    vars.add(variable().min(0.0).max(p_nom)),
                    vars.add(variable().min(0.0).max(max_hours * p_nom)),
                ),
                Capacity::Extendable(p_nom) => {
                    let d = vars.add(variable().min(0.0));
                    let c = vars.add(variable().min(0.0));
                    let e = vars.add(variable().min(0.0));
                    constraints.push(constraint!(d - p_nom <= 0.0));
                    constraints.push(constraint!(c - p_nom <= 0.0));
                    constraints.push(constraint!(e - max_hours * p_nom <= 0.0));
                    (d, c, e)
                }
            };
            objective += (weights[t].objective.value() * su.marginal_cost) * d;
            injection[b][t] += d;
            injection[b][t] -= c;
            dispatch.push(d);
            store.push(c);
            soc.push(e);
        }

        for t in 0..n_t {
            let w = weights[t].stores.value();
            let retain = (1.0 - su.standing_loss).powf(w);
            let inflow: Expression = (w * su.efficiency_store) * store[t]
                - (w / su.efficiency_dispatch) * dispatch[t];
            let balance: Constraint = if t > 0 {
                let lhs: Expression = soc[t] - retain * soc[t - 1] - inflow;
                constraint!(lhs == 0.0)
            } else if su.cyclic_state_of_charge {
                let lhs: Expression = soc[0] - retain * soc[n_t - 1] - inflow;
                constraint!(lhs == 0.0)
            } else {
                let lhs: Expression = soc[0] - inflow;
                let initial = retain * su.state_of_charge_initial.value();
                constraint!(lhs == initial)
            };
            constraints.push(balance);
        }

        num_variables += 3 * n_t + usize::from(matches!(cap, Capacity::Extendable(_)));
        su_cap.push(cap);
        su_vars.push((dispatch, store, soc));
    }

    // === Lines ===
    let mut angle_links = UnionFind::<usize>::new(n_bus);
    let mut with_angle = vec![false; n_bus];
    let mut line_ends = Vec::with_capacity(lines.len());
    for line in &lines {
        let i = position(line.bus0)?;
        let j = position(line.bus1)?;
        let v_nom = buses[i].v_nom;
        let x_pu = line.x.to_per_unit(v_nom);
        if x_pu.abs() > MIN_X_PU {
            angle_links.union(i, j);
            with_angle[i] = true;
            with_angle[j] = true;
        }
        line_ends.push((i, j, x_pu));
    }

    // Reference bus of each sub-network keeps θ = 0
    let mut theta: Vec<Option<Vec<Variable>>> = vec![None; n_bus];
    for (k, slot) in theta.iter_mut().enumerate() {
        if with_angle[k] && angle_links.find(k) != k {
            *slot = Some((0..n_t).map(|_| vars.add(variable())).collect());
            num_variables += n_t;
        }
    }

    let mut line_cap = Vec::with_capacity(lines.len());
    let mut line_flow: Vec<Vec<Variable>> = Vec::with_capacity(lines.len());
    for (line, &(i, j, x_pu)) in lines.iter().zip(&line_ends) {
        let cap = capacity_term(
            &mut vars,
            &mut objective,
            line.s_nom_extendable,
            line.s_nom,
            line.s_nom_min,
            line.s_nom_max,
            line.capital_cost,
        );
        let rating = line.s_max_pu;
        let mut flows = Vec::with_capacity(n_t);
        for t in 0..n_t {
            let f = match cap {
                Capacity::Fixed(s_nom) => {
                    vars.add(variable().min(-rating * s_nom).max(rating * s_nom))
                }
                Capacity::Extendable(s_nom) => {
                    let f = vars.add(variable());
                    constraints.push(constraint!(f - rating * s_nom <= 0.0));
                    constraints.push(constraint!(f + rating * s_nom >= 0.0));
                    f
                }
            };

            if x_pu.abs() > MIN_X_PU {
                let mut angle_diff = Expression::from(0.0);
                if let Some(theta_i) = &theta[i] {
                    angle_diff += theta_i[t];
                }
                if let Some(theta_j) = &theta[j] {
                    angle_diff -= theta_j[t];
                }
                let lhs: Expression = f - (1.0 / x_pu) * angle_diff;
                constraints.push(constraint!(lhs == 0.0));
            }

            injection[i][t] -= f;
            injection[j][t] += f;
            flows.push(f);
        }
        num_variables += n_t + usize::from(matches!(cap, Capacity::Extendable(_)));
        line_cap.push(cap);
        line_flow.push(flows);
    }

    // === Global constraints ===
    let mut global_rows: Vec<(usize, Sense, Constraint)> = Vec::new();
    let mut trivial_shadow_prices = Vec::new();
    for (k, gc) in network.global_constraints.iter().enumerate() {
        if gc.carrier_attribute != CO2_EMISSIONS {
            continue;
        }
        let mut emissions = Expression::from(0.0);
        let mut has_terms = false;
        for (gen, series) in generators.iter().zip(&gen_p) {
            let intensity = network.co2_intensity(&gen.carrier);
            if intensity == 0.0 {
                continue;
            }
            has_terms = true;
            let per_mwh = intensity / gen.efficiency;
            for (t, p) in series.iter().enumerate() {
                emissions += (weights[t].generators.value() * per_mwh) * *p;
            }
        }

        let limit = gc.constant;
        if !has_terms {
            let satisfied = match gc.sense {
                Sense::LessEqual => 0.0 <= limit,
                Sense::GreaterEqual => 0.0 >= limit,
                Sense::Equal => limit == 0.0,
            };
            if !satisfied {
                return Err(CemError::Solver(format!(
                    "global constraint '{}' cannot hold: no emitting generators but {} {}",
                    gc.name, gc.sense, limit
                )));
            }
            trivial_shadow_prices.push((k, 0.0));
            continue;
        }

        let row = match gc.sense {
            Sense::LessEqual => constraint!(emissions <= limit),
            Sense::GreaterEqual => constraint!(emissions >= limit),
            Sense::Equal => constraint!(emissions == limit),
        };
        global_rows.push((k, gc.sense, row));
    }

    // === Assemble ===
    let mut model = vars.minimise(objective).using(clarabel);
    let num_constraints = constraints.len() + n_bus * n_t + global_rows.len();
    debug!(
        "LP has {} variables and {} constraints",
        num_variables, num_constraints
    );

    for c in constraints {
        model.add_constraint(c);
    }

    let mut balance_refs = Vec::with_capacity(n_bus);
    for (b, per_bus) in injection.into_iter().enumerate() {
        let mut refs = Vec::with_capacity(n_t);
        for (t, net) in per_bus.into_iter().enumerate() {
            let demand = load[b][t];
            refs.push(model.add_constraint(constraint!(net == demand)));
        }
        balance_refs.push(refs);
    }

    let mut global_refs = Vec::with_capacity(global_rows.len());
    for (k, sense, row) in global_rows {
        global_refs.push((k, sense, model.add_constraint(row)));
    }

    // === Solve ===
    let mut solution = model.solve().map_err(|e| match e {
        ResolutionError::Infeasible => CemError::Solver("problem is infeasible".to_string()),
        ResolutionError::Unbounded => CemError::Solver("problem is unbounded".to_string()),
        other => CemError::Solver(format!("{}", other)),
    })?;

    // === Extract primal results ===
    let mut objective_value = 0.0;

    let mut gen_results = Vec::with_capacity(generators.len());
    for ((gen, cap), series) in generators.iter().zip(&gen_cap).zip(&gen_p) {
        let p: Vec<f64> = series.iter().map(|v| solution.value(*v)).collect();
        let p_nom_opt = cap.value(&solution);
        if gen.p_nom_extendable {
            objective_value += gen.capital_cost * p_nom_opt;
        }
        objective_value += p
            .iter()
            .zip(&weights)
            .map(|(p, w)| w.objective.value() * gen.marginal_cost * p)
            .sum::<f64>();
        gen_results.push(GeneratorResult {
            id: gen.id,
            p_nom_opt,
            p,
        });
    }

    let mut su_results = Vec::with_capacity(storage_units.len());
    for ((su, cap), (dispatch, store, soc)) in storage_units.iter().zip(&su_cap).zip(&su_vars) {
        let values = |series: &[Variable]| -> Vec<f64> {
            series.iter().map(|v| solution.value(*v)).collect()
        };
        let p_dispatch = values(dispatch);
        let p_nom_opt = cap.value(&solution);
        if su.p_nom_extendable {
            objective_value += su.capital_cost * p_nom_opt;
        }
        objective_value += p_dispatch
            .iter()
            .zip(&weights)
            .map(|(d, w)| w.objective.value() * su.marginal_cost * d)
            .sum::<f64>();
        su_results.push(StorageResult {
            id: su.id,
            p_nom_opt,
            p_dispatch,
            p_store: values(store),
            state_of_charge: values(soc),
        });
    }

    let mut line_results = Vec::with_capacity(lines.len());
    for ((line, cap), flows) in lines.iter().zip(&line_cap).zip(&line_flow) {
        let s_nom_opt = cap.value(&solution);
        if line.s_nom_extendable {
            objective_value += line.capital_cost * s_nom_opt;
        }
        line_results.push(LineResult {
            id: line.id,
            s_nom_opt,
            p0: flows.iter().map(|v| solution.value(*v)).collect(),
        });
    }

    // === Extract duals ===
    let mut prices = HashMap::new();
    let mut shadow_prices = trivial_shadow_prices;
    if config.compute_prices {
        let duals = solution.compute_dual();

        // The dual of `net == load` is minus the cost of serving one more MWh
        for (bus, refs) in buses.iter().zip(&balance_refs) {
            let series = refs
                .iter()
                .zip(&weights)
                .map(|(r, w)| {
                    let weight = w.objective.value();
                    if weight.abs() < config.min_price_weight {
                        0.0
                    } else {
                        -duals.dual(r.clone()) / weight
                    }
                })
                .collect();
            prices.insert(bus.id, series);
        }

        // mu is the change in objective per unit increase of the constant;
        // `>=` rows are stored negated
        for (k, sense, r) in &global_refs {
            let z = duals.dual(r.clone());
            let mu = match sense {
                Sense::GreaterEqual => z,
                Sense::LessEqual | Sense::Equal => -z,
            };
            shadow_prices.push((*k, mu));
        }
    }

    Ok(ModelResults {
        objective: objective_value,
        generators: gen_results,
        storage_units: su_results,
        lines: line_results,
        prices,
        shadow_prices,
        num_variables,
        num_constraints,
    })
}

fn apply_results(network: &mut Network, results: ModelResults) {
    network.clear_results();

    let mut generators: HashMap<GeneratorId, GeneratorResult> =
        results.generators.into_iter().map(|r| (r.id, r)).collect();
    let mut storage: HashMap<StorageUnitId, StorageResult> =
        results.storage_units.into_iter().map(|r| (r.id, r)).collect();
    let mut lines: HashMap<LineId, LineResult> =
        results.lines.into_iter().map(|r| (r.id, r)).collect();
    let mut prices = results.prices;

    for node in network.graph.node_weights_mut() {
        match node {
            Node::Bus(bus) => {
                if let Some(series) = prices.remove(&bus.id) {
                    bus.marginal_price = series;
                }
            }
            Node::Generator(gen) => {
                if let Some(r) = generators.remove(&gen.id) {
                    gen.p_nom_opt = Megawatts(r.p_nom_opt);
                    gen.p = r.p;
                }
            }
            Node::StorageUnit(su) => {
                if let Some(r) = storage.remove(&su.id) {
                    su.p_nom_opt = Megawatts(r.p_nom_opt);
                    su.p_dispatch = r.p_dispatch;
                    su.p_store = r.p_store;
                    su.state_of_charge = r.state_of_charge;
                }
            }
            Node::Load(_) => {}
        }
    }

    for edge in network.graph.edge_weights_mut() {
        let Edge::Line(line) = edge;
        if let Some(r) = lines.remove(&line.id) {
            line.s_nom_opt = Megawatts(r.s_nom_opt);
            line.p0 = r.p0;
        }
    }

    for (k, mu) in results.shadow_prices {
        if let Some(gc) = network.global_constraints.get_mut(k) {
            gc.mu = Some(mu);
        }
    }

    network.objective = Some(results.objective);
}
