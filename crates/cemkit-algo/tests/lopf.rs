//! Linear optimal power flow tests

use cemkit_algo::{optimize, statistics, OptimizeConfig};
use cemkit_core::{
    Bus, Carrier, CemError, GlobalConstraint, Generator, Hours, Line, Load, Network, Sense,
    SnapshotWeighting, StorageUnit,
};
use chrono::{NaiveDate, NaiveDateTime};

fn hourly(n: u32) -> Vec<NaiveDateTime> {
    let day = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
    (0..n).map(|h| day.and_hms_opt(h, 0, 0).unwrap()).collect()
}

fn close(actual: f64, expected: f64, tol: f64) -> bool {
    (actual - expected).abs() <= tol * expected.abs().max(1.0)
}

/// One bus, two fixed generators, 150 MW load
/// cheap: 100 MW @ 10, expensive: 100 MW @ 50
fn merit_order_network() -> Network {
    let mut network = Network::new();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_generator(
            Generator::new("cheap", bus)
                .with_p_nom(100.0)
                .with_marginal_cost(10.0),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("expensive", bus)
                .with_p_nom(100.0)
                .with_marginal_cost(50.0),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 150.0))
        .unwrap();
    network
}

#[test]
fn test_dispatch_follows_merit_order() {
    let mut network = merit_order_network();
    let outcome = optimize(&mut network, &OptimizeConfig::default()).expect("LP should solve");

    let cheap = network.generator("cheap").unwrap();
    let expensive = network.generator("expensive").unwrap();
    assert!(close(cheap.p[0], 100.0, 1e-3), "cheap = {}", cheap.p[0]);
    assert!(close(expensive.p[0], 50.0, 1e-3), "expensive = {}", expensive.p[0]);

    // 100 × 10 + 50 × 50
    assert!(close(outcome.objective, 3_500.0, 1e-3));
    assert_eq!(network.objective, Some(outcome.objective));
    assert_eq!(outcome.num_snapshots, 1);
}

#[test]
fn test_marginal_price_set_by_marginal_unit() {
    let mut network = merit_order_network();
    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let bus = network.buses().next().unwrap();
    assert_eq!(bus.marginal_price.len(), 1);
    assert!(
        close(bus.marginal_price[0], 50.0, 1e-2),
        "price = {}",
        bus.marginal_price[0]
    );
}

#[test]
fn test_prices_skipped_when_disabled() {
    let mut network = merit_order_network();
    let config = OptimizeConfig {
        compute_prices: false,
        ..OptimizeConfig::default()
    };
    optimize(&mut network, &config).unwrap();
    assert!(network.buses().next().unwrap().marginal_price.is_empty());
}

#[test]
fn test_extendable_generator_sized_to_peak_load() {
    let mut network = Network::new();
    network.set_snapshots(hourly(3)).unwrap();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_generator(
            Generator::new("gas", bus)
                .extendable()
                .with_capital_cost(1_000.0)
                .with_marginal_cost(10.0),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, vec![50.0, 100.0, 80.0]))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let gas = network.generator("gas").unwrap();
    assert!(close(gas.p_nom_opt.value(), 100.0, 1e-3), "p_nom_opt = {:?}", gas.p_nom_opt);
    assert!(close(gas.p[1], 100.0, 1e-3));
    // capex 100 × 1000 + opex 230 × 10
    assert!(close(network.objective.unwrap(), 102_300.0, 1e-3));
}

#[test]
fn test_cyclic_storage_returns_to_start() {
    let mut network = Network::new();
    network.set_snapshots(hourly(4)).unwrap();
    network.set_snapshot_weightings(2.0);
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_generator(
            Generator::new("solar", bus)
                .with_p_nom(100.0)
                .with_p_max_pu(vec![1.0, 0.0, 1.0, 0.0]),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("peaker", bus)
                .with_p_nom(100.0)
                .with_marginal_cost(100.0),
        )
        .unwrap();
    network
        .add_storage_unit(
            StorageUnit::new("battery", bus)
                .with_p_nom(50.0)
                .with_max_hours(4.0)
                .with_efficiencies(0.9, 0.9)
                .cyclic(),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 40.0))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let battery = network.storage_unit("battery").unwrap();
    let soc = &battery.state_of_charge;
    assert_eq!(soc.len(), 4);

    let last = soc[3];
    let expected_first =
        last + 2.0 * (0.9 * battery.p_store[0] - battery.p_dispatch[0] / 0.9);
    assert!((soc[0] - expected_first).abs() < 1e-2, "soc = {:?}", soc);

    // Storage shifts solar into the dark hours and displaces the peaker
    let discharged: f64 = battery.p_dispatch.iter().sum();
    assert!(discharged > 1.0, "battery never discharged");
    for level in soc {
        assert!(*level >= -1e-4 && *level <= 200.0 + 1e-2);
    }
}

/// Gas is cheap but emits, wind is expensive to build
fn emissions_network() -> Network {
    let mut network = Network::new();
    network.set_snapshots(hourly(2)).unwrap();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_carrier(Carrier::new("gas").with_co2_emissions(0.2))
        .unwrap();
    network.add_carrier(Carrier::new("wind")).unwrap();
    network
        .add_generator(
            Generator::new("gas", bus)
                .with_carrier("gas")
                .extendable()
                .with_efficiency(0.5)
                .with_capital_cost(100.0)
                .with_marginal_cost(50.0),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("wind", bus)
                .with_carrier("wind")
                .extendable()
                .with_capital_cost(1_000.0)
                .with_p_max_pu(vec![0.5, 1.0]),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 10.0))
        .unwrap();
    network
}

#[test]
fn test_uncapped_emissions_match_dispatch() {
    let mut network = emissions_network();
    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let gas = network.generator("gas").unwrap();
    assert!(close(gas.p_nom_opt.value(), 10.0, 1e-3));
    // 2 h × 10 MW / 0.5 × 0.2 t/MWh = 8 t
    assert!(close(statistics::total_emissions(&network) * 1e6, 8.0, 1e-3));
}

#[test]
fn test_zero_co2_cap_removes_emitting_dispatch() {
    let mut network = emissions_network();
    optimize(&mut network, &OptimizeConfig::default()).unwrap();
    let uncapped = network.objective.unwrap();

    network
        .add_global_constraint(GlobalConstraint::co2_limit("CO2Limit", Sense::LessEqual, 0.0))
        .unwrap();
    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    assert!(statistics::total_emissions(&network).abs() < 1e-9);
    let gas = network.generator("gas").unwrap();
    assert!(gas.p.iter().all(|p| p.abs() < 1e-3), "gas = {:?}", gas.p);

    let wind = network.generator("wind").unwrap();
    assert!(close(wind.p_nom_opt.value(), 20.0, 1e-3));
    assert!(network.objective.unwrap() > uncapped);

    // Relaxing the cap lets gas displace wind capacity, so the objective falls
    let mu = network.global_constraint("CO2Limit").unwrap().mu.unwrap();
    assert!(mu < -1.0, "mu = {}", mu);
}

#[test]
fn test_line_limit_splits_prices() {
    let mut network = Network::new();
    let north = network.add_bus(Bus::new("north")).unwrap();
    let south = network.add_bus(Bus::new("south")).unwrap();
    network
        .add_generator(
            Generator::new("north coal", north)
                .with_p_nom(300.0)
                .with_marginal_cost(10.0),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("south gas", south)
                .with_p_nom(300.0)
                .with_marginal_cost(50.0),
        )
        .unwrap();
    network
        .add_line(
            Line::new("north - south", north, south)
                .with_impedance(1.0, 1.0)
                .with_s_nom(100.0),
        )
        .unwrap();
    network
        .add_load(Load::new("south load", south, 150.0))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let line = network.line("north - south").unwrap();
    assert!(close(line.p0[0], 100.0, 1e-3), "flow = {}", line.p0[0]);
    assert!(close(network.generator("south gas").unwrap().p[0], 50.0, 1e-3));

    let price = |name: &str| {
        let id = network.bus_id(name).unwrap();
        network.bus(id).unwrap().marginal_price[0]
    };
    assert!(close(price("north"), 10.0, 1e-2), "north = {}", price("north"));
    assert!(close(price("south"), 50.0, 1e-2), "south = {}", price("south"));
}

#[test]
fn test_must_run_surplus_gives_negative_price() {
    let mut network = Network::new();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_generator(
            Generator::new("must run", bus)
                .with_p_nom(100.0)
                .with_marginal_cost(-20.0),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 50.0))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    assert!(close(network.objective.unwrap(), -1_000.0, 1e-3));
    let price = network.buses().next().unwrap().marginal_price[0];
    assert!(close(price, -20.0, 1e-2), "price = {}", price);
}

#[test]
fn test_zero_objective_weight_snapshot_has_zero_price() {
    let mut network = merit_order_network();
    network.set_snapshots(hourly(2)).unwrap();
    network
        .snapshots_mut()
        .set_weightings(vec![
            SnapshotWeighting::uniform(1.0),
            SnapshotWeighting {
                objective: Hours(0.0),
                ..SnapshotWeighting::uniform(1.0)
            },
        ])
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let prices = &network.buses().next().unwrap().marginal_price;
    assert_eq!(prices.len(), 2);
    assert!(close(prices[0], 50.0, 1e-2), "prices = {:?}", prices);
    assert_eq!(prices[1], 0.0);
}

#[test]
fn test_minimum_output_is_respected() {
    let mut network = Network::new();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_generator(
            Generator::new("baseload", bus)
                .with_p_nom(100.0)
                .with_p_min_pu(0.2)
                .with_marginal_cost(30.0),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("cheap", bus)
                .with_p_nom(100.0)
                .with_marginal_cost(10.0),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 50.0))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let baseload = network.generator("baseload").unwrap().p[0];
    let cheap = network.generator("cheap").unwrap().p[0];
    assert!(close(baseload, 20.0, 1e-3), "baseload = {}", baseload);
    assert!(close(cheap, 30.0, 1e-3), "cheap = {}", cheap);
    let price = network.buses().next().unwrap().marginal_price[0];
    assert!(close(price, 10.0, 1e-2), "price = {}", price);
}

#[test]
fn test_non_cyclic_storage_decays_from_initial_level() {
    let mut network = Network::new();
    network.set_snapshots(hourly(3)).unwrap();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_storage_unit(
            StorageUnit::new("reservoir", bus)
                .with_p_nom(50.0)
                .with_max_hours(10.0)
                .with_efficiencies(1.0, 1.0)
                .with_standing_loss(0.1)
                .with_state_of_charge_initial(100.0),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 20.0))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    // e_t = 0.9 e_{t-1} - 20, starting from 100
    let soc = &network.storage_unit("reservoir").unwrap().state_of_charge;
    for (actual, expected) in soc.iter().zip([70.0, 43.0, 18.7]) {
        assert!(close(*actual, expected, 1e-3), "soc = {:?}", soc);
    }
}

/// Emitting gas (0.4 t/MWh at 50 % efficiency) next to wind, 50 MW load
fn capped_network(gas_cost: f64, wind_cost: f64, sense: Sense) -> Network {
    let mut network = Network::new();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_carrier(Carrier::new("gas").with_co2_emissions(0.2))
        .unwrap();
    network.add_carrier(Carrier::new("wind")).unwrap();
    network
        .add_generator(
            Generator::new("gas", bus)
                .with_carrier("gas")
                .with_p_nom(100.0)
                .with_efficiency(0.5)
                .with_marginal_cost(gas_cost),
        )
        .unwrap();
    network
        .add_generator(
            Generator::new("wind", bus)
                .with_carrier("wind")
                .with_p_nom(100.0)
                .with_marginal_cost(wind_cost),
        )
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 50.0))
        .unwrap();
    network
        .add_global_constraint(GlobalConstraint::co2_limit("CO2Limit", sense, 8.0))
        .unwrap();
    network
}

#[test]
fn test_binding_upper_cap_has_negative_mu() {
    let mut network = capped_network(10.0, 30.0, Sense::LessEqual);
    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    // 8 t / 0.4 t/MWh = 20 MWh of gas
    assert!(close(network.generator("gas").unwrap().p[0], 20.0, 1e-3));
    assert!(close(network.generator("wind").unwrap().p[0], 30.0, 1e-3));
    assert!(close(network.objective.unwrap(), 1_100.0, 1e-3));

    // One more tonne is 2.5 MWh of gas replacing wind at 20 less per MWh
    let mu = network.global_constraint("CO2Limit").unwrap().mu.unwrap();
    assert!(close(mu, -50.0, 1e-2), "mu = {}", mu);
    let price = network.buses().next().unwrap().marginal_price[0];
    assert!(close(price, 30.0, 1e-2), "price = {}", price);
}

#[test]
fn test_binding_lower_bound_has_positive_mu() {
    for sense in [Sense::GreaterEqual, Sense::Equal] {
        let mut network = capped_network(50.0, 0.0, sense);
        optimize(&mut network, &OptimizeConfig::default()).unwrap();

        assert!(close(network.generator("gas").unwrap().p[0], 20.0, 1e-3));
        assert!(close(network.objective.unwrap(), 1_000.0, 1e-3));

        let mu = network.global_constraint("CO2Limit").unwrap().mu.unwrap();
        assert!(close(mu, 125.0, 1e-2), "{} mu = {}", sense, mu);
        let price = network.buses().next().unwrap().marginal_price[0];
        assert!(close(price, 0.0, 1e-3), "{} price = {}", sense, price);
    }
}

#[test]
fn test_transport_link_joins_two_angle_sub_networks() {
    let mut network = Network::new();
    let mut bus = |name: &str| network.add_bus(Bus::new(name)).unwrap();
    let (a, b, c, d) = (bus("a"), bus("b"), bus("c"), bus("d"));
    network
        .add_line(Line::new("a - b", a, b).with_impedance(0.0, 1.0).with_s_nom(1_000.0))
        .unwrap();
    network
        .add_line(Line::new("b - c", b, c).with_s_nom(50.0))
        .unwrap();
    network
        .add_line(Line::new("c - d", c, d).with_impedance(0.0, 1.0).with_s_nom(1_000.0))
        .unwrap();
    network
        .add_generator(Generator::new("west", a).with_p_nom(200.0).with_marginal_cost(10.0))
        .unwrap();
    network
        .add_generator(Generator::new("east", d).with_p_nom(200.0).with_marginal_cost(50.0))
        .unwrap();
    for (name, bus, demand) in [("load b", b, 20.0), ("load c", c, 30.0), ("load d", d, 40.0)] {
        network.add_load(Load::new(name, bus, demand)).unwrap();
    }

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let flow = |name: &str| network.line(name).unwrap().p0[0];
    assert!(close(flow("a - b"), 70.0, 1e-3), "a - b = {}", flow("a - b"));
    assert!(close(flow("b - c"), 50.0, 1e-3), "b - c = {}", flow("b - c"));
    assert!(close(flow("c - d"), 20.0, 1e-3), "c - d = {}", flow("c - d"));
    assert!(close(network.generator("west").unwrap().p[0], 70.0, 1e-3));
    assert!(close(network.generator("east").unwrap().p[0], 20.0, 1e-3));

    let price = |name: &str| {
        let id = network.bus_id(name).unwrap();
        network.bus(id).unwrap().marginal_price[0]
    };
    for (name, expected) in [("a", 10.0), ("b", 10.0), ("c", 50.0), ("d", 50.0)] {
        assert!(close(price(name), expected, 1e-2), "{} = {}", name, price(name));
    }
}

#[test]
fn test_extendable_line_sized_to_transfer() {
    let mut network = Network::new();
    let north = network.add_bus(Bus::new("north")).unwrap();
    let south = network.add_bus(Bus::new("south")).unwrap();
    network
        .add_generator(Generator::new("north coal", north).with_p_nom(300.0).with_marginal_cost(10.0))
        .unwrap();
    network
        .add_generator(Generator::new("south gas", south).with_p_nom(300.0).with_marginal_cost(50.0))
        .unwrap();
    network
        .add_line(
            Line::new("north - south", north, south)
                .with_impedance(0.0, 1.0)
                .extendable()
                .with_capital_cost(1.0),
        )
        .unwrap();
    network
        .add_load(Load::new("south load", south, 60.0))
        .unwrap();

    optimize(&mut network, &OptimizeConfig::default()).unwrap();

    let line = network.line("north - south").unwrap();
    assert!(close(line.s_nom_opt.value(), 60.0, 1e-3), "s_nom_opt = {:?}", line.s_nom_opt);
    assert!(close(line.p0[0], 60.0, 1e-3));
    // capex 60 × 1 + opex 60 × 10
    assert!(close(network.objective.unwrap(), 660.0, 1e-3));
    let south_price = network.bus(south).unwrap().marginal_price[0];
    assert!(close(south_price, 11.0, 1e-2), "south = {}", south_price);
}

#[test]
fn test_infeasible_network_is_solver_error() {
    let mut network = Network::new();
    let bus = network.add_bus(Bus::new("electricity")).unwrap();
    network
        .add_generator(Generator::new("small", bus).with_p_nom(50.0))
        .unwrap();
    network
        .add_load(Load::new("demand", bus, 100.0))
        .unwrap();

    let result = optimize(&mut network, &OptimizeConfig::default());
    assert!(matches!(result, Err(CemError::Solver(_))), "{:?}", result);
    assert!(network.objective.is_none());
}

#[test]
fn test_invalid_network_is_rejected_before_solving() {
    let mut network = Network::new();
    let result = optimize(&mut network, &OptimizeConfig::default());
    assert!(matches!(result, Err(CemError::Validation(_))));
}
